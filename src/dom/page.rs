//! [`Dom`] over a live browser tab.
//!
//! Located elements are kept in a page-side registry (`window.__courier.refs`)
//! and referred to by index, so the document itself is never annotated and
//! the same node always maps to the same [`ElementRef`].

use super::{Dom, ElementInfo, ElementRef, EventTarget, SyntheticEvent};
use crate::{Error, Result};
use async_trait::async_trait;
use eoka::Page;

const REGISTRY: &str =
    "(window.__courier = window.__courier || { refs: [], visible: false, watching: false, clip: undefined })";

/// Look up `selector`, register the match and return its index.
/// `-1` means no attached match, `-2` an invalid selector.
const QUERY_JS: &str = r#"((sel) => {
    const R = __REGISTRY__;
    let el = null;
    try { el = document.querySelector(sel); } catch (e) { return -2; }
    if (!el || !el.isConnected) return -1;
    let i = R.refs.indexOf(el);
    if (i < 0) { R.refs.push(el); i = R.refs.length - 1; }
    return i;
})"#;

const DESCRIBE_JS: &str = r#"
    const tag = el.tagName.toLowerCase();
    const kind = (tag === 'input' || tag === 'textarea')
        ? 'plain_input'
        : (el.isContentEditable ? 'rich_text' : 'other');
    const r = el.getBoundingClientRect();
    return JSON.stringify({
        kind,
        disabled: !!el.disabled || el.getAttribute('aria-disabled') === 'true',
        bbox: { x: r.x, y: r.y, width: r.width, height: r.height },
    });
"#;

const RENDERED_TEXT_JS: &str = r#"
    const tag = el.tagName.toLowerCase();
    if (tag === 'input' || tag === 'textarea') return el.value || '';
    return (el.innerText !== undefined ? el.innerText : el.textContent) || '';
"#;

const CARET_TO_END_JS: &str = r#"
    el.focus();
    const tag = el.tagName.toLowerCase();
    if (tag === 'input' || tag === 'textarea') {
        const n = (el.value || '').length;
        try { el.setSelectionRange(n, n); } catch (e) {}
        return true;
    }
    const range = document.createRange();
    range.selectNodeContents(el);
    range.collapse(false);
    const sel = window.getSelection();
    sel.removeAllRanges();
    sel.addRange(range);
    return true;
"#;

const NATIVE_VALUE_JS: &str = r#"
    const proto = el instanceof HTMLTextAreaElement
        ? HTMLTextAreaElement.prototype
        : HTMLInputElement.prototype;
    const desc = Object.getOwnPropertyDescriptor(proto, 'value');
    if (desc && desc.set) { desc.set.call(el, text); } else { el.value = text; }
    return true;
"#;

const CLEAR_JS: &str = r#"
    const tag = el.tagName.toLowerCase();
    if (tag === 'input' || tag === 'textarea') {
        const proto = el instanceof HTMLTextAreaElement
            ? HTMLTextAreaElement.prototype
            : HTMLInputElement.prototype;
        const desc = Object.getOwnPropertyDescriptor(proto, 'value');
        if (desc && desc.set) { desc.set.call(el, ''); } else { el.value = ''; }
    } else {
        el.textContent = '';
    }
    return true;
"#;

const DISPATCH_JS: &str = r#"
    const opts = { bubbles: true, cancelable: true, composed: true };
    switch (ev.type) {
        case 'key': {
            const m = ev.modifiers;
            const code = ev.key.length === 1 ? 'Key' + ev.key.toUpperCase() : ev.key;
            el.dispatchEvent(new KeyboardEvent(ev.phase, {
                ...opts, key: ev.key, code,
                ctrlKey: m.ctrl, metaKey: m.meta, shiftKey: m.shift, altKey: m.alt,
            }));
            return true;
        }
        case 'pointer': {
            const init = {
                ...opts, view: window, clientX: ev.x, clientY: ev.y, button: 0,
                buttons: ev.phase === 'pointerdown' ? 1 : 0, pointerType: 'mouse', isPrimary: true,
            };
            if (ev.phase === 'click') {
                el.dispatchEvent(new MouseEvent('click', init));
            } else {
                el.dispatchEvent(new PointerEvent(ev.phase, init));
                const mouse = { pointermove: 'mousemove', pointerdown: 'mousedown', pointerup: 'mouseup' }[ev.phase];
                el.dispatchEvent(new MouseEvent(mouse, init));
            }
            return true;
        }
        case 'paste': {
            const dt = new DataTransfer();
            dt.setData('text/plain', ev.data);
            el.dispatchEvent(new ClipboardEvent('paste', { ...opts, clipboardData: dt }));
            return true;
        }
        case 'before_input':
            el.dispatchEvent(new InputEvent('beforeinput', { ...opts, inputType: ev.input_type, data: ev.data }));
            return true;
        case 'input':
            el.dispatchEvent(new InputEvent('input', { ...opts, inputType: ev.input_type, data: ev.data }));
            return true;
        case 'change':
            el.dispatchEvent(new Event('change', { bubbles: true }));
            return true;
    }
    return false;
"#;

const WATCH_VISIBILITY_JS: &str = r#"(() => {
    const R = __REGISTRY__;
    if (R.watching) return true;
    R.watching = true;
    const mark = () => { if (document.visibilityState === 'visible') R.visible = true; };
    document.addEventListener('visibilitychange', mark);
    window.addEventListener('focus', mark);
    return true;
})()"#;

/// Browser-backed host page.
pub struct PageDom<'a> {
    page: &'a Page,
}

impl<'a> PageDom<'a> {
    pub fn new(page: &'a Page) -> Self {
        Self { page }
    }

    /// Get the underlying page.
    pub fn page(&self) -> &Page {
        self.page
    }

    /// Evaluate `body` with `el` bound to a registered, attached element.
    /// Yields `null` when the element is gone.
    async fn with_element<T>(&self, el: ElementRef, prelude: &str, body: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let js = format!(
            "(() => {{ const R = {REGISTRY}; const el = R.refs[{id}]; \
             if (!el || !el.isConnected) return null; {prelude} {body} }})()",
            id = el.0,
        );
        let value: Option<T> = self.page.evaluate(&js).await?;
        value.ok_or_else(|| Error::Transient(format!("element #{} detached", el.0)))
    }
}

/// Settled state of a parked `readText()` promise.
#[derive(serde::Deserialize)]
struct ClipboardRead {
    ok: bool,
    #[serde(default)]
    text: String,
    #[serde(default)]
    pending: bool,
}

fn js_str(s: &str) -> Result<String> {
    Ok(serde_json::to_string(s)?)
}

#[async_trait(?Send)]
impl Dom for PageDom<'_> {
    async fn location(&self) -> Result<String> {
        Ok(self.page.url().await?)
    }

    async fn session_item(&self, key: &str) -> Result<Option<String>> {
        let js = format!(
            "(() => {{ try {{ return sessionStorage.getItem({}); }} catch (e) {{ return null; }} }})()",
            js_str(key)?
        );
        Ok(self.page.evaluate(&js).await?)
    }

    async fn platform(&self) -> Result<String> {
        Ok(self.page.evaluate("navigator.platform || ''").await?)
    }

    async fn query(&self, selector: &str) -> Result<Option<ElementRef>> {
        let js = format!(
            "{}({})",
            QUERY_JS.replace("__REGISTRY__", REGISTRY),
            js_str(selector)?
        );
        let index: i64 = self.page.evaluate(&js).await?;
        match index {
            -2 => Err(Error::Transient(format!("invalid selector '{}'", selector))),
            i if i < 0 => Ok(None),
            i => Ok(Some(ElementRef(i as u64))),
        }
    }

    async fn is_attached(&self, el: ElementRef) -> Result<bool> {
        let js = format!(
            "(() => {{ const R = {REGISTRY}; const el = R.refs[{}]; return !!(el && el.isConnected); }})()",
            el.0
        );
        Ok(self.page.evaluate(&js).await?)
    }

    async fn describe(&self, el: ElementRef) -> Result<ElementInfo> {
        let json: String = self.with_element(el, "", DESCRIBE_JS).await?;
        Ok(serde_json::from_str(&json)?)
    }

    async fn rendered_text(&self, el: ElementRef) -> Result<String> {
        self.with_element(el, "", RENDERED_TEXT_JS).await
    }

    async fn is_foreground(&self) -> Result<bool> {
        Ok(self
            .page
            .evaluate("document.visibilityState === 'visible' && !document.hidden")
            .await?)
    }

    async fn watch_visibility(&self) -> Result<()> {
        let _: bool = self
            .page
            .evaluate(&WATCH_VISIBILITY_JS.replace("__REGISTRY__", REGISTRY))
            .await?;
        Ok(())
    }

    async fn visibility_signalled(&self) -> Result<bool> {
        let js = format!("!!{}.visible", REGISTRY);
        Ok(self.page.evaluate(&js).await?)
    }

    async fn focus(&self, el: ElementRef) -> Result<()> {
        let _: bool = self.with_element(el, "", "el.focus(); return true;").await?;
        Ok(())
    }

    async fn caret_to_end(&self, el: ElementRef) -> Result<()> {
        let _: bool = self.with_element(el, "", CARET_TO_END_JS).await?;
        Ok(())
    }

    async fn insert_text_command(&self, text: &str) -> Result<bool> {
        let js = format!(
            "(() => {{ try {{ return !!document.execCommand('insertText', false, {}); }} catch (e) {{ return false; }} }})()",
            js_str(text)?
        );
        Ok(self.page.evaluate(&js).await?)
    }

    async fn set_text_content(&self, el: ElementRef, text: &str) -> Result<()> {
        let prelude = format!("const text = {};", js_str(text)?);
        let _: bool = self
            .with_element(el, &prelude, "el.innerText = text; return true;")
            .await?;
        Ok(())
    }

    async fn set_native_value(&self, el: ElementRef, text: &str) -> Result<()> {
        let prelude = format!("const text = {};", js_str(text)?);
        let _: bool = self.with_element(el, &prelude, NATIVE_VALUE_JS).await?;
        Ok(())
    }

    async fn clear(&self, el: ElementRef) -> Result<()> {
        let _: bool = self.with_element(el, "", CLEAR_JS).await?;
        Ok(())
    }

    async fn click(&self, el: ElementRef) -> Result<()> {
        let _: bool = self.with_element(el, "", "el.click(); return true;").await?;
        Ok(())
    }

    async fn dispatch(&self, target: EventTarget, event: &SyntheticEvent) -> Result<()> {
        let prelude = format!("const ev = {};", serde_json::to_string(event)?);
        let ok: bool = match target {
            EventTarget::Element(el) => self.with_element(el, &prelude, DISPATCH_JS).await?,
            EventTarget::Document => {
                let js = format!("(() => {{ const el = document; {} {} }})()", prelude, DISPATCH_JS);
                self.page.evaluate(&js).await?
            }
        };
        if ok {
            Ok(())
        } else {
            Err(Error::Transient("event was not dispatched".into()))
        }
    }

    async fn read_clipboard(&self) -> Result<String> {
        // readText() is a promise; park its result in the registry and pick it up.
        let kick = format!(
            "(() => {{ const R = {REGISTRY}; R.clip = undefined; \
             if (!navigator.clipboard || !navigator.clipboard.readText) return false; \
             navigator.clipboard.readText().then(t => {{ R.clip = t; }}, () => {{ R.clip = null; }}); \
             return true; }})()"
        );
        let started: bool = self.page.evaluate(&kick).await?;
        if !started {
            return Err(Error::Transient("clipboard API unavailable".into()));
        }
        self.page.wait(150).await;
        // string: read; null: rejected; undefined: still pending
        let js = format!(
            "(() => {{ const c = {REGISTRY}.clip; \
             return typeof c === 'string' ? {{ ok: true, text: c }} : {{ ok: false, pending: c === undefined }}; }})()"
        );
        let read: ClipboardRead = self.page.evaluate(&js).await?;
        match read {
            ClipboardRead { ok: true, text, .. } => Ok(text),
            ClipboardRead { pending: true, .. } => {
                Err(Error::Transient("clipboard read did not settle".into()))
            }
            _ => Err(Error::Transient("clipboard read rejected".into())),
        }
    }

    async fn write_clipboard(&self, text: &str) -> Result<bool> {
        let js = format!(
            "(() => {{ if (!navigator.clipboard || !navigator.clipboard.writeText) return false; \
             navigator.clipboard.writeText({}).catch(() => {{}}); return true; }})()",
            js_str(text)?
        );
        Ok(self.page.evaluate(&js).await?)
    }
}
