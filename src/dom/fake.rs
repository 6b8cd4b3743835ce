//! Scripted in-memory host page for unit tests.
//!
//! Nodes match selectors by exact string. Reactions model the host app's
//! own behaviour (a click reveals a dialog, Enter confirms a recipient),
//! either at once or after a delay, the way a framework re-renders on its
//! next tick. Time is tokio time, so tests run with a paused clock.

use super::{
    BBox, Dom, ElementInfo, ElementKind, ElementRef, EventTarget, KeyPhase, PointerPhase,
    SyntheticEvent,
};
use crate::config::{Config, Modifiers, SelectorTable, Target, Timings};
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub(crate) struct Node {
    selectors: Vec<String>,
    kind: ElementKind,
    text: String,
    attached: bool,
    appears_at: Option<Instant>,
    disabled_until: Option<Instant>,
    disabled: bool,
    strips_writes: bool,
    bbox: BBox,
}

impl Node {
    fn new(kind: ElementKind, selectors: &[&str]) -> Self {
        Self {
            selectors: selectors.iter().map(|s| s.to_string()).collect(),
            kind,
            text: String::new(),
            attached: true,
            appears_at: None,
            disabled_until: None,
            disabled: false,
            strips_writes: false,
            bbox: BBox {
                x: 100.0,
                y: 200.0,
                width: 300.0,
                height: 40.0,
            },
        }
    }

    pub fn rich_text(selectors: &[&str]) -> Self {
        Self::new(ElementKind::RichText, selectors)
    }

    pub fn input(selectors: &[&str]) -> Self {
        Self::new(ElementKind::PlainInput, selectors)
    }

    pub fn other(selectors: &[&str]) -> Self {
        Self::new(ElementKind::Other, selectors)
    }

    /// Not in the document until revealed by a reaction.
    pub fn hidden(mut self) -> Self {
        self.attached = false;
        self
    }

    /// Attached, but only matches after `delay`.
    pub fn appears_after(mut self, delay: Duration) -> Self {
        self.appears_at = Some(Instant::now() + delay);
        self
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    pub fn disabled_for(mut self, delay: Duration) -> Self {
        self.disabled_until = Some(Instant::now() + delay);
        self
    }

    /// Writes are accepted but the host framework immediately discards them.
    pub fn strips_writes(mut self) -> Self {
        self.strips_writes = true;
        self
    }

    fn matchable(&self, now: Instant) -> bool {
        self.attached && self.appears_at.map_or(true, |t| now >= t)
    }

    fn is_disabled(&self, now: Instant) -> bool {
        self.disabled || self.disabled_until.is_some_and(|t| now < t)
    }
}

#[derive(Debug, Clone)]
pub(crate) enum Trigger {
    /// `click()` or a synthetic click on the node.
    Click(ElementRef),
    /// keydown of `key` on a node (or the document) with the given modifiers.
    Key {
        target: Option<ElementRef>,
        key: &'static str,
        modifiers: Modifiers,
    },
    /// Enter on a node whose text contains `needle`.
    Confirm { target: ElementRef, needle: String },
    /// Synthetic paste on the node.
    Paste(ElementRef),
}

/// Page-side effects fired by a reaction.

#[derive(Debug, Clone, Copy)]
pub(crate) enum Effect {
    Reveal(ElementRef),
    Detach(ElementRef),
}

/// One observable side effect on the page.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Mutate { op: &'static str, el: ElementRef, text: String },
    Dispatch { target: Option<ElementRef>, event: SyntheticEvent },
    Click(ElementRef),
    Focus(ElementRef),
    Clipboard(String),
}

struct State {
    url: String,
    session: HashMap<String, String>,
    platform: String,
    nodes: Vec<Node>,
    reactions: Vec<(Trigger, Duration, Vec<Effect>)>,
    pending: Vec<(Instant, Effect)>,
    focused: Option<ElementRef>,
    foreground: bool,
    foreground_at: Option<Instant>,
    watching: bool,
    exec_command: bool,
    clipboard: Option<String>,
    clipboard_delay: Duration,
    failing: HashSet<&'static str>,
    calls: Vec<Call>,
    reads: usize,
}

pub(crate) struct FakeDom {
    state: Mutex<State>,
}

impl FakeDom {
    pub fn new(url: &str) -> Self {
        Self {
            state: Mutex::new(State {
                url: url.to_string(),
                session: HashMap::new(),
                platform: "Linux x86_64".into(),
                nodes: Vec::new(),
                reactions: Vec::new(),
                pending: Vec::new(),
                focused: None,
                foreground: true,
                foreground_at: None,
                watching: false,
                exec_command: true,
                clipboard: None,
                clipboard_delay: Duration::ZERO,
                failing: HashSet::new(),
                calls: Vec::new(),
                reads: 0,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        let mut s = self.state.lock().unwrap_or_else(|e| e.into_inner());
        s.apply_due(Instant::now());
        s
    }

    pub fn add(&self, node: Node) -> ElementRef {
        let mut s = self.lock();
        s.nodes.push(node);
        ElementRef((s.nodes.len() - 1) as u64)
    }

    pub fn on(&self, trigger: Trigger, effects: &[Effect]) {
        self.on_after(trigger, Duration::ZERO, effects);
    }

    /// Like [`FakeDom::on`], with the effects landing `delay` after the trigger.
    pub fn on_after(&self, trigger: Trigger, delay: Duration, effects: &[Effect]) {
        self.lock().reactions.push((trigger, delay, effects.to_vec()));
    }

    /// Apply `effects` once `delay` has passed, with no trigger.
    pub fn schedule(&self, delay: Duration, effects: &[Effect]) {
        let at = Instant::now() + delay;
        self.lock()
            .pending
            .extend(effects.iter().map(|e| (at, *e)));
    }

    pub fn set_session(&self, key: &str, value: &str) {
        self.lock().session.insert(key.into(), value.into());
    }

    pub fn set_platform(&self, platform: &str) {
        self.lock().platform = platform.into();
    }

    /// Background tab that comes to the foreground after `delay` (never if `None`).
    pub fn background_until(&self, delay: Option<Duration>) {
        let mut s = self.lock();
        s.foreground = false;
        s.foreground_at = delay.map(|d| Instant::now() + d);
    }

    /// Make `document.execCommand('insertText')` report failure.
    pub fn without_exec_command(&self) {
        self.lock().exec_command = false;
    }

    pub fn set_clipboard(&self, text: Option<&str>) {
        self.lock().clipboard = text.map(str::to_string);
    }

    pub fn clipboard(&self) -> Option<String> {
        self.lock().clipboard.clone()
    }

    /// Make clipboard reads take `delay`, as a permission prompt would.
    pub fn slow_clipboard(&self, delay: Duration) {
        self.lock().clipboard_delay = delay;
    }

    /// Make an operation fail with a transient error.
    pub fn fail_on(&self, op: &'static str) {
        self.lock().failing.insert(op);
    }

    pub fn text(&self, el: ElementRef) -> String {
        self.lock().nodes[el.0 as usize].text.clone()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Number of calls that changed page state or dispatched events.
    pub fn side_effects(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| !matches!(c, Call::Clipboard(_)))
            .count()
    }

    pub fn mutations(&self) -> Vec<(&'static str, ElementRef, String)> {
        self.lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::Mutate { op, el, text } => Some((*op, *el, text.clone())),
                _ => None,
            })
            .collect()
    }

    /// Events dispatched to a target, in order.
    pub fn events_on(&self, target: Option<ElementRef>) -> Vec<SyntheticEvent> {
        self.lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::Dispatch { target: t, event } if *t == target => Some(event.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clicked(&self, el: ElementRef) -> bool {
        self.lock().calls.iter().any(|c| match c {
            Call::Click(e) => *e == el,
            Call::Dispatch {
                target: Some(e),
                event: SyntheticEvent::Pointer {
                    phase: PointerPhase::Click,
                    ..
                },
            } => *e == el,
            _ => false,
        })
    }

    /// Whether any Enter keydown reached `target`.
    pub fn pressed_enter(&self, target: Option<ElementRef>) -> bool {
        self.events_on(target).iter().any(|e| {
            matches!(e, SyntheticEvent::Key { phase: KeyPhase::Down, key, .. } if key == "Enter")
        })
    }

    /// Number of page reads (queries, descriptions, text reads).
    pub fn reads(&self) -> usize {
        self.lock().reads
    }
}

impl State {
    fn check(&self, op: &'static str) -> Result<()> {
        if self.failing.contains(op) {
            Err(Error::Transient(format!("{} failed", op)))
        } else {
            Ok(())
        }
    }

    fn node(&self, el: ElementRef) -> Result<&Node> {
        self.nodes
            .get(el.0 as usize)
            .filter(|n| n.attached)
            .ok_or_else(|| Error::Transient(format!("element #{} detached", el.0)))
    }

    fn node_mut(&mut self, el: ElementRef) -> Result<&mut Node> {
        self.nodes
            .get_mut(el.0 as usize)
            .filter(|n| n.attached)
            .ok_or_else(|| Error::Transient(format!("element #{} detached", el.0)))
    }

    fn write(&mut self, op: &'static str, el: ElementRef, text: String, append: bool) -> Result<()> {
        self.calls.push(Call::Mutate {
            op,
            el,
            text: text.clone(),
        });
        let node = self.node_mut(el)?;
        if node.strips_writes {
            node.text.clear();
        } else if append {
            node.text.push_str(&text);
        } else {
            node.text = text;
        }
        Ok(())
    }

    fn fire(&mut self, fired: impl Fn(&Trigger, &State) -> bool) {
        let now = Instant::now();
        let effects: Vec<(Duration, Effect)> = self
            .reactions
            .iter()
            .filter(|(t, _, _)| fired(t, self))
            .flat_map(|(_, delay, e)| e.iter().map(move |e| (*delay, *e)))
            .collect();
        for (delay, effect) in effects {
            if delay.is_zero() {
                self.apply(effect);
            } else {
                self.pending.push((now + delay, effect));
            }
        }
    }

    fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::Reveal(el) => {
                let node = &mut self.nodes[el.0 as usize];
                node.attached = true;
                node.appears_at = None;
            }
            Effect::Detach(el) => self.nodes[el.0 as usize].attached = false,
        }
    }

    fn apply_due(&mut self, now: Instant) {
        let (due, later): (Vec<_>, Vec<_>) =
            self.pending.drain(..).partition(|(at, _)| *at <= now);
        self.pending = later;
        for (_, effect) in due {
            self.apply(effect);
        }
    }

    fn react(&mut self, target: Option<ElementRef>, event: &SyntheticEvent) {
        match event {
            SyntheticEvent::Pointer {
                phase: PointerPhase::Click,
                ..
            } => {
                if let Some(el) = target {
                    self.fire(|t, _| matches!(t, Trigger::Click(c) if *c == el));
                }
            }
            SyntheticEvent::Paste { .. } => {
                if let Some(el) = target {
                    self.fire(|t, _| matches!(t, Trigger::Paste(p) if *p == el));
                }
            }
            SyntheticEvent::Key {
                phase: KeyPhase::Down,
                key,
                modifiers,
            } => {
                let key = key.clone();
                let modifiers = *modifiers;
                self.fire(|t, s| match t {
                    Trigger::Key {
                        target: kt,
                        key: k,
                        modifiers: m,
                    } => *kt == target && *k == key && *m == modifiers,
                    Trigger::Confirm { target: ct, needle } => {
                        key == "Enter"
                            && Some(*ct) == target
                            && s.nodes[ct.0 as usize].text.contains(needle.as_str())
                    }
                    _ => false,
                });
            }
            _ => {}
        }
    }
}

#[async_trait(?Send)]
impl Dom for FakeDom {
    async fn location(&self) -> Result<String> {
        let mut s = self.lock();
        s.reads += 1;
        Ok(s.url.clone())
    }

    async fn session_item(&self, key: &str) -> Result<Option<String>> {
        let mut s = self.lock();
        s.check("session_item")?;
        s.reads += 1;
        Ok(s.session.get(key).cloned())
    }

    async fn platform(&self) -> Result<String> {
        Ok(self.lock().platform.clone())
    }

    async fn query(&self, selector: &str) -> Result<Option<ElementRef>> {
        let mut s = self.lock();
        s.check("query")?;
        s.reads += 1;
        let now = Instant::now();
        Ok(s
            .nodes
            .iter()
            .position(|n| n.matchable(now) && n.selectors.iter().any(|sel| sel == selector))
            .map(|i| ElementRef(i as u64)))
    }

    async fn is_attached(&self, el: ElementRef) -> Result<bool> {
        let s = self.lock();
        Ok(s.nodes.get(el.0 as usize).is_some_and(|n| n.attached))
    }

    async fn describe(&self, el: ElementRef) -> Result<ElementInfo> {
        let mut s = self.lock();
        s.check("describe")?;
        s.reads += 1;
        let now = Instant::now();
        let node = s.node(el)?;
        Ok(ElementInfo {
            kind: node.kind,
            disabled: node.is_disabled(now),
            bbox: node.bbox,
        })
    }

    async fn rendered_text(&self, el: ElementRef) -> Result<String> {
        let mut s = self.lock();
        s.check("rendered_text")?;
        s.reads += 1;
        Ok(s.node(el)?.text.clone())
    }

    async fn is_foreground(&self) -> Result<bool> {
        let s = self.lock();
        Ok(s.foreground || s.foreground_at.is_some_and(|t| Instant::now() >= t))
    }

    async fn watch_visibility(&self) -> Result<()> {
        self.lock().watching = true;
        Ok(())
    }

    async fn visibility_signalled(&self) -> Result<bool> {
        let s = self.lock();
        Ok(s.watching && s.foreground_at.is_some_and(|t| Instant::now() >= t))
    }

    async fn focus(&self, el: ElementRef) -> Result<()> {
        let mut s = self.lock();
        s.check("focus")?;
        s.node(el)?;
        s.focused = Some(el);
        s.calls.push(Call::Focus(el));
        Ok(())
    }

    async fn caret_to_end(&self, el: ElementRef) -> Result<()> {
        let mut s = self.lock();
        s.check("caret_to_end")?;
        s.node(el)?;
        s.focused = Some(el);
        Ok(())
    }

    async fn insert_text_command(&self, text: &str) -> Result<bool> {
        let mut s = self.lock();
        s.check("insert_text_command")?;
        if !s.exec_command {
            return Ok(false);
        }
        let Some(el) = s.focused else {
            return Ok(false);
        };
        if s.node(el)?.kind == ElementKind::Other {
            return Ok(false);
        }
        s.write("insert_text", el, text.to_string(), true)?;
        Ok(true)
    }

    async fn set_text_content(&self, el: ElementRef, text: &str) -> Result<()> {
        let mut s = self.lock();
        s.check("set_text_content")?;
        s.write("set_text_content", el, text.to_string(), false)
    }

    async fn set_native_value(&self, el: ElementRef, text: &str) -> Result<()> {
        let mut s = self.lock();
        s.check("set_native_value")?;
        s.write("set_native_value", el, text.to_string(), false)
    }

    async fn clear(&self, el: ElementRef) -> Result<()> {
        let mut s = self.lock();
        s.check("clear")?;
        s.write("clear", el, String::new(), false)
    }

    async fn click(&self, el: ElementRef) -> Result<()> {
        let mut s = self.lock();
        s.check("click")?;
        s.node(el)?;
        s.calls.push(Call::Click(el));
        s.fire(|t, _| matches!(t, Trigger::Click(c) if *c == el));
        Ok(())
    }

    async fn dispatch(&self, target: EventTarget, event: &SyntheticEvent) -> Result<()> {
        let mut s = self.lock();
        s.check("dispatch")?;
        let target = match target {
            EventTarget::Document => None,
            EventTarget::Element(el) => {
                s.node(el)?;
                Some(el)
            }
        };
        s.calls.push(Call::Dispatch {
            target,
            event: event.clone(),
        });
        s.react(target, event);
        Ok(())
    }

    async fn read_clipboard(&self) -> Result<String> {
        let delay = self.lock().clipboard_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let s = self.lock();
        s.check("read_clipboard")?;
        Ok(s.clipboard.clone().unwrap_or_default())
    }

    async fn write_clipboard(&self, text: &str) -> Result<bool> {
        let mut s = self.lock();
        s.check("write_clipboard")?;
        s.clipboard = Some(text.to_string());
        s.calls.push(Call::Clipboard(text.to_string()));
        Ok(true)
    }
}

/// Selectors used by scenario tests, two shapes for composer and "To" field.
pub(crate) const COMPOSER: &str = "#composer";
pub(crate) const COMPOSER_LEGACY: &str = "#composer-legacy";
pub(crate) const NEW_MESSAGE: &str = "#new-message";
pub(crate) const TO_REGION: &str = "#to-region";
pub(crate) const TO_INPUT: &str = "#to-input";
pub(crate) const TO_RICH: &str = "#to-rich";
pub(crate) const CHIP: &str = "#chip";
pub(crate) const PROFILE_MESSAGE: &str = "#profile-message";
pub(crate) const SWITCHER: &str = "#switcher";
pub(crate) const SEND: &str = "#send";

/// Config with the test selectors and a short warm-up.
pub(crate) fn test_config() -> Config {
    let list = |sels: &[&str]| sels.iter().map(|s| s.to_string()).collect::<Vec<_>>();
    let selectors = SelectorTable::default()
        .set(Target::Composer, list(&[COMPOSER, COMPOSER_LEGACY]))
        .set(Target::NewConversation, list(&[NEW_MESSAGE]))
        .set(Target::RecipientRegion, list(&[TO_REGION]))
        .set(Target::RecipientInput, list(&[TO_INPUT, TO_RICH]))
        .set(Target::RecipientChip, list(&[CHIP]))
        .set(Target::ProfileMessage, list(&[PROFILE_MESSAGE]))
        .set(Target::QuickSwitcherInput, list(&[SWITCHER]))
        .set(Target::SendControl, list(&[SEND]));
    Config {
        selectors,
        timings: Timings {
            warmup_ms: 100,
            ..Timings::default()
        },
        ..Config::default()
    }
}
