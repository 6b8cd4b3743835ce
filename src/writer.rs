//! Text insertion into host-page inputs.
//!
//! The host's reactive framework only observes certain event sequences, so
//! each input shape has its own path:
//!
//! - rich text: caret to end, `insertText` command, else overwrite the
//!   content and dispatch an `input` event carrying the text
//! - plain input: `insertText` command, else set `value` through the
//!   prototype setter and dispatch `change` + `input`
//! - simulated paste: clear, then `paste` / `beforeinput` / mutation /
//!   `input`, both input events tagged `insertFromPaste`
//!
//! Reporting success never replaces the caller's own check that the text is
//! present; see [`FieldWriter::verify`].

use crate::dom::{Dom, ElementKind, ElementRef, EventTarget, InputType, SyntheticEvent};
use crate::Result;
use tracing::debug;

/// Which insertion strategy produced the final content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// `document.execCommand('insertText')`.
    InsertCommand,
    /// Direct content overwrite plus `input` event.
    TextContent,
    /// Prototype `value` setter plus `change`/`input` events.
    NativeValue,
    /// Synthetic clipboard paste sequence.
    Paste,
}

/// Outcome of a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Insertion {
    /// Last strategy that ran, `None` if every step failed.
    pub strategy: Option<Strategy>,
    /// Whether the element's rendered text contains the inserted text.
    pub inserted: bool,
}

impl Insertion {
    const FAILED: Insertion = Insertion {
        strategy: None,
        inserted: false,
    };
}

pub struct FieldWriter<'a, D: Dom + ?Sized> {
    dom: &'a D,
}

impl<'a, D: Dom + ?Sized> FieldWriter<'a, D> {
    pub fn new(dom: &'a D) -> Self {
        Self { dom }
    }

    /// Whether the element's rendered text contains `text` verbatim.
    pub async fn verify(&self, el: ElementRef, text: &str) -> bool {
        match self.dom.rendered_text(el).await {
            Ok(rendered) => rendered.contains(text),
            Err(e) => {
                debug!("verify read failed: {}", e);
                false
            }
        }
    }

    /// Insert `text` into a focused input, choosing the path by input shape.
    pub async fn write(&self, el: ElementRef, text: &str) -> Insertion {
        let kind = match self.dom.describe(el).await {
            Ok(info) => info.kind,
            Err(e) => {
                debug!("describe failed, assuming rich text: {}", e);
                ElementKind::RichText
            }
        };

        if self.try_insert_command(el, text).await {
            return Insertion {
                strategy: Some(Strategy::InsertCommand),
                inserted: true,
            };
        }

        let (strategy, result) = match kind {
            ElementKind::PlainInput => (Strategy::NativeValue, self.native_value(el, text).await),
            ElementKind::RichText | ElementKind::Other => {
                (Strategy::TextContent, self.text_content(el, text).await)
            }
        };
        match result {
            Ok(()) => Insertion {
                strategy: Some(strategy),
                inserted: self.verify(el, text).await,
            },
            Err(e) => {
                debug!("{:?} write failed: {}", strategy, e);
                Insertion::FAILED
            }
        }
    }

    /// Replace the field's content with `text` the way a user paste would.
    pub async fn paste(&self, el: ElementRef, text: &str) -> Insertion {
        match self.paste_sequence(el, text).await {
            Ok(()) => Insertion {
                strategy: Some(Strategy::Paste),
                inserted: self.verify(el, text).await,
            },
            Err(e) => {
                debug!("paste failed: {}", e);
                Insertion::FAILED
            }
        }
    }

    /// Caret to end, then the in-place insertion command. Succeeds only if
    /// the host accepted the command and the text is now present.
    async fn try_insert_command(&self, el: ElementRef, text: &str) -> bool {
        if let Err(e) = self.dom.focus(el).await {
            debug!("focus failed: {}", e);
        }
        if let Err(e) = self.dom.caret_to_end(el).await {
            debug!("caret placement failed: {}", e);
        }
        match self.dom.insert_text_command(text).await {
            Ok(true) => self.verify(el, text).await,
            Ok(false) => false,
            Err(e) => {
                debug!("insertText command failed: {}", e);
                false
            }
        }
    }

    async fn text_content(&self, el: ElementRef, text: &str) -> Result<()> {
        self.dom.set_text_content(el, text).await?;
        self.dom
            .dispatch(
                EventTarget::Element(el),
                &SyntheticEvent::Input {
                    input_type: InputType::InsertText,
                    data: Some(text.to_string()),
                },
            )
            .await
    }

    async fn native_value(&self, el: ElementRef, text: &str) -> Result<()> {
        self.dom.set_native_value(el, text).await?;
        let target = EventTarget::Element(el);
        self.dom.dispatch(target, &SyntheticEvent::Change).await?;
        self.dom
            .dispatch(
                target,
                &SyntheticEvent::Input {
                    input_type: InputType::InsertText,
                    data: Some(text.to_string()),
                },
            )
            .await
    }

    async fn paste_sequence(&self, el: ElementRef, text: &str) -> Result<()> {
        let kind = self
            .dom
            .describe(el)
            .await
            .map(|i| i.kind)
            .unwrap_or(ElementKind::PlainInput);
        let target = EventTarget::Element(el);

        self.dom.clear(el).await?;
        self.dom
            .dispatch(
                target,
                &SyntheticEvent::Paste {
                    data: text.to_string(),
                },
            )
            .await?;
        self.dom
            .dispatch(
                target,
                &SyntheticEvent::BeforeInput {
                    input_type: InputType::InsertFromPaste,
                    data: text.to_string(),
                },
            )
            .await?;
        match kind {
            ElementKind::PlainInput => self.dom.set_native_value(el, text).await?,
            ElementKind::RichText | ElementKind::Other => self.dom.set_text_content(el, text).await?,
        }
        self.dom
            .dispatch(
                target,
                &SyntheticEvent::Input {
                    input_type: InputType::InsertFromPaste,
                    data: Some(text.to_string()),
                },
            )
            .await
    }
}
