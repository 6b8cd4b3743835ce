//! Host page abstraction.
//!
//! The engine only talks to the page through [`Dom`]. [`PageDom`] drives a
//! real browser tab over CDP; tests use an in-memory fake.

mod page;

#[cfg(test)]
pub(crate) mod fake;

pub use page::PageDom;

use crate::config::Modifiers;
use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Reference to an element that was located on the page.
///
/// The same attached element always yields the same reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementRef(pub u64);

/// Input shape of an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    /// `<input>` or `<textarea>`.
    PlainInput,
    /// Element with editable content.
    RichText,
    /// Anything else (buttons, containers, chips).
    Other,
}

/// Bounding box in viewport coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
pub struct BBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BBox {
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// Snapshot of the properties the engine needs from an element.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ElementInfo {
    pub kind: ElementKind,
    /// `disabled` property or `aria-disabled="true"`.
    pub disabled: bool,
    pub bbox: BBox,
}

/// Where a synthetic event is dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventTarget {
    Document,
    Element(ElementRef),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum KeyPhase {
    #[serde(rename = "keydown")]
    Down,
    #[serde(rename = "keypress")]
    Press,
    #[serde(rename = "keyup")]
    Up,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PointerPhase {
    #[serde(rename = "pointermove")]
    Move,
    #[serde(rename = "pointerdown")]
    Down,
    #[serde(rename = "pointerup")]
    Up,
    #[serde(rename = "click")]
    Click,
}

/// `inputType` carried by input events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InputType {
    #[serde(rename = "insertText")]
    InsertText,
    #[serde(rename = "insertFromPaste")]
    InsertFromPaste,
}

/// A programmatically constructed event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyntheticEvent {
    Key {
        phase: KeyPhase,
        key: String,
        modifiers: Modifiers,
    },
    Pointer {
        phase: PointerPhase,
        x: f64,
        y: f64,
    },
    /// Clipboard paste carrying `text/plain` data.
    Paste { data: String },
    BeforeInput { input_type: InputType, data: String },
    Input {
        input_type: InputType,
        data: Option<String>,
    },
    Change,
}

impl SyntheticEvent {
    pub fn key(phase: KeyPhase, key: &str, modifiers: Modifiers) -> Self {
        SyntheticEvent::Key {
            phase,
            key: key.to_string(),
            modifiers,
        }
    }
}

/// Primitive operations on the host page.
///
/// Runs are single-threaded, so futures are not required to be `Send`.
///
/// Implementations report synchronous page-side failures as
/// [`crate::Error::Transient`] or [`crate::Error::Browser`]; callers treat
/// those as "this strategy failed".
#[async_trait(?Send)]
pub trait Dom {
    /// Current page URL.
    async fn location(&self) -> Result<String>;

    /// Value of a session-storage key.
    async fn session_item(&self, key: &str) -> Result<Option<String>>;

    /// `navigator.platform`.
    async fn platform(&self) -> Result<String>;

    /// First attached element matching `selector`.
    async fn query(&self, selector: &str) -> Result<Option<ElementRef>>;

    /// Whether a previously located element is still in the document.
    async fn is_attached(&self, el: ElementRef) -> Result<bool>;

    async fn describe(&self, el: ElementRef) -> Result<ElementInfo>;

    /// Value for plain inputs, rendered text otherwise.
    async fn rendered_text(&self, el: ElementRef) -> Result<String>;

    /// Whether the document is foreground-visible right now.
    async fn is_foreground(&self) -> Result<bool>;

    /// Subscribe to visibility-change notifications.
    async fn watch_visibility(&self) -> Result<()>;

    /// Whether a "now visible" notification fired since `watch_visibility`.
    async fn visibility_signalled(&self) -> Result<bool>;

    async fn focus(&self, el: ElementRef) -> Result<()>;

    /// Collapse the selection to the end of the element's content.
    async fn caret_to_end(&self, el: ElementRef) -> Result<()>;

    /// In-place text insertion at the current selection. Returns whether the
    /// host accepted the command.
    async fn insert_text_command(&self, text: &str) -> Result<bool>;

    /// Overwrite the text content of an editable element.
    async fn set_text_content(&self, el: ElementRef, text: &str) -> Result<()>;

    /// Set `value` through the prototype setter, past any framework override.
    async fn set_native_value(&self, el: ElementRef, text: &str) -> Result<()>;

    /// Empty an input or editable element.
    async fn clear(&self, el: ElementRef) -> Result<()>;

    /// `element.click()`.
    async fn click(&self, el: ElementRef) -> Result<()>;

    async fn dispatch(&self, target: EventTarget, event: &SyntheticEvent) -> Result<()>;

    /// Current clipboard text, empty when the clipboard holds nothing.
    ///
    /// A clipboard that cannot be read (no API, permission denied, read
    /// still pending) is an error, never an empty string.
    async fn read_clipboard(&self) -> Result<String>;

    /// Returns whether the clipboard accepted the text.
    async fn write_clipboard(&self, text: &str) -> Result<bool>;
}
