//! Simulated user actions.
//!
//! Each action produces the event sequence a rich front-end framework
//! expects from a real person. Orchestration code never builds events
//! itself; it goes through [`Actions`].

use crate::config::{Chord, KeyboardConfig, Modifiers};
use crate::dom::{Dom, ElementRef, EventTarget, KeyPhase, PointerPhase, SyntheticEvent};
use crate::writer::{FieldWriter, Insertion};
use crate::Result;
use tracing::debug;

pub struct Actions<'a, D: Dom + ?Sized> {
    dom: &'a D,
    primary_is_meta: bool,
}

impl<'a, D: Dom + ?Sized> Actions<'a, D> {
    pub fn new(dom: &'a D, primary_is_meta: bool) -> Self {
        Self {
            dom,
            primary_is_meta,
        }
    }

    /// Resolve the `primary` modifier against the host platform.
    pub async fn for_host(dom: &'a D, keyboard: &KeyboardConfig) -> Self {
        let platform = dom.platform().await.unwrap_or_default();
        let primary_is_meta = keyboard.primary_modifier.is_meta(&platform);
        debug!("platform '{}', primary modifier meta={}", platform, primary_is_meta);
        Self::new(dom, primary_is_meta)
    }

    /// keydown / keypress / keyup for one chord.
    pub async fn press_key(&self, target: EventTarget, chord: &Chord) -> Result<()> {
        let modifiers = chord.resolve(self.primary_is_meta);
        for phase in [KeyPhase::Down, KeyPhase::Press, KeyPhase::Up] {
            self.dom
                .dispatch(target, &SyntheticEvent::key(phase, &chord.key, modifiers))
                .await?;
        }
        Ok(())
    }

    pub async fn press_enter(&self, target: EventTarget) -> Result<()> {
        self.press_key(target, &Chord::key("Enter")).await
    }

    /// Move / down / up / click at the element's centre, then focus it.
    ///
    /// Some rich inputs only become editable after a pointer interaction;
    /// `focus()` alone leaves them inert.
    pub async fn pointer_activate(&self, el: ElementRef) -> Result<()> {
        let bbox = self.dom.describe(el).await?.bbox;
        let (x, y) = bbox.center();
        let target = EventTarget::Element(el);
        for phase in [
            PointerPhase::Move,
            PointerPhase::Down,
            PointerPhase::Up,
            PointerPhase::Click,
        ] {
            self.dom
                .dispatch(target, &SyntheticEvent::Pointer { phase, x, y })
                .await?;
        }
        self.dom.focus(el).await
    }

    /// Paste `text` into the field.
    pub async fn paste_text(&self, el: ElementRef, text: &str) -> Insertion {
        FieldWriter::new(self.dom).paste(el, text).await
    }

    /// Type `text` into the field at the caret.
    pub async fn type_text(&self, el: ElementRef, text: &str) -> Insertion {
        FieldWriter::new(self.dom).write(el, text).await
    }

    pub fn modifiers(&self, chord: &Chord) -> Modifiers {
        chord.resolve(self.primary_is_meta)
    }
}
