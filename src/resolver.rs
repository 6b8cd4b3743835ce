//! Open a one-to-one conversation with the recipient.
//!
//! Each attempt runs the same sequence:
//!
//! 1. open a new-message dialog (button, else keyboard shortcuts)
//! 2. pointer-activate the "To" region so rich inputs become editable
//! 3. find the "To" field; failing that, use a profile "Message" action or
//!    the quick switcher
//! 4. paste the recipient id
//! 5. confirm with Enter and wait for the recipient chip
//! 6. wait for a composer; none means the attempt failed
//!
//! Attempts repeat up to the configured budget. Exhausting the budget is
//! not an error: the caller still writes into whatever composer is present.

use crate::action::Actions;
use crate::config::{Config, Target};
use crate::dom::{Dom, ElementRef, EventTarget};
use crate::locate::Locator;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// How the conversation was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// New-message dialog and its "To" field.
    NewMessageDialog,
    /// "Message" action on the recipient's profile.
    ProfileAction,
    /// Command palette / quick switcher search.
    QuickSwitcher,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// A composer became available after `attempts` attempts.
    Resolved {
        route: Route,
        attempts: u32,
        /// Whether a recipient chip was seen before the composer.
        confirmed: bool,
    },
    /// Every attempt ended without a composer.
    Exhausted { attempts: u32 },
}

impl Resolution {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Resolution::Resolved { .. })
    }
}

pub struct RecipientResolver<'a, D: Dom + ?Sized> {
    locator: &'a Locator<'a, D>,
    actions: &'a Actions<'a, D>,
    config: &'a Config,
}

impl<'a, D: Dom + ?Sized> RecipientResolver<'a, D> {
    pub fn new(locator: &'a Locator<'a, D>, actions: &'a Actions<'a, D>, config: &'a Config) -> Self {
        Self {
            locator,
            actions,
            config,
        }
    }

    pub async fn resolve(&self, recipient: &str) -> Resolution {
        let budget = self.config.attempt_budget();
        for attempt in 1..=budget {
            info!("resolving recipient (attempt {}/{})", attempt, budget);
            if let Some((route, confirmed)) = self.attempt(recipient).await {
                info!("conversation opened via {:?} (confirmed: {})", route, confirmed);
                return Resolution::Resolved {
                    route,
                    attempts: attempt,
                    confirmed,
                };
            }
            debug!("attempt {} ended without a composer", attempt);
        }
        warn!("recipient not resolved after {} attempts", budget);
        Resolution::Exhausted { attempts: budget }
    }

    async fn attempt(&self, recipient: &str) -> Option<(Route, bool)> {
        let t = &self.config.timings;

        self.open_new_conversation().await;

        let region = self.locator.probe(Target::RecipientRegion).await;
        if let Some(ref found) = region {
            if let Err(e) = self.actions.pointer_activate(found.el).await {
                debug!("recipient region activation failed: {}", e);
            }
        }

        let field = self
            .locator
            .locate(Target::RecipientInput, ms(t.recipient_field_timeout_ms))
            .await;

        let (route, confirmed) = match field {
            Ok(found) => {
                if region.is_none() {
                    if let Err(e) = self.actions.pointer_activate(found.el).await {
                        debug!("recipient field activation failed: {}", e);
                    }
                }
                let confirmed = self.enter_recipient(found.el, recipient).await;
                (Route::NewMessageDialog, confirmed)
            }
            Err(_) => (self.fallback(recipient).await?, false),
        };

        self.locator
            .locate(Target::Composer, ms(t.composer_probe_timeout_ms))
            .await
            .ok()
            .map(|_| (route, confirmed))
    }

    /// Click the new-message affordance, or press the configured shortcuts.
    async fn open_new_conversation(&self) {
        let t = &self.config.timings;
        match self
            .locator
            .locate(Target::NewConversation, ms(t.new_conversation_timeout_ms))
            .await
        {
            Ok(found) => {
                debug!("opening new message via '{}'", found.selector);
                if let Err(e) = self.actions.pointer_activate(found.el).await {
                    debug!("new message control failed: {}", e);
                }
            }
            Err(_) => {
                for chord in &self.config.keyboard.new_conversation {
                    debug!("new message shortcut {}", chord);
                    if let Err(e) = self.actions.press_key(EventTarget::Document, chord).await {
                        debug!("shortcut {} failed: {}", chord, e);
                    }
                }
            }
        }
        sleep(t.settle()).await;
    }

    /// Paste the recipient, confirm with Enter, and wait for the chip.
    async fn enter_recipient(&self, field: ElementRef, recipient: &str) -> bool {
        let t = &self.config.timings;
        let pasted = self.actions.paste_text(field, recipient).await;
        if !pasted.inserted {
            debug!("recipient text not visible after paste");
        }
        let Ok(field) = self
            .locator
            .revalidate(field, Target::RecipientInput, t.poll_interval())
            .await
        else {
            return false;
        };
        if let Err(e) = self.actions.press_enter(EventTarget::Element(field)).await {
            debug!("recipient confirm failed: {}", e);
        }
        sleep(t.settle()).await;
        self.locator
            .locate(Target::RecipientChip, ms(t.chip_timeout_ms))
            .await
            .is_ok()
    }

    /// No "To" field: try the profile action, then the quick switcher.
    async fn fallback(&self, recipient: &str) -> Option<Route> {
        let t = &self.config.timings;

        if let Some(found) = self.locator.probe(Target::ProfileMessage).await {
            debug!("profile message action via '{}'", found.selector);
            if self.actions.pointer_activate(found.el).await.is_ok() {
                sleep(t.settle()).await;
                return Some(Route::ProfileAction);
            }
        }

        let chord = &self.config.keyboard.quick_switcher;
        debug!("quick switcher shortcut {}", chord);
        if let Err(e) = self.actions.press_key(EventTarget::Document, chord).await {
            debug!("quick switcher shortcut failed: {}", e);
        }
        sleep(t.settle()).await;

        let input = self
            .locator
            .locate(Target::QuickSwitcherInput, ms(t.switcher_timeout_ms))
            .await
            .ok()?;
        if let Err(e) = self.actions.pointer_activate(input.el).await {
            debug!("switcher activation failed: {}", e);
        }
        let pasted = self.actions.paste_text(input.el, recipient).await;
        if !pasted.inserted {
            debug!("recipient text not visible in switcher");
            return None;
        }
        sleep(t.settle()).await;

        // the switcher often re-renders its results while we wait
        let input = self
            .locator
            .revalidate(input.el, Target::QuickSwitcherInput, t.poll_interval())
            .await
            .ok()?;
        if let Err(e) = self.actions.press_enter(EventTarget::Element(input)).await {
            debug!("switcher confirm failed: {}", e);
        }
        sleep(t.settle()).await;
        Some(Route::QuickSwitcher)
    }
}

fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}
