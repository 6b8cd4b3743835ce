//! Polling element lookup over an ordered selector list.

use crate::config::{SelectorTable, Target};
use crate::dom::{Dom, ElementRef};
use crate::{Error, Result};
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

/// A located element and the selector that matched it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Found {
    pub el: ElementRef,
    pub selector: String,
}

/// Finds logical targets on the page using the selector table.
pub struct Locator<'a, D: Dom + ?Sized> {
    dom: &'a D,
    selectors: &'a SelectorTable,
    poll: Duration,
}

impl<'a, D: Dom + ?Sized> Locator<'a, D> {
    pub fn new(dom: &'a D, selectors: &'a SelectorTable, poll: Duration) -> Self {
        Self {
            dom,
            selectors,
            poll,
        }
    }

    /// Evaluate the target's selectors once, in order.
    ///
    /// A selector that errors (for example one the browser does not
    /// support) counts as no match.
    pub async fn probe(&self, target: Target) -> Option<Found> {
        for selector in self.selectors.get(target) {
            match self.dom.query(selector).await {
                Ok(Some(el)) => {
                    return Some(Found {
                        el,
                        selector: selector.clone(),
                    })
                }
                Ok(None) => {}
                Err(e) if e.is_transient() => {
                    debug!("{}: selector '{}' skipped: {}", target, selector, e)
                }
                Err(e) => warn!("{}: selector '{}' failed: {}", target, selector, e),
            }
        }
        None
    }

    /// Poll until any selector of `target` matches or `timeout` elapses.
    pub async fn locate(&self, target: Target, timeout: Duration) -> Result<Found> {
        let start = Instant::now();
        loop {
            if let Some(found) = self.probe(target).await {
                debug!("{} found via '{}'", target, found.selector);
                return Ok(found);
            }
            if start.elapsed() >= timeout {
                debug!("{} not found within {}ms", target, timeout.as_millis());
                return Err(Error::NotFound(target));
            }
            sleep(self.poll).await;
        }
    }

    /// Like [`Locator::locate`], keeping only the element.
    pub async fn element(&self, target: Target, timeout: Duration) -> Result<ElementRef> {
        self.locate(target, timeout).await.map(|f| f.el)
    }

    /// Return `el` if still attached, otherwise locate `target` again.
    pub async fn revalidate(
        &self,
        el: ElementRef,
        target: Target,
        timeout: Duration,
    ) -> Result<ElementRef> {
        if self.dom.is_attached(el).await.unwrap_or(false) {
            return Ok(el);
        }
        debug!("{} detached, locating again", target);
        self.element(target, timeout).await
    }
}
