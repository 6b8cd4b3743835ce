//! Wait for the host tab to be foreground-visible.
//!
//! Background tabs are throttled and may suppress focus, so DOM mutation
//! there is unreliable or invisible to the host's own handlers.

use crate::dom::Dom;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::debug;

/// Returns `true` as soon as the page is visible, `false` on timeout.
///
/// Both polls the visibility state and listens for a visibility-change
/// notification; whichever fires first wins.
pub async fn await_foreground<D: Dom + ?Sized>(dom: &D, timeout: Duration, poll: Duration) -> bool {
    if dom.is_foreground().await.unwrap_or(false) {
        return true;
    }
    if let Err(e) = dom.watch_visibility().await {
        debug!("visibility listener not installed: {}", e);
    }

    let start = Instant::now();
    loop {
        if dom.visibility_signalled().await.unwrap_or(false) {
            debug!("visibility change signalled");
            return true;
        }
        if dom.is_foreground().await.unwrap_or(false) {
            return true;
        }
        if start.elapsed() >= timeout {
            return false;
        }
        sleep(poll).await;
    }
}
