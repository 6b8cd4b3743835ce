//! Trigger delivery of a written message.

use crate::action::Actions;
use crate::config::{Target, Timings};
use crate::dom::{Dom, ElementRef, EventTarget};
use crate::locate::Locator;
use crate::Result;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info};

/// How the message was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendPath {
    /// The explicit send control was clicked.
    Control,
    /// Enter was pressed on the composer.
    KeyPress,
}

pub struct Dispatcher<'a, D: Dom + ?Sized> {
    dom: &'a D,
    locator: &'a Locator<'a, D>,
    actions: &'a Actions<'a, D>,
    timings: &'a Timings,
}

impl<'a, D: Dom + ?Sized> Dispatcher<'a, D> {
    pub fn new(
        dom: &'a D,
        locator: &'a Locator<'a, D>,
        actions: &'a Actions<'a, D>,
        timings: &'a Timings,
    ) -> Self {
        Self {
            dom,
            locator,
            actions,
            timings,
        }
    }

    /// Send the composer's content.
    ///
    /// Only call after the written text has been verified in the composer.
    pub async fn send(&self, composer: ElementRef) -> Result<SendPath> {
        let timeout = Duration::from_millis(self.timings.send_control_timeout_ms);
        match self.locator.locate(Target::SendControl, timeout).await {
            Ok(found) => {
                if self.wait_enabled(found.el).await {
                    match self.dom.click(found.el).await {
                        Ok(()) => {
                            info!("sent via control '{}'", found.selector);
                            return Ok(SendPath::Control);
                        }
                        Err(e) => debug!("send control click failed: {}", e),
                    }
                } else {
                    debug!("send control stayed disabled");
                }
            }
            Err(e) => debug!("no send control: {}", e),
        }

        let composer = self
            .locator
            .revalidate(composer, Target::Composer, self.timings.poll_interval())
            .await?;
        self.actions.press_enter(EventTarget::Element(composer)).await?;
        info!("sent via Enter key");
        Ok(SendPath::KeyPress)
    }

    /// Wait up to `send_enable_wait_ms` for a disabled control to enable.
    async fn wait_enabled(&self, el: ElementRef) -> bool {
        let wait = Duration::from_millis(self.timings.send_enable_wait_ms);
        let start = Instant::now();
        loop {
            match self.dom.describe(el).await {
                Ok(info) if !info.disabled => return true,
                Ok(_) => {}
                Err(e) => {
                    debug!("send control unreadable: {}", e);
                    return false;
                }
            }
            if start.elapsed() >= wait {
                return false;
            }
            sleep(self.timings.poll_interval()).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::dom::fake::{test_config, FakeDom, Node, COMPOSER, SEND};

    async fn send_with(dom: &FakeDom, config: &Config, composer: ElementRef) -> Result<SendPath> {
        let locator = Locator::new(dom, &config.selectors, config.timings.poll_interval());
        let actions = Actions::new(dom, false);
        Dispatcher::new(dom, &locator, &actions, &config.timings)
            .send(composer)
            .await
    }

    #[tokio::test(start_paused = true)]
    async fn test_clicks_enabled_send_control() {
        let config = test_config();
        let dom = FakeDom::new("https://example.com/");
        let composer = dom.add(Node::rich_text(&[COMPOSER]).with_text("Hello"));
        let send = dom.add(Node::other(&[SEND]));

        let path = send_with(&dom, &config, composer).await.unwrap();
        assert_eq!(path, SendPath::Control);
        assert!(dom.clicked(send));
        assert!(!dom.pressed_enter(Some(composer)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_for_control_to_enable() {
        let config = test_config();
        let dom = FakeDom::new("https://example.com/");
        let composer = dom.add(Node::rich_text(&[COMPOSER]).with_text("Hello"));
        let send = dom.add(Node::other(&[SEND]).disabled_for(Duration::from_millis(600)));

        let start = Instant::now();
        let path = send_with(&dom, &config, composer).await.unwrap();
        assert_eq!(path, SendPath::Control);
        assert!(dom.clicked(send));
        assert!(start.elapsed() >= Duration::from_millis(600));
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_control_falls_back_to_enter() {
        let config = test_config();
        let dom = FakeDom::new("https://example.com/");
        let composer = dom.add(Node::rich_text(&[COMPOSER]).with_text("Hello"));
        let send = dom.add(Node::other(&[SEND]).disabled());

        let path = send_with(&dom, &config, composer).await.unwrap();
        assert_eq!(path, SendPath::KeyPress);
        assert!(!dom.clicked(send));
        assert!(dom.pressed_enter(Some(composer)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_control_presses_enter_on_composer() {
        let config = test_config();
        let dom = FakeDom::new("https://example.com/");
        let composer = dom.add(Node::rich_text(&[COMPOSER]).with_text("Hello"));

        let start = Instant::now();
        let path = send_with(&dom, &config, composer).await.unwrap();
        assert_eq!(path, SendPath::KeyPress);
        assert!(start.elapsed() >= Duration::from_millis(config.timings.send_control_timeout_ms));
        assert_eq!(dom.events_on(Some(composer)).len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_detached_composer_without_replacement_fails() {
        let config = test_config();
        let dom = FakeDom::new("https://example.com/");
        let composer = dom.add(Node::rich_text(&["#old"]).hidden());

        assert!(send_with(&dom, &config, composer).await.is_err());
    }
}
