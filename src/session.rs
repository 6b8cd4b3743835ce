//! Browser lifecycle and page hand-off.

use crate::config::{BrowserConfig, PayloadKeys};
use crate::handoff::Handoff;
use crate::Result;
use eoka::{Browser, Page};
use tracing::{debug, info};

/// How the payload reaches the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Channel {
    /// Query parameters on the opened URL.
    Query,
    /// Session-store entries on the host origin.
    Session,
    /// Session-store entries, then the decorated URL.
    #[default]
    Both,
}

/// A launched browser with one page.
pub struct BrowserSession {
    browser: Browser,
    page: Page,
}

impl BrowserSession {
    pub async fn launch(config: &BrowserConfig) -> Result<Self> {
        let stealth = eoka::StealthConfig {
            headless: config.headless,
            proxy: config.proxy.clone(),
            user_agent: config.user_agent.clone(),
            viewport_width: config.viewport.as_ref().map(|v| v.width).unwrap_or(1280),
            viewport_height: config.viewport.as_ref().map(|v| v.height).unwrap_or(720),
            ..Default::default()
        };

        debug!(
            "Launching browser (headless: {}, proxy: {:?})",
            config.headless, config.proxy
        );
        let browser = Browser::launch_with_config(stealth).await?;
        let page = browser.new_page("about:blank").await?;

        Ok(Self { browser, page })
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    /// Load the host page with the payload delivered through `channel`.
    pub async fn open(&self, handoff: &Handoff, keys: &PayloadKeys, channel: Channel) -> Result<()> {
        match channel {
            Channel::Query => {
                let url = handoff.web_url(keys)?;
                info!("Opening {}", url.as_str());
                self.page.goto(url.as_str()).await?;
            }
            Channel::Session => {
                let url = handoff.base_url()?;
                info!("Opening {} (session payload)", url.as_str());
                self.page.goto(url.as_str()).await?;
                self.seed_session(handoff, keys).await?;
                self.page.reload().await?;
            }
            Channel::Both => {
                let base = handoff.base_url()?;
                self.page.goto(base.as_str()).await?;
                self.seed_session(handoff, keys).await?;
                let url = handoff.web_url(keys)?;
                info!("Opening {}", url.as_str());
                self.page.goto(url.as_str()).await?;
            }
        }
        if let Err(e) = self.page.wait_for_network_idle(500, 10_000).await {
            debug!("network not idle: {}", e);
        }
        Ok(())
    }

    async fn seed_session(&self, handoff: &Handoff, keys: &PayloadKeys) -> Result<()> {
        let mut js = String::new();
        for (key, value) in handoff.session_entries(keys) {
            js.push_str(&format!(
                "sessionStorage.setItem({}, {});",
                serde_json::to_string(&key)?,
                serde_json::to_string(&value)?
            ));
        }
        debug!("seeding session store");
        self.page.execute(&js).await?;
        Ok(())
    }

    pub async fn close(self) -> Result<()> {
        self.browser.close().await?;
        Ok(())
    }
}
