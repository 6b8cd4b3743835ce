//! Hand-off from the approval frontend to a delivery run.
//!
//! On approval the frontend copies the message to the clipboard, seeds the
//! session store, opens the web client with the payload in the query string
//! and optionally opens a native deep link. [`Handoff`] builds each of those
//! channels from a [`DecisionResponse`].

use crate::config::PayloadKeys;
use crate::Result;
use serde::{Deserialize, Serialize};
use url::Url;

const WEB_CLIENT: &str = "https://app.slack.com/client/";

/// What the backend decided to do with an approved notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionAction {
    /// Open a conversation and deliver the message.
    OpenSlack,
    /// Already delivered server-side.
    Sent,
    /// Denied or nothing to do.
    #[default]
    #[serde(rename = "none")]
    Nothing,
}

/// Response body of `POST /decision`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionResponse {
    #[serde(default)]
    pub action: DecisionAction,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub web_dm_url: Option<String>,
    #[serde(default)]
    pub deep_link: Option<String>,
}

impl DecisionResponse {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a response body saved to a file.
    pub fn load<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&content)
    }
}

/// Everything needed to start a delivery run for one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handoff {
    pub team_id: String,
    pub recipient_id: String,
    pub message: String,
    /// Page to open instead of the recipient's profile.
    pub web_dm_url: Option<String>,
    /// Deep link supplied by the backend.
    pub deep_link: Option<String>,
}

impl Handoff {
    pub fn new(
        team_id: impl Into<String>,
        recipient_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            team_id: team_id.into(),
            recipient_id: recipient_id.into(),
            message: message.into(),
            web_dm_url: None,
            deep_link: None,
        }
    }

    /// Build a hand-off from a decision. `None` unless the decision asks
    /// for a conversation to be opened.
    pub fn from_decision(
        resp: DecisionResponse,
        team_id: impl Into<String>,
        recipient_id: impl Into<String>,
    ) -> Option<Self> {
        if resp.action != DecisionAction::OpenSlack {
            return None;
        }
        Some(Self {
            team_id: team_id.into(),
            recipient_id: recipient_id.into(),
            message: resp.message.unwrap_or_default(),
            web_dm_url: resp.web_dm_url.filter(|u| !u.trim().is_empty()),
            deep_link: resp.deep_link.filter(|u| !u.trim().is_empty()),
        })
    }

    /// Page the run starts on, without payload parameters.
    pub fn base_url(&self) -> Result<Url> {
        if let Some(ref url) = self.web_dm_url {
            return Ok(Url::parse(url)?);
        }
        let mut url = Url::parse(WEB_CLIENT)?;
        url.path_segments_mut()
            .map_err(|_| crate::Error::Config("web client url cannot be a base".into()))?
            .pop_if_empty()
            .extend([self.team_id.as_str(), "user_profile", self.recipient_id.as_str()]);
        Ok(url)
    }

    /// Base URL with the message and recipient appended as query parameters.
    /// Parameters already on the base URL are kept.
    pub fn web_url(&self, keys: &PayloadKeys) -> Result<Url> {
        let mut url = self.base_url()?;
        url.query_pairs_mut()
            .append_pair(&keys.message_key, &self.message)
            .append_pair(&keys.recipient_key, &self.recipient_id);
        Ok(url)
    }

    /// Native client link for the recipient.
    pub fn deep_link(&self) -> Result<Url> {
        if let Some(ref link) = self.deep_link {
            return Ok(Url::parse(link)?);
        }
        Ok(Url::parse_with_params(
            "slack://user",
            &[("team", self.team_id.as_str()), ("id", self.recipient_id.as_str())],
        )?)
    }

    /// Session-store pairs that carry the payload.
    pub fn session_entries(&self, keys: &PayloadKeys) -> [(String, String); 2] {
        [
            (keys.message_key.clone(), self.message.clone()),
            (keys.recipient_key.clone(), self.recipient_id.clone()),
        ]
    }
}
