//! Delivery payload extraction.

use crate::config::PayloadKeys;
use url::Url;

/// Recipient and message for one run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Payload {
    /// Opaque identifier understood by the host application (e.g. a user id).
    pub recipient_id: String,
    /// Message text, delivered verbatim including newlines.
    pub message_text: String,
}

impl Payload {
    pub fn new(recipient_id: impl Into<String>, message_text: impl Into<String>) -> Self {
        Self {
            recipient_id: recipient_id.into(),
            message_text: message_text.into(),
        }
    }

    /// Read the payload from a page URL and a session-store lookup.
    ///
    /// Each field prefers its query parameter and falls back to the session
    /// value independently. Never fails: an unparsable URL contributes nothing.
    /// The recipient id is trimmed; the message is kept verbatim.
    pub fn read<F>(page_url: &str, keys: &PayloadKeys, session: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let (query_user, query_msg) = match Url::parse(page_url) {
            Ok(url) => {
                let mut user = None;
                let mut msg = None;
                for (k, v) in url.query_pairs() {
                    if user.is_none() && k == keys.recipient_key.as_str() {
                        user = Some(v.into_owned());
                    } else if msg.is_none() && k == keys.message_key.as_str() {
                        msg = Some(v.into_owned());
                    }
                }
                (user, msg)
            }
            Err(_) => (None, None),
        };

        let pick = |from_query: Option<String>, key: &str| -> String {
            from_query
                .filter(|v| !v.is_empty())
                .or_else(|| session(key))
                .unwrap_or_default()
        };

        let query_user = query_user.map(|v| v.trim().to_string());
        Self {
            recipient_id: pick(query_user, &keys.recipient_key).trim().to_string(),
            message_text: pick(query_msg, &keys.message_key),
        }
    }

    /// An empty message means there is nothing to deliver.
    pub fn is_empty(&self) -> bool {
        self.message_text.is_empty()
    }

    pub fn has_recipient(&self) -> bool {
        !self.recipient_id.is_empty()
    }
}
