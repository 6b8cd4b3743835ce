//! Versioned locator strategy lists.
//!
//! Each logical target maps to an ordered list of CSS selectors. Earlier
//! entries are more specific and are tried first. Adapting to a redesign of
//! the host application is a change to this table, not to the engine.

use crate::{Error, Result};
use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::fmt;

/// Logical element the engine looks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Target {
    /// Editable region where the outgoing message is authored.
    Composer,
    /// Button or link that opens a new-message dialog.
    NewConversation,
    /// Container of the "To" field; activated with a pointer sequence.
    RecipientRegion,
    /// The "To" field itself, plain input or contenteditable.
    RecipientInput,
    /// Confirmation token shown once a recipient is accepted.
    RecipientChip,
    /// "Message" action on a profile page.
    ProfileMessage,
    /// Search field of the command palette / quick switcher.
    QuickSwitcherInput,
    /// Explicit send button of the composer.
    SendControl,
}

impl Target {
    pub const ALL: [Target; 8] = [
        Target::Composer,
        Target::NewConversation,
        Target::RecipientRegion,
        Target::RecipientInput,
        Target::RecipientChip,
        Target::ProfileMessage,
        Target::QuickSwitcherInput,
        Target::SendControl,
    ];

    const NAMES: &'static [&'static str] = &[
        "composer",
        "new_conversation",
        "recipient_region",
        "recipient_input",
        "recipient_chip",
        "profile_message",
        "quick_switcher_input",
        "send_control",
    ];

    /// Config key of this target.
    pub fn name(self) -> &'static str {
        match self {
            Target::Composer => "composer",
            Target::NewConversation => "new_conversation",
            Target::RecipientRegion => "recipient_region",
            Target::RecipientInput => "recipient_input",
            Target::RecipientChip => "recipient_chip",
            Target::ProfileMessage => "profile_message",
            Target::QuickSwitcherInput => "quick_switcher_input",
            Target::SendControl => "send_control",
        }
    }

    pub fn from_name(name: &str) -> Option<Target> {
        Target::ALL.into_iter().find(|t| t.name() == name)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Built-in selectors for Slack web, newest markup first.
const BUILTIN_REVISION: &str = "slack-web-2025";

fn builtin(target: Target) -> &'static [&'static str] {
    match target {
        Target::Composer => &[
            r#"[data-qa="message_input"] [role="textbox"][contenteditable="true"]"#,
            r#"[role="textbox"][contenteditable="true"]"#,
            r#"div.ql-editor[contenteditable="true"]"#,
        ],
        Target::NewConversation => &[
            r#"button[data-qa="composer_button"]"#,
            r#"button[aria-label^="New message"]"#,
            r#"[data-qa="new_message_button"]"#,
        ],
        Target::RecipientRegion => &[
            r#"[data-qa="compose_dm_input"]"#,
            r#"[data-qa="new_message_to_field"]"#,
            r#".c-multi_select_input"#,
        ],
        Target::RecipientInput => &[
            r#"input[data-qa="compose_dm_input"]"#,
            r#"[data-qa="compose_dm_input"] [contenteditable="true"]"#,
            r#"input[aria-label^="To"]"#,
            r#"input[placeholder*="somebody"]"#,
            r#"[role="combobox"][contenteditable="true"]"#,
        ],
        Target::RecipientChip => &[
            r#"[data-qa="compose_dm_input"] [data-qa^="member_token"]"#,
            r#"[data-qa="token"]"#,
            r#".c-token"#,
        ],
        Target::ProfileMessage => &[
            r#"button[aria-label^="Message"]"#,
            r#"button:has(svg[aria-label="Message"])"#,
        ],
        Target::QuickSwitcherInput => &[
            r#"input[placeholder*="Search"]"#,
            r#"input[aria-label*="Search"]"#,
            r#"[data-qa="jumper_input"] [contenteditable="true"]"#,
        ],
        Target::SendControl => &[
            r#"button[data-qa="texty_send_button"]"#,
            r#"button[aria-label^="Send"]"#,
            r#"button[type="submit"][aria-label*="Send"]"#,
        ],
    }
}

/// Mapping of logical target to ordered selector list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorTable {
    revision: String,
    lists: BTreeMap<Target, Vec<String>>,
}

impl Default for SelectorTable {
    fn default() -> Self {
        let lists = Target::ALL
            .into_iter()
            .map(|t| (t, builtin(t).iter().map(|s| s.to_string()).collect()))
            .collect();
        Self {
            revision: BUILTIN_REVISION.into(),
            lists,
        }
    }
}

impl SelectorTable {
    /// Revision label of this table.
    pub fn revision(&self) -> &str {
        &self.revision
    }

    /// Ordered selectors for a target.
    pub fn get(&self, target: Target) -> &[String] {
        self.lists.get(&target).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Replace the list for one target.
    pub fn set(mut self, target: Target, selectors: Vec<String>) -> Self {
        self.lists.insert(target, selectors);
        self
    }

    pub fn validate(&self) -> Result<()> {
        for target in Target::ALL {
            let list = self.get(target);
            if list.is_empty() {
                return Err(Error::Config(format!(
                    "selectors.{}: at least one selector is required",
                    target
                )));
            }
            if list.iter().any(|s| s.trim().is_empty()) {
                return Err(Error::Config(format!(
                    "selectors.{}: selectors must not be blank",
                    target
                )));
            }
        }
        Ok(())
    }
}

impl<'de> Deserialize<'de> for SelectorTable {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(SelectorTableVisitor)
    }
}

struct SelectorTableVisitor;

impl<'de> Visitor<'de> for SelectorTableVisitor {
    type Value = SelectorTable;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a map of target name to selector list, with optional 'revision'")
    }

    fn visit_map<M>(self, mut map: M) -> std::result::Result<Self::Value, M::Error>
    where
        M: MapAccess<'de>,
    {
        let mut table = SelectorTable::default();
        let mut revised = false;
        while let Some(key) = map.next_key::<String>()? {
            if key == "revision" {
                table.revision = map.next_value()?;
                revised = true;
                continue;
            }
            let target = Target::from_name(&key)
                .ok_or_else(|| de::Error::unknown_variant(&key, Target::NAMES))?;
            let list: Vec<String> = map.next_value()?;
            table.lists.insert(target, list);
            if !revised {
                table.revision = format!("{}+custom", BUILTIN_REVISION);
            }
        }
        Ok(table)
    }
}
