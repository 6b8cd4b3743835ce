use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which physical modifier `primary` stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PrimaryModifier {
    /// Meta on macOS hosts, Ctrl elsewhere.
    #[default]
    Auto,
    Ctrl,
    Meta,
}

impl PrimaryModifier {
    /// Resolve against the host's `navigator.platform` string.
    pub fn is_meta(self, platform: &str) -> bool {
        match self {
            PrimaryModifier::Auto => platform.contains("Mac"),
            PrimaryModifier::Ctrl => false,
            PrimaryModifier::Meta => true,
        }
    }
}

/// Modifier keys held during a key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Modifiers {
    pub ctrl: bool,
    pub meta: bool,
    pub shift: bool,
    pub alt: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        ctrl: false,
        meta: false,
        shift: false,
        alt: false,
    };
}

/// A key plus modifiers, written as `"primary+shift+k"` in config.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct Chord {
    pub key: String,
    pub primary: bool,
    pub modifiers: Modifiers,
}

impl Chord {
    /// A bare key with no modifiers.
    pub fn key(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            primary: false,
            modifiers: Modifiers::NONE,
        }
    }

    /// Concrete modifiers once `primary` has been resolved for this host.
    pub fn resolve(&self, primary_is_meta: bool) -> Modifiers {
        let mut m = self.modifiers;
        if self.primary {
            if primary_is_meta {
                m.meta = true;
            } else {
                m.ctrl = true;
            }
        }
        m
    }
}

impl FromStr for Chord {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('+').map(str::trim).collect();
        let Some((key, mods)) = parts.split_last() else {
            return Err(format!("invalid chord '{}'", s));
        };
        if key.is_empty() {
            return Err(format!("chord '{}' has no key", s));
        }
        let mut chord = Chord::key(*key);
        for m in mods {
            match m.to_ascii_lowercase().as_str() {
                "primary" | "mod" => chord.primary = true,
                "ctrl" | "control" => chord.modifiers.ctrl = true,
                "meta" | "cmd" => chord.modifiers.meta = true,
                "shift" => chord.modifiers.shift = true,
                "alt" | "option" => chord.modifiers.alt = true,
                other => return Err(format!("unknown modifier '{}' in chord '{}'", other, s)),
            }
        }
        Ok(chord)
    }
}

impl TryFrom<String> for Chord {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for Chord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.primary {
            write!(f, "primary+")?;
        }
        if self.modifiers.ctrl {
            write!(f, "ctrl+")?;
        }
        if self.modifiers.meta {
            write!(f, "meta+")?;
        }
        if self.modifiers.shift {
            write!(f, "shift+")?;
        }
        if self.modifiers.alt {
            write!(f, "alt+")?;
        }
        write!(f, "{}", self.key)
    }
}

/// Shortcuts used when no clickable affordance is found.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KeyboardConfig {
    pub primary_modifier: PrimaryModifier,
    /// Tried in order to open a new-message dialog.
    pub new_conversation: Vec<Chord>,
    /// Opens the command palette / quick switcher.
    pub quick_switcher: Chord,
}

impl Default for KeyboardConfig {
    fn default() -> Self {
        Self {
            primary_modifier: PrimaryModifier::Auto,
            new_conversation: vec![Chord {
                key: "n".into(),
                primary: true,
                modifiers: Modifiers::NONE,
            }],
            quick_switcher: Chord {
                key: "k".into(),
                primary: true,
                modifiers: Modifiers::NONE,
            },
        }
    }
}
