pub mod keyboard;
pub mod schema;
pub mod selectors;

pub use keyboard::{Chord, KeyboardConfig, Modifiers, PrimaryModifier};
pub use schema::{BrowserConfig, ClipboardConfig, Config, PayloadKeys, Timings, Viewport};
pub use selectors::{SelectorTable, Target};
