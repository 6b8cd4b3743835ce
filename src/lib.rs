//! # dm-courier
//!
//! Unattended delivery of a pre-composed direct message into a messaging
//! web application. A single run reads its payload from the page URL or
//! session storage, opens a conversation with the recipient, writes the
//! message into the composer and sends it.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dm_courier::{BrowserSession, Channel, Config, Courier, Handoff, PageDom};
//!
//! # #[tokio::main]
//! # async fn main() -> dm_courier::Result<()> {
//! let config = Config::default();
//! let handoff = Handoff::new("T0123", "U0456", "Hi there");
//!
//! let session = BrowserSession::launch(&config.browser).await?;
//! session.open(&handoff, &config.payload, Channel::Both).await?;
//!
//! let dom = PageDom::new(session.page());
//! let report = Courier::new(&dom, &config).run().await;
//! println!("sent: {}", report.sent);
//!
//! session.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod action;
pub mod config;
pub mod dispatch;
pub mod dom;
pub mod handoff;
pub mod locate;
pub mod payload;
pub mod resolver;
pub mod run;
pub mod session;
pub mod visibility;
pub mod writer;

pub use config::{BrowserConfig, Config, PayloadKeys, SelectorTable, Target, Timings};
pub use dispatch::SendPath;
pub use dom::{Dom, ElementRef, PageDom};
pub use handoff::{DecisionResponse, Handoff};
pub use payload::Payload;
pub use resolver::{Resolution, Route};
pub use run::{Courier, EndReason, RunReport, RunState, Stage, StageOutcome};
pub use session::{BrowserSession, Channel};

/// Result type for dm-courier operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while configuring or driving a delivery run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("yaml parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("browser error: {0}")]
    Browser(#[from] eoka::Error),

    #[error("url error: {0}")]
    Url(#[from] url::ParseError),

    /// A required element did not appear within its timeout.
    #[error("{0} not found")]
    NotFound(Target),

    /// The payload carried no message text.
    #[error("payload has no message text")]
    EmptyPayload,

    /// An insertion ran but its text is not present in the element.
    #[error("inserted text not observed in {0}")]
    InsertionUnverified(Target),

    /// A synchronous failure while dispatching an event or reading a property.
    #[error("transient ui error: {0}")]
    Transient(String),
}

impl Error {
    /// Whether this error should make the caller move on to its next strategy
    /// rather than end the stage.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Transient(_) | Error::Browser(_) | Error::Json(_))
    }
}
