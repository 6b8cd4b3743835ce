//! One delivery run against a loaded host page.

mod state;

pub use state::{EndReason, RunState, Stage, StageOutcome};

use crate::action::Actions;
use crate::config::{Config, Target};
use crate::dispatch::{Dispatcher, SendPath};
use crate::dom::{Dom, ElementRef};
use crate::locate::Locator;
use crate::payload::Payload;
use crate::resolver::{RecipientResolver, Resolution};
use crate::visibility::await_foreground;
use crate::writer::FieldWriter;
use crate::{Error, Result};
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

/// Result of a run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Final state, always `Done` or `Abandoned`.
    pub state: RunState,
    /// Every state visited, in order, starting with `Idle`.
    pub history: Vec<RunState>,
    /// Outcome of each stage that ran.
    pub stages: Vec<(Stage, StageOutcome)>,
    /// Recipient resolution, if a recipient was given.
    pub resolution: Option<Resolution>,
    /// Whether the message was sent.
    pub sent: bool,
    pub send_path: Option<SendPath>,
    /// Set when the run was abandoned.
    pub reason: Option<EndReason>,
    /// Total duration in milliseconds.
    pub duration_ms: u64,
}

impl RunReport {
    fn new() -> Self {
        Self {
            state: RunState::Idle,
            history: vec![RunState::Idle],
            stages: Vec::new(),
            resolution: None,
            sent: false,
            send_path: None,
            reason: None,
            duration_ms: 0,
        }
    }

    /// Outcome recorded for `stage`, if it ran.
    pub fn outcome(&self, stage: Stage) -> Option<StageOutcome> {
        self.stages
            .iter()
            .find(|(s, _)| *s == stage)
            .map(|(_, outcome)| *outcome)
    }

    fn advance(&mut self, next: RunState) {
        if self.state.advance(next) {
            info!("run: {}", next);
            self.history.push(next);
        }
    }

    fn record(&mut self, stage: Stage, outcome: StageOutcome) {
        debug!("{:?} stage: {:?}", stage, outcome);
        self.stages.push((stage, outcome));
    }

    fn abandon(mut self, reason: EndReason, start: Instant) -> Self {
        warn!("run abandoned: {}", reason);
        self.reason = Some(reason);
        self.advance(RunState::Abandoned);
        self.duration_ms = start.elapsed().as_millis() as u64;
        self
    }

    fn finish(mut self, path: SendPath, start: Instant) -> Self {
        self.sent = true;
        self.send_path = Some(path);
        self.advance(RunState::Done);
        self.duration_ms = start.elapsed().as_millis() as u64;
        self
    }
}

/// Drives the stages of one run: payload, visibility, recipient, composer,
/// write, send.
pub struct Courier<'a, D: Dom + ?Sized> {
    dom: &'a D,
    config: &'a Config,
}

impl<'a, D: Dom + ?Sized> Courier<'a, D> {
    pub fn new(dom: &'a D, config: &'a Config) -> Self {
        Self { dom, config }
    }

    /// Run once. Never fails; the report says how far the run got.
    pub async fn run(&self) -> RunReport {
        let start = Instant::now();
        let t = &self.config.timings;
        let mut report = RunReport::new();

        sleep(Duration::from_millis(t.warmup_ms)).await;

        let payload = self.read_payload().await;
        if payload.is_empty() {
            report.record(Stage::Payload, StageOutcome::Skipped);
            return report.abandon(EndReason::EmptyPayload, start);
        }
        report.record(Stage::Payload, StageOutcome::Success);
        info!(
            "payload: recipient '{}', {} chars",
            payload.recipient_id,
            payload.message_text.chars().count()
        );

        report.advance(RunState::AwaitingVisibility);
        let visible = await_foreground(
            self.dom,
            Duration::from_millis(t.visibility_timeout_ms),
            t.poll_interval(),
        )
        .await;
        if visible {
            report.record(Stage::Visibility, StageOutcome::Success);
        } else {
            warn!("page still in background, continuing");
            report.record(Stage::Visibility, StageOutcome::NotFound);
        }

        let locator = Locator::new(self.dom, &self.config.selectors, t.poll_interval());
        let actions = Actions::for_host(self.dom, &self.config.keyboard).await;

        if payload.has_recipient() {
            report.advance(RunState::ResolvingRecipient);
            let resolution = RecipientResolver::new(&locator, &actions, self.config)
                .resolve(&payload.recipient_id)
                .await;
            let outcome = if resolution.is_resolved() {
                StageOutcome::Success
            } else {
                StageOutcome::NotFound
            };
            report.record(Stage::Recipient, outcome);
            report.resolution = Some(resolution);
        } else {
            report.record(Stage::Recipient, StageOutcome::Skipped);
        }

        report.advance(RunState::AwaitingComposer);
        let composer = locator
            .element(Target::Composer, Duration::from_millis(t.composer_timeout_ms))
            .await;
        report.record(Stage::Composer, StageOutcome::of(&composer));
        let Ok(composer) = composer else {
            return report.abandon(EndReason::ComposerNotFound, start);
        };

        report.advance(RunState::WritingMessage);
        if self.config.clipboard.prime {
            self.prime_clipboard(&payload.message_text).await;
        }
        let written = self
            .write_message(&locator, &actions, composer, &payload.message_text)
            .await;
        report.record(Stage::Write, StageOutcome::of(&written));
        let composer = match written {
            Ok(el) => el,
            Err(Error::NotFound(_)) => return report.abandon(EndReason::ComposerNotFound, start),
            Err(_) => return report.abandon(EndReason::InsertionUnverified, start),
        };

        report.advance(RunState::Dispatching);
        let sent = Dispatcher::new(self.dom, &locator, &actions, t)
            .send(composer)
            .await;
        report.record(Stage::Dispatch, StageOutcome::of(&sent));
        match sent {
            Ok(path) => report.finish(path, start),
            Err(e) => {
                debug!("send failed: {}", e);
                report.abandon(EndReason::SendFailed, start)
            }
        }
    }

    async fn read_payload(&self) -> Payload {
        let keys = &self.config.payload;
        let url = self.dom.location().await.unwrap_or_default();
        let recipient = self.session(&keys.recipient_key).await;
        let message = self.session(&keys.message_key).await;
        Payload::read(&url, keys, |key| {
            if key == keys.recipient_key {
                recipient.clone()
            } else if key == keys.message_key {
                message.clone()
            } else {
                None
            }
        })
    }

    async fn session(&self, key: &str) -> Option<String> {
        match self.dom.session_item(key).await {
            Ok(value) => value,
            Err(e) => {
                debug!("session store unreadable: {}", e);
                None
            }
        }
    }

    /// Leave the message on the clipboard for a manual paste, unless the
    /// user already has something there.
    async fn prime_clipboard(&self, text: &str) {
        match self.dom.read_clipboard().await {
            Ok(current) if current.is_empty() => {}
            Ok(_) => return,
            Err(e) => {
                debug!("clipboard unreadable, left alone: {}", e);
                return;
            }
        }
        match self.dom.write_clipboard(text).await {
            Ok(true) => debug!("message copied to clipboard"),
            Ok(false) => debug!("clipboard write refused"),
            Err(e) => debug!("clipboard write failed: {}", e),
        }
    }

    /// Write into the composer and check the text is really there.
    async fn write_message(
        &self,
        locator: &Locator<'_, D>,
        actions: &Actions<'_, D>,
        composer: ElementRef,
        text: &str,
    ) -> Result<ElementRef> {
        let composer = locator
            .revalidate(composer, Target::Composer, self.config.timings.poll_interval())
            .await?;
        let insertion = actions.type_text(composer, text).await;
        debug!("composer write: {:?}", insertion);
        if FieldWriter::new(self.dom).verify(composer, text).await {
            Ok(composer)
        } else {
            Err(Error::InsertionUnverified(Target::Composer))
        }
    }
}
