use std::fmt;
use tracing::debug;

/// Where a run is. Runs only move forward; `Done` and `Abandoned` are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RunState {
    Idle,
    AwaitingVisibility,
    ResolvingRecipient,
    AwaitingComposer,
    WritingMessage,
    Dispatching,
    Done,
    Abandoned,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Done | RunState::Abandoned)
    }

    /// Whether `next` is a legal forward move from `self`.
    pub fn can_advance_to(self, next: RunState) -> bool {
        !self.is_terminal() && next > self
    }

    /// Move to `next` if that is a forward move. Returns `false` and leaves
    /// the state untouched otherwise.
    pub fn advance(&mut self, next: RunState) -> bool {
        if !self.can_advance_to(next) {
            debug!("ignoring transition {:?} -> {:?}", self, next);
            return false;
        }
        *self = next;
        true
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunState::Idle => "idle",
            RunState::AwaitingVisibility => "awaiting visibility",
            RunState::ResolvingRecipient => "resolving recipient",
            RunState::AwaitingComposer => "awaiting composer",
            RunState::WritingMessage => "writing message",
            RunState::Dispatching => "dispatching",
            RunState::Done => "done",
            RunState::Abandoned => "abandoned",
        };
        f.write_str(s)
    }
}

/// A step of the run whose outcome is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Payload,
    Visibility,
    Recipient,
    Composer,
    Write,
    Dispatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    Success,
    /// Stage had nothing to do (no recipient, empty payload).
    Skipped,
    /// Required element or condition never showed up.
    NotFound,
    /// Work ran but its effect could not be observed.
    Unverified,
}

impl StageOutcome {
    /// Outcome recorded for a stage that returned `result`.
    pub fn of<T>(result: &crate::Result<T>) -> Self {
        use crate::Error;
        match result {
            Ok(_) => StageOutcome::Success,
            Err(Error::EmptyPayload) => StageOutcome::Skipped,
            Err(Error::InsertionUnverified(_)) => StageOutcome::Unverified,
            Err(_) => StageOutcome::NotFound,
        }
    }
}

/// Why a run ended without sending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    EmptyPayload,
    ComposerNotFound,
    InsertionUnverified,
    SendFailed,
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EndReason::EmptyPayload => "payload has no message text",
            EndReason::ComposerNotFound => "no composer appeared",
            EndReason::InsertionUnverified => "message not observed in composer",
            EndReason::SendFailed => "send could not be triggered",
        };
        f.write_str(s)
    }
}
