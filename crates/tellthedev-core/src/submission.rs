//! Submission state machine with an explicit transition table.

use serde::{Deserialize, Serialize};

pub const RESET_DELAY_MS: u32 = 3_000;
pub const ALERT_DISMISS_MS: u32 = 4_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionState {
    #[default]
    Idle,
    Loading,
    Success,
    Error,
}

impl SubmissionState {
    #[must_use]
    pub fn button_label(self) -> &'static str {
        match self {
            Self::Idle => "Submit feedback",
            Self::Loading => "Submitting...",
            Self::Success => "Submitted ✅",
            Self::Error => "Try Again",
        }
    }

    #[must_use]
    pub fn button_disabled(self) -> bool {
        matches!(self, Self::Loading)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionEvent {
    /// Local validation passed and a request is about to be issued.
    Submit,
    Accepted,
    Rejected,
    ResetElapsed,
}

#[must_use]
pub fn next_state(from: SubmissionState, event: SubmissionEvent) -> Option<SubmissionState> {
    use SubmissionEvent as E;
    use SubmissionState as S;
    match (from, event) {
        (S::Idle | S::Success | S::Error, E::Submit) => Some(S::Loading),
        (S::Loading, E::Accepted) => Some(S::Success),
        (S::Loading, E::Rejected) => Some(S::Error),
        (S::Success | S::Error, E::ResetElapsed) => Some(S::Idle),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid submission transition: {event:?} from {from:?}")]
pub struct TransitionError {
    pub from: SubmissionState,
    pub event: SubmissionEvent,
}

/// Handle for a deferred reset; only the newest one is honoured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetTicket {
    generation: u64,
}

#[derive(Debug, Clone, Default)]
pub struct SubmissionMachine {
    state: SubmissionState,
    generation: u64,
}

impl SubmissionMachine {
    #[must_use]
    pub fn state(&self) -> SubmissionState {
        self.state
    }

    pub fn fire(&mut self, event: SubmissionEvent) -> Result<SubmissionState, TransitionError> {
        let next = next_state(self.state, event).ok_or(TransitionError {
            from: self.state,
            event,
        })?;
        self.state = next;
        self.generation = self.generation.wrapping_add(1);
        Ok(next)
    }

    /// Moves `loading` to `success` or `error` and hands back the reset ticket.
    pub fn settle(&mut self, accepted: bool) -> Result<ResetTicket, TransitionError> {
        let event = if accepted {
            SubmissionEvent::Accepted
        } else {
            SubmissionEvent::Rejected
        };
        self.fire(event)?;
        Ok(ResetTicket {
            generation: self.generation,
        })
    }

    /// Returns `true` when the ticket was current and the state went back to idle.
    pub fn expire(&mut self, ticket: ResetTicket) -> bool {
        if ticket.generation != self.generation {
            return false;
        }
        self.fire(SubmissionEvent::ResetElapsed).is_ok()
    }
}
