use std::fmt;

use serde::{Deserialize, Serialize};

use crate::outcome::OutcomeKind;

/// Status a thread moves to after an action outcome is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreadStatus {
    /// Still open and eligible for re-check.
    InProgress,
    /// Waiting on a human to finish the job.
    AwaitingHuman,
    /// Handed to staff.
    Escalated,
    /// Done.
    Resolved,
}

impl fmt::Display for ThreadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::InProgress => "in_progress",
            Self::AwaitingHuman => "awaiting_human",
            Self::Escalated => "escalated",
            Self::Resolved => "resolved",
        };
        f.write_str(s)
    }
}

impl OutcomeKind {
    /// Thread status implied by this outcome.
    pub fn thread_status(self) -> ThreadStatus {
        match self {
            Self::Success => ThreadStatus::Resolved,
            Self::Failed => ThreadStatus::Escalated,
            Self::Partial => ThreadStatus::AwaitingHuman,
            Self::Unconfirmed => ThreadStatus::InProgress,
        }
    }
}

/// Who performed an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Performer {
    #[default]
    Automation,
    Human,
}

/// Downstream effect of recording one outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusTransition {
    /// New thread status.
    pub status: ThreadStatus,
    /// Whether the SOP's override counter must be incremented.
    pub increment_sop_override: bool,
}

impl StatusTransition {
    /// Compute the transition for an outcome.
    ///
    /// The SOP override counter increments when a human performed the action
    /// after the automated SOP had already failed on the thread.
    pub fn for_outcome(
        outcome: OutcomeKind,
        performed_by: Performer,
        prior_automated_failure: bool,
    ) -> Self {
        Self {
            status: outcome.thread_status(),
            increment_sop_override: performed_by == Performer::Human && prior_automated_failure,
        }
    }
}
