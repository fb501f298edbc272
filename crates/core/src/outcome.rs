use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Normalized result kind of one action dispatch.
///
/// Every handler result is reduced to exactly one of these four kinds before
/// it leaves the dispatcher. Downstream logic (thread status, ticket
/// creation, staff escalation) only ever sees this vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    /// The action fully achieved its goal.
    Success,
    /// The action achieved a sub-goal but needs human follow-up.
    Partial,
    /// The action was attempted and definitively did not achieve its goal.
    Failed,
    /// The action was dispatched but completion could not be verified.
    Unconfirmed,
}

impl OutcomeKind {
    /// All recognized outcome kinds.
    pub const ALL: [Self; 4] = [Self::Success, Self::Partial, Self::Failed, Self::Unconfirmed];

    /// Wire name of this outcome kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Partial => "partial",
            Self::Failed => "failed",
            Self::Unconfirmed => "unconfirmed",
        }
    }

    /// Whether a human must be looped in after this outcome.
    pub fn requires_escalation(self) -> bool {
        matches!(self, Self::Failed | Self::Partial)
    }
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string does not name one of the four outcome kinds.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized outcome: {0:?}")]
pub struct UnknownOutcome(pub String);

impl FromStr for OutcomeKind {
    type Err = UnknownOutcome;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(Self::Success),
            "partial" => Ok(Self::Partial),
            "failed" => Ok(Self::Failed),
            "unconfirmed" => Ok(Self::Unconfirmed),
            other => Err(UnknownOutcome(other.to_owned())),
        }
    }
}

/// Outcome as reported by a handler, before normalization.
///
/// Framework handlers report a typed [`OutcomeKind`]. Legacy handlers may
/// still report free-form strings; those are accepted and normalized by
/// [`ReportedOutcome::normalize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportedOutcome {
    /// A recognized outcome kind.
    Kind(OutcomeKind),
    /// A raw outcome string.
    Raw(String),
}

impl ReportedOutcome {
    /// Reduce the reported value to an [`OutcomeKind`].
    ///
    /// Raw strings naming a recognized kind map to it; anything else is
    /// coerced to [`OutcomeKind::Unconfirmed`]. The second element carries
    /// the original string when coercion happened.
    pub fn normalize(&self) -> (OutcomeKind, Option<&str>) {
        match self {
            Self::Kind(kind) => (*kind, None),
            Self::Raw(raw) => match raw.parse::<OutcomeKind>() {
                Ok(kind) => (kind, None),
                Err(_) => (OutcomeKind::Unconfirmed, Some(raw.as_str())),
            },
        }
    }
}

impl From<OutcomeKind> for ReportedOutcome {
    fn from(kind: OutcomeKind) -> Self {
        Self::Kind(kind)
    }
}

impl From<&str> for ReportedOutcome {
    fn from(raw: &str) -> Self {
        Self::Raw(raw.to_owned())
    }
}

impl From<String> for ReportedOutcome {
    fn from(raw: String) -> Self {
        Self::Raw(raw)
    }
}

/// Record produced by every completed dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    /// Normalized outcome.
    pub outcome: OutcomeKind,
    /// Human-readable note suitable for direct display to staff.
    pub notes: String,
    /// Handler-specific details (device name, simulated flag, attempts, ...).
    #[serde(default)]
    pub details: serde_json::Map<String, serde_json::Value>,
}

impl ActionResult {
    /// Create a result with the given outcome and notes and no details.
    #[must_use]
    pub fn new(outcome: OutcomeKind, notes: impl Into<String>) -> Self {
        Self {
            outcome,
            notes: notes.into(),
            details: serde_json::Map::new(),
        }
    }

    #[must_use]
    pub fn success(notes: impl Into<String>) -> Self {
        Self::new(OutcomeKind::Success, notes)
    }

    #[must_use]
    pub fn partial(notes: impl Into<String>) -> Self {
        Self::new(OutcomeKind::Partial, notes)
    }

    #[must_use]
    pub fn failed(notes: impl Into<String>) -> Self {
        Self::new(OutcomeKind::Failed, notes)
    }

    #[must_use]
    pub fn unconfirmed(notes: impl Into<String>) -> Self {
        Self::new(OutcomeKind::Unconfirmed, notes)
    }

    /// Attach a single detail entry.
    #[must_use]
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    /// Look up a detail entry.
    pub fn detail(&self, key: &str) -> Option<&serde_json::Value> {
        self.details.get(key)
    }
}
