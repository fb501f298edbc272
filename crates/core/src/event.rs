use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::outcome::OutcomeKind;
use crate::status::ThreadStatus;

/// Signal emitted once per completed dispatch.
///
/// Consumers use it to apply the thread status transition and to observe
/// escalations without polling the dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchEvent {
    /// Unique dispatch identifier (`UUIDv7`).
    pub dispatch_id: String,
    /// Thread the action was taken for.
    pub thread_id: String,
    /// Dispatched action type.
    pub action_type: String,
    /// Normalized outcome.
    pub outcome: OutcomeKind,
    /// Status the thread should move to.
    pub next_status: ThreadStatus,
    /// Whether an escalation was triggered for this outcome.
    pub escalated: bool,
    /// When the dispatch completed.
    pub timestamp: DateTime<Utc>,
}
