use async_trait::async_trait;
use opsdesk_core::{OutcomeKind, ReportedOutcome};

use crate::context::Invocation;
use crate::error::HandlerError;

/// What a handler reports back for one invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerReport {
    /// Outcome as reported; normalized by the dispatcher.
    pub outcome: ReportedOutcome,
    /// Human-readable note for staff.
    pub notes: String,
    /// Handler-specific details.
    pub details: serde_json::Map<String, serde_json::Value>,
}

impl HandlerReport {
    pub fn new(outcome: impl Into<ReportedOutcome>, notes: impl Into<String>) -> Self {
        Self {
            outcome: outcome.into(),
            notes: notes.into(),
            details: serde_json::Map::new(),
        }
    }

    pub fn success(notes: impl Into<String>) -> Self {
        Self::new(OutcomeKind::Success, notes)
    }

    pub fn partial(notes: impl Into<String>) -> Self {
        Self::new(OutcomeKind::Partial, notes)
    }

    pub fn failed(notes: impl Into<String>) -> Self {
        Self::new(OutcomeKind::Failed, notes)
    }

    pub fn unconfirmed(notes: impl Into<String>) -> Self {
        Self::new(OutcomeKind::Unconfirmed, notes)
    }

    #[must_use]
    pub fn with_detail(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}

/// Strongly-typed handler trait with native `async fn`.
///
/// Not object-safe. Implement this and rely on the blanket
/// [`DynActionHandler`] implementation for registry storage.
pub trait ActionHandler: Send + Sync {
    /// Action type this handler serves (e.g. `reset_trackman`).
    fn action_type(&self) -> &str;

    /// Perform the action.
    fn handle(
        &self,
        invocation: &Invocation<'_>,
    ) -> impl std::future::Future<Output = Result<HandlerReport, HandlerError>> + Send;
}

/// Object-safe handler trait for use behind `Arc<dyn DynActionHandler>`.
#[async_trait]
pub trait DynActionHandler: Send + Sync {
    fn action_type(&self) -> &str;

    async fn handle(&self, invocation: &Invocation<'_>) -> Result<HandlerReport, HandlerError>;
}

#[async_trait]
impl<T: ActionHandler + Sync> DynActionHandler for T {
    fn action_type(&self) -> &str {
        ActionHandler::action_type(self)
    }

    async fn handle(&self, invocation: &Invocation<'_>) -> Result<HandlerReport, HandlerError> {
        ActionHandler::handle(self, invocation).await
    }
}
