use opsdesk_core::{ActionContext, ThreadContext};
use tokio_util::sync::CancellationToken;

/// A single handler invocation.
///
/// Carries the dispatch context, the zero-based attempt index, and a
/// cancellation signal the dispatcher trips when the attempt times out.
/// Handlers with several sub-steps should check
/// [`is_cancelled`](Self::is_cancelled) between them.
#[derive(Debug, Clone)]
pub struct Invocation<'a> {
    /// Action type being dispatched.
    pub action_type: &'a str,
    /// Context loaded by the caller.
    pub context: &'a ActionContext,
    /// Zero-based attempt index.
    pub attempt: u32,
    /// Cancelled when the dispatcher stops waiting for this attempt.
    pub cancel: CancellationToken,
}

impl<'a> Invocation<'a> {
    /// Create a first-attempt invocation with a fresh cancellation token.
    pub fn new(action_type: &'a str, context: &'a ActionContext) -> Self {
        Self {
            action_type,
            context,
            attempt: 0,
            cancel: CancellationToken::new(),
        }
    }

    #[must_use]
    pub fn with_attempt(mut self, attempt: u32) -> Self {
        self.attempt = attempt;
        self
    }

    #[must_use]
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn thread(&self) -> &ThreadContext {
        &self.context.thread
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
