use async_trait::async_trait;
use opsdesk_core::ThreadContext;

use crate::error::HandlerError;

/// Sends a message to the customer on a thread.
#[async_trait]
pub trait MessageSender: Send + Sync {
    fn name(&self) -> &str;

    /// Deliver `message`; returns a transport message id when one exists.
    async fn send_message(
        &self,
        thread: &ThreadContext,
        message: &str,
    ) -> Result<Option<String>, HandlerError>;
}
