use std::sync::Arc;

use opsdesk_provider::{ActionHandler, HandlerError, HandlerReport, Invocation, MessageSender};
use tracing::instrument;

use super::SEND_MESSAGE;

/// Legacy handler sending `parameters.message` to the customer.
pub struct SendMessageHandler {
    sender: Arc<dyn MessageSender>,
}

impl SendMessageHandler {
    pub fn new(sender: Arc<dyn MessageSender>) -> Self {
        Self { sender }
    }
}

impl ActionHandler for SendMessageHandler {
    fn action_type(&self) -> &str {
        SEND_MESSAGE
    }

    #[instrument(skip_all, fields(sender = %self.sender.name(), attempt = invocation.attempt))]
    async fn handle(&self, invocation: &Invocation<'_>) -> Result<HandlerReport, HandlerError> {
        let message = invocation
            .context
            .parameter_str("message")
            .filter(|m| !m.trim().is_empty())
            .ok_or_else(|| {
                HandlerError::Configuration("send_message requires a non-empty `message` parameter".into())
            })?;

        if invocation.is_cancelled() {
            return Err(HandlerError::Cancelled);
        }

        let message_id = self.sender.send_message(invocation.thread(), message).await?;

        let mut report = HandlerReport::success("Message sent to customer")
            .with_detail("sender", self.sender.name());
        if let Some(id) = message_id {
            report = report.with_detail("message_id", id);
        }
        Ok(report)
    }
}
