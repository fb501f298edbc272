use async_trait::async_trait;
use opsdesk_core::{SopConfig, ThreadContext};
use tracing::info;

use crate::error::HandlerError;
use crate::escalation::{EscalationDelivery, EscalationTransport};
use crate::message::MessageSender;

/// Escalation transport that logs the escalation and reports delivery
/// without any external I/O.
///
/// Useful for local development, staging, and tests.
#[derive(Debug, Default)]
pub struct LogEscalationTransport;

#[async_trait]
impl EscalationTransport for LogEscalationTransport {
    fn name(&self) -> &str {
        "log"
    }

    async fn send_escalation(
        &self,
        thread: &ThreadContext,
        sop: Option<&SopConfig>,
        reason: &str,
    ) -> Result<EscalationDelivery, HandlerError> {
        info!(
            thread_id = %thread.id,
            location = %thread.location,
            bay_id = thread.bay_id.as_deref().unwrap_or("-"),
            sop_id = sop.map_or("-", |s| s.id.as_str()),
            reason,
            "escalation logged"
        );
        Ok(EscalationDelivery::Delivered)
    }
}

/// Message sender that only logs.
#[derive(Debug, Default)]
pub struct LogMessageSender;

#[async_trait]
impl MessageSender for LogMessageSender {
    fn name(&self) -> &str {
        "log"
    }

    async fn send_message(
        &self,
        thread: &ThreadContext,
        message: &str,
    ) -> Result<Option<String>, HandlerError> {
        info!(
            thread_id = %thread.id,
            customer = thread.customer_ref.as_deref().unwrap_or("-"),
            chars = message.len(),
            "message logged"
        );
        Ok(None)
    }
}
