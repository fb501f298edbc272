use std::sync::Arc;

use opsdesk_provider::{
    ActionHandler, EscalationDelivery, EscalationTransport, HandlerError, HandlerReport, Invocation,
};
use tracing::{info, instrument, warn};

use super::ESCALATE;

const DEFAULT_REASON: &str = "Automated handling could not resolve this thread";

/// Legacy handler handing a thread to staff through the escalation
/// transport.
///
/// Delivery refusals are reported as `failed`, never raised: escalation is
/// the last line of defense. Transport faults are returned as errors so the
/// dispatcher retries them.
pub struct EscalationHandler {
    transport: Arc<dyn EscalationTransport>,
}

impl EscalationHandler {
    pub fn new(transport: Arc<dyn EscalationTransport>) -> Self {
        Self { transport }
    }
}

impl ActionHandler for EscalationHandler {
    fn action_type(&self) -> &str {
        ESCALATE
    }

    #[instrument(skip_all, fields(transport = %self.transport.name(), attempt = invocation.attempt))]
    async fn handle(&self, invocation: &Invocation<'_>) -> Result<HandlerReport, HandlerError> {
        let context = invocation.context;
        let reason = context.parameter_str("reason").unwrap_or(DEFAULT_REASON);
        let transport = self.transport.name();

        let delivery = self
            .transport
            .send_escalation(&context.thread, context.sop.as_ref(), reason)
            .await?;

        let report = match delivery {
            EscalationDelivery::Delivered => {
                info!(thread_id = %context.thread.id, "escalation delivered");
                HandlerReport::success(format!("Escalated to staff via {transport}"))
            }
            EscalationDelivery::Unconfirmed { reason } => HandlerReport::unconfirmed(format!(
                "Escalation sent via {transport} but delivery was not confirmed: {reason}"
            )),
            EscalationDelivery::Failed { reason } => {
                warn!(thread_id = %context.thread.id, %reason, "escalation failed");
                HandlerReport::failed(format!("Escalation failed: {reason}"))
            }
        };
        Ok(report
            .with_detail("transport", transport)
            .with_detail("reason", reason))
    }
}
