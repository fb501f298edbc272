use async_trait::async_trait;
use opsdesk_core::{SopConfig, ThreadContext};

use crate::error::HandlerError;

/// Result of handing an escalation to the notification transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EscalationDelivery {
    /// The transport confirmed delivery.
    Delivered,
    /// The request left but delivery could not be confirmed.
    Unconfirmed { reason: String },
    /// The transport refused or failed the delivery.
    Failed { reason: String },
}

impl EscalationDelivery {
    /// Map a `{ success, reason }` receipt. An unsuccessful receipt is a
    /// failure whether or not the transport names a reason.
    pub fn from_receipt(success: bool, reason: Option<String>) -> Self {
        if success {
            Self::Delivered
        } else {
            Self::Failed {
                reason: reason.unwrap_or_else(|| "unknown_error".to_owned()),
            }
        }
    }
}

/// Delivers escalations to staff (chat, pager, ...).
#[async_trait]
pub trait EscalationTransport: Send + Sync {
    /// Transport name, for logs.
    fn name(&self) -> &str;

    /// Hand the escalation to staff.
    ///
    /// `Err` is reserved for faults worth retrying (connection errors);
    /// definitive refusals come back as [`EscalationDelivery::Failed`].
    async fn send_escalation(
        &self,
        thread: &ThreadContext,
        sop: Option<&SopConfig>,
        reason: &str,
    ) -> Result<EscalationDelivery, HandlerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn receipt_mapping() {
        assert_eq!(
            EscalationDelivery::from_receipt(true, None),
            EscalationDelivery::Delivered
        );
        assert_eq!(
            EscalationDelivery::from_receipt(false, Some("channel_not_found".into())),
            EscalationDelivery::Failed {
                reason: "channel_not_found".into()
            }
        );
        assert_eq!(
            EscalationDelivery::from_receipt(false, None),
            EscalationDelivery::Failed {
                reason: "unknown_error".into()
            }
        );
    }
}
