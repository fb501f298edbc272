use async_trait::async_trait;
use opsdesk_core::ActionContext;

use crate::error::HandlerError;

/// Answer of a booking check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingValidation {
    pub valid: bool,
    /// Why the booking was rejected, shown to staff as-is.
    pub reason: Option<String>,
}

impl BookingValidation {
    pub fn valid() -> Self {
        Self {
            valid: true,
            reason: None,
        }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            reason: Some(reason.into()),
        }
    }
}

/// Checks that a customer holds an active booking before access is granted.
#[async_trait]
pub trait BookingValidator: Send + Sync {
    async fn validate(&self, context: &ActionContext) -> Result<BookingValidation, HandlerError>;
}

/// Accepts any context that carries a booking id.
#[derive(Debug, Default, Clone, Copy)]
pub struct RequireBookingId;

#[async_trait]
impl BookingValidator for RequireBookingId {
    async fn validate(&self, context: &ActionContext) -> Result<BookingValidation, HandlerError> {
        Ok(match context.booking_id.as_deref() {
            Some(id) if !id.trim().is_empty() => BookingValidation::valid(),
            _ => BookingValidation::invalid("No active booking found for this customer"),
        })
    }
}

#[cfg(test)]
mod tests {
    use opsdesk_core::ThreadContext;

    use super::*;

    #[tokio::test]
    async fn booking_id_required() {
        let ctx = ActionContext::new(ThreadContext::new("t", "downtown"));
        let v = RequireBookingId.validate(&ctx).await.unwrap();
        assert!(!v.valid);
        assert_eq!(
            v.reason.as_deref(),
            Some("No active booking found for this customer")
        );

        let ctx = ctx.with_booking("bk-1");
        assert!(RequireBookingId.validate(&ctx).await.unwrap().valid);
    }

    #[tokio::test]
    async fn blank_booking_id_is_rejected() {
        let ctx = ActionContext::new(ThreadContext::new("t", "downtown")).with_booking("  ");
        assert!(!RequireBookingId.validate(&ctx).await.unwrap().valid);
    }
}
