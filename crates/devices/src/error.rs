use opsdesk_provider::HandlerError;
use thiserror::Error;

/// Errors raised by the remote device adapter and its vendor clients.
///
/// Converted into [`HandlerError`] at the handler boundary.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// No device is mapped for the bay at the location.
    #[error("Device not found for bay {bay_id} at location {location}")]
    NotFound { location: String, bay_id: String },

    /// No door controller is mapped for the bay at the location.
    #[error("Door not found for bay {bay_id} at location {location}")]
    DoorNotFound { location: String, bay_id: String },

    /// The HTTP client could not be built or the request never completed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The vendor API answered with a non-success status.
    #[error("{vendor} API returned HTTP {status}: {body}")]
    Api {
        vendor: &'static str,
        status: u16,
        body: String,
    },

    /// The vendor API answered 2xx but the body reports a failure.
    #[error("{vendor} rejected the request: {message}")]
    Rejected {
        vendor: &'static str,
        message: String,
    },

    /// The vendor API answered 2xx but the body could not be read, so
    /// whether the command took effect is unknown.
    #[error("{vendor} accepted the request but the response was unreadable: {message}")]
    Unconfirmed {
        vendor: &'static str,
        message: String,
    },
}

impl DeviceError {
    /// Whether this is a missing mapping rather than a device fault.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::DoorNotFound { .. })
    }
}

impl From<DeviceError> for HandlerError {
    fn from(err: DeviceError) -> Self {
        match err {
            e @ (DeviceError::NotFound { .. } | DeviceError::DoorNotFound { .. }) => {
                HandlerError::Configuration(e.to_string())
            }
            DeviceError::Http(e) => HandlerError::Transient(e.to_string()),
            DeviceError::Api {
                vendor,
                status,
                body,
            } => HandlerError::from_status(status, format!("{vendor}: {body}")),
            e @ DeviceError::Rejected { .. } => HandlerError::ExecutionFailed(e.to_string()),
            e @ DeviceError::Unconfirmed { .. } => HandlerError::Unconfirmed(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use opsdesk_executor::Retryable;

    use super::*;

    #[test]
    fn not_found_is_configuration() {
        let err = DeviceError::NotFound {
            location: "nowhere".into(),
            bay_id: "bay-9".into(),
        };
        assert!(err.is_not_found());
        assert_eq!(
            err.to_string(),
            "Device not found for bay bay-9 at location nowhere"
        );
        let handler_err: HandlerError = err.into();
        assert!(matches!(handler_err, HandlerError::Configuration(_)));
        assert!(!handler_err.is_retryable());
    }

    #[test]
    fn api_status_classification() {
        let unavailable: HandlerError = DeviceError::Api {
            vendor: "ninjaone",
            status: 503,
            body: "maintenance".into(),
        }
        .into();
        assert!(unavailable.is_retryable());

        let forbidden: HandlerError = DeviceError::Api {
            vendor: "unifi",
            status: 403,
            body: "no".into(),
        }
        .into();
        assert!(matches!(forbidden, HandlerError::Permission { status: 403, .. }));
        assert!(!forbidden.is_retryable());
    }

    #[test]
    fn rejected_is_definitive() {
        let err: HandlerError = DeviceError::Rejected {
            vendor: "unifi",
            message: "door offline".into(),
        }
        .into();
        assert!(matches!(err, HandlerError::ExecutionFailed(_)));
    }

    #[test]
    fn unreadable_success_is_unconfirmed_and_not_retried() {
        let err: HandlerError = DeviceError::Unconfirmed {
            vendor: "unifi",
            message: "expected value at line 1 column 1".into(),
        }
        .into();
        assert!(matches!(err, HandlerError::Unconfirmed(_)));
        assert!(!err.is_retryable());
    }
}
