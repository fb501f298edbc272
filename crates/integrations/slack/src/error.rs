use opsdesk_provider::HandlerError;
use thiserror::Error;

/// Errors specific to the Slack transport.
///
/// Converted into [`HandlerError`] at the transport boundary.
#[derive(Debug, Error)]
pub enum SlackError {
    /// An HTTP-level transport error occurred.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The Slack API answered with a non-success HTTP status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The transport received an HTTP 429 (Too Many Requests) response.
    #[error("rate limited by Slack")]
    RateLimited,
}

impl From<SlackError> for HandlerError {
    fn from(err: SlackError) -> Self {
        match err {
            SlackError::Http(e) => HandlerError::Transient(e.to_string()),
            SlackError::Status { status, body } => HandlerError::from_status(status, body),
            SlackError::RateLimited => HandlerError::Transient("rate limited by Slack".into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use opsdesk_executor::Retryable;

    use super::*;

    #[test]
    fn rate_limited_maps_to_retryable() {
        let err: HandlerError = SlackError::RateLimited.into();
        assert!(err.is_retryable());
        assert!(matches!(err, HandlerError::Transient(_)));
    }

    #[test]
    fn server_error_is_retryable_client_error_is_not() {
        let err: HandlerError = SlackError::Status {
            status: 503,
            body: "unavailable".into(),
        }
        .into();
        assert!(err.is_retryable());

        let err: HandlerError = SlackError::Status {
            status: 403,
            body: "forbidden".into(),
        }
        .into();
        assert!(matches!(err, HandlerError::Permission { status: 403, .. }));
        assert!(!err.is_retryable());
    }

    #[test]
    fn status_display() {
        let err = SlackError::Status {
            status: 500,
            body: "oops".into(),
        };
        assert_eq!(err.to_string(), "HTTP 500: oops");
    }
}
