use std::time::Duration;

use opsdesk_executor::{RetryError, Retryable, TimedOut, is_non_retryable_status};
use thiserror::Error;

/// Errors a handler (or a collaborator it calls) can fail with.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Bad configuration: unmapped device, unknown target, missing credential.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A network-level or otherwise transient fault.
    #[error("transient error: {0}")]
    Transient(String),

    /// The remote side refused the request (401/403).
    #[error("permission denied (HTTP {status}): {message}")]
    Permission { status: u16, message: String },

    /// The remote side answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// The call did not finish within its deadline.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// A circuit breaker rejected the call without invoking it.
    #[error("circuit open for {target}, retry in {remaining_secs}s")]
    CircuitOpen { target: String, remaining_secs: u64 },

    /// Every allowed attempt failed.
    #[error("retries exhausted after {attempts} attempts: {source}")]
    RetryExhausted {
        attempts: u32,
        #[source]
        source: Box<HandlerError>,
    },

    /// The handler ran and definitively failed.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    /// The remote side accepted the request but its outcome could not be
    /// confirmed. Repeating the call could apply it twice.
    #[error("outcome unconfirmed: {0}")]
    Unconfirmed(String),

    /// The handler observed its cancellation signal.
    #[error("cancelled")]
    Cancelled,
}

impl HandlerError {
    /// Build an error from an HTTP status, classifying 401/403 as
    /// [`HandlerError::Permission`].
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 | 403 => Self::Permission { status, message },
            _ => Self::Http { status, message },
        }
    }

    /// Whether this error is (or wraps) a timeout.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout(_) => true,
            Self::RetryExhausted { source, .. } => source.is_timeout(),
            _ => false,
        }
    }
}

impl Retryable for HandlerError {
    fn status_code(&self) -> Option<u16> {
        match self {
            Self::Permission { status, .. } | Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        match self {
            Self::Transient(_) | Self::Timeout(_) => true,
            Self::Http { status, .. } => !is_non_retryable_status(*status),
            Self::Configuration(_)
            | Self::Permission { .. }
            | Self::CircuitOpen { .. }
            | Self::RetryExhausted { .. }
            | Self::ExecutionFailed(_)
            | Self::Unconfirmed(_)
            | Self::Cancelled => false,
        }
    }
}

impl From<TimedOut> for HandlerError {
    fn from(t: TimedOut) -> Self {
        Self::Timeout(t.elapsed)
    }
}

impl From<RetryError<HandlerError>> for HandlerError {
    fn from(err: RetryError<HandlerError>) -> Self {
        match err {
            RetryError::NonRetryable { source, .. } => source,
            RetryError::Exhausted { attempts, source } => Self::RetryExhausted {
                attempts,
                source: Box::new(source),
            },
        }
    }
}
