use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Raised when an operation does not finish before its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("operation timed out after {elapsed:?}")]
pub struct TimedOut {
    /// Time spent waiting before giving up.
    pub elapsed: Duration,
}

/// Race `operation` against a `duration` deadline.
///
/// If the operation finishes first its result (success or error) is returned
/// unchanged. If the deadline fires first the operation future is dropped and
/// [`TimedOut`] is returned, converted into the caller's error type. The
/// timer is released on both paths.
///
/// Dropping the future stops it at its next await point. Work it already
/// handed off (a request that reached a vendor, a spawned task) is not
/// recalled, so a side effect may still land after a reported timeout.
pub async fn run_with_timeout<F, T, E>(duration: Duration, operation: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: From<TimedOut>,
{
    let started = Instant::now();
    match tokio::time::timeout(duration, operation).await {
        Ok(result) => result,
        Err(_) => {
            let elapsed = started.elapsed();
            debug!(elapsed_ms = %elapsed.as_millis(), "operation timed out");
            Err(TimedOut { elapsed }.into())
        }
    }
}

/// Like [`run_with_timeout`], but also cancels `token` when the deadline
/// fires so handlers that check it between sub-steps (or detached tasks
/// holding a clone) can stop early.
pub async fn run_with_timeout_cancellable<F, T, E>(
    duration: Duration,
    token: &CancellationToken,
    operation: F,
) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: From<TimedOut>,
{
    let started = Instant::now();
    match tokio::time::timeout(duration, operation).await {
        Ok(result) => result,
        Err(_) => {
            token.cancel();
            let elapsed = started.elapsed();
            debug!(elapsed_ms = %elapsed.as_millis(), "operation timed out, cancellation signalled");
            Err(TimedOut { elapsed }.into())
        }
    }
}
