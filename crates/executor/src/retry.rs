use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

use crate::timeout::TimedOut;

/// Statuses that indicate a malformed request or a permission problem.
/// Failures reporting one of these are never retried.
pub const NON_RETRYABLE_STATUSES: [u16; 4] = [400, 401, 403, 404];

/// Returns `true` if `status` belongs to [`NON_RETRYABLE_STATUSES`].
pub fn is_non_retryable_status(status: u16) -> bool {
    NON_RETRYABLE_STATUSES.contains(&status)
}

/// Classification of a failure for the retry loop.
pub trait Retryable {
    /// HTTP-like status reported by the failure, if any.
    fn status_code(&self) -> Option<u16> {
        None
    }

    /// Whether another attempt may succeed. By default every failure is
    /// retryable unless it reports a status in [`NON_RETRYABLE_STATUSES`].
    fn is_retryable(&self) -> bool {
        !self.status_code().is_some_and(is_non_retryable_status)
    }
}

impl Retryable for TimedOut {}

/// Strategy for computing delay between retry attempts.
///
/// All variants clamp the computed delay so it never exceeds the
/// configured maximum.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryStrategy {
    /// Exponential backoff: `base * multiplier^attempt`, optionally with
    /// deterministic jitter.
    Exponential {
        /// Delay before the first retry.
        base: Duration,
        /// Upper bound on the computed delay.
        max: Duration,
        /// Factor applied on each successive attempt.
        multiplier: f64,
        /// When `true`, a deterministic jitter factor is applied so that
        /// concurrent callers do not all retry at the same instant.
        jitter: bool,
    },
    /// Constant delay between every retry attempt.
    Constant {
        /// Fixed delay duration.
        delay: Duration,
    },
}

impl RetryStrategy {
    /// Plain doubling backoff: `base * 2^attempt`, clamped to `max`.
    pub fn doubling(base: Duration, max: Duration) -> Self {
        Self::Exponential {
            base,
            max,
            multiplier: 2.0,
            jitter: false,
        }
    }

    /// Compute the delay for the given zero-based `attempt` number.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    /// use opsdesk_executor::RetryStrategy;
    ///
    /// let strategy = RetryStrategy::doubling(Duration::from_secs(1), Duration::from_secs(30));
    /// assert_eq!(strategy.delay_for(0), Duration::from_secs(1));
    /// assert_eq!(strategy.delay_for(2), Duration::from_secs(4));
    /// ```
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self {
            Self::Exponential {
                base,
                max,
                multiplier,
                jitter,
            } => {
                let base_secs = base.as_secs_f64();
                // `attempt` is a small retry count, so the cast cannot wrap.
                #[allow(clippy::cast_possible_wrap)]
                let raw = base_secs * multiplier.powi(attempt as i32);

                let adjusted = if *jitter {
                    // +0% to +40% depending on the attempt number.
                    raw * (1.0 + 0.1 * f64::from(attempt % 5))
                } else {
                    raw
                };

                Duration::from_secs_f64(adjusted.min(max.as_secs_f64()))
            }
            Self::Constant { delay } => *delay,
        }
    }
}

impl Default for RetryStrategy {
    fn default() -> Self {
        Self::doubling(Duration::from_secs(1), Duration::from_secs(30))
    }
}

/// Retry budget plus backoff curve for one dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; `max_retries + 1` attempts in total.
    pub max_retries: u32,
    /// Delay curve between attempts.
    pub strategy: RetryStrategy,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, strategy: RetryStrategy) -> Self {
        Self {
            max_retries,
            strategy,
        }
    }

    /// `base_delay * 2^attempt` backoff with the given retry budget.
    pub fn exponential(max_retries: u32, base_delay: Duration) -> Self {
        Self::new(
            max_retries,
            RetryStrategy::doubling(base_delay, Duration::from_secs(30)),
        )
    }

    /// Total attempts this policy allows.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(2, RetryStrategy::default())
    }
}

/// Failure of a retried operation.
#[derive(Debug, Error)]
pub enum RetryError<E>
where
    E: std::error::Error + 'static,
{
    /// The operation failed with an error that must not be retried.
    #[error("{source}")]
    NonRetryable {
        /// Attempts made, including the failing one.
        attempts: u32,
        #[source]
        source: E,
    },

    /// Every allowed attempt failed. Carries the last error.
    #[error("retries exhausted after {attempts} attempts: {source}")]
    Exhausted {
        /// Total attempts made.
        attempts: u32,
        #[source]
        source: E,
    },
}

impl<E> RetryError<E>
where
    E: std::error::Error + 'static,
{
    /// Number of attempts made before giving up.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::NonRetryable { attempts, .. } | Self::Exhausted { attempts, .. } => *attempts,
        }
    }

    /// The last underlying error.
    pub fn last_error(&self) -> &E {
        match self {
            Self::NonRetryable { source, .. } | Self::Exhausted { source, .. } => source,
        }
    }

    pub fn into_inner(self) -> E {
        match self {
            Self::NonRetryable { source, .. } | Self::Exhausted { source, .. } => source,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }
}

/// Run `operation` until it succeeds, fails with a non-retryable error, or
/// the policy's attempts are used up.
///
/// `operation` receives the zero-based attempt index. Attempts are strictly
/// sequential; between attempts the caller's task sleeps for
/// `policy.strategy.delay_for(attempt)`. A policy with `max_retries = 0`
/// still performs exactly one attempt.
pub async fn with_retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    mut operation: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + std::error::Error + 'static,
{
    let mut attempt: u32 = 0;
    loop {
        match operation(attempt).await {
            Ok(value) => {
                if attempt > 0 {
                    debug!(attempt, "operation recovered after retries");
                }
                return Ok(value);
            }
            Err(err) if !err.is_retryable() => {
                warn!(
                    attempt,
                    error = %err,
                    status = ?err.status_code(),
                    "non-retryable failure"
                );
                return Err(RetryError::NonRetryable {
                    attempts: attempt + 1,
                    source: err,
                });
            }
            Err(err) if attempt >= policy.max_retries => {
                warn!(
                    attempt,
                    max_retries = policy.max_retries,
                    error = %err,
                    "retries exhausted"
                );
                return Err(RetryError::Exhausted {
                    attempts: attempt + 1,
                    source: err,
                });
            }
            Err(err) => {
                let delay = policy.strategy.delay_for(attempt);
                warn!(
                    attempt,
                    error = %err,
                    delay_ms = %delay.as_millis(),
                    "retryable failure, will retry"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
