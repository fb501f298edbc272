use std::time::Duration;

use crate::retry::{RetryPolicy, RetryStrategy};

/// Defaults applied to legacy handler invocations when the SOP does not
/// override them.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use opsdesk_executor::ExecutorConfig;
///
/// let config = ExecutorConfig::default();
/// assert_eq!(config.default_timeout, Duration::from_secs(30));
/// assert_eq!(config.max_retries, 2);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutorConfig {
    /// Per-attempt timeout used when the SOP sets none.
    pub default_timeout: Duration,
    /// Retry budget used when the SOP sets none.
    pub max_retries: u32,
    /// Strategy used to compute the delay between retries.
    pub retry_strategy: RetryStrategy,
}

impl ExecutorConfig {
    /// Retry policy for a dispatch, honouring an SOP override.
    pub fn policy_for(&self, max_retries: Option<u32>) -> RetryPolicy {
        RetryPolicy::new(
            max_retries.unwrap_or(self.max_retries),
            self.retry_strategy.clone(),
        )
    }

    /// Per-attempt timeout for a dispatch, honouring an SOP override.
    pub fn timeout_for(&self, timeout: Option<Duration>) -> Duration {
        timeout.unwrap_or(self.default_timeout)
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(30),
            max_retries: 2,
            retry_strategy: RetryStrategy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_win_over_defaults() {
        let cfg = ExecutorConfig::default();
        assert_eq!(cfg.policy_for(Some(5)).max_retries, 5);
        assert_eq!(cfg.policy_for(None).max_retries, 2);
        assert_eq!(
            cfg.timeout_for(Some(Duration::from_secs(3))),
            Duration::from_secs(3)
        );
        assert_eq!(cfg.timeout_for(None), Duration::from_secs(30));
    }

    #[test]
    fn policy_carries_configured_strategy() {
        let cfg = ExecutorConfig {
            retry_strategy: RetryStrategy::Constant {
                delay: Duration::from_millis(5),
            },
            ..ExecutorConfig::default()
        };
        assert_eq!(
            cfg.policy_for(None).strategy.delay_for(4),
            Duration::from_millis(5)
        );
    }
}
