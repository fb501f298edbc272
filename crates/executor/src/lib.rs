pub mod config;
pub mod retry;
pub mod timeout;

pub use config::ExecutorConfig;
pub use retry::{
    NON_RETRYABLE_STATUSES, RetryError, RetryPolicy, RetryStrategy, Retryable,
    is_non_retryable_status, with_retry,
};
pub use timeout::{TimedOut, run_with_timeout, run_with_timeout_cancellable};
