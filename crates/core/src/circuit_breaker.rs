use serde::{Deserialize, Serialize};

/// Summary of a single circuit breaker's current state, for health reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerStatus {
    /// Protected target, `<vendor>:<operation>`.
    pub target: String,
    /// Current circuit state ("closed", "open", "`half_open`").
    pub state: String,
    /// Failures counted since the last recovery.
    pub failures: u32,
    /// Failures that open the circuit.
    pub failure_threshold: u32,
    /// Cool-down in seconds before a trial call is allowed.
    pub reset_timeout_seconds: u64,
    /// Calls that went through the breaker (rejections excluded).
    pub request_count: u64,
    /// Calls that succeeded.
    pub success_count: u64,
    /// `success_count / request_count`, `1.0` before any request.
    pub success_rate: f64,
}
