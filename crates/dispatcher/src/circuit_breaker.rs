use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use opsdesk_core::CircuitBreakerStatus;
use opsdesk_provider::HandlerError;
use tokio::time::Instant;
use tracing::{debug, info};

/// State of a circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Normal operation: calls flow through.
    Closed,
    /// Target is failing: calls are rejected immediately.
    Open,
    /// Cool-down elapsed: a single trial call is allowed.
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "closed"),
            Self::Open => write!(f, "open"),
            Self::HalfOpen => write!(f, "half_open"),
        }
    }
}

/// Configuration for a per-target circuit breaker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Failures that open the circuit.
    pub failure_threshold: u32,
    /// How long to stay `Open` after the last failure before a trial call.
    pub reset_timeout: Duration,
}

impl CircuitBreakerConfig {
    /// Validate configuration values.
    ///
    /// `reset_timeout = 0` is allowed (useful for testing).
    pub fn validate(&self) -> Result<(), String> {
        if self.failure_threshold < 1 {
            return Err("failure_threshold must be >= 1".into());
        }
        Ok(())
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout: Duration::from_secs(60),
        }
    }
}

/// Answer of [`CircuitBreaker::check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The call may proceed; `trial` is set for the half-open trial call.
    Allowed { trial: bool },
    /// The call must not be made.
    Rejected { remaining: Duration },
}

struct CircuitData {
    state: CircuitState,
    failures: u32,
    last_failure_time: Option<Instant>,
    /// Set while the half-open trial call is running.
    trial_in_flight: bool,
    request_count: u64,
    success_count: u64,
}

impl CircuitData {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            failures: 0,
            last_failure_time: None,
            trial_in_flight: false,
            request_count: 0,
            success_count: 0,
        }
    }
}

/// Circuit breaker protecting one external target.
///
/// - `Closed` -> `Open` once `failures` reaches the threshold
/// - `Open` -> `HalfOpen` lazily, on the first call after `reset_timeout`
///   has elapsed since the last failure; `failures` restarts at zero
/// - `HalfOpen` -> `Closed` when the trial call succeeds
/// - `HalfOpen` -> `Open` when it fails, re-arming the cool-down
///
/// Successes while `Closed` do not reset the failure count.
pub struct CircuitBreaker {
    target: String,
    config: CircuitBreakerConfig,
    data: RwLock<CircuitData>,
}

impl CircuitBreaker {
    pub fn new(target: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            target: target.into(),
            config,
            data: RwLock::new(CircuitData::new()),
        }
    }

    /// Decide whether a call may go through.
    ///
    /// May move `Open` to `HalfOpen`. Only one trial call is admitted while
    /// half-open; concurrent callers are rejected until it settles.
    pub fn check(&self) -> Admission {
        let mut data = self
            .data
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        match data.state {
            CircuitState::Closed => {
                data.request_count += 1;
                Admission::Allowed { trial: false }
            }
            CircuitState::Open => {
                let elapsed = data
                    .last_failure_time
                    .map_or(self.config.reset_timeout, |t| t.elapsed());
                if elapsed >= self.config.reset_timeout {
                    debug!(target = %self.target, "circuit breaker transitioning from open to half-open");
                    data.state = CircuitState::HalfOpen;
                    data.failures = 0;
                    data.trial_in_flight = true;
                    data.request_count += 1;
                    Admission::Allowed { trial: true }
                } else {
                    Admission::Rejected {
                        remaining: self.config.reset_timeout - elapsed,
                    }
                }
            }
            CircuitState::HalfOpen if data.trial_in_flight => Admission::Rejected {
                remaining: Duration::ZERO,
            },
            CircuitState::HalfOpen => {
                data.trial_in_flight = true;
                data.request_count += 1;
                Admission::Allowed { trial: true }
            }
        }
    }

    /// Record a successful call.
    pub fn record_success(&self) {
        let mut data = self
            .data
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        data.success_count += 1;

        if data.state == CircuitState::HalfOpen {
            info!(target = %self.target, "circuit breaker closing after successful trial call");
            data.state = CircuitState::Closed;
            data.failures = 0;
            data.trial_in_flight = false;
        }
    }

    /// Record a failed call.
    pub fn record_failure(&self) {
        let mut data = self
            .data
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        data.failures = data.failures.saturating_add(1);
        data.last_failure_time = Some(Instant::now());

        match data.state {
            CircuitState::Closed if data.failures >= self.config.failure_threshold => {
                info!(
                    target = %self.target,
                    failures = data.failures,
                    threshold = self.config.failure_threshold,
                    "circuit breaker opening"
                );
                data.state = CircuitState::Open;
            }
            CircuitState::HalfOpen => {
                info!(target = %self.target, "circuit breaker re-opening after trial call failure");
                data.state = CircuitState::Open;
                data.trial_in_flight = false;
            }
            _ => {}
        }
    }

    /// Release an admitted call that says nothing about the target's health:
    /// a local configuration error, an unconfirmed reply, or a cancelled or
    /// abandoned call.
    ///
    /// The call is taken back out of the request count. Only the trial call
    /// itself (`trial`) frees the half-open slot.
    pub fn record_ignored(&self, trial: bool) {
        let mut data = self
            .data
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        data.request_count = data.request_count.saturating_sub(1);
        if trial {
            data.trial_in_flight = false;
        }
    }

    /// Run `operation` through the breaker.
    ///
    /// Rejected calls fail with [`HandlerError::CircuitOpen`] without
    /// polling `operation`. Configuration and cancellation errors do not
    /// count against the target.
    pub async fn call<T, F>(&self, operation: F) -> Result<T, HandlerError>
    where
        F: Future<Output = Result<T, HandlerError>>,
    {
        let trial = match self.check() {
            Admission::Allowed { trial } => trial,
            Admission::Rejected { remaining } => {
                debug!(target = %self.target, remaining_ms = %remaining.as_millis(), "circuit open, call rejected");
                return Err(HandlerError::CircuitOpen {
                    target: self.target.clone(),
                    remaining_secs: remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0),
                });
            }
        };

        let mut pending = PendingCall {
            breaker: self,
            trial,
            settled: false,
        };
        let result = operation.await;
        pending.settled = true;
        match &result {
            Ok(_) => self.record_success(),
            Err(
                HandlerError::Configuration(_)
                | HandlerError::Unconfirmed(_)
                | HandlerError::Cancelled,
            ) => self.record_ignored(trial),
            Err(_) => self.record_failure(),
        }
        result
    }

    /// Current state without triggering transitions.
    pub fn state(&self) -> CircuitState {
        self.data
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .state
    }

    pub fn failures(&self) -> u32 {
        self.data
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .failures
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Point-in-time view for health reporting.
    pub fn status(&self) -> CircuitBreakerStatus {
        let data = self
            .data
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        #[allow(clippy::cast_precision_loss)]
        let success_rate = if data.request_count == 0 {
            1.0
        } else {
            data.success_count as f64 / data.request_count as f64
        };
        CircuitBreakerStatus {
            target: self.target.clone(),
            state: data.state.to_string(),
            failures: data.failures,
            failure_threshold: self.config.failure_threshold,
            reset_timeout_seconds: self.config.reset_timeout.as_secs(),
            request_count: data.request_count,
            success_count: data.success_count,
            success_rate,
        }
    }
}

/// Releases the half-open slot when an admitted call is dropped before it
/// completes.
struct PendingCall<'a> {
    breaker: &'a CircuitBreaker,
    trial: bool,
    settled: bool,
}

impl Drop for PendingCall<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.breaker.record_ignored(self.trial);
        }
    }
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let data = self
            .data
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        f.debug_struct("CircuitBreaker")
            .field("target", &self.target)
            .field("config", &self.config)
            .field("state", &data.state)
            .field("failures", &data.failures)
            .finish_non_exhaustive()
    }
}

/// Circuit breakers keyed by protected target (`vendor:operation`).
///
/// Built once at dispatcher construction and then used immutably; each
/// [`CircuitBreaker`] handles its own internal mutability.
#[derive(Default)]
pub struct CircuitBreakerRegistry {
    breakers: HashMap<String, Arc<CircuitBreaker>>,
}

impl CircuitBreakerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the breaker for a target and return it.
    pub fn register(
        &mut self,
        target: impl Into<String>,
        config: CircuitBreakerConfig,
    ) -> Arc<CircuitBreaker> {
        let name = target.into();
        let breaker = Arc::new(CircuitBreaker::new(name.clone(), config));
        self.breakers.insert(name, Arc::clone(&breaker));
        breaker
    }

    pub fn get(&self, target: &str) -> Option<Arc<CircuitBreaker>> {
        self.breakers.get(target).cloned()
    }

    /// Sorted list of protected targets.
    pub fn targets(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.breakers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Status of every breaker, sorted by target.
    pub fn statuses(&self) -> Vec<CircuitBreakerStatus> {
        self.targets()
            .into_iter()
            .filter_map(|t| self.breakers.get(t))
            .map(|b| b.status())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.breakers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.breakers.is_empty()
    }
}

impl std::fmt::Debug for CircuitBreakerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreakerRegistry")
            .field("targets", &self.targets())
            .finish()
    }
}
