use std::sync::Arc;
use std::time::Duration;

use opsdesk_devices::{DeviceActionOutcome, DeviceAdapter, DeviceOperation};
use opsdesk_executor::{RetryPolicy, run_with_timeout, with_retry};
use opsdesk_provider::{ActionHandler, BookingValidator, HandlerError, HandlerReport, Invocation};
use tracing::{debug, instrument, warn};

use crate::circuit_breaker::CircuitBreaker;

/// Resilience policy a device handler applies around each vendor call.
#[derive(Debug, Clone, PartialEq)]
pub struct DevicePolicy {
    /// Deadline for one adapter call.
    pub timeout: Duration,
    /// Retries around the breaker-guarded call.
    pub retry: RetryPolicy,
}

impl Default for DevicePolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(20),
            retry: RetryPolicy::exponential(1, Duration::from_millis(500)),
        }
    }
}

/// Framework handler performing a device operation for the thread's bay.
///
/// Owns its resilience: every adapter call runs under a timeout, through
/// the circuit breaker of its vendor target, inside a small retry loop.
/// Door unlocks are refused unless the booking validator accepts the
/// context.
pub struct DeviceActionHandler {
    action_type: String,
    operation: DeviceOperation,
    adapter: Arc<dyn DeviceAdapter>,
    breaker: Arc<CircuitBreaker>,
    policy: DevicePolicy,
    booking: Option<Arc<dyn BookingValidator>>,
}

impl DeviceActionHandler {
    pub fn new(
        action_type: impl Into<String>,
        operation: DeviceOperation,
        adapter: Arc<dyn DeviceAdapter>,
        breaker: Arc<CircuitBreaker>,
    ) -> Self {
        Self {
            action_type: action_type.into(),
            operation,
            adapter,
            breaker,
            policy: DevicePolicy::default(),
            booking: None,
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: DevicePolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn with_booking_validator(mut self, validator: Arc<dyn BookingValidator>) -> Self {
        self.booking = Some(validator);
        self
    }

    async fn perform(&self, bay_id: &str, location: &str) -> Result<DeviceActionOutcome, HandlerError> {
        let result = match self.operation {
            DeviceOperation::Reset => self.adapter.reset_device(bay_id, location).await,
            DeviceOperation::Reboot => self.adapter.reboot_device(bay_id, location).await,
            DeviceOperation::Unlock => self.adapter.unlock_door(bay_id, location).await,
        };
        result.map_err(HandlerError::from)
    }

    fn success_report(&self, outcome: DeviceActionOutcome) -> HandlerReport {
        let mut report = HandlerReport::success(outcome.message)
            .with_detail("device_id", outcome.device.device_id)
            .with_detail("device_name", outcome.device.display_name)
            .with_detail("simulated", outcome.simulated)
            .with_detail("target", self.breaker.target());
        if let Some(duration) = outcome.duration {
            report = report.with_detail("duration", duration.as_secs());
        }
        report
    }

    fn failure_report(&self, err: &HandlerError) -> HandlerReport {
        let report = match err {
            HandlerError::Configuration(msg) => HandlerReport::failed(msg.clone()),
            HandlerError::CircuitOpen { remaining_secs, .. } => HandlerReport::failed(format!(
                "{} is unavailable, not calling it for another {remaining_secs}s",
                self.operation.vendor()
            ))
            .with_detail("circuit_open", true),
            HandlerError::Unconfirmed(_) => HandlerReport::unconfirmed(format!(
                "Device {} was sent but {} did not confirm it",
                self.operation.as_str(),
                self.operation.vendor()
            )),
            other => HandlerReport::failed(format!(
                "Device {} failed: {other}",
                self.operation.as_str()
            )),
        };
        report
            .with_detail("target", self.breaker.target())
            .with_detail("error", err.to_string())
    }
}

impl ActionHandler for DeviceActionHandler {
    fn action_type(&self) -> &str {
        &self.action_type
    }

    #[instrument(skip_all, fields(action_type = %self.action_type, target = %self.breaker.target()))]
    async fn handle(&self, invocation: &Invocation<'_>) -> Result<HandlerReport, HandlerError> {
        let thread = invocation.thread();
        let Some(bay_id) = thread.bay_id.as_deref() else {
            return Ok(HandlerReport::failed("No bay associated with this thread"));
        };

        if let Some(validator) = &self.booking {
            let validation =
                match run_with_timeout(self.policy.timeout, validator.validate(invocation.context))
                    .await
                {
                    Ok(validation) => validation,
                    Err(err) if err.is_timeout() => {
                        warn!(thread_id = %thread.id, "booking validation timed out");
                        return Ok(HandlerReport::failed(format!(
                            "Booking validation timed out after {}s",
                            self.policy.timeout.as_secs()
                        ))
                        .with_detail("error", err.to_string()));
                    }
                    Err(err) => return Err(err),
                };
            if !validation.valid {
                debug!(thread_id = %thread.id, "booking validation rejected the request");
                return Ok(HandlerReport::failed(
                    validation
                        .reason
                        .unwrap_or_else(|| "Booking validation failed".to_owned()),
                ));
            }
        }

        let location = thread.location.as_str();
        let breaker = &self.breaker;
        let timeout = self.policy.timeout;
        let this = self;
        let result = with_retry(&self.policy.retry, move |_attempt| {
            breaker.call(run_with_timeout(timeout, this.perform(bay_id, location)))
        })
        .await
        .map_err(HandlerError::from);

        Ok(match result {
            Ok(outcome) => self.success_report(outcome),
            Err(err) => {
                warn!(thread_id = %thread.id, error = %err, "device operation failed");
                self.failure_report(&err)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;
    use opsdesk_core::{ActionContext, DeviceIdentity, OutcomeKind, ReportedOutcome, ThreadContext};
    use opsdesk_devices::{DeviceAdapterConfig, DeviceDirectory, DeviceError, RemoteDeviceAdapter};
    use opsdesk_provider::{BookingValidation, RequireBookingId};

    use super::*;
    use crate::circuit_breaker::{CircuitBreakerConfig, CircuitState};

    fn simulated_adapter() -> Arc<dyn DeviceAdapter> {
        let directory = DeviceDirectory::new()
            .with_bay("downtown", "bay-1", DeviceIdentity::new("pc-101", "Bay 1 TrackMan"))
            .with_door("downtown", "bay-1", DeviceIdentity::new("door-7", "Bay 1 door"));
        Arc::new(RemoteDeviceAdapter::simulated(directory, DeviceAdapterConfig::default()))
    }

    fn breaker(target: &str, threshold: u32) -> Arc<CircuitBreaker> {
        Arc::new(CircuitBreaker::new(target, CircuitBreakerConfig {
            failure_threshold: threshold,
            reset_timeout: Duration::from_secs(60),
        }))
    }

    fn fast_policy() -> DevicePolicy {
        DevicePolicy {
            timeout: Duration::from_secs(1),
            retry: RetryPolicy::exponential(1, Duration::from_millis(10)),
        }
    }

    fn context(bay: &str, location: &str) -> ActionContext {
        ActionContext::new(ThreadContext::new("t-1", location).with_bay(bay))
    }

    /// Adapter whose every vendor call fails with a transport error.
    struct DownAdapter {
        calls: AtomicU32,
    }

    #[async_trait]
    impl DeviceAdapter for DownAdapter {
        async fn reset_device(&self, _: &str, _: &str) -> Result<DeviceActionOutcome, DeviceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(DeviceError::Api {
                vendor: "ninjaone",
                status: 503,
                body: "unavailable".into(),
            })
        }

        async fn unlock_door(&self, bay: &str, location: &str) -> Result<DeviceActionOutcome, DeviceError> {
            self.reset_device(bay, location).await
        }

        async fn reboot_device(&self, bay: &str, location: &str) -> Result<DeviceActionOutcome, DeviceError> {
            self.reset_device(bay, location).await
        }

        fn is_live(&self, _: DeviceOperation) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn simulated_reset_succeeds() {
        let handler = DeviceActionHandler::new(
            "reset_trackman",
            DeviceOperation::Reset,
            simulated_adapter(),
            breaker("ninjaone:reset", 5),
        );
        let ctx = context("bay-1", "downtown");
        let report = handler
            .handle(&Invocation::new("reset_trackman", &ctx))
            .await
            .unwrap();
        assert_eq!(report.outcome, ReportedOutcome::Kind(OutcomeKind::Success));
        assert_eq!(report.details["simulated"], true);
        assert_eq!(report.details["device_name"], "Bay 1 TrackMan");
    }

    #[tokio::test]
    async fn unmapped_device_fails_without_retry_or_trip() {
        let cb = breaker("ninjaone:reset", 1);
        let handler = DeviceActionHandler::new(
            "reset_trackman",
            DeviceOperation::Reset,
            simulated_adapter(),
            Arc::clone(&cb),
        );
        let ctx = context("bay-9", "nowhere");
        let report = handler
            .handle(&Invocation::new("reset_trackman", &ctx))
            .await
            .unwrap();
        assert_eq!(report.outcome, ReportedOutcome::Kind(OutcomeKind::Failed));
        assert!(report.notes.contains("Device not found"));
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn missing_bay_fails() {
        let handler = DeviceActionHandler::new(
            "reboot_pc",
            DeviceOperation::Reboot,
            simulated_adapter(),
            breaker("ninjaone:reboot", 5),
        );
        let ctx = ActionContext::new(ThreadContext::new("t-1", "downtown"));
        let report = handler.handle(&Invocation::new("reboot_pc", &ctx)).await.unwrap();
        assert_eq!(report.outcome, ReportedOutcome::Kind(OutcomeKind::Failed));
        assert_eq!(report.notes, "No bay associated with this thread");
    }

    #[tokio::test]
    async fn unlock_requires_booking() {
        let handler = DeviceActionHandler::new(
            "unlock_door",
            DeviceOperation::Unlock,
            simulated_adapter(),
            breaker("unifi:unlock", 5),
        )
        .with_booking_validator(Arc::new(RequireBookingId));

        let ctx = context("bay-1", "downtown");
        let report = handler.handle(&Invocation::new("unlock_door", &ctx)).await.unwrap();
        assert_eq!(report.outcome, ReportedOutcome::Kind(OutcomeKind::Failed));
        assert_eq!(report.notes, "No active booking found for this customer");

        let ctx = ctx.with_booking("bk-1");
        let report = handler.handle(&Invocation::new("unlock_door", &ctx)).await.unwrap();
        assert_eq!(report.outcome, ReportedOutcome::Kind(OutcomeKind::Success));
        assert_eq!(report.details["duration"], 30);
    }

    /// Booking lookup that never answers.
    struct StalledBookings;

    #[async_trait]
    impl BookingValidator for StalledBookings {
        async fn validate(&self, _: &ActionContext) -> Result<BookingValidation, HandlerError> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_booking_lookup_times_out() {
        let adapter = Arc::new(DownAdapter {
            calls: AtomicU32::new(0),
        });
        let handler = DeviceActionHandler::new(
            "unlock_door",
            DeviceOperation::Unlock,
            Arc::clone(&adapter) as Arc<dyn DeviceAdapter>,
            breaker("unifi:unlock", 5),
        )
        .with_policy(fast_policy())
        .with_booking_validator(Arc::new(StalledBookings));

        let ctx = context("bay-1", "downtown").with_booking("bk-1");
        let report = handler.handle(&Invocation::new("unlock_door", &ctx)).await.unwrap();
        assert_eq!(report.outcome, ReportedOutcome::Kind(OutcomeKind::Failed));
        assert_eq!(report.notes, "Booking validation timed out after 1s");
        assert_eq!(adapter.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn vendor_outage_retries_then_opens_breaker() {
        let adapter = Arc::new(DownAdapter {
            calls: AtomicU32::new(0),
        });
        let cb = breaker("ninjaone:reset", 3);
        let handler = DeviceActionHandler::new(
            "reset_trackman",
            DeviceOperation::Reset,
            Arc::clone(&adapter) as Arc<dyn DeviceAdapter>,
            Arc::clone(&cb),
        )
        .with_policy(fast_policy());
        let ctx = context("bay-1", "downtown");

        // Two attempts per dispatch (one retry).
        let report = handler.handle(&Invocation::new("reset_trackman", &ctx)).await.unwrap();
        assert_eq!(report.outcome, ReportedOutcome::Kind(OutcomeKind::Failed));
        assert_eq!(adapter.calls.load(Ordering::SeqCst), 2);

        // Third failure opens the circuit; the retry is rejected by it.
        let report = handler.handle(&Invocation::new("reset_trackman", &ctx)).await.unwrap();
        assert_eq!(report.details["circuit_open"], true);
        assert_eq!(adapter.calls.load(Ordering::SeqCst), 3);
        assert_eq!(cb.state(), CircuitState::Open);

        // While open, the adapter is not called at all.
        let report = handler.handle(&Invocation::new("reset_trackman", &ctx)).await.unwrap();
        assert_eq!(report.outcome, ReportedOutcome::Kind(OutcomeKind::Failed));
        assert_eq!(adapter.calls.load(Ordering::SeqCst), 3);
        assert!(report.notes.contains("ninjaone is unavailable"));
    }

    /// Adapter whose vendor accepts the unlock but answers with garbage.
    struct UnreadableAdapter {
        calls: AtomicU32,
    }

    #[async_trait]
    impl DeviceAdapter for UnreadableAdapter {
        async fn reset_device(&self, _: &str, _: &str) -> Result<DeviceActionOutcome, DeviceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(DeviceError::Unconfirmed {
                vendor: "unifi",
                message: "expected value at line 1 column 1".into(),
            })
        }

        async fn unlock_door(&self, bay: &str, location: &str) -> Result<DeviceActionOutcome, DeviceError> {
            self.reset_device(bay, location).await
        }

        async fn reboot_device(&self, bay: &str, location: &str) -> Result<DeviceActionOutcome, DeviceError> {
            self.reset_device(bay, location).await
        }

        fn is_live(&self, _: DeviceOperation) -> bool {
            true
        }
    }

    #[tokio::test(start_paused = true)]
    async fn unreadable_unlock_reply_is_unconfirmed_and_sent_once() {
        let adapter = Arc::new(UnreadableAdapter {
            calls: AtomicU32::new(0),
        });
        let cb = breaker("unifi:unlock", 1);
        let handler = DeviceActionHandler::new(
            "unlock_door",
            DeviceOperation::Unlock,
            Arc::clone(&adapter) as Arc<dyn DeviceAdapter>,
            Arc::clone(&cb),
        )
        .with_policy(DevicePolicy {
            timeout: Duration::from_secs(1),
            retry: RetryPolicy::exponential(3, Duration::from_millis(10)),
        });

        let ctx = context("bay-1", "downtown");
        let report = handler.handle(&Invocation::new("unlock_door", &ctx)).await.unwrap();
        assert_eq!(report.outcome, ReportedOutcome::Kind(OutcomeKind::Unconfirmed));
        assert_eq!(report.notes, "Device unlock was sent but unifi did not confirm it");
        assert_eq!(report.details["target"], "unifi:unlock");
        assert_eq!(adapter.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cb.state(), CircuitState::Closed);
    }
}
