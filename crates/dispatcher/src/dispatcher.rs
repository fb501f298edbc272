use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::FutureExt;
use opsdesk_core::{
    ActionContext, ActionRequest, ActionResult, CircuitBreakerStatus, DispatchEvent, OutcomeKind,
    SopConfig,
};
use opsdesk_executor::{ExecutorConfig, run_with_timeout_cancellable, with_retry};
use opsdesk_provider::{
    DynActionHandler, HandlerError, HandlerInfo, HandlerRegistry, HandlerReport, Invocation,
    RegisteredHandler,
};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::builder::ActionDispatcherBuilder;
use crate::circuit_breaker::CircuitBreakerRegistry;
use crate::handlers::ESCALATE;
use crate::metrics::{DispatcherMetrics, MetricsSnapshot};

/// Registered handlers, breaker states and counters, for operators.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub handlers: Vec<HandlerInfo>,
    pub circuit_breakers: Vec<CircuitBreakerStatus>,
    pub metrics: MetricsSnapshot,
}

/// The public entry point of the action framework.
///
/// Resolves an action type to its handler, bounds legacy handlers with a
/// timeout inside a retry loop, normalizes whatever the handler reports
/// into an [`ActionResult`], and emits a [`DispatchEvent`]. Dispatching
/// never fails: every path ends in a result.
///
/// Dispatches share no mutable state apart from the circuit breakers and
/// the metrics, so they can run concurrently. Dispatches for the same
/// thread are not serialized here; callers that need that must hold their
/// own per-thread lock.
pub struct ActionDispatcher {
    pub(crate) handlers: HandlerRegistry,
    pub(crate) breakers: Arc<CircuitBreakerRegistry>,
    pub(crate) executor: ExecutorConfig,
    pub(crate) metrics: Arc<DispatcherMetrics>,
    pub(crate) events: broadcast::Sender<DispatchEvent>,
    pub(crate) auto_escalate: bool,
}

impl ActionDispatcher {
    pub fn builder() -> ActionDispatcherBuilder {
        ActionDispatcherBuilder::new()
    }

    /// Dispatch one action.
    ///
    /// When automatic escalation is on, a `failed` or `partial` outcome of
    /// any action other than `escalate` triggers an escalation whose result
    /// is attached under `details.escalation`.
    #[instrument(name = "dispatch", skip(self, context), fields(thread_id = %context.thread.id))]
    pub async fn execute(&self, action_type: &str, context: &ActionContext) -> ActionResult {
        let result = self.run(action_type, context).await;
        self.finish(action_type, context, result).await
    }

    pub async fn dispatch(&self, request: &ActionRequest) -> ActionResult {
        self.execute(&request.action_type, &request.context).await
    }

    /// Run the thread's SOP: its primary action, then its fallback action
    /// if the primary one failed.
    ///
    /// When the fallback runs, its result is returned with
    /// `details.fallback_from` naming the primary action and
    /// `details.primary` holding the primary result.
    #[instrument(skip(self, context), fields(thread_id = %context.thread.id))]
    pub async fn execute_sop(&self, context: &ActionContext) -> ActionResult {
        let Some(sop) = context.sop.as_ref() else {
            return ActionResult::failed("No SOP attached to this thread");
        };

        let primary = self.run(&sop.primary_action, context).await;
        let fallback = match sop.fallback_action.as_deref() {
            Some(fallback) if primary.outcome == OutcomeKind::Failed => fallback,
            _ => return self.finish(&sop.primary_action, context, primary).await,
        };

        info!(
            sop_id = %sop.id,
            primary = %sop.primary_action,
            fallback,
            "primary action failed, running fallback"
        );
        self.metrics.increment_fallbacks();
        let result = self
            .run(fallback, context)
            .await
            .with_detail("fallback_from", sop.primary_action.as_str())
            .with_detail(
                "primary",
                serde_json::json!({ "outcome": primary.outcome, "notes": primary.notes }),
            );
        self.finish(fallback, context, result).await
    }

    /// Subscribe to dispatch events. Events sent while nobody listens are
    /// dropped.
    pub fn subscribe(&self) -> broadcast::Receiver<DispatchEvent> {
        self.events.subscribe()
    }

    /// Registered handlers sorted by action type.
    pub fn handlers(&self) -> Vec<HandlerInfo> {
        self.handlers.list()
    }

    pub fn circuit_breakers(&self) -> &CircuitBreakerRegistry {
        &self.breakers
    }

    pub fn metrics(&self) -> &DispatcherMetrics {
        &self.metrics
    }

    pub fn health(&self) -> HealthReport {
        HealthReport {
            handlers: self.handlers.list(),
            circuit_breakers: self.breakers.statuses(),
            metrics: self.metrics.snapshot(),
        }
    }

    /// Resolve and run a handler, producing a normalized result.
    async fn run(&self, action_type: &str, context: &ActionContext) -> ActionResult {
        self.metrics.increment_dispatched();

        let result = match self.handlers.get(action_type) {
            None => {
                warn!(action_type, "unknown action type");
                self.metrics.increment_unknown_actions();
                ActionResult::failed(format!("Unknown action type: {action_type}"))
            }
            Some(RegisteredHandler::Framework(handler)) => {
                self.run_framework(&handler, action_type, context).await
            }
            Some(RegisteredHandler::Legacy(handler)) => {
                self.run_legacy(&handler, action_type, context).await
            }
        };

        if result.detail("circuit_open") == Some(&serde_json::Value::Bool(true)) {
            self.metrics.increment_circuit_open();
        }
        self.metrics.record_outcome(result.outcome);
        info!(action_type, outcome = %result.outcome, "dispatch completed");
        result
    }

    /// Framework handlers own their resilience and are called once.
    async fn run_framework(
        &self,
        handler: &Arc<dyn DynActionHandler>,
        action_type: &str,
        context: &ActionContext,
    ) -> ActionResult {
        let invocation = Invocation::new(action_type, context);
        match guarded(handler.handle(&invocation), &self.metrics).await {
            Ok(report) => self.normalize(action_type, report),
            Err(err) => error_result(action_type, &err, 1),
        }
    }

    /// Legacy handlers run under the timeout guard inside the retry loop,
    /// bounded by the SOP's settings or the executor defaults.
    async fn run_legacy(
        &self,
        handler: &Arc<dyn DynActionHandler>,
        action_type: &str,
        context: &ActionContext,
    ) -> ActionResult {
        let sop = context.sop.as_ref();
        let timeout = self.executor.timeout_for(sop.and_then(SopConfig::timeout));
        let policy = self.executor.policy_for(sop.and_then(|s| s.max_retries));
        debug!(
            action_type,
            timeout_secs = timeout.as_secs(),
            max_retries = policy.max_retries,
            "running legacy handler"
        );

        let parent = CancellationToken::new();
        let parent = &parent;
        let metrics = &*self.metrics;
        let outcome = with_retry(&policy, move |attempt| {
            let cancel = parent.child_token();
            async move {
                if attempt > 0 {
                    metrics.increment_retries();
                }
                let invocation = Invocation::new(action_type, context)
                    .with_attempt(attempt)
                    .with_cancel(cancel.clone());
                run_with_timeout_cancellable(
                    timeout,
                    &cancel,
                    guarded(handler.handle(&invocation), metrics),
                )
                .await
            }
        })
        .await;

        match outcome {
            Ok(report) => self.normalize(action_type, report),
            Err(err) => {
                let attempts = err.attempts();
                let last = err.into_inner();
                if last.is_timeout() {
                    self.metrics.increment_timeouts();
                    timeout_result(timeout, attempts)
                } else {
                    error_result(action_type, &last, attempts)
                }
            }
        }
    }

    /// Turn a handler report into a result, coercing unrecognized outcome
    /// strings to `unconfirmed`.
    fn normalize(&self, action_type: &str, report: HandlerReport) -> ActionResult {
        let (outcome, raw) = report.outcome.normalize();
        let raw = raw.map(str::to_owned);
        let mut result = ActionResult::new(outcome, report.notes);
        result.details = report.details;
        if let Some(raw) = raw {
            warn!(
                action_type,
                reported = %raw,
                "handler reported an unrecognized outcome, recording it as unconfirmed"
            );
            self.metrics.increment_coerced_outcomes();
            result = result.with_detail("reported_outcome", raw);
        }
        result
    }

    /// Escalate if needed and publish the dispatch event.
    async fn finish(
        &self,
        action_type: &str,
        context: &ActionContext,
        mut result: ActionResult,
    ) -> ActionResult {
        let mut escalated = false;
        if self.auto_escalate
            && result.outcome.requires_escalation()
            && action_type != ESCALATE
            && self.handlers.contains(ESCALATE)
        {
            let escalation_context = escalation_context(context, action_type, &result);
            let escalation = self.run(ESCALATE, &escalation_context).await;
            self.metrics.increment_escalations();
            result = result.with_detail(
                "escalation",
                serde_json::json!({ "outcome": escalation.outcome, "notes": escalation.notes }),
            );
            escalated = true;
        }

        let event = DispatchEvent {
            dispatch_id: uuid::Uuid::now_v7().to_string(),
            thread_id: context.thread.id.clone(),
            action_type: action_type.to_owned(),
            outcome: result.outcome,
            next_status: result.outcome.thread_status(),
            escalated,
            timestamp: Utc::now(),
        };
        // No subscribers is not an error.
        let _ = self.events.send(event);
        result
    }
}

impl std::fmt::Debug for ActionDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionDispatcher")
            .field("handlers", &self.handlers)
            .field("breakers", &self.breakers)
            .field("executor", &self.executor)
            .field("auto_escalate", &self.auto_escalate)
            .finish_non_exhaustive()
    }
}

/// Run a handler future, converting a panic into an error.
async fn guarded<F>(future: F, metrics: &DispatcherMetrics) -> Result<HandlerReport, HandlerError>
where
    F: Future<Output = Result<HandlerReport, HandlerError>>,
{
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => {
            metrics.increment_panics();
            let message = panic_message(panic.as_ref());
            warn!(panic = %message, "handler panicked");
            Err(HandlerError::ExecutionFailed(format!("handler panicked: {message}")))
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_owned()
    }
}

fn attempts_label(attempts: u32) -> String {
    if attempts == 1 {
        "1 attempt".to_owned()
    } else {
        format!("{attempts} attempts")
    }
}

fn timeout_result(timeout: Duration, attempts: u32) -> ActionResult {
    ActionResult::failed(format!(
        "Action timed out after {}s ({})",
        timeout.as_secs(),
        attempts_label(attempts)
    ))
    .with_detail("timeout_seconds", timeout.as_secs())
    .with_detail("attempts", attempts)
}

fn error_result(action_type: &str, err: &HandlerError, attempts: u32) -> ActionResult {
    if let HandlerError::Unconfirmed(msg) = err {
        return ActionResult::unconfirmed(format!("{action_type} sent but not confirmed: {msg}"))
            .with_detail("error", err.to_string())
            .with_detail("attempts", attempts);
    }
    let notes = match err {
        HandlerError::Configuration(msg) => msg.clone(),
        other if attempts > 1 => {
            format!("{action_type} failed after {}: {other}", attempts_label(attempts))
        }
        other => format!("{action_type} failed: {other}"),
    };
    let mut result = ActionResult::failed(notes)
        .with_detail("error", err.to_string())
        .with_detail("attempts", attempts);
    if matches!(err, HandlerError::CircuitOpen { .. }) {
        result = result.with_detail("circuit_open", true);
    }
    result
}

/// Context for an automatic escalation: the original context with the
/// reason and the source action filled in.
fn escalation_context(
    context: &ActionContext,
    action_type: &str,
    result: &ActionResult,
) -> ActionContext {
    let reason = format!("{action_type} {}: {}", result.outcome, result.notes);
    context
        .clone()
        .with_parameter("reason", reason)
        .with_parameter("source_action", action_type)
}
