use std::sync::atomic::{AtomicU64, Ordering};

use opsdesk_core::OutcomeKind;
use serde::Serialize;

/// Atomic counters tracking dispatch outcomes.
///
/// All counters use relaxed ordering. For a consistent point-in-time view,
/// call [`snapshot`](Self::snapshot).
#[derive(Debug, Default)]
pub struct DispatcherMetrics {
    /// Dispatches started, escalations and fallbacks included.
    pub dispatched: AtomicU64,
    pub succeeded: AtomicU64,
    pub partial: AtomicU64,
    pub failed: AtomicU64,
    pub unconfirmed: AtomicU64,
    /// Dispatches for an action type with no registered handler.
    pub unknown_actions: AtomicU64,
    /// Legacy dispatches that ended on a timeout.
    pub timeouts: AtomicU64,
    /// Retry attempts made by the dispatcher (first attempts excluded).
    pub retries: AtomicU64,
    /// Handler outcomes coerced to `unconfirmed`.
    pub coerced_outcomes: AtomicU64,
    /// Handler panics caught.
    pub panics: AtomicU64,
    /// Calls rejected by an open circuit breaker.
    pub circuit_open: AtomicU64,
    /// Escalations triggered automatically.
    pub escalations: AtomicU64,
    /// SOP fallback actions run.
    pub fallbacks: AtomicU64,
}

impl DispatcherMetrics {
    pub fn increment_dispatched(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a normalized outcome.
    pub fn record_outcome(&self, outcome: OutcomeKind) {
        let counter = match outcome {
            OutcomeKind::Success => &self.succeeded,
            OutcomeKind::Partial => &self.partial,
            OutcomeKind::Failed => &self.failed,
            OutcomeKind::Unconfirmed => &self.unconfirmed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_unknown_actions(&self) {
        self.unknown_actions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_timeouts(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_retries(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_coerced_outcomes(&self) {
        self.coerced_outcomes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_panics(&self) {
        self.panics.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_circuit_open(&self) {
        self.circuit_open.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_escalations(&self) {
        self.escalations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_fallbacks(&self) {
        self.fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a point-in-time snapshot of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            dispatched: self.dispatched.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            partial: self.partial.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            unconfirmed: self.unconfirmed.load(Ordering::Relaxed),
            unknown_actions: self.unknown_actions.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            coerced_outcomes: self.coerced_outcomes.load(Ordering::Relaxed),
            panics: self.panics.load(Ordering::Relaxed),
            circuit_open: self.circuit_open.load(Ordering::Relaxed),
            escalations: self.escalations.load(Ordering::Relaxed),
            fallbacks: self.fallbacks.load(Ordering::Relaxed),
        }
    }
}

/// A plain data snapshot of [`DispatcherMetrics`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub dispatched: u64,
    pub succeeded: u64,
    pub partial: u64,
    pub failed: u64,
    pub unconfirmed: u64,
    pub unknown_actions: u64,
    pub timeouts: u64,
    pub retries: u64,
    pub coerced_outcomes: u64,
    pub panics: u64,
    pub circuit_open: u64,
    pub escalations: u64,
    pub fallbacks: u64,
}
