use std::time::Duration;

use serde::{Deserialize, Serialize};

/// The customer thread an action is being taken for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadContext {
    /// Thread identifier.
    pub id: String,
    /// Location (site) the thread belongs to.
    pub location: String,
    /// Bay the customer is in, when known.
    #[serde(default)]
    pub bay_id: Option<String>,
    /// Reference to the customer (phone number, CRM id, ...).
    #[serde(default)]
    pub customer_ref: Option<String>,
    /// Correlation id propagated into logs and vendor calls.
    #[serde(default)]
    pub correlation_id: Option<String>,
}

impl ThreadContext {
    /// Create a thread context for a location with no bay.
    pub fn new(id: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            location: location.into(),
            bay_id: None,
            customer_ref: None,
            correlation_id: None,
        }
    }

    #[must_use]
    pub fn with_bay(mut self, bay_id: impl Into<String>) -> Self {
        self.bay_id = Some(bay_id.into());
        self
    }

    #[must_use]
    pub fn with_customer(mut self, customer_ref: impl Into<String>) -> Self {
        self.customer_ref = Some(customer_ref.into());
        self
    }

    #[must_use]
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }
}

/// Pre-approved automated procedure attached to a thread.
///
/// The framework consumes SOPs but never stores them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SopConfig {
    /// SOP identifier.
    pub id: String,
    /// Display name shown to staff.
    #[serde(default)]
    pub name: String,
    /// Per-attempt timeout for legacy handlers.
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
    /// Retry budget for legacy handlers.
    #[serde(default)]
    pub max_retries: Option<u32>,
    /// Action type run first.
    pub primary_action: String,
    /// Action type run when the primary action fails.
    #[serde(default)]
    pub fallback_action: Option<String>,
}

impl SopConfig {
    pub fn new(id: impl Into<String>, primary_action: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            timeout_seconds: None,
            max_retries: None,
            primary_action: primary_action.into(),
            fallback_action: None,
        }
    }

    #[must_use]
    pub fn with_timeout_seconds(mut self, seconds: u64) -> Self {
        self.timeout_seconds = Some(seconds);
        self
    }

    #[must_use]
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    #[must_use]
    pub fn with_fallback(mut self, action_type: impl Into<String>) -> Self {
        self.fallback_action = Some(action_type.into());
        self
    }

    /// Configured per-attempt timeout, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_seconds.map(Duration::from_secs)
    }
}

/// Everything a handler needs, loaded by the caller before dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionContext {
    /// The thread the action is taken for.
    pub thread: ThreadContext,
    /// SOP driving the action, when automated.
    #[serde(default)]
    pub sop: Option<SopConfig>,
    /// Active booking, used by door access checks.
    #[serde(default)]
    pub booking_id: Option<String>,
    /// Free-form action parameters (message text, escalation reason, ...).
    #[serde(default)]
    pub parameters: serde_json::Map<String, serde_json::Value>,
}

impl ActionContext {
    pub fn new(thread: ThreadContext) -> Self {
        Self {
            thread,
            sop: None,
            booking_id: None,
            parameters: serde_json::Map::new(),
        }
    }

    #[must_use]
    pub fn with_sop(mut self, sop: SopConfig) -> Self {
        self.sop = Some(sop);
        self
    }

    #[must_use]
    pub fn with_booking(mut self, booking_id: impl Into<String>) -> Self {
        self.booking_id = Some(booking_id.into());
        self
    }

    #[must_use]
    pub fn with_parameter(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// String parameter lookup.
    pub fn parameter_str(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).and_then(serde_json::Value::as_str)
    }
}

/// A symbolic action request. Immutable once dispatched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    /// Action type discriminator (e.g. `reset_trackman`, `unlock_door`).
    pub action_type: String,
    /// Context loaded for the action.
    pub context: ActionContext,
}

impl ActionRequest {
    pub fn new(action_type: impl Into<String>, context: ActionContext) -> Self {
        Self {
            action_type: action_type.into(),
            context,
        }
    }
}
