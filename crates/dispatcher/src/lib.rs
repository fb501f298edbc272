//! Action dispatcher: the public entry point of the opsdesk action
//! framework.
//!
//! Build an [`ActionDispatcher`] with [`ActionDispatcher::builder`], then
//! call [`ActionDispatcher::execute`] with an action type and a loaded
//! [`ActionContext`](opsdesk_core::ActionContext).

pub mod builder;
pub mod circuit_breaker;
pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod metrics;

pub use builder::ActionDispatcherBuilder;
pub use circuit_breaker::{
    Admission, CircuitBreaker, CircuitBreakerConfig, CircuitBreakerRegistry, CircuitState,
};
pub use dispatcher::{ActionDispatcher, HealthReport};
pub use error::DispatcherError;
pub use handlers::{DeviceActionHandler, DevicePolicy, EscalationHandler, SendMessageHandler};
pub use metrics::{DispatcherMetrics, MetricsSnapshot};
