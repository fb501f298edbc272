use std::collections::HashMap;
use std::sync::Arc;

use opsdesk_devices::{DeviceAdapter, DeviceOperation};
use opsdesk_executor::ExecutorConfig;
use opsdesk_provider::{
    BookingValidator, DynActionHandler, EscalationTransport, HandlerRegistry, MessageSender,
    RequireBookingId,
};
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::circuit_breaker::{CircuitBreakerConfig, CircuitBreakerRegistry};
use crate::dispatcher::ActionDispatcher;
use crate::error::DispatcherError;
use crate::handlers::{
    DeviceActionHandler, DevicePolicy, EscalationHandler, REBOOT_PC, RESET_TRACKMAN,
    SendMessageHandler, UNLOCK_DOOR,
};
use crate::metrics::DispatcherMetrics;

/// Fluent builder for an [`ActionDispatcher`].
///
/// Built-in handlers are registered for each collaborator supplied: the
/// device actions for a device adapter, `escalate` for an escalation
/// transport and `send_message` for a message sender. Handlers added with
/// [`legacy_handler`](Self::legacy_handler) or
/// [`framework_handler`](Self::framework_handler) are registered last and
/// replace built-ins of the same action type.
pub struct ActionDispatcherBuilder {
    executor_config: ExecutorConfig,
    breaker_defaults: CircuitBreakerConfig,
    breaker_overrides: HashMap<String, CircuitBreakerConfig>,
    device_adapter: Option<Arc<dyn DeviceAdapter>>,
    device_policy: DevicePolicy,
    booking_validator: Option<Arc<dyn BookingValidator>>,
    escalation: Option<Arc<dyn EscalationTransport>>,
    message_sender: Option<Arc<dyn MessageSender>>,
    legacy: Vec<Arc<dyn DynActionHandler>>,
    framework: Vec<Arc<dyn DynActionHandler>>,
    auto_escalate: bool,
    event_capacity: usize,
}

impl ActionDispatcherBuilder {
    pub fn new() -> Self {
        Self {
            executor_config: ExecutorConfig::default(),
            breaker_defaults: CircuitBreakerConfig::default(),
            breaker_overrides: HashMap::new(),
            device_adapter: None,
            device_policy: DevicePolicy::default(),
            booking_validator: None,
            escalation: None,
            message_sender: None,
            legacy: Vec::new(),
            framework: Vec::new(),
            auto_escalate: true,
            event_capacity: 256,
        }
    }

    /// Timeout and retry defaults for legacy handlers.
    #[must_use]
    pub fn executor_config(mut self, config: ExecutorConfig) -> Self {
        self.executor_config = config;
        self
    }

    /// Breaker settings used for every target without an override.
    #[must_use]
    pub fn circuit_breaker_defaults(mut self, config: CircuitBreakerConfig) -> Self {
        self.breaker_defaults = config;
        self
    }

    /// Breaker settings for one target (`vendor:operation`).
    #[must_use]
    pub fn circuit_breaker(mut self, target: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        self.breaker_overrides.insert(target.into(), config);
        self
    }

    #[must_use]
    pub fn device_adapter(mut self, adapter: Arc<dyn DeviceAdapter>) -> Self {
        self.device_adapter = Some(adapter);
        self
    }

    /// Timeout and retries the device handlers apply around vendor calls.
    #[must_use]
    pub fn device_policy(mut self, policy: DevicePolicy) -> Self {
        self.device_policy = policy;
        self
    }

    /// Validator consulted before unlocking doors. Defaults to
    /// [`RequireBookingId`].
    #[must_use]
    pub fn booking_validator(mut self, validator: Arc<dyn BookingValidator>) -> Self {
        self.booking_validator = Some(validator);
        self
    }

    #[must_use]
    pub fn escalation_transport(mut self, transport: Arc<dyn EscalationTransport>) -> Self {
        self.escalation = Some(transport);
        self
    }

    #[must_use]
    pub fn message_sender(mut self, sender: Arc<dyn MessageSender>) -> Self {
        self.message_sender = Some(sender);
        self
    }

    #[must_use]
    pub fn legacy_handler(mut self, handler: Arc<dyn DynActionHandler>) -> Self {
        self.legacy.push(handler);
        self
    }

    #[must_use]
    pub fn framework_handler(mut self, handler: Arc<dyn DynActionHandler>) -> Self {
        self.framework.push(handler);
        self
    }

    /// Escalate `failed` and `partial` outcomes automatically (default on).
    #[must_use]
    pub fn auto_escalate(mut self, enabled: bool) -> Self {
        self.auto_escalate = enabled;
        self
    }

    /// Buffer size of the dispatch event channel.
    #[must_use]
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    fn breaker_config(&self, target: &str) -> CircuitBreakerConfig {
        self.breaker_overrides
            .get(target)
            .cloned()
            .unwrap_or_else(|| self.breaker_defaults.clone())
    }

    /// Validate the configuration and build the dispatcher.
    pub fn build(self) -> Result<ActionDispatcher, DispatcherError> {
        self.breaker_defaults
            .validate()
            .map_err(|e| DispatcherError::Configuration(format!("circuit breaker defaults: {e}")))?;
        for (target, config) in &self.breaker_overrides {
            config
                .validate()
                .map_err(|e| DispatcherError::Configuration(format!("circuit breaker {target}: {e}")))?;
        }
        if self.event_capacity == 0 {
            return Err(DispatcherError::Configuration(
                "event_capacity must be >= 1".into(),
            ));
        }

        let mut breakers = CircuitBreakerRegistry::new();
        let mut handlers = HandlerRegistry::new();

        if let Some(adapter) = &self.device_adapter {
            let booking = self
                .booking_validator
                .clone()
                .unwrap_or_else(|| Arc::new(RequireBookingId) as Arc<dyn BookingValidator>);
            for (action_type, operation) in [
                (RESET_TRACKMAN, DeviceOperation::Reset),
                (REBOOT_PC, DeviceOperation::Reboot),
                (UNLOCK_DOOR, DeviceOperation::Unlock),
            ] {
                let target = operation.breaker_target();
                let breaker = breakers.register(target.clone(), self.breaker_config(&target));
                let mut handler =
                    DeviceActionHandler::new(action_type, operation, Arc::clone(adapter), breaker)
                        .with_policy(self.device_policy.clone());
                if operation == DeviceOperation::Unlock {
                    handler = handler.with_booking_validator(Arc::clone(&booking));
                }
                handlers.register_framework(Arc::new(handler));
            }
        }

        for target in self.breaker_overrides.keys() {
            if breakers.get(target).is_none() {
                warn!(%target, "circuit breaker override for a target no handler uses");
            }
        }

        if let Some(transport) = self.escalation {
            handlers.register_legacy(Arc::new(EscalationHandler::new(transport)));
        }
        if let Some(sender) = self.message_sender {
            handlers.register_legacy(Arc::new(SendMessageHandler::new(sender)));
        }
        for handler in self.legacy {
            handlers.register_legacy(handler);
        }
        for handler in self.framework {
            handlers.register_framework(handler);
        }

        let (events, _) = broadcast::channel(self.event_capacity);
        info!(
            handlers = handlers.len(),
            breakers = breakers.len(),
            auto_escalate = self.auto_escalate,
            "action dispatcher built"
        );

        Ok(ActionDispatcher {
            handlers,
            breakers: Arc::new(breakers),
            executor: self.executor_config,
            metrics: Arc::new(DispatcherMetrics::default()),
            events,
            auto_escalate: self.auto_escalate,
        })
    }
}

impl Default for ActionDispatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use opsdesk_devices::{DeviceAdapterConfig, DeviceDirectory, RemoteDeviceAdapter};
    use opsdesk_provider::{HandlerKind, LogEscalationTransport, LogMessageSender};

    use super::*;

    fn adapter() -> Arc<dyn DeviceAdapter> {
        Arc::new(RemoteDeviceAdapter::simulated(
            DeviceDirectory::new(),
            DeviceAdapterConfig::default(),
        ))
    }

    #[test]
    fn empty_builder_has_no_handlers() {
        let dispatcher = ActionDispatcher::builder().build().unwrap();
        assert!(dispatcher.handlers().is_empty());
        assert!(dispatcher.circuit_breakers().is_empty());
    }

    #[test]
    fn registers_builtins_for_collaborators() {
        let dispatcher = ActionDispatcher::builder()
            .device_adapter(adapter())
            .escalation_transport(Arc::new(LogEscalationTransport))
            .message_sender(Arc::new(LogMessageSender))
            .build()
            .unwrap();

        let handlers = dispatcher.handlers();
        let names: Vec<&str> = handlers.iter().map(|h| h.action_type.as_str()).collect();
        assert_eq!(
            names,
            vec!["escalate", "reboot_pc", "reset_trackman", "send_message", "unlock_door"]
        );
        let kind_of = |name: &str| handlers.iter().find(|h| h.action_type == name).map(|h| h.kind);
        assert_eq!(kind_of("reset_trackman"), Some(HandlerKind::Framework));
        assert_eq!(kind_of("escalate"), Some(HandlerKind::Legacy));

        assert_eq!(
            dispatcher.circuit_breakers().targets(),
            vec!["ninjaone:reboot", "ninjaone:reset", "unifi:unlock"]
        );
    }

    #[test]
    fn per_target_override_applies() {
        let dispatcher = ActionDispatcher::builder()
            .device_adapter(adapter())
            .circuit_breaker(
                "unifi:unlock",
                CircuitBreakerConfig {
                    failure_threshold: 2,
                    reset_timeout: Duration::from_secs(5),
                },
            )
            .build()
            .unwrap();
        let breakers = dispatcher.circuit_breakers();
        assert_eq!(breakers.get("unifi:unlock").unwrap().config().failure_threshold, 2);
        assert_eq!(breakers.get("ninjaone:reset").unwrap().config().failure_threshold, 5);
    }

    #[test]
    fn invalid_breaker_config_is_rejected() {
        let err = ActionDispatcher::builder()
            .circuit_breaker_defaults(CircuitBreakerConfig {
                failure_threshold: 0,
                reset_timeout: Duration::from_secs(5),
            })
            .build()
            .unwrap_err();
        assert!(matches!(err, DispatcherError::Configuration(_)));
    }

    #[test]
    fn zero_event_capacity_is_rejected() {
        assert!(ActionDispatcher::builder().event_capacity(0).build().is_err());
    }
}
