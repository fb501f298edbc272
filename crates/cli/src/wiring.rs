use std::sync::Arc;

use anyhow::Context;
use opsdesk_devices::RemoteDeviceAdapter;
use opsdesk_dispatcher::ActionDispatcher;
use opsdesk_provider::{EscalationTransport, LogEscalationTransport, LogMessageSender};
use opsdesk_slack::SlackEscalationTransport;
use tracing::info;

use crate::config::{EscalationKind, OpsdeskConfig};

/// Build a dispatcher with every built-in handler from configuration.
pub fn build_dispatcher(config: &OpsdeskConfig) -> anyhow::Result<ActionDispatcher> {
    let ninjaone = config.vendors.ninjaone.to_config();
    let unifi = config.vendors.unifi.to_config();
    info!(
        ninjaone_live = ninjaone.is_some(),
        unifi_live = unifi.is_some(),
        bays = config.devices.bays.len(),
        doors = config.devices.doors.len(),
        "configuring device adapter"
    );
    let adapter = RemoteDeviceAdapter::new(
        config.devices.directory(),
        config.devices.adapter_config(),
        ninjaone,
        unifi,
    )
    .context("failed to build device adapter")?;

    let escalation: Arc<dyn EscalationTransport> = match config.escalation.kind {
        EscalationKind::Log => Arc::new(LogEscalationTransport),
        EscalationKind::Slack => {
            let slack = config
                .escalation
                .slack_config()
                .map_err(anyhow::Error::msg)?;
            Arc::new(SlackEscalationTransport::new(slack).context("failed to build slack client")?)
        }
    };

    let mut builder = ActionDispatcher::builder()
        .executor_config(config.executor.to_executor_config())
        .circuit_breaker_defaults(config.circuit_breaker.defaults())
        .device_adapter(Arc::new(adapter))
        .escalation_transport(escalation)
        .message_sender(Arc::new(LogMessageSender))
        .auto_escalate(config.dispatcher.auto_escalate);
    for (target, breaker) in config.circuit_breaker.overrides() {
        builder = builder.circuit_breaker(target, breaker);
    }

    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use opsdesk_provider::HandlerKind;

    use super::*;

    #[test]
    fn default_config_registers_all_built_ins() {
        let dispatcher = build_dispatcher(&OpsdeskConfig::default()).unwrap();
        let handlers = dispatcher.handlers();
        let types: Vec<_> = handlers.iter().map(|h| h.action_type.as_str()).collect();
        assert_eq!(
            types,
            [
                "escalate",
                "reboot_pc",
                "reset_trackman",
                "send_message",
                "unlock_door"
            ]
        );
        let unlock = handlers
            .iter()
            .find(|h| h.action_type == "unlock_door")
            .unwrap();
        assert_eq!(unlock.kind, HandlerKind::Framework);
        assert_eq!(dispatcher.circuit_breakers().len(), 3);
    }

    #[test]
    fn breaker_overrides_reach_the_dispatcher() {
        let config = OpsdeskConfig::from_toml(
            r#"
            [circuit_breaker.targets."ninjaone:reset"]
            failure_threshold = 2
            "#,
        )
        .unwrap();
        let dispatcher = build_dispatcher(&config).unwrap();
        let breaker = dispatcher
            .circuit_breakers()
            .get("ninjaone:reset")
            .unwrap();
        assert_eq!(breaker.config().failure_threshold, 2);
    }
}
