//! TOML configuration for the `opsdesk` binary.
//!
//! Every section is optional. An empty file yields a dispatcher with
//! simulated devices and log-only escalation.
//!
//! ```toml
//! [executor]
//! default_timeout_seconds = 30
//! max_retries = 2
//!
//! [circuit_breaker]
//! failure_threshold = 5
//! reset_timeout_seconds = 60
//!
//! [circuit_breaker.targets."unifi:unlock"]
//! failure_threshold = 3
//!
//! [[devices.bays]]
//! location = "downtown"
//! bay_id = "1"
//! device_id = "ninja-1042"
//! display_name = "Bay 1 PC"
//!
//! [vendors.unifi]
//! base_url = "https://unifi.downtown.example:12445"
//!
//! [escalation]
//! type = "slack"
//! channel = "#ops-escalations"
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use opsdesk_devices::{
    DeviceAdapterConfig, DeviceDirectory, DeviceMapping, NinjaOneConfig, UnifiConfig,
};
use opsdesk_dispatcher::CircuitBreakerConfig;
use opsdesk_executor::{ExecutorConfig, RetryStrategy};
use opsdesk_slack::SlackConfig;
use serde::Deserialize;
use thiserror::Error;

pub const NINJAONE_TOKEN_ENV: &str = "OPSDESK_NINJAONE_TOKEN";
pub const UNIFI_TOKEN_ENV: &str = "OPSDESK_UNIFI_TOKEN";
pub const SLACK_TOKEN_ENV: &str = "OPSDESK_SLACK_TOKEN";

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Root of the configuration file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct OpsdeskConfig {
    pub executor: ExecutorSection,
    pub circuit_breaker: CircuitBreakerSection,
    pub devices: DevicesSection,
    pub vendors: VendorsSection,
    pub escalation: EscalationSection,
    pub dispatcher: DispatcherSection,
}

impl OpsdeskConfig {
    /// Load from `path`, or use defaults when no path is given. Vendor
    /// tokens found in the environment override the file.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_toml(&raw)?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Fill vendor and Slack tokens from environment variables.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(token) = lookup(NINJAONE_TOKEN_ENV) {
            self.vendors.ninjaone.token = Some(token);
        }
        if let Some(token) = lookup(UNIFI_TOKEN_ENV) {
            self.vendors.unifi.token = Some(token);
        }
        if let Some(token) = lookup(SLACK_TOKEN_ENV) {
            self.escalation.token = Some(token);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.executor.default_timeout_seconds == 0 {
            return Err(ConfigError::Invalid(
                "executor.default_timeout_seconds must be >= 1".into(),
            ));
        }
        if self.executor.base_delay_ms > self.executor.max_delay_ms {
            return Err(ConfigError::Invalid(
                "executor.base_delay_ms must not exceed executor.max_delay_ms".into(),
            ));
        }
        if self.vendors.unifi.token.is_some() && self.vendors.unifi.base_url.is_none() {
            return Err(ConfigError::Invalid(
                "vendors.unifi.base_url is required when a UniFi token is set".into(),
            ));
        }
        if self.escalation.kind == EscalationKind::Slack {
            self.escalation
                .slack_config()
                .and_then(|c| c.validate().map(|()| c))
                .map_err(|e| ConfigError::Invalid(format!("escalation: {e}")))?;
        }
        Ok(())
    }
}

/// Legacy handler defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExecutorSection {
    pub default_timeout_seconds: u64,
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for ExecutorSection {
    fn default() -> Self {
        Self {
            default_timeout_seconds: 30,
            max_retries: 2,
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
        }
    }
}

impl ExecutorSection {
    pub fn to_executor_config(&self) -> ExecutorConfig {
        ExecutorConfig {
            default_timeout: Duration::from_secs(self.default_timeout_seconds),
            max_retries: self.max_retries,
            retry_strategy: RetryStrategy::doubling(
                Duration::from_millis(self.base_delay_ms),
                Duration::from_millis(self.max_delay_ms),
            ),
        }
    }
}

/// Breaker defaults plus per-target overrides keyed by `"<vendor>:<op>"`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerSection {
    pub failure_threshold: u32,
    pub reset_timeout_seconds: u64,
    pub targets: HashMap<String, CircuitBreakerTargetSection>,
}

impl Default for CircuitBreakerSection {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout_seconds: 60,
            targets: HashMap::new(),
        }
    }
}

/// Per-target overrides; unset fields inherit the section defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CircuitBreakerTargetSection {
    pub failure_threshold: Option<u32>,
    pub reset_timeout_seconds: Option<u64>,
}

impl CircuitBreakerSection {
    pub fn defaults(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: self.failure_threshold,
            reset_timeout: Duration::from_secs(self.reset_timeout_seconds),
        }
    }

    /// Resolved override for every configured target.
    pub fn overrides(&self) -> impl Iterator<Item = (&str, CircuitBreakerConfig)> {
        self.targets.iter().map(|(target, o)| {
            let config = CircuitBreakerConfig {
                failure_threshold: o.failure_threshold.unwrap_or(self.failure_threshold),
                reset_timeout: Duration::from_secs(
                    o.reset_timeout_seconds
                        .unwrap_or(self.reset_timeout_seconds),
                ),
            };
            (target.as_str(), config)
        })
    }
}

/// Device adapter tuning and the bay/door mapping tables.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DevicesSection {
    pub unlock_duration_seconds: u64,
    pub simulated_latency_ms: u64,
    pub call_timeout_seconds: u64,
    pub bays: Vec<DeviceMapping>,
    pub doors: Vec<DeviceMapping>,
}

impl Default for DevicesSection {
    fn default() -> Self {
        Self {
            unlock_duration_seconds: 30,
            simulated_latency_ms: 0,
            call_timeout_seconds: 10,
            bays: Vec::new(),
            doors: Vec::new(),
        }
    }
}

impl DevicesSection {
    pub fn adapter_config(&self) -> DeviceAdapterConfig {
        DeviceAdapterConfig {
            unlock_duration: Duration::from_secs(self.unlock_duration_seconds),
            simulated_latency: Duration::from_millis(self.simulated_latency_ms),
            call_timeout: Duration::from_secs(self.call_timeout_seconds),
        }
    }

    pub fn directory(&self) -> DeviceDirectory {
        DeviceDirectory::from_mappings(self.bays.iter().cloned(), self.doors.iter().cloned())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VendorsSection {
    pub ninjaone: NinjaOneSection,
    pub unifi: UnifiSection,
}

#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct NinjaOneSection {
    pub base_url: Option<String>,
    pub token: Option<String>,
    pub reset_script_id: Option<String>,
}

impl std::fmt::Debug for NinjaOneSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NinjaOneSection")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("reset_script_id", &self.reset_script_id)
            .finish()
    }
}

impl NinjaOneSection {
    /// Live credentials, or `None` to run NinjaOne operations simulated.
    pub fn to_config(&self) -> Option<NinjaOneConfig> {
        let token = self.token.as_deref().filter(|t| !t.trim().is_empty())?;
        let mut config = NinjaOneConfig::new(token);
        if let Some(url) = &self.base_url {
            config = config.with_base_url(url.clone());
        }
        if let Some(id) = &self.reset_script_id {
            config = config.with_reset_script_id(id.clone());
        }
        Some(config)
    }
}

#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct UnifiSection {
    pub base_url: Option<String>,
    pub token: Option<String>,
}

impl std::fmt::Debug for UnifiSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnifiSection")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl UnifiSection {
    /// Live credentials, or `None` to run door unlocks simulated.
    pub fn to_config(&self) -> Option<UnifiConfig> {
        let token = self.token.as_deref().filter(|t| !t.trim().is_empty())?;
        let base_url = self.base_url.as_deref()?;
        Some(UnifiConfig::new(token, base_url))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EscalationKind {
    #[default]
    Log,
    Slack,
}

#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct EscalationSection {
    #[serde(rename = "type")]
    pub kind: EscalationKind,
    pub token: Option<String>,
    pub channel: Option<String>,
    pub api_base_url: Option<String>,
}

impl std::fmt::Debug for EscalationSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EscalationSection")
            .field("kind", &self.kind)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("channel", &self.channel)
            .field("api_base_url", &self.api_base_url)
            .finish()
    }
}

impl EscalationSection {
    pub fn slack_config(&self) -> Result<SlackConfig, String> {
        let token = self.token.as_deref().ok_or("slack token is not set")?;
        let channel = self.channel.as_deref().ok_or("slack channel is not set")?;
        let mut config = SlackConfig::new(token, channel);
        if let Some(url) = &self.api_base_url {
            config = config.with_api_base_url(url.clone());
        }
        Ok(config)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DispatcherSection {
    pub auto_escalate: bool,
}

impl Default for DispatcherSection {
    fn default() -> Self {
        Self {
            auto_escalate: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = OpsdeskConfig::from_toml("").unwrap();
        let executor = config.executor.to_executor_config();
        assert_eq!(executor.default_timeout, Duration::from_secs(30));
        assert_eq!(executor.max_retries, 2);
        assert_eq!(config.circuit_breaker.defaults(), CircuitBreakerConfig::default());
        assert_eq!(config.escalation.kind, EscalationKind::Log);
        assert!(config.dispatcher.auto_escalate);
        assert!(config.vendors.ninjaone.to_config().is_none());
        assert!(config.vendors.unifi.to_config().is_none());
        config.validate().unwrap();
    }

    #[test]
    fn parses_full_file() {
        let raw = r#"
            [executor]
            default_timeout_seconds = 5
            max_retries = 1
            base_delay_ms = 200
            max_delay_ms = 800

            [circuit_breaker]
            failure_threshold = 4
            reset_timeout_seconds = 30

            [circuit_breaker.targets."unifi:unlock"]
            failure_threshold = 2

            [devices]
            unlock_duration_seconds = 15

            [[devices.bays]]
            location = "downtown"
            bay_id = "1"
            device_id = "ninja-1042"
            display_name = "Bay 1 PC"

            [[devices.doors]]
            location = "downtown"
            bay_id = "1"
            device_id = "door-7"

            [vendors.ninjaone]
            token = "ninja-secret"
            reset_script_id = "tm-restart"

            [escalation]
            type = "slack"
            token = "xoxb-1"
            channel = "C123"

            [dispatcher]
            auto_escalate = false
        "#;
        let config = OpsdeskConfig::from_toml(raw).unwrap();
        config.validate().unwrap();

        assert_eq!(config.executor.to_executor_config().max_retries, 1);
        let overrides: HashMap<_, _> = config.circuit_breaker.overrides().collect();
        let unlock = &overrides["unifi:unlock"];
        assert_eq!(unlock.failure_threshold, 2);
        assert_eq!(unlock.reset_timeout, Duration::from_secs(30));

        let directory = config.devices.directory();
        assert_eq!(directory.bay_count(), 1);
        assert_eq!(directory.door_count(), 1);
        assert_eq!(
            config.devices.adapter_config().unlock_duration,
            Duration::from_secs(15)
        );

        let ninja = config.vendors.ninjaone.to_config().unwrap();
        assert_eq!(ninja.reset_script_id, "tm-restart");
        assert_eq!(config.escalation.slack_config().unwrap().channel, "C123");
        assert!(!config.dispatcher.auto_escalate);
    }

    #[test]
    fn load_reads_file_from_disk() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[dispatcher]\nauto_escalate = false").unwrap();
        let config = OpsdeskConfig::load(Some(file.path())).unwrap();
        assert!(!config.dispatcher.auto_escalate);
    }

    #[test]
    fn load_reports_missing_file() {
        let err = OpsdeskConfig::load(Some(Path::new("/nonexistent/opsdesk.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/opsdesk.toml"));
    }

    #[test]
    fn environment_tokens_override_file() {
        let mut config = OpsdeskConfig::from_toml(
            r#"
            [vendors.unifi]
            base_url = "https://unifi.local"
            token = "from-file"
            "#,
        )
        .unwrap();
        config.apply_env(|key| match key {
            UNIFI_TOKEN_ENV => Some("from-env".to_owned()),
            NINJAONE_TOKEN_ENV => Some("ninja-env".to_owned()),
            _ => None,
        });
        assert_eq!(config.vendors.unifi.to_config().unwrap().token, "from-env");
        assert!(config.vendors.ninjaone.to_config().is_some());
    }

    #[test]
    fn unifi_token_without_url_is_rejected() {
        let config = OpsdeskConfig::from_toml(
            r#"
            [vendors.unifi]
            token = "t"
            "#,
        )
        .unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn slack_escalation_requires_channel() {
        let config = OpsdeskConfig::from_toml(
            r#"
            [escalation]
            type = "slack"
            token = "xoxb-1"
            "#,
        )
        .unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("channel"));
    }

    #[test]
    fn unknown_escalation_type_fails_to_parse() {
        let err = OpsdeskConfig::from_toml("[escalation]\ntype = \"pager\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn debug_redacts_tokens() {
        let config = OpsdeskConfig::from_toml(
            r#"
            [vendors.ninjaone]
            token = "super-secret"
            [escalation]
            token = "xoxb-secret"
            "#,
        )
        .unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret"));
        assert!(!debug.contains("xoxb-secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
