use std::time::Duration;

/// Settings shared by all device operations.
#[derive(Debug, Clone)]
pub struct DeviceAdapterConfig {
    /// Validity window reported for a simulated door unlock.
    pub unlock_duration: Duration,
    /// Artificial delay applied to simulated operations.
    pub simulated_latency: Duration,
    /// Per-request timeout of the vendor HTTP clients.
    pub call_timeout: Duration,
}

impl Default for DeviceAdapterConfig {
    fn default() -> Self {
        Self {
            unlock_duration: Duration::from_secs(30),
            simulated_latency: Duration::ZERO,
            call_timeout: Duration::from_secs(10),
        }
    }
}

/// Credentials for the NinjaOne RMM API.
#[derive(Clone)]
pub struct NinjaOneConfig {
    /// API token.
    pub token: String,
    /// Base URL of the NinjaOne API.
    pub base_url: String,
    /// Script run on a bay PC to restart the launch-monitor software.
    pub reset_script_id: String,
}

impl std::fmt::Debug for NinjaOneConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NinjaOneConfig")
            .field("token", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("reset_script_id", &self.reset_script_id)
            .finish()
    }
}

impl NinjaOneConfig {
    /// Uses the default NinjaOne base URL (`https://app.ninjarmm.com`).
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            base_url: "https://app.ninjarmm.com".to_owned(),
            reset_script_id: "trackman-reset".to_owned(),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    #[must_use]
    pub fn with_reset_script_id(mut self, id: impl Into<String>) -> Self {
        self.reset_script_id = id.into();
        self
    }
}

/// Credentials for a UniFi Access controller.
#[derive(Clone)]
pub struct UnifiConfig {
    pub token: String,
    /// Base URL of the controller, e.g. `https://10.0.0.2:12445`.
    pub base_url: String,
}

impl std::fmt::Debug for UnifiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnifiConfig")
            .field("token", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl UnifiConfig {
    pub fn new(token: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            base_url: base_url.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = DeviceAdapterConfig::default();
        assert_eq!(config.unlock_duration, Duration::from_secs(30));
        assert_eq!(config.simulated_latency, Duration::ZERO);
        assert_eq!(config.call_timeout, Duration::from_secs(10));

        let ninja = NinjaOneConfig::new("tok");
        assert_eq!(ninja.base_url, "https://app.ninjarmm.com");
        assert_eq!(ninja.reset_script_id, "trackman-reset");
    }

    #[test]
    fn debug_redacts_tokens() {
        let ninja = format!("{:?}", NinjaOneConfig::new("ninja-secret-value"));
        assert!(ninja.contains("[REDACTED]"));
        assert!(!ninja.contains("ninja-secret-value"));

        let unifi = format!("{:?}", UnifiConfig::new("unifi-secret-value", "https://door"));
        assert!(unifi.contains("[REDACTED]"));
        assert!(!unifi.contains("unifi-secret-value"));
    }
}
