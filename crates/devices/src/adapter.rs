use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use opsdesk_core::DeviceIdentity;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::config::{DeviceAdapterConfig, NinjaOneConfig, UnifiConfig};
use crate::directory::DeviceDirectory;
use crate::error::DeviceError;
use crate::ninjaone::NinjaOneClient;
use crate::unifi::UnifiAccessClient;

/// A physical operation the adapter can perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceOperation {
    /// Restart the launch-monitor software on a bay PC.
    Reset,
    /// Reboot a bay PC.
    Reboot,
    /// Unlock a door.
    Unlock,
}

impl DeviceOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Reset => "reset",
            Self::Reboot => "reboot",
            Self::Unlock => "unlock",
        }
    }

    /// Vendor API serving the operation.
    pub fn vendor(self) -> &'static str {
        match self {
            Self::Reset | Self::Reboot => "ninjaone",
            Self::Unlock => "unifi",
        }
    }

    /// Circuit breaker key for the operation, `vendor:operation`.
    pub fn breaker_target(self) -> String {
        format!("{}:{}", self.vendor(), self.as_str())
    }
}

impl fmt::Display for DeviceOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a device operation achieved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceActionOutcome {
    pub operation: DeviceOperation,
    pub device: DeviceIdentity,
    /// `true` when no vendor API was called.
    pub simulated: bool,
    /// Unlock validity window; only set for door unlocks.
    #[serde(skip_serializing_if = "Option::is_none", with = "duration_secs")]
    pub duration: Option<Duration>,
    /// Staff-facing summary.
    pub message: String,
}

mod duration_secs {
    use std::time::Duration;

    use serde::Serializer;

    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match d {
            Some(d) => s.serialize_u64(d.as_secs()),
            None => s.serialize_none(),
        }
    }
}

/// Performs reset / unlock / reboot for a bay at a location.
#[async_trait]
pub trait DeviceAdapter: Send + Sync {
    async fn reset_device(
        &self,
        bay_id: &str,
        location: &str,
    ) -> Result<DeviceActionOutcome, DeviceError>;

    async fn unlock_door(
        &self,
        bay_id: &str,
        location: &str,
    ) -> Result<DeviceActionOutcome, DeviceError>;

    async fn reboot_device(
        &self,
        bay_id: &str,
        location: &str,
    ) -> Result<DeviceActionOutcome, DeviceError>;

    /// Whether `operation` calls a real vendor API.
    fn is_live(&self, operation: DeviceOperation) -> bool;
}

/// Device adapter backed by the static directory and, when credentials
/// are configured, the NinjaOne and UniFi Access APIs.
///
/// Each vendor runs live only if its client is set; otherwise its
/// operations are simulated and always succeed.
#[derive(Debug, Clone)]
pub struct RemoteDeviceAdapter {
    directory: Arc<DeviceDirectory>,
    config: DeviceAdapterConfig,
    ninjaone: Option<NinjaOneClient>,
    unifi: Option<UnifiAccessClient>,
}

impl RemoteDeviceAdapter {
    /// Create a fully simulated adapter.
    pub fn simulated(directory: DeviceDirectory, config: DeviceAdapterConfig) -> Self {
        Self {
            directory: Arc::new(directory),
            config,
            ninjaone: None,
            unifi: None,
        }
    }

    /// Create an adapter with live vendors for the credentials given.
    pub fn new(
        directory: DeviceDirectory,
        config: DeviceAdapterConfig,
        ninjaone: Option<NinjaOneConfig>,
        unifi: Option<UnifiConfig>,
    ) -> Result<Self, DeviceError> {
        let client = Client::builder().timeout(config.call_timeout).build()?;
        Ok(Self {
            ninjaone: ninjaone.map(|c| NinjaOneClient::new(c, client.clone())),
            unifi: unifi.map(|c| UnifiAccessClient::new(c, client)),
            ..Self::simulated(directory, config)
        })
    }

    pub fn directory(&self) -> &DeviceDirectory {
        &self.directory
    }

    fn resolve_bay(&self, bay_id: &str, location: &str) -> Result<DeviceIdentity, DeviceError> {
        self.directory
            .bay_device(location, bay_id)
            .cloned()
            .ok_or_else(|| DeviceError::NotFound {
                location: location.to_owned(),
                bay_id: bay_id.to_owned(),
            })
    }

    fn resolve_door(&self, bay_id: &str, location: &str) -> Result<DeviceIdentity, DeviceError> {
        self.directory
            .door(location, bay_id)
            .cloned()
            .ok_or_else(|| DeviceError::DoorNotFound {
                location: location.to_owned(),
                bay_id: bay_id.to_owned(),
            })
    }

    async fn simulate(&self, operation: DeviceOperation, device: DeviceIdentity) -> DeviceActionOutcome {
        if !self.config.simulated_latency.is_zero() {
            tokio::time::sleep(self.config.simulated_latency).await;
        }
        debug!(%operation, device_id = %device.device_id, "simulated device operation");
        let duration = (operation == DeviceOperation::Unlock).then_some(self.config.unlock_duration);
        outcome(operation, device, true, duration)
    }
}

fn outcome(
    operation: DeviceOperation,
    device: DeviceIdentity,
    simulated: bool,
    duration: Option<Duration>,
) -> DeviceActionOutcome {
    let verb = match operation {
        DeviceOperation::Reset => "reset",
        DeviceOperation::Reboot => "rebooted",
        DeviceOperation::Unlock => "unlocked",
    };
    let mut message = format!("{} {verb}", device.display_name);
    if let Some(d) = duration {
        message.push_str(&format!(" for {}s", d.as_secs()));
    }
    if simulated {
        message.push_str(" (simulated)");
    }
    DeviceActionOutcome {
        operation,
        device,
        simulated,
        duration,
        message,
    }
}

#[async_trait]
impl DeviceAdapter for RemoteDeviceAdapter {
    #[instrument(skip(self))]
    async fn reset_device(
        &self,
        bay_id: &str,
        location: &str,
    ) -> Result<DeviceActionOutcome, DeviceError> {
        let device = self.resolve_bay(bay_id, location)?;
        let Some(ninja) = &self.ninjaone else {
            return Ok(self.simulate(DeviceOperation::Reset, device).await);
        };
        ninja.run_reset_script(&device.device_id).await?;
        info!(device_id = %device.device_id, "device reset requested");
        Ok(outcome(DeviceOperation::Reset, device, false, None))
    }

    #[instrument(skip(self))]
    async fn unlock_door(
        &self,
        bay_id: &str,
        location: &str,
    ) -> Result<DeviceActionOutcome, DeviceError> {
        let door = self.resolve_door(bay_id, location)?;
        let Some(unifi) = &self.unifi else {
            return Ok(self.simulate(DeviceOperation::Unlock, door).await);
        };
        unifi.unlock(&door.device_id).await?;
        info!(door_id = %door.device_id, "door unlocked");
        Ok(outcome(
            DeviceOperation::Unlock,
            door,
            false,
            Some(self.config.unlock_duration),
        ))
    }

    #[instrument(skip(self))]
    async fn reboot_device(
        &self,
        bay_id: &str,
        location: &str,
    ) -> Result<DeviceActionOutcome, DeviceError> {
        let device = self.resolve_bay(bay_id, location)?;
        let Some(ninja) = &self.ninjaone else {
            return Ok(self.simulate(DeviceOperation::Reboot, device).await);
        };
        ninja.reboot(&device.device_id).await?;
        info!(device_id = %device.device_id, "device reboot requested");
        Ok(outcome(DeviceOperation::Reboot, device, false, None))
    }

    fn is_live(&self, operation: DeviceOperation) -> bool {
        match operation {
            DeviceOperation::Reset | DeviceOperation::Reboot => self.ninjaone.is_some(),
            DeviceOperation::Unlock => self.unifi.is_some(),
        }
    }
}
