use reqwest::Client;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::config::NinjaOneConfig;
use crate::error::DeviceError;

const VENDOR: &str = "ninjaone";

#[derive(Debug, Serialize)]
struct RunScriptRequest<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    id: &'a str,
    #[serde(rename = "runAs")]
    run_as: &'static str,
}

/// Client for the NinjaOne RMM device endpoints used on bay PCs.
#[derive(Debug, Clone)]
pub struct NinjaOneClient {
    config: NinjaOneConfig,
    client: Client,
}

impl NinjaOneClient {
    pub fn new(config: NinjaOneConfig, client: Client) -> Self {
        Self { config, client }
    }

    fn device_url(&self, device_id: &str, suffix: &str) -> String {
        format!(
            "{}/v2/device/{device_id}/{suffix}",
            self.config.base_url.trim_end_matches('/')
        )
    }

    /// Run the configured reset script on the device.
    #[instrument(skip(self), fields(vendor = VENDOR))]
    pub async fn run_reset_script(&self, device_id: &str) -> Result<(), DeviceError> {
        let url = self.device_url(device_id, "script/run");
        let request = RunScriptRequest {
            kind: "SCRIPT",
            id: &self.config.reset_script_id,
            run_as: "system",
        };
        debug!(script_id = %self.config.reset_script_id, "running reset script");
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.token)
            .json(&request)
            .send()
            .await?;
        check_status(response).await
    }

    /// Issue a normal (non-forced) reboot.
    #[instrument(skip(self), fields(vendor = VENDOR))]
    pub async fn reboot(&self, device_id: &str) -> Result<(), DeviceError> {
        let url = self.device_url(device_id, "reboot/NORMAL");
        debug!("requesting reboot");
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.token)
            .send()
            .await?;
        check_status(response).await
    }
}

async fn check_status(response: reqwest::Response) -> Result<(), DeviceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body = response.text().await.unwrap_or_default();
    warn!(status = status.as_u16(), "NinjaOne call failed");
    Err(DeviceError::Api {
        vendor: VENDOR,
        status: status.as_u16(),
        body,
    })
}
