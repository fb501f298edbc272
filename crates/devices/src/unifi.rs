use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::config::UnifiConfig;
use crate::error::DeviceError;

const VENDOR: &str = "unifi";

/// Envelope every UniFi Access developer API response uses.
#[derive(Debug, Deserialize)]
struct UnifiResponse {
    code: String,
    #[serde(default)]
    msg: Option<String>,
}

/// Client for the UniFi Access door endpoints.
#[derive(Debug, Clone)]
pub struct UnifiAccessClient {
    config: UnifiConfig,
    client: Client,
}

impl UnifiAccessClient {
    pub fn new(config: UnifiConfig, client: Client) -> Self {
        Self { config, client }
    }

    /// Remotely unlock a door.
    #[instrument(skip(self), fields(vendor = VENDOR))]
    pub async fn unlock(&self, door_id: &str) -> Result<(), DeviceError> {
        let url = format!(
            "{}/api/v1/developer/doors/{door_id}/unlock",
            self.config.base_url.trim_end_matches('/')
        );
        debug!("unlocking door");

        let response = self
            .client
            .put(&url)
            .bearer_auth(&self.config.token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "UniFi Access call failed");
            return Err(DeviceError::Api {
                vendor: VENDOR,
                status: status.as_u16(),
                body,
            });
        }

        // The controller has accepted the request by now. A body we cannot
        // read leaves the door state unknown, so it must not be retried.
        let body: UnifiResponse = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "UniFi Access response unreadable");
                return Err(DeviceError::Unconfirmed {
                    vendor: VENDOR,
                    message: e.to_string(),
                });
            }
        };
        if body.code != "SUCCESS" {
            return Err(DeviceError::Rejected {
                vendor: VENDOR,
                message: body.msg.unwrap_or(body.code),
            });
        }
        Ok(())
    }
}
