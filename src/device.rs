//! ==============================================================================
//! device.rs - device configuration push
//! ==============================================================================
//!
//! purpose:
//!     sends the bin's settings (id, location, reporting interval, alert
//!     threshold) to the sensor server with one POST. the live pipeline does
//!     not depend on this; it is only reached from the api.
//!
//! ==============================================================================

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::DeviceError;
use crate::transport::Endpoint;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceConfig {
    pub device_id: String,
    pub location: String,
    /// minutes between device reports
    pub reporting_interval: u32,
    /// fill percentage that should raise an alert
    pub alert_threshold: u8,
}

impl DeviceConfig {
    pub fn validate(&self) -> Result<(), DeviceError> {
        if self.device_id.trim().is_empty() {
            return Err(DeviceError::MissingDeviceId);
        }
        if !(1..=60).contains(&self.reporting_interval) {
            return Err(DeviceError::ReportingInterval(self.reporting_interval));
        }
        if self.alert_threshold > 100 {
            return Err(DeviceError::AlertThreshold(self.alert_threshold));
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct DeviceClient {
    client: reqwest::Client,
    base_url: String,
}

impl DeviceClient {
    /// client for the http side of the sensor server
    pub fn new(endpoint: &Endpoint) -> Self {
        let scheme = if endpoint.secure { "https" } else { "http" };
        Self::with_base_url(format!("{}://{}:{}", scheme, endpoint.address, endpoint.port))
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self { client: reqwest::Client::new(), base_url: base_url.into() }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST the config; `Ok(true)` when the server answered 2xx
    pub async fn save_config(&self, config: &DeviceConfig) -> Result<bool, DeviceError> {
        config.validate()?;
        let url = format!("{}/api/config", self.base_url);
        let response = self.client.post(&url).json(config).send().await?;
        let saved = response.status().is_success();
        info!("Device config for {} sent to {}: {}", config.device_id, url, response.status());
        Ok(saved)
    }
}
