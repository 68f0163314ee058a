//! HTTP command client for the motion/sensor controller
//!
//! Every command is a single request: GET when there is no payload, POST with
//! a JSON body otherwise. Connection failures, timeouts and non-2xx replies
//! all surface as [`DeviceError`]. There is no retry at this layer.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info};

/// Default request timeout for controller commands
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Controller endpoints
pub mod endpoints {
    pub const PING: &str = "ping";
    pub const SCAN_START: &str = "scanner/start";
    pub const SCAN_STOP: &str = "scanner/stop";
    pub const INJECTION_START: &str = "injection/start";
    pub const INJECTION_STOP: &str = "injection/stop";
    pub const INJECTION_STATUS: &str = "injection/status";
    pub const MOVEMENT_MOVE: &str = "movement/move";
    pub const MOVEMENT_HOME: &str = "movement/home";
    pub const MOVEMENT_STATUS: &str = "movement/status";
}

/// Error types for device communication
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeviceError {
    #[error("Device communication failed on {endpoint}: {reason}")]
    Communication { endpoint: String, reason: String },
    #[error("Device sent an unreadable reply on {endpoint}: {reason}")]
    InvalidReply { endpoint: String, reason: String },
    #[error("Could not encode command for {endpoint}: {reason}")]
    Encode { endpoint: String, reason: String },
}

impl DeviceError {
    pub fn communication(endpoint: &str, reason: impl ToString) -> Self {
        DeviceError::Communication {
            endpoint: endpoint.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
pub trait DeviceClient: Send + Sync {
    /// Send one command and return the raw reply body
    async fn send(&self, endpoint: &str, payload: Option<Value>) -> Result<String, DeviceError>;

    /// Connectivity probe: a `ping` that succeeds means connected
    async fn is_connected(&self) -> bool {
        self.send(endpoints::PING, None).await.is_ok()
    }
}

/// Serialize a command body for `endpoint`
pub fn encode_command<T: Serialize>(endpoint: &str, command: &T) -> Result<Value, DeviceError> {
    serde_json::to_value(command).map_err(|e| DeviceError::Encode {
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    })
}

/// Send a command and decode its JSON reply. An empty body decodes as `{}`.
pub async fn send_json<T: DeserializeOwned>(
    device: &dyn DeviceClient,
    endpoint: &str,
    payload: Option<Value>,
) -> Result<T, DeviceError> {
    let raw = device.send(endpoint, payload).await?;
    let body = if raw.trim().is_empty() { "{}" } else { raw.as_str() };

    serde_json::from_str(body).map_err(|e| {
        error!(endpoint = %endpoint, error = %e, body = %raw, "Unreadable device reply");
        DeviceError::InvalidReply {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        }
    })
}

/// reqwest-backed controller client
#[derive(Clone)]
pub struct HttpDeviceClient {
    client: Client,
    base_url: String,
}

impl HttpDeviceClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let client = Client::builder().timeout(timeout).build()?;

        info!(base_url = %base_url, timeout_secs = timeout.as_secs(), "Device client configured");

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }
}

#[async_trait]
impl DeviceClient for HttpDeviceClient {
    async fn send(&self, endpoint: &str, payload: Option<Value>) -> Result<String, DeviceError> {
        let url = self.url_for(endpoint);
        let method = if payload.is_some() { "POST" } else { "GET" };

        let request = match &payload {
            None => self.client.get(&url),
            Some(body) => self.client.post(&url).json(body),
        };

        debug!(method, url = %url, "Sending device command");

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                error!(method, endpoint = %endpoint, error = %e, "Device request timed out");
            } else {
                error!(method, endpoint = %endpoint, error = %e, "Device request failed");
            }
            DeviceError::communication(endpoint, e)
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(method, endpoint = %endpoint, status = %status, body = %body, "Device returned error status");
            return Err(DeviceError::communication(
                endpoint,
                format!("HTTP {}: {}", status, body),
            ));
        }

        let body = response.text().await.map_err(|e| {
            error!(method, endpoint = %endpoint, error = %e, "Failed to read device reply");
            DeviceError::communication(endpoint, e)
        })?;

        info!(method, endpoint = %endpoint, reply = %body, "Device replied");
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::device::DeviceAck;

    struct CannedDevice(&'static str);

    #[async_trait]
    impl DeviceClient for CannedDevice {
        async fn send(&self, _endpoint: &str, _payload: Option<Value>) -> Result<String, DeviceError> {
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn test_url_joining() {
        let client =
            HttpDeviceClient::new("http://192.168.1.100/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.base_url(), "http://192.168.1.100");
        assert_eq!(client.url_for("scanner/start"), "http://192.168.1.100/scanner/start");
        assert_eq!(client.url_for("/ping"), "http://192.168.1.100/ping");
    }

    #[tokio::test]
    async fn test_send_json_treats_empty_body_as_empty_object() {
        let ack: DeviceAck = send_json(&CannedDevice(""), endpoints::PING, None)
            .await
            .unwrap();
        assert!(ack.accepted());
    }

    #[tokio::test]
    async fn test_send_json_rejects_non_json() {
        let err = send_json::<DeviceAck>(&CannedDevice("OK"), endpoints::PING, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DeviceError::InvalidReply { .. }));
    }

    #[test]
    fn test_error_display() {
        let err = DeviceError::communication("ping", "connection refused");
        assert!(err.to_string().contains("Device communication failed on ping"));
    }
}
