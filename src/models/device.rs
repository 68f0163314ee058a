//! Wire types for the motion/sensor controller's HTTP command protocol
//!
//! Replies are JSON objects. `success` is optional: when the controller
//! leaves it out, a 2xx reply counts as accepted.

use serde::{Deserialize, Serialize};

use super::injection::Injection;
use super::movement::Movement;

/// Generic acknowledgement carried by every reply
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceAck {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl DeviceAck {
    pub fn accepted(&self) -> bool {
        self.success.unwrap_or(true)
    }

    /// Best description of a refusal for the audit row
    pub fn refusal_reason(&self, endpoint: &str) -> String {
        self.error
            .clone()
            .or_else(|| self.message.clone())
            .unwrap_or_else(|| format!("Device rejected {}", endpoint))
    }
}

/// Reply of `scanner/stop`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanStopReply {
    #[serde(flatten)]
    pub ack: DeviceAck,
    #[serde(default)]
    pub readings: Vec<f64>,
}

/// Reply of `injection/status`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InjectionProgress {
    #[serde(flatten)]
    pub ack: DeviceAck,
    #[serde(default)]
    pub is_running: bool,
    #[serde(default)]
    pub is_completed: bool,
}

/// Reply of `movement/status`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceStatus {
    #[serde(default)]
    pub z_position: f64,
    #[serde(default)]
    pub y_position: f64,
    #[serde(default)]
    pub is_homed: bool,
    #[serde(default)]
    pub is_moving: bool,
    #[serde(default)]
    pub limit_switch1: bool,
    #[serde(default)]
    pub limit_switch2: bool,
    #[serde(default)]
    pub limit_switch3: bool,
    /// Controller clock, milliseconds
    #[serde(default)]
    pub timestamp: i64,
}

/// Body of `injection/start`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InjectionStartCommand {
    pub action: String,
    pub range_from: f64,
    pub range_to: f64,
    pub step: f64,
    pub volume: f64,
    pub element_count: i32,
}

impl From<&Injection> for InjectionStartCommand {
    fn from(params: &Injection) -> Self {
        Self {
            action: "start".to_string(),
            range_from: params.range_from,
            range_to: params.range_to,
            step: params.step,
            volume: params.volume,
            element_count: params.element_count,
        }
    }
}

/// Body of `movement/move`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveCommand {
    pub action: String,
    pub axis: String,
    pub direction: i16,
    pub speed: i32,
    pub steps: i32,
}

impl From<&Movement> for MoveCommand {
    fn from(movement: &Movement) -> Self {
        Self {
            action: "move".to_string(),
            axis: movement.axis.to_string(),
            direction: movement.direction.sign(),
            speed: movement.speed,
            steps: movement.steps,
        }
    }
}

/// Body of `movement/home`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HomeCommand {
    pub speed: i32,
}

/// Response for GET /api/device/status
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceConnectionResponse {
    pub connected: bool,
    pub message: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Response for POST /api/device/test
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceTestResponse {
    pub success: bool,
    pub response: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}
