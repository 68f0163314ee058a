//! Scan operation types and request/response bodies

use serde::{Deserialize, Serialize};

use super::inference::{DetectedText, TrackDetection};
use super::operation::{LifecycleStatus, Operation, OperationKind};

/// Result payload of a depth/sensor scan. Readings are filled in at stop time.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Scan {
    pub readings: Vec<f64>,
}

/// Scan status values
/// Status progresses: in_progress → success
///                                ↘ failed
///                                ↘ unconfirmed → success | failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    /// Device is scanning, no readings yet
    InProgress,
    /// Stop was sent but the device never acknowledged it
    Unconfirmed,
    /// Readings were collected
    Success,
    Failed,
}

impl LifecycleStatus for ScanStatus {
    fn is_terminal(&self) -> bool {
        matches!(self, ScanStatus::Success | ScanStatus::Failed)
    }

    fn failed() -> Self {
        ScanStatus::Failed
    }
}

impl std::fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanStatus::InProgress => write!(f, "in_progress"),
            ScanStatus::Unconfirmed => write!(f, "unconfirmed"),
            ScanStatus::Success => write!(f, "success"),
            ScanStatus::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for ScanStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "in_progress" => Ok(ScanStatus::InProgress),
            "unconfirmed" => Ok(ScanStatus::Unconfirmed),
            "success" => Ok(ScanStatus::Success),
            "failed" => Ok(ScanStatus::Failed),
            _ => Err(format!("Unknown scan status: {}", s)),
        }
    }
}

impl OperationKind for Scan {
    type Status = ScanStatus;
    const LABEL: &'static str = "scan";
}

pub type ScanOperation = Operation<Scan>;

/// Body of POST /api/scanner/stop
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopScanRequest {
    pub scan_id: i32,
}

/// Response for scan start/stop
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResponse {
    pub success: bool,
    pub message: String,
    pub scan_id: i32,
    pub status: ScanStatus,
    pub readings: Vec<f64>,
    pub reading_count: usize,
}

impl ScanResponse {
    pub fn from_operation(op: &ScanOperation, message: impl Into<String>) -> Self {
        Self {
            success: op.status != ScanStatus::Failed,
            message: message.into(),
            scan_id: op.id,
            status: op.status,
            readings: op.details.readings.clone(),
            reading_count: op.details.readings.len(),
        }
    }
}

/// Response for POST /api/scanner/detect-track
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackGateResponse {
    pub success: bool,
    pub message: String,
    pub track_id: String,
    pub has_previous_injection: bool,
    pub allow_scan: bool,
    pub detected_texts: Vec<DetectedText>,
}

impl TrackGateResponse {
    /// Gate a scan on a detected tray. Injection rows carry no tray id, so
    /// no tray is known to have been injected before.
    pub fn from_detection(detection: TrackDetection) -> Self {
        if !detection.success {
            return Self {
                success: false,
                message: detection
                    .error
                    .unwrap_or_else(|| "Failed to detect track".to_string()),
                track_id: String::new(),
                has_previous_injection: false,
                allow_scan: false,
                detected_texts: Vec::new(),
            };
        }

        Self {
            success: true,
            message: format!("Track {} detected - scan allowed", detection.track_id),
            track_id: detection.track_id,
            has_previous_injection: false,
            allow_scan: true,
            detected_texts: detection.detected_texts,
        }
    }
}

/// One entry of GET /api/scanner/history
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanHistoryEntry {
    pub id: i32,
    pub status: ScanStatus,
    pub sensor_readings: Vec<f64>,
    pub error_message: Option<String>,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub ended_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<&ScanOperation> for ScanHistoryEntry {
    fn from(op: &ScanOperation) -> Self {
        Self {
            id: op.id,
            status: op.status,
            sensor_readings: op.details.readings.clone(),
            error_message: op.error_message.clone(),
            started_at: op.started_at,
            ended_at: op.ended_at,
        }
    }
}
