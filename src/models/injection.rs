//! Injection operation types and request/response bodies

use serde::{Deserialize, Serialize};

use super::operation::{LifecycleStatus, Operation, OperationKind};

/// Parameters of a multi-step liquid injection run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Injection {
    /// Infrared range start (mm)
    pub range_from: f64,
    /// Infrared range end (mm)
    pub range_to: f64,
    /// Distance between injections (mm)
    pub step: f64,
    /// Liquid volume per element (ml)
    pub volume: f64,
    pub element_count: i32,
}

impl Injection {
    /// Check the parameter set before anything is sent to the device
    pub fn validate(&self) -> Result<(), String> {
        let finite = [self.range_from, self.range_to, self.step, self.volume]
            .iter()
            .all(|v| v.is_finite());
        if !finite {
            return Err("Injection parameters must be finite numbers".to_string());
        }
        if self.range_from < 0.0 {
            return Err("Range start cannot be negative".to_string());
        }
        if self.range_from > self.range_to {
            return Err(format!(
                "Range start ({}) must not exceed range end ({})",
                self.range_from, self.range_to
            ));
        }
        if self.step <= 0.0 {
            return Err("Step of injection must be positive".to_string());
        }
        if self.volume <= 0.0 {
            return Err("Volume of liquid must be positive".to_string());
        }
        if self.element_count <= 0 {
            return Err("Number of elements must be positive".to_string());
        }
        Ok(())
    }
}

/// Injection status values
/// Status progresses: active → completed
///                           ↘ stopped
///                           ↘ failed
///                           ↘ unconfirmed → completed | stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InjectionStatus {
    /// Device accepted the run and is injecting
    Active,
    /// Stop was sent but the device never acknowledged it
    Unconfirmed,
    Completed,
    Stopped,
    Failed,
}

impl LifecycleStatus for InjectionStatus {
    fn is_terminal(&self) -> bool {
        matches!(
            self,
            InjectionStatus::Completed | InjectionStatus::Stopped | InjectionStatus::Failed
        )
    }

    fn failed() -> Self {
        InjectionStatus::Failed
    }
}

impl std::fmt::Display for InjectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InjectionStatus::Active => write!(f, "active"),
            InjectionStatus::Unconfirmed => write!(f, "unconfirmed"),
            InjectionStatus::Completed => write!(f, "completed"),
            InjectionStatus::Stopped => write!(f, "stopped"),
            InjectionStatus::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for InjectionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(InjectionStatus::Active),
            "unconfirmed" => Ok(InjectionStatus::Unconfirmed),
            "completed" => Ok(InjectionStatus::Completed),
            "stopped" => Ok(InjectionStatus::Stopped),
            "failed" => Ok(InjectionStatus::Failed),
            _ => Err(format!("Unknown injection status: {}", s)),
        }
    }
}

impl OperationKind for Injection {
    type Status = InjectionStatus;
    const LABEL: &'static str = "injection";
}

pub type InjectionOperation = Operation<Injection>;

/// Body of POST /api/injection/start
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartInjectionRequest {
    pub range_of_infrared_from: f64,
    pub range_of_infrared_to: f64,
    pub step_of_injection: f64,
    pub volume_of_liquid: f64,
    pub number_of_elements: i32,
}

impl From<StartInjectionRequest> for Injection {
    fn from(req: StartInjectionRequest) -> Self {
        Self {
            range_from: req.range_of_infrared_from,
            range_to: req.range_of_infrared_to,
            step: req.step_of_injection,
            volume: req.volume_of_liquid,
            element_count: req.number_of_elements,
        }
    }
}

/// Body of POST /api/injection/{stop,complete,status}
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InjectionOperationRequest {
    pub operation_id: i32,
}

/// Response for injection start/stop/complete
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InjectionResponse {
    pub success: bool,
    pub message: String,
    pub operation_id: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<InjectionStatus>,
}

/// Response for POST /api/injection/status
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InjectionStatusResponse {
    pub operation_id: i32,
    pub status: InjectionStatus,
    pub completed: bool,
    pub ended_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// One entry of GET /api/injection/history
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InjectionHistoryEntry {
    pub id: i32,
    pub status: InjectionStatus,
    pub range_of_infrared_from: f64,
    pub range_of_infrared_to: f64,
    pub step_of_injection: f64,
    pub volume_of_liquid: f64,
    pub number_of_elements: i32,
    pub error_message: Option<String>,
    pub start_time: chrono::DateTime<chrono::Utc>,
    pub end_time: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<&InjectionOperation> for InjectionHistoryEntry {
    fn from(op: &InjectionOperation) -> Self {
        Self {
            id: op.id,
            status: op.status,
            range_of_infrared_from: op.details.range_from,
            range_of_infrared_to: op.details.range_to,
            step_of_injection: op.details.step,
            volume_of_liquid: op.details.volume,
            number_of_elements: op.details.element_count,
            error_message: op.error_message.clone(),
            start_time: op.started_at,
            end_time: op.ended_at,
        }
    }
}
