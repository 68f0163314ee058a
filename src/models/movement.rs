//! Movement command types (axis moves and homing) and request/response bodies

use serde::{Deserialize, Serialize};

use super::operation::{LifecycleStatus, Operation, OperationKind};

/// Slowest and fastest accepted speed, in percent of the controller maximum
pub const MIN_SPEED: i32 = 1;
pub const MAX_SPEED: i32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementAction {
    Move,
    Home,
}

impl std::fmt::Display for MovementAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MovementAction::Move => write!(f, "move"),
            MovementAction::Home => write!(f, "home"),
        }
    }
}

impl std::str::FromStr for MovementAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "move" => Ok(MovementAction::Move),
            "home" => Ok(MovementAction::Home),
            _ => Err(format!("Unknown movement action: {}", s)),
        }
    }
}

/// Controller axes. `All` is only used for homing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Axis {
    Z,
    Y,
    All,
}

impl Axis {
    /// Parse an axis that can be moved individually
    pub fn parse_movable(s: &str) -> Result<Self, String> {
        match s.parse::<Axis>()? {
            Axis::All => Err("Axis ALL can only be homed, not moved".to_string()),
            axis => Ok(axis),
        }
    }
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Axis::Z => write!(f, "Z"),
            Axis::Y => write!(f, "Y"),
            Axis::All => write!(f, "ALL"),
        }
    }
}

impl std::str::FromStr for Axis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "Z" => Ok(Axis::Z),
            "Y" => Ok(Axis::Y),
            "ALL" => Ok(Axis::All),
            _ => Err(format!("Invalid axis: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Positive,
    Negative,
}

impl Direction {
    pub fn from_sign(value: i32) -> Result<Self, String> {
        match value.signum() {
            1 => Ok(Direction::Positive),
            -1 => Ok(Direction::Negative),
            _ => Err("Direction must be non-zero".to_string()),
        }
    }

    pub fn sign(&self) -> i16 {
        match self {
            Direction::Positive => 1,
            Direction::Negative => -1,
        }
    }
}

/// Parameters of one movement command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movement {
    pub action: MovementAction,
    pub axis: Axis,
    pub direction: Direction,
    /// Percent of maximum speed
    pub speed: i32,
    /// Motor steps; 0 for homing
    pub steps: i32,
}

/// Check a speed percentage
pub fn validate_speed(speed: i32) -> Result<(), String> {
    if !(MIN_SPEED..=MAX_SPEED).contains(&speed) {
        return Err(format!(
            "Speed must be between {} and {} (got {})",
            MIN_SPEED, MAX_SPEED, speed
        ));
    }
    Ok(())
}

/// Movement status values
/// Moves are acknowledged after they finish, so they go straight to a
/// terminal state. Homing is acknowledged first and stays in_progress until
/// the device reports the axes homed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementStatus {
    InProgress,
    Completed,
    Failed,
}

impl LifecycleStatus for MovementStatus {
    fn is_terminal(&self) -> bool {
        !matches!(self, MovementStatus::InProgress)
    }

    fn failed() -> Self {
        MovementStatus::Failed
    }
}

impl std::fmt::Display for MovementStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MovementStatus::InProgress => write!(f, "in_progress"),
            MovementStatus::Completed => write!(f, "completed"),
            MovementStatus::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for MovementStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "in_progress" => Ok(MovementStatus::InProgress),
            "completed" => Ok(MovementStatus::Completed),
            "failed" => Ok(MovementStatus::Failed),
            _ => Err(format!("Unknown movement status: {}", s)),
        }
    }
}

impl OperationKind for Movement {
    type Status = MovementStatus;
    const LABEL: &'static str = "movement";
}

pub type MovementCommand = Operation<Movement>;

fn default_speed() -> i32 {
    50
}

fn default_steps() -> i32 {
    1000
}

/// Body of POST /api/movement/move
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRequest {
    pub axis: String,
    pub direction: i32,
    #[serde(default = "default_speed")]
    pub speed: i32,
    #[serde(default = "default_steps")]
    pub steps: i32,
}

/// Body of POST /api/movement/home
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeRequest {
    #[serde(default = "default_speed")]
    pub speed: i32,
}

/// Body of POST /api/movement/status
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementStatusRequest {
    pub homing_operation_id: Option<i32>,
}

/// Response for move/home
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementResponse {
    pub success: bool,
    pub message: String,
    pub movement_id: i32,
    pub status: MovementStatus,
}

/// Live axis state, optionally with the reconciled homing operation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementStatusResponse {
    pub is_connected: bool,
    pub z_axis_position: f64,
    pub y_axis_position: f64,
    pub is_homed: bool,
    pub is_moving: bool,
    pub status: String,
    pub limit_switch1: bool,
    pub limit_switch2: bool,
    pub limit_switch3: bool,
    pub timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub homing_operation: Option<HomingOperationState>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HomingOperationState {
    pub id: i32,
    pub status: MovementStatus,
}

/// One entry of GET /api/movement/history
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementHistoryEntry {
    pub id: i32,
    pub action: MovementAction,
    pub axis: Axis,
    pub direction: Direction,
    pub speed: i32,
    pub steps: i32,
    pub status: MovementStatus,
    pub error_message: Option<String>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub ended_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<&MovementCommand> for MovementHistoryEntry {
    fn from(cmd: &MovementCommand) -> Self {
        Self {
            id: cmd.id,
            action: cmd.details.action,
            axis: cmd.details.axis,
            direction: cmd.details.direction,
            speed: cmd.details.speed,
            steps: cmd.details.steps,
            status: cmd.status,
            error_message: cmd.error_message.clone(),
            timestamp: cmd.started_at,
            ended_at: cmd.ended_at,
        }
    }
}
