//! Movement lifecycle: in_progress → completed | failed
//!
//! A move is acknowledged only after the axis stops, so its row is written in
//! a terminal state straight away. Homing is acknowledged first and finishes
//! later; the row stays `in_progress` until a status query sees the axes
//! homed.

use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::models::device::{DeviceAck, DeviceStatus, HomeCommand, MoveCommand};
use crate::models::movement::{
    Axis, Direction, HomingOperationState, Movement, MovementAction, MovementCommand,
    MovementStatus, MovementStatusResponse, validate_speed,
};
use crate::models::operation::Operation;
use crate::services::device_client::{
    DeviceClient, DeviceError, encode_command, endpoints, send_json,
};
use crate::services::lifecycle::{
    LifecycleError, LifecycleSettings, find_owned, recent_history,
};
use crate::services::operation_store::Repository;

const STATUS_READY: &str = "Ready";
const STATUS_HOMING: &str = "Homing in progress";
const STATUS_DISCONNECTED: &str = "Device connection failed";

#[derive(Clone)]
pub struct MovementLifecycle {
    store: Arc<dyn Repository<Movement>>,
    device: Arc<dyn DeviceClient>,
    settings: LifecycleSettings,
}

impl MovementLifecycle {
    pub fn new(
        store: Arc<dyn Repository<Movement>>,
        device: Arc<dyn DeviceClient>,
        settings: LifecycleSettings,
    ) -> Self {
        Self {
            store,
            device,
            settings,
        }
    }

    /// Move one axis by `steps` in the sign of `direction`
    pub async fn move_axis(
        &self,
        user_id: &str,
        axis: &str,
        direction: i32,
        speed: i32,
        steps: i32,
    ) -> Result<MovementCommand, LifecycleError> {
        let movement = parse_move(axis, direction, speed, steps).map_err(LifecycleError::Validation)?;
        let command = encode_command(endpoints::MOVEMENT_MOVE, &MoveCommand::from(&movement))?;

        self.dispatch(user_id, movement, endpoints::MOVEMENT_MOVE, command, MovementStatus::Completed)
            .await
    }

    /// Start homing all axes. The row only reflects the acknowledgement.
    pub async fn home_axes(
        &self,
        user_id: &str,
        speed: i32,
    ) -> Result<MovementCommand, LifecycleError> {
        validate_speed(speed).map_err(LifecycleError::Validation)?;

        let movement = Movement {
            action: MovementAction::Home,
            axis: Axis::All,
            direction: Direction::Positive,
            speed,
            steps: 0,
        };
        let command = encode_command(endpoints::MOVEMENT_HOME, &HomeCommand { speed })?;

        self.dispatch(user_id, movement, endpoints::MOVEMENT_HOME, command, MovementStatus::InProgress)
            .await
    }

    /// Send one movement command and write its row. `accepted` is the status
    /// recorded when the device acknowledges.
    async fn dispatch(
        &self,
        user_id: &str,
        movement: Movement,
        endpoint: &str,
        command: serde_json::Value,
        accepted: MovementStatus,
    ) -> Result<MovementCommand, LifecycleError> {
        let outcome = send_json::<DeviceAck>(self.device.as_ref(), endpoint, Some(command)).await;

        let now = Utc::now();
        let mut op = Operation::new(user_id, MovementStatus::InProgress, movement, now);

        match outcome {
            Ok(ack) if ack.accepted() => {
                op.transition(accepted, now)?;
                let op = self.store.add(op).await?;
                info!(
                    movement_id = op.id,
                    action = %movement.action,
                    axis = %movement.axis,
                    status = %op.status,
                    "Movement command acknowledged"
                );
                Ok(op)
            }
            Ok(ack) => {
                let reason = ack.refusal_reason(endpoint);
                op.fail(reason.clone(), now)?;
                let op = self.store.add(op).await?;
                warn!(movement_id = op.id, action = %movement.action, reason = %reason, "Device refused movement");
                Ok(op)
            }
            Err(e) => {
                op.fail(e.to_string(), now)?;
                let op = self.store.add(op).await?;
                error!(movement_id = op.id, action = %movement.action, error = %e, "Movement command failed, recorded as failed");
                Err(LifecycleError::device(Some(op.id), e))
            }
        }
    }

    /// Live axis state from the device. Pure read.
    pub async fn query_device_status(&self) -> Result<DeviceStatus, DeviceError> {
        send_json(self.device.as_ref(), endpoints::MOVEMENT_STATUS, None).await
    }

    /// Advance an owned, still running homing operation to `completed` when the
    /// device reports the axes homed. Returns the row as it now stands, or
    /// `None` when it is unknown or not owned.
    pub async fn reconcile_homing(
        &self,
        user_id: &str,
        homing_id: i32,
        status: &DeviceStatus,
    ) -> Result<Option<MovementCommand>, LifecycleError> {
        let Some(mut op) = find_owned(self.store.as_ref(), user_id, homing_id).await? else {
            return Ok(None);
        };

        if status.is_homed
            && op.details.action == MovementAction::Home
            && op.status == MovementStatus::InProgress
        {
            op.transition(MovementStatus::Completed, Utc::now())?;
            self.store.update(&op).await?;
            info!(movement_id = homing_id, "Homing completed");
        }

        Ok(Some(op))
    }

    /// Device status for the operator, reconciling `homing_id` on the way.
    /// An unreachable device is reported as disconnected, not as an error.
    pub async fn get_status(
        &self,
        user_id: &str,
        homing_id: Option<i32>,
    ) -> Result<MovementStatusResponse, LifecycleError> {
        let status = match self.query_device_status().await {
            Ok(status) => status,
            Err(e) => {
                warn!(error = %e, "Device status unavailable");
                return Ok(disconnected_status());
            }
        };

        let homing_operation = match homing_id {
            Some(id) => self
                .reconcile_homing(user_id, id, &status)
                .await?
                .map(|op| HomingOperationState {
                    id: op.id,
                    status: op.status,
                }),
            None => None,
        };

        Ok(MovementStatusResponse {
            is_connected: true,
            z_axis_position: status.z_position,
            y_axis_position: status.y_position,
            is_homed: status.is_homed,
            is_moving: status.is_moving,
            status: if status.is_homed { STATUS_READY } else { STATUS_HOMING }.to_string(),
            limit_switch1: status.limit_switch1,
            limit_switch2: status.limit_switch2,
            limit_switch3: status.limit_switch3,
            timestamp: status.timestamp,
            homing_operation,
        })
    }

    /// Most recent movement commands of `user_id`, newest first
    pub async fn history(&self, user_id: &str) -> Result<Vec<MovementCommand>, LifecycleError> {
        Ok(recent_history(self.store.as_ref(), user_id, self.settings.history_limit).await?)
    }
}

fn parse_move(axis: &str, direction: i32, speed: i32, steps: i32) -> Result<Movement, String> {
    let axis = Axis::parse_movable(axis)?;
    let direction = Direction::from_sign(direction)?;
    validate_speed(speed)?;
    if steps <= 0 {
        return Err(format!("Steps must be positive (got {})", steps));
    }

    Ok(Movement {
        action: MovementAction::Move,
        axis,
        direction,
        speed,
        steps,
    })
}

fn disconnected_status() -> MovementStatusResponse {
    MovementStatusResponse {
        is_connected: false,
        z_axis_position: 0.0,
        y_axis_position: 0.0,
        is_homed: false,
        is_moving: false,
        status: STATUS_DISCONNECTED.to_string(),
        limit_switch1: false,
        limit_switch2: false,
        limit_switch3: false,
        timestamp: Utc::now().timestamp_millis(),
        homing_operation: None,
    }
}
