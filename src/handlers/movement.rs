use axum::{Json, extract::State};

use crate::AppState;
use crate::handlers::auth::AuthenticatedUser;
use crate::handlers::error::{ApiError, lifecycle_error};
use crate::models::movement::{
    HomeRequest, MoveRequest, MovementCommand, MovementHistoryEntry, MovementResponse,
    MovementStatus, MovementStatusRequest, MovementStatusResponse,
};

pub async fn move_axis(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<MoveRequest>,
) -> Result<Json<MovementResponse>, ApiError> {
    let cmd = state
        .movements
        .move_axis(
            user.id(),
            &payload.axis,
            payload.direction,
            payload.speed,
            payload.steps,
        )
        .await
        .map_err(lifecycle_error)?;

    Ok(Json(movement_response(&cmd, "Movement completed successfully")))
}

pub async fn home_axes(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<HomeRequest>,
) -> Result<Json<MovementResponse>, ApiError> {
    let cmd = state
        .movements
        .home_axes(user.id(), payload.speed)
        .await
        .map_err(lifecycle_error)?;

    Ok(Json(movement_response(&cmd, "Homing started")))
}

/// Live axis state. The body is optional; without one no homing row is reconciled.
pub async fn movement_status(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    payload: Option<Json<MovementStatusRequest>>,
) -> Result<Json<MovementStatusResponse>, ApiError> {
    let homing_operation_id = payload.and_then(|Json(req)| req.homing_operation_id);
    let status = state
        .movements
        .get_status(user.id(), homing_operation_id)
        .await
        .map_err(lifecycle_error)?;
    Ok(Json(status))
}

pub async fn movement_history(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<MovementHistoryEntry>>, ApiError> {
    let history = state
        .movements
        .history(user.id())
        .await
        .map_err(lifecycle_error)?;
    Ok(Json(history.iter().map(MovementHistoryEntry::from).collect()))
}

fn movement_response(cmd: &MovementCommand, accepted_message: &str) -> MovementResponse {
    let failed = cmd.status == MovementStatus::Failed;
    MovementResponse {
        success: !failed,
        message: if failed {
            format!(
                "Device rejected {}: {}",
                cmd.details.action,
                cmd.error_message.as_deref().unwrap_or("unknown reason")
            )
        } else {
            accepted_message.to_string()
        },
        movement_id: cmd.id,
        status: cmd.status,
    }
}
