//! Injection endpoints
//!
//! Stop and complete use a soft-failure contract: an unknown or finished
//! operation is answered with `200` and `success: false`.

use axum::{Json, extract::State};

use crate::AppState;
use crate::handlers::auth::AuthenticatedUser;
use crate::handlers::error::{ApiError, lifecycle_error, not_found};
use crate::models::injection::{
    InjectionHistoryEntry, InjectionOperation, InjectionOperationRequest, InjectionResponse,
    InjectionStatus, InjectionStatusResponse, StartInjectionRequest,
};
use crate::models::operation::Transition;

pub async fn start_injection(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<StartInjectionRequest>,
) -> Result<Json<InjectionResponse>, ApiError> {
    let op = state
        .injections
        .start(user.id(), payload.into())
        .await
        .map_err(lifecycle_error)?;

    let message = match op.status {
        InjectionStatus::Active => "Injection started successfully".to_string(),
        _ => format!(
            "Failed to start injection: {}",
            op.error_message.as_deref().unwrap_or("device error")
        ),
    };

    Ok(Json(InjectionResponse {
        success: op.status == InjectionStatus::Active,
        message,
        operation_id: op.id,
        status: Some(op.status),
    }))
}

pub async fn stop_injection(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<InjectionOperationRequest>,
) -> Result<Json<InjectionResponse>, ApiError> {
    let outcome = state
        .injections
        .stop(user.id(), payload.operation_id)
        .await
        .map_err(lifecycle_error)?;

    Ok(Json(soft_response(payload.operation_id, outcome, |op| {
        match op.status {
            InjectionStatus::Unconfirmed => "Stop sent but not confirmed by the device".to_string(),
            _ => "Injection stopped successfully".to_string(),
        }
    })))
}

pub async fn complete_injection(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<InjectionOperationRequest>,
) -> Result<Json<InjectionResponse>, ApiError> {
    let outcome = state
        .injections
        .complete(user.id(), payload.operation_id)
        .await
        .map_err(lifecycle_error)?;

    Ok(Json(soft_response(payload.operation_id, outcome, |_| {
        "Injection completed successfully".to_string()
    })))
}

/// Report whether an injection has finished, reconciling with the device first
pub async fn injection_status(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<InjectionOperationRequest>,
) -> Result<Json<InjectionStatusResponse>, ApiError> {
    let op = state
        .injections
        .poll_completion(user.id(), payload.operation_id)
        .await
        .map_err(lifecycle_error)?
        .ok_or_else(|| not_found(format!("Operation {} not found", payload.operation_id)))?;

    Ok(Json(InjectionStatusResponse {
        operation_id: op.id,
        status: op.status,
        completed: op.status == InjectionStatus::Completed,
        ended_at: op.ended_at,
    }))
}

pub async fn injection_history(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<InjectionHistoryEntry>>, ApiError> {
    let history = state
        .injections
        .history(user.id())
        .await
        .map_err(lifecycle_error)?;
    Ok(Json(history.iter().map(InjectionHistoryEntry::from).collect()))
}

fn soft_response(
    operation_id: i32,
    outcome: Transition<InjectionOperation>,
    applied_message: impl FnOnce(&InjectionOperation) -> String,
) -> InjectionResponse {
    match outcome {
        Transition::Applied(op) => InjectionResponse {
            success: true,
            message: applied_message(&op),
            operation_id: op.id,
            status: Some(op.status),
        },
        Transition::NotFound => InjectionResponse {
            success: false,
            message: format!("Injection operation {} not found", operation_id),
            operation_id,
            status: None,
        },
        Transition::InvalidState { status } => InjectionResponse {
            success: false,
            message: format!(
                "Injection operation {} is not active (status: {})",
                operation_id, status
            ),
            operation_id,
            status: status.parse().ok(),
        },
    }
}
