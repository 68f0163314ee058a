use axum::{Json, extract::State, http::StatusCode};
use tracing::{info, warn};

use crate::AppState;
use crate::handlers::auth::AuthenticatedUser;
use crate::handlers::error::{ApiError, conflict, lifecycle_error, not_found};
use crate::models::operation::Transition;
use crate::models::scan::{
    ScanHistoryEntry, ScanResponse, ScanStatus, StopScanRequest, TrackGateResponse,
};

pub async fn start_scan(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<ScanResponse>, ApiError> {
    let op = state.scans.start(user.id()).await.map_err(lifecycle_error)?;

    let message = match op.status {
        ScanStatus::Failed => format!(
            "Failed to start scan: {}",
            op.error_message.as_deref().unwrap_or("device error")
        ),
        _ => "Scan started successfully".to_string(),
    };

    Ok(Json(ScanResponse::from_operation(&op, message)))
}

pub async fn stop_scan(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<StopScanRequest>,
) -> Result<Json<ScanResponse>, ApiError> {
    let outcome = state
        .scans
        .stop(user.id(), payload.scan_id)
        .await
        .map_err(lifecycle_error)?;

    match outcome {
        Transition::Applied(op) => {
            let message = match op.status {
                ScanStatus::Success => "Scan stopped successfully".to_string(),
                ScanStatus::Unconfirmed => {
                    "Stop sent but not confirmed by the device".to_string()
                }
                _ => format!(
                    "Scan failed: {}",
                    op.error_message.as_deref().unwrap_or("device error")
                ),
            };
            info!(scan_id = op.id, status = %op.status, "Scan stop handled");
            Ok(Json(ScanResponse::from_operation(&op, message)))
        }
        Transition::NotFound => Err(not_found(format!("Scan {} not found", payload.scan_id))),
        Transition::InvalidState { status } => Err(conflict(format!(
            "Scan {} is not in progress (status: {})",
            payload.scan_id, status
        ))),
    }
}

pub async fn scan_history(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<ScanHistoryEntry>>, ApiError> {
    let history = state.scans.history(user.id()).await.map_err(lifecycle_error)?;
    Ok(Json(history.iter().map(ScanHistoryEntry::from).collect()))
}

/// Identify the tray in front of the camera and say whether it may be scanned
pub async fn detect_track(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> (StatusCode, Json<TrackGateResponse>) {
    let gate = TrackGateResponse::from_detection(state.inference.detect_track().await);

    if gate.success {
        info!(user_id = %user.id(), track_id = %gate.track_id, allow_scan = gate.allow_scan, "Track detected");
        (StatusCode::OK, Json(gate))
    } else {
        warn!(user_id = %user.id(), error = %gate.message, "Track detection failed");
        (StatusCode::BAD_REQUEST, Json(gate))
    }
}
