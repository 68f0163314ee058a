//! Vision/AI inference endpoints
//!
//! Detection results are returned as-is; a failed detection is answered with
//! `400` and the same body.

use axum::{Json, extract::State, http::StatusCode};
use chrono::Utc;
use tracing::{info, warn};

use crate::AppState;
use crate::models::inference::{CenterDetection, InferenceHealthResponse, TrackDetection};

pub async fn detect_track(State(state): State<AppState>) -> (StatusCode, Json<TrackDetection>) {
    let retry = state.inference_retry;
    let result = state
        .inference
        .detect_track_with_retry(retry.max_retries, retry.delay)
        .await;

    if result.success {
        info!(track_id = %result.track_id, "Track detection successful");
        (StatusCode::OK, Json(result))
    } else {
        warn!(error = ?result.error, "Track detection failed");
        (StatusCode::BAD_REQUEST, Json(result))
    }
}

pub async fn detect_center(State(state): State<AppState>) -> (StatusCode, Json<CenterDetection>) {
    let retry = state.inference_retry;
    let result = state
        .inference
        .detect_centers_with_retry(retry.max_retries, retry.delay)
        .await;

    if result.success {
        info!(count = result.count, "Center detection successful");
        (StatusCode::OK, Json(result))
    } else {
        warn!(error = ?result.error, "Center detection failed");
        (StatusCode::BAD_REQUEST, Json(result))
    }
}

pub async fn inference_health(
    State(state): State<AppState>,
) -> (StatusCode, Json<InferenceHealthResponse>) {
    let connected = state.inference.check_health().await;
    let body = InferenceHealthResponse {
        connected,
        api_url: state.inference.base_url().to_string(),
        message: if connected {
            "Inference service is responding".to_string()
        } else {
            "Inference service is not responding".to_string()
        },
        timestamp: Utc::now(),
    };

    let status = if connected {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}
