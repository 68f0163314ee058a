use axum::{Json, extract::State, http::StatusCode};
use chrono::Utc;
use tracing::warn;

use crate::AppState;
use crate::handlers::error::{ApiError, api_error};
use crate::models::device::{DeviceConnectionResponse, DeviceTestResponse};
use crate::services::device_client::endpoints;

pub async fn device_status(State(state): State<AppState>) -> Json<DeviceConnectionResponse> {
    let connected = state.device.is_connected().await;

    Json(DeviceConnectionResponse {
        connected,
        message: if connected {
            "Device is connected".to_string()
        } else {
            "Device is not connected".to_string()
        },
        timestamp: Utc::now(),
    })
}

/// Send a raw `ping` and hand back whatever the device answered
pub async fn test_device(
    State(state): State<AppState>,
) -> Result<Json<DeviceTestResponse>, ApiError> {
    match state.device.send(endpoints::PING, None).await {
        Ok(response) => Ok(Json(DeviceTestResponse {
            success: true,
            response,
            timestamp: Utc::now(),
        })),
        Err(e) => {
            warn!(error = %e, "Device test failed");
            Err(api_error(StatusCode::BAD_GATEWAY, e.to_string()))
        }
    }
}
