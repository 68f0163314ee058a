use axum::{Json, http::StatusCode};
use tracing::error;

use crate::models::error::ErrorResponse;
use crate::services::lifecycle::LifecycleError;

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(ErrorResponse::new(message)))
}

pub fn not_found(message: impl Into<String>) -> ApiError {
    api_error(StatusCode::NOT_FOUND, message)
}

pub fn conflict(message: impl Into<String>) -> ApiError {
    api_error(StatusCode::CONFLICT, message)
}

/// Map a lifecycle fault to its HTTP response
pub fn lifecycle_error(err: LifecycleError) -> ApiError {
    match err {
        LifecycleError::Validation(message) => api_error(StatusCode::BAD_REQUEST, message),
        LifecycleError::Device {
            operation_id,
            source,
        } => (
            StatusCode::BAD_GATEWAY,
            Json(ErrorResponse {
                error: source.to_string(),
                operation_id,
            }),
        ),
        LifecycleError::Conflict(e) => conflict(e.to_string()),
        LifecycleError::Store(e) => {
            error!(error = %e, "Operation store failure");
            api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Database error: {}", e),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::device_client::DeviceError;
    use crate::services::operation_store::StoreError;

    #[test]
    fn test_status_mapping() {
        let (status, _) = lifecycle_error(LifecycleError::Validation("bad axis".into()));
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, Json(body)) = lifecycle_error(LifecycleError::device(
            Some(12),
            DeviceError::communication("movement/move", "timed out"),
        ));
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body.operation_id, Some(12));

        let (status, _) = lifecycle_error(LifecycleError::Store(StoreError::Missing {
            kind: "scan",
            id: 1,
        }));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
