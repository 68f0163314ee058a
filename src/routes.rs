//! Router assembly shared by the server binary and the HTTP tests

use axum::{
    Router,
    http::HeaderValue,
    routing::{get, post},
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::AppState;
use crate::handlers::{device, inference, injection, movement, scanner};

pub fn build_router(state: AppState, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/", get(hello_ovocontrol))
        .route("/api/scanner/start", post(scanner::start_scan))
        .route("/api/scanner/stop", post(scanner::stop_scan))
        .route("/api/scanner/history", get(scanner::scan_history))
        .route("/api/scanner/detect-track", post(scanner::detect_track))
        .route("/api/injection/start", post(injection::start_injection))
        .route("/api/injection/stop", post(injection::stop_injection))
        .route("/api/injection/complete", post(injection::complete_injection))
        .route("/api/injection/status", post(injection::injection_status))
        .route("/api/injection/history", get(injection::injection_history))
        .route("/api/movement/move", post(movement::move_axis))
        .route("/api/movement/home", post(movement::home_axes))
        .route("/api/movement/status", post(movement::movement_status))
        .route("/api/movement/history", get(movement::movement_history))
        .route("/api/device/status", get(device::device_status))
        .route("/api/device/test", post(device::test_device))
        .route("/api/inference/detect-track", get(inference::detect_track))
        .route("/api/inference/detect-center", get(inference::detect_center))
        .route("/api/inference/health", get(inference::inference_health))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(allowed_origins))
}

/// CORS for the operator UI. No configured origins means any origin.
pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if allowed_origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    layer.allow_origin(AllowOrigin::list(origins))
}

async fn hello_ovocontrol() -> &'static str {
    "Hello from OvoControl Backend!"
}
