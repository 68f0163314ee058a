mod common;

use axum::http::{Method, StatusCode};
use ovocontrol_backend::services::lifecycle::{LifecycleSettings, StopConfirmationPolicy};
use serde_json::json;
use std::sync::atomic::Ordering;

use crate::common::{test_app, test_app_with};

const ALICE: Option<&str> = Some("alice");
const BOB: Option<&str> = Some("bob");

fn injection_body() -> serde_json::Value {
    json!({
        "rangeOfInfraredFrom": 10.0,
        "rangeOfInfraredTo": 50.0,
        "stepOfInjection": 5.0,
        "volumeOfLiquid": 0.2,
        "numberOfElements": 30
    })
}

#[tokio::test]
async fn test_hello() {
    let app = test_app();
    let (status, body) = app.get("/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_str().unwrap().contains("OvoControl"));
}

#[tokio::test]
async fn test_operation_routes_require_user() {
    let app = test_app();

    let (status, body) = app.post("/api/scanner/start", None, json!({})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let (status, _) = app.get("/api/injection/history", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.post("/api/movement/home", None, json!({ "speed": 50 })).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    assert!(app.device.calls().is_empty());
}

#[tokio::test]
async fn test_scan_start_stop_and_history() {
    let app = test_app();
    app.device.queue_readings(vec![1.5, 2.5, 3.5]);

    let (status, started) = app.post("/api/scanner/start", ALICE, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(started["success"], true);
    assert_eq!(started["status"], "in_progress");
    let scan_id = started["scanId"].as_i64().unwrap();

    let (status, stopped) = app
        .post("/api/scanner/stop", ALICE, json!({ "scanId": scan_id }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stopped["status"], "success");
    assert_eq!(stopped["readings"], json!([1.5, 2.5, 3.5]));
    assert_eq!(stopped["readingCount"], 3);

    let (status, again) = app
        .post("/api/scanner/stop", ALICE, json!({ "scanId": scan_id }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(again["error"].as_str().unwrap().contains("success"));

    let (status, history) = app.get("/api/scanner/history", ALICE).await;
    assert_eq!(status, StatusCode::OK);
    let entries = history.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["sensorReadings"], json!([1.5, 2.5, 3.5]));
    assert!(entries[0]["endedAt"].is_string());
}

#[tokio::test]
async fn test_scan_stop_by_other_user_is_not_found() {
    let app = test_app();
    let (_, started) = app.post("/api/scanner/start", ALICE, json!({})).await;
    let scan_id = started["scanId"].as_i64().unwrap();

    let (status, _) = app
        .post("/api/scanner/stop", BOB, json!({ "scanId": scan_id }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, bob_history) = app.get("/api/scanner/history", BOB).await;
    assert!(bob_history.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_scan_start_with_unreachable_device_reports_failure() {
    let app = test_app();
    app.device.set_reachable(false);

    let (status, body) = app.post("/api/scanner/start", ALICE, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert_eq!(body["status"], "failed");
}

#[tokio::test]
async fn test_injection_lifecycle_over_http() {
    let app = test_app();

    let (status, started) = app
        .post("/api/injection/start", ALICE, injection_body())
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(started["success"], true);
    assert_eq!(started["status"], "active");
    let id = started["operationId"].as_i64().unwrap();

    let (status, polled) = app
        .post("/api/injection/status", ALICE, json!({ "operationId": id }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(polled["completed"], false);

    app.device.finish_injection();
    let (_, polled) = app
        .post("/api/injection/status", ALICE, json!({ "operationId": id }))
        .await;
    assert_eq!(polled["completed"], true);
    assert_eq!(polled["status"], "completed");
    assert!(polled["endedAt"].is_string());

    let (status, stop) = app
        .post("/api/injection/stop", ALICE, json!({ "operationId": id }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stop["success"], false);
    assert_eq!(stop["status"], "completed");
}

#[tokio::test]
async fn test_injection_stop_and_complete_soft_failures() {
    let app = test_app();

    let (status, body) = app
        .post("/api/injection/stop", ALICE, json!({ "operationId": 77 }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert!(body.get("status").is_none());

    let (_, started) = app
        .post("/api/injection/start", ALICE, injection_body())
        .await;
    let id = started["operationId"].as_i64().unwrap();

    let (_, foreign) = app
        .post("/api/injection/complete", BOB, json!({ "operationId": id }))
        .await;
    assert_eq!(foreign["success"], false);

    let (_, completed) = app
        .post("/api/injection/complete", ALICE, json!({ "operationId": id }))
        .await;
    assert_eq!(completed["success"], true);
    assert_eq!(completed["status"], "completed");
}

#[tokio::test]
async fn test_injection_status_unknown_operation_is_not_found() {
    let app = test_app();
    let (status, _) = app
        .post("/api/injection/status", ALICE, json!({ "operationId": 5 }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_injection_validation_is_bad_request() {
    let app = test_app();
    let mut body = injection_body();
    body["numberOfElements"] = json!(0);

    let (status, error) = app.post("/api/injection/start", ALICE, body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(error["error"].is_string());
    assert!(app.device.calls().is_empty());
}

#[tokio::test]
async fn test_injection_start_unreachable_is_bad_gateway_with_audit_row() {
    let app = test_app();
    app.device.set_reachable(false);

    let (status, error) = app
        .post("/api/injection/start", ALICE, injection_body())
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    let id = error["operationId"].as_i64().unwrap();

    let (_, history) = app.get("/api/injection/history", ALICE).await;
    let entries = history.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["id"].as_i64(), Some(id));
    assert_eq!(entries[0]["status"], "failed");
    assert!(entries[0]["endTime"].is_string());
}

#[tokio::test]
async fn test_injection_stop_under_hold_policy() {
    let app = test_app_with(LifecycleSettings {
        stop_policy: StopConfirmationPolicy::Hold,
        ..LifecycleSettings::default()
    });

    let (_, started) = app
        .post("/api/injection/start", ALICE, injection_body())
        .await;
    let id = started["operationId"].as_i64().unwrap();

    app.device.set_reachable(false);
    let (status, held) = app
        .post("/api/injection/stop", ALICE, json!({ "operationId": id }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(held["success"], true);
    assert_eq!(held["status"], "unconfirmed");

    app.device.set_reachable(true);
    let (_, stopped) = app
        .post("/api/injection/stop", ALICE, json!({ "operationId": id }))
        .await;
    assert_eq!(stopped["status"], "stopped");
}

#[tokio::test]
async fn test_movement_move_home_status_and_history() {
    let app = test_app();
    app.device.set_homing_polls(1);

    let (status, moved) = app
        .post(
            "/api/movement/move",
            ALICE,
            json!({ "axis": "z", "direction": 1, "speed": 40, "steps": 200 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(moved["success"], true);
    assert_eq!(moved["status"], "completed");

    let (_, homing) = app
        .post("/api/movement/home", ALICE, json!({ "speed": 60 }))
        .await;
    assert_eq!(homing["status"], "in_progress");
    let homing_id = homing["movementId"].as_i64().unwrap();

    let body = json!({ "homingOperationId": homing_id });
    let (_, first) = app.post("/api/movement/status", ALICE, body.clone()).await;
    assert_eq!(first["isConnected"], true);
    assert_eq!(first["isHomed"], false);
    assert_eq!(first["homingOperation"]["status"], "in_progress");

    let (_, second) = app.post("/api/movement/status", ALICE, body).await;
    assert_eq!(second["isHomed"], true);
    assert_eq!(second["status"], "Ready");
    assert_eq!(second["homingOperation"]["status"], "completed");

    let (_, history) = app.get("/api/movement/history", ALICE).await;
    let entries = history.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["action"], "home");
    assert_eq!(entries[0]["status"], "completed");
    assert_eq!(entries[1]["axis"], "Z");
}

#[tokio::test]
async fn test_movement_invalid_axis_is_bad_request() {
    let app = test_app();
    let (status, _) = app
        .post(
            "/api/movement/move",
            ALICE,
            json!({ "axis": "X", "direction": 1 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(app.device.calls().is_empty());
}

#[tokio::test]
async fn test_movement_status_without_device_is_disconnected() {
    let app = test_app();
    app.device.set_reachable(false);

    let (status, body) = app.post("/api/movement/status", ALICE, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isConnected"], false);
}

#[tokio::test]
async fn test_movement_status_without_body_reports_live_state() {
    let app = test_app();

    let (status, body) = app
        .call(Method::POST, "/api/movement/status", ALICE, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isConnected"], true);
    assert!(body.get("homingOperation").is_none());
}

#[tokio::test]
async fn test_scanner_detect_track_gates_scanning() {
    let app = test_app();

    let (status, _) = app.call(Method::POST, "/api/scanner/detect-track", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .call(Method::POST, "/api/scanner/detect-track", ALICE, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["trackId"], "TRAY-01");
    assert_eq!(body["allowScan"], true);
    assert_eq!(body["hasPreviousInjection"], false);
    assert_eq!(body["message"], "Track TRAY-01 detected - scan allowed");

    app.inference.detects.store(false, Ordering::SeqCst);
    let (status, body) = app
        .call(Method::POST, "/api/scanner/detect-track", ALICE, None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["allowScan"], false);
    assert_eq!(body["message"], "no tray in view");
}

#[tokio::test]
async fn test_device_status_and_test() {
    let app = test_app();

    let (status, body) = app.get("/api/device/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["connected"], true);

    let (status, body) = app.call(Method::POST, "/api/device/test", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    app.device.set_reachable(false);
    let (_, body) = app.get("/api/device/status", None).await;
    assert_eq!(body["connected"], false);

    let (status, _) = app.call(Method::POST, "/api/device/test", None, None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_inference_routes() {
    let app = test_app();

    let (status, track) = app.get("/api/inference/detect-track", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(track["trackId"], "TRAY-01");

    let (status, centers) = app.get("/api/inference/detect-center", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(centers["count"], 1);

    app.inference.detects.store(false, Ordering::SeqCst);
    let (status, track) = app.get("/api/inference/detect-track", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(track["success"], false);

    let (status, health) = app.get("/api/inference/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["connected"], true);

    app.inference.healthy.store(false, Ordering::SeqCst);
    let (status, _) = app.get("/api/inference/health", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}
