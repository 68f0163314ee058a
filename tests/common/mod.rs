#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
};
use chrono::Utc;
use ovocontrol_backend::{
    AppState,
    models::inference::{CenterDetection, DetectedCenter, TrackDetection},
    routes::build_router,
    services::{
        inference_client::{InferenceApi, RetryPolicy},
        lifecycle::LifecycleSettings,
        operation_store::Stores,
        simulated_device::SimulatedDevice,
    },
};
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tower::ServiceExt;

/// Inference service double that answers instantly
pub struct ScriptedInference {
    pub healthy: AtomicBool,
    pub detects: AtomicBool,
}

impl ScriptedInference {
    pub fn new() -> Self {
        Self {
            healthy: AtomicBool::new(true),
            detects: AtomicBool::new(true),
        }
    }
}

#[async_trait]
impl InferenceApi for ScriptedInference {
    async fn detect_track(&self) -> TrackDetection {
        if self.detects.load(Ordering::SeqCst) {
            TrackDetection {
                success: true,
                track_id: "TRAY-01".to_string(),
                detected_texts: Vec::new(),
                error: None,
            }
        } else {
            TrackDetection::failure("no tray in view")
        }
    }

    async fn detect_centers(&self) -> CenterDetection {
        if self.detects.load(Ordering::SeqCst) {
            CenterDetection {
                success: true,
                count: 1,
                centers: vec![DetectedCenter {
                    label: "egg".to_string(),
                    confidence: 0.93,
                    x: 120.0,
                    y: 80.0,
                }],
                error: None,
                timestamp: Utc::now(),
            }
        } else {
            CenterDetection::failure("no frame")
        }
    }

    async fn check_health(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }

    fn base_url(&self) -> &str {
        "http://inference.test"
    }
}

pub struct TestApp {
    pub router: Router,
    pub device: Arc<SimulatedDevice>,
    pub inference: Arc<ScriptedInference>,
}

pub fn test_app() -> TestApp {
    test_app_with(LifecycleSettings::default())
}

pub fn test_app_with(settings: LifecycleSettings) -> TestApp {
    let device = Arc::new(SimulatedDevice::new());
    let inference = Arc::new(ScriptedInference::new());
    let retry = RetryPolicy {
        max_retries: 2,
        delay: Duration::ZERO,
    };

    let state = AppState::new(
        Stores::in_memory(),
        device.clone(),
        inference.clone(),
        settings,
        retry,
    );

    TestApp {
        router: build_router(state, &[]),
        device,
        inference,
    }
}

impl TestApp {
    /// Send one request and decode the response body as JSON
    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        user: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header("X-User-Id", user);
        }

        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).to_string()))
        };

        (status, json)
    }

    pub async fn get(&self, uri: &str, user: Option<&str>) -> (StatusCode, Value) {
        self.call(Method::GET, uri, user, None).await
    }

    pub async fn post(&self, uri: &str, user: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.call(Method::POST, uri, user, Some(body)).await
    }
}
