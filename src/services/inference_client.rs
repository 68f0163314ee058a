//! Client for the vision/AI inference service
//!
//! Inference on the service side can take tens of seconds, so requests use a
//! long timeout. Results never raise: transport problems come back as
//! `success = false` with a readable message.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::models::inference::{
    CenterDetection, CenterDetectionReply, TrackDetection, TrackDetectionReply,
};

pub const DEFAULT_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_MAX_RETRIES: u32 = 2;
pub const DEFAULT_RETRY_DELAY_SECS: u64 = 10;

/// Attempt budget used by the detection endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            delay: Duration::from_secs(DEFAULT_RETRY_DELAY_SECS),
        }
    }
}

const TRACK_PATH: &str = "/api/track/detect";
const CENTER_PATH: &str = "/api/center/detect";
const HEALTH_PATH: &str = "/api/health";

#[async_trait]
pub trait InferenceApi: Send + Sync {
    async fn detect_track(&self) -> TrackDetection;

    async fn detect_centers(&self) -> CenterDetection;

    async fn check_health(&self) -> bool;

    /// Where the service lives, for status reporting
    fn base_url(&self) -> &str;

    /// `detect_track` with up to `max_retries` attempts and a fixed delay
    async fn detect_track_with_retry(&self, max_retries: u32, delay: Duration) -> TrackDetection {
        with_fixed_retry(
            "detect_track",
            max_retries,
            delay,
            || self.detect_track(),
            |result: &TrackDetection| result.success,
        )
        .await
    }

    /// `detect_centers` with up to `max_retries` attempts and a fixed delay
    async fn detect_centers_with_retry(
        &self,
        max_retries: u32,
        delay: Duration,
    ) -> CenterDetection {
        with_fixed_retry(
            "detect_centers",
            max_retries,
            delay,
            || self.detect_centers(),
            |result: &CenterDetection| result.success,
        )
        .await
    }
}

/// Run `attempt` until `succeeded` holds or `max_retries` attempts are spent,
/// sleeping `delay` between attempts. Returns the last result either way.
/// At least one attempt is always made.
pub async fn with_fixed_retry<T, F, Fut, S>(
    operation: &str,
    max_retries: u32,
    delay: Duration,
    attempt: F,
    succeeded: S,
) -> T
where
    F: Fn() -> Fut,
    Fut: Future<Output = T>,
    S: Fn(&T) -> bool,
{
    let max_attempts = max_retries.max(1);
    let mut attempts = 0;

    loop {
        attempts += 1;
        let result = attempt().await;

        if succeeded(&result) {
            if attempts > 1 {
                info!(operation = %operation, attempts, "Inference succeeded after retry");
            }
            return result;
        }

        if attempts >= max_attempts {
            error!(operation = %operation, attempts, "Inference retries exhausted");
            return result;
        }

        warn!(
            operation = %operation,
            attempt = attempts,
            max_attempts,
            delay_secs = delay.as_secs(),
            "Inference attempt failed, retrying..."
        );
        tokio::time::sleep(delay).await;
    }
}

/// reqwest-backed inference client
#[derive(Clone)]
pub struct HttpInferenceClient {
    client: Client,
    base_url: String,
}

impl HttpInferenceClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let client = Client::builder().timeout(timeout).build()?;

        info!(base_url = %base_url, timeout_secs = timeout.as_secs(), "Inference client configured");

        Ok(Self { client, base_url })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, String> {
        let url = format!("{}{}", self.base_url, path);
        info!(url = %url, "Sending inference request");

        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                error!(url = %url, error = %e, "Inference request timed out");
                "Timeout connecting to the inference service. Check if it is running.".to_string()
            } else {
                error!(url = %url, error = %e, "Inference request failed");
                format!("Cannot connect to the inference service at {}", self.base_url)
            }
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| format!("Error reading inference reply: {}", e))?;

        if !status.is_success() {
            error!(url = %url, status = %status, body = %body, "Inference service returned error status");
            return Err(format!("Inference service returned {}: {}", status, body));
        }

        serde_json::from_str(&body).map_err(|e| {
            error!(url = %url, error = %e, body = %body, "Unreadable inference reply");
            format!("Unreadable inference reply: {}", e)
        })
    }
}

#[async_trait]
impl InferenceApi for HttpInferenceClient {
    async fn detect_track(&self) -> TrackDetection {
        match self.get_json::<TrackDetectionReply>(TRACK_PATH).await {
            Ok(reply) => {
                let result = TrackDetection::from(reply);
                info!(success = result.success, track_id = %result.track_id, "Track detection finished");
                result
            }
            Err(message) => TrackDetection::failure(message),
        }
    }

    async fn detect_centers(&self) -> CenterDetection {
        match self.get_json::<CenterDetectionReply>(CENTER_PATH).await {
            Ok(reply) => {
                let result = CenterDetection::from(reply);
                info!(success = result.success, count = result.count, "Center detection finished");
                result
            }
            Err(message) => CenterDetection::failure(message),
        }
    }

    async fn check_health(&self) -> bool {
        let url = format!("{}{}", self.base_url, HEALTH_PATH);
        match self.client.get(&url).send().await {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                warn!(url = %url, status = %response.status(), "Inference health check failed");
                false
            }
            Err(e) => {
                error!(url = %url, error = %e, "Inference health check error");
                false
            }
        }
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails the first `failures` calls, then succeeds
    struct FlakyInference {
        failures: u32,
        calls: AtomicU32,
    }

    impl FlakyInference {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                calls: AtomicU32::new(0),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }

        fn next_succeeds(&self) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst) >= self.failures
        }
    }

    #[async_trait]
    impl InferenceApi for FlakyInference {
        async fn detect_track(&self) -> TrackDetection {
            if self.next_succeeds() {
                TrackDetection {
                    success: true,
                    track_id: "T-7".to_string(),
                    detected_texts: Vec::new(),
                    error: None,
                }
            } else {
                TrackDetection::failure(format!("attempt {} failed", self.calls()))
            }
        }

        async fn detect_centers(&self) -> CenterDetection {
            if self.next_succeeds() {
                CenterDetection {
                    success: true,
                    count: 0,
                    centers: Vec::new(),
                    error: None,
                    timestamp: chrono::Utc::now(),
                }
            } else {
                CenterDetection::failure("no frame")
            }
        }

        async fn check_health(&self) -> bool {
            true
        }

        fn base_url(&self) -> &str {
            "http://fake"
        }
    }

    #[tokio::test]
    async fn test_retry_stops_on_first_success() {
        let service = FlakyInference::new(1);
        let result = service.detect_track_with_retry(2, Duration::ZERO).await;

        assert!(result.success);
        assert_eq!(result.track_id, "T-7");
        assert_eq!(service.calls(), 2);
    }

    #[tokio::test]
    async fn test_retry_returns_last_failure_when_exhausted() {
        let service = FlakyInference::new(10);
        let result = service.detect_track_with_retry(3, Duration::ZERO).await;

        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("attempt 3 failed"));
        assert_eq!(service.calls(), 3);
    }

    #[tokio::test]
    async fn test_retry_makes_single_attempt_when_first_succeeds() {
        let service = FlakyInference::new(0);
        let result = service.detect_centers_with_retry(5, Duration::ZERO).await;

        assert!(result.success);
        assert_eq!(service.calls(), 1);
    }

    #[tokio::test]
    async fn test_zero_retries_still_attempts_once() {
        let service = FlakyInference::new(10);
        let result = service.detect_centers_with_retry(0, Duration::ZERO).await;

        assert!(!result.success);
        assert_eq!(service.calls(), 1);
    }

    #[tokio::test]
    async fn test_unreachable_service_reports_failure() {
        // Port 9 on localhost is discard; nothing should be listening there
        let client = HttpInferenceClient::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();

        let track = client.detect_track().await;
        assert!(!track.success);
        assert!(track.error.is_some());
        assert!(!client.check_health().await);
    }
}
