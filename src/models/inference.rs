//! Vision/AI inference service types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedText {
    pub text: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedCenter {
    pub label: String,
    pub confidence: f64,
    pub x: f64,
    pub y: f64,
}

/// Result of a track (tray label) detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackDetection {
    pub success: bool,
    pub track_id: String,
    pub detected_texts: Vec<DetectedText>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TrackDetection {
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            track_id: String::new(),
            detected_texts: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// Result of an object-center detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CenterDetection {
    pub success: bool,
    pub count: u32,
    pub centers: Vec<DetectedCenter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl CenterDetection {
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            count: 0,
            centers: Vec::new(),
            error: Some(error.into()),
            timestamp: Utc::now(),
        }
    }
}

/// Raw body of GET {base}/api/track/detect
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackDetectionReply {
    #[serde(default)]
    pub success: bool,
    #[serde(default, alias = "track_id")]
    pub track_id: Option<String>,
    #[serde(default, alias = "detected_texts")]
    pub detected_texts: Vec<DetectedText>,
    #[serde(default)]
    pub error: Option<String>,
}

impl From<TrackDetectionReply> for TrackDetection {
    fn from(reply: TrackDetectionReply) -> Self {
        Self {
            success: reply.success,
            track_id: reply.track_id.unwrap_or_default(),
            detected_texts: reply.detected_texts,
            error: reply.error.filter(|e| !e.is_empty()),
        }
    }
}

/// Raw body of GET {base}/api/center/detect
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CenterDetectionReply {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub count: u32,
    #[serde(default)]
    pub centers: Vec<DetectedCenter>,
    #[serde(default)]
    pub error: Option<String>,
    /// Unix seconds, 0 when the service did not stamp the result
    #[serde(default)]
    pub timestamp: f64,
}

impl From<CenterDetectionReply> for CenterDetection {
    fn from(reply: CenterDetectionReply) -> Self {
        let timestamp = if reply.timestamp > 0.0 {
            DateTime::from_timestamp(reply.timestamp as i64, 0).unwrap_or_else(Utc::now)
        } else {
            Utc::now()
        };

        Self {
            success: reply.success,
            count: reply.count,
            centers: reply.centers,
            error: reply.error.filter(|e| !e.is_empty()),
            timestamp,
        }
    }
}

/// Response for GET /api/inference/health
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InferenceHealthResponse {
    pub connected: bool,
    pub api_url: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_reply_accepts_both_casings() {
        let camel: TrackDetectionReply = serde_json::from_str(
            r#"{"success":true,"trackId":"T-12","detectedTexts":[{"text":"T-12","confidence":0.93}]}"#,
        )
        .unwrap();
        let snake: TrackDetectionReply =
            serde_json::from_str(r#"{"success":true,"track_id":"T-12","detected_texts":[]}"#).unwrap();

        assert_eq!(TrackDetection::from(camel).track_id, "T-12");
        assert_eq!(TrackDetection::from(snake).track_id, "T-12");
    }

    #[test]
    fn test_empty_error_string_is_dropped() {
        let reply: TrackDetectionReply =
            serde_json::from_str(r#"{"success":true,"trackId":"A","error":""}"#).unwrap();
        assert!(TrackDetection::from(reply).error.is_none());
    }

    #[test]
    fn test_center_reply_timestamp() {
        let reply: CenterDetectionReply = serde_json::from_str(
            r#"{"success":true,"count":1,"centers":[{"label":"egg","confidence":0.8,"x":10.0,"y":20.0}],"timestamp":1700000000}"#,
        )
        .unwrap();
        let detection = CenterDetection::from(reply);
        assert_eq!(detection.count, 1);
        assert_eq!(detection.timestamp.timestamp(), 1_700_000_000);
    }
}
