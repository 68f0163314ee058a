use serde::{Deserialize, Serialize};

/// Error body returned by every handler
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: String,
    /// Audit row written before the failure, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<i32>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            operation_id: None,
        }
    }
}
