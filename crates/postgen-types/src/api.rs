use serde::{Deserialize, Serialize};

/// Generic message returned for any upstream failure
pub const PROCESSING_FAILURE: &str = "Failed to process Request";

/// Body of `POST /api/chat` and `POST /api/chat_stream`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub message: String,
}

impl GenerateRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Success body of the non-streaming endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub response: String,
    pub status: u16,
}

/// Error body shared by both endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureResponse {
    #[serde(rename = "Error")]
    pub error: String,
    pub status: u16,
}
