pub mod file_utils;

use serde::{Deserialize, Serialize};

/// Message returned by the upload route on every non-error path
pub const UPLOAD_SUCCESS_MESSAGE: &str = "Success";

/// Response of `GET /api/upload/{token_id}`
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct UploadResponse {
    pub success: bool,
    pub message: String,
}

impl UploadResponse {
    pub fn success() -> Self {
        Self {
            success: true,
            message: UPLOAD_SUCCESS_MESSAGE.to_string(),
        }
    }
}

/// JSON body of every error response
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ErrorEnvelope {
    pub code: u16,       // HTTP status code
    pub title: String,   // e.g. "UNAUTHORIZED", "Not Found"
    pub message: String, // Human-readable message
    #[serde(default)]
    pub errors: Vec<String>, // Individual validation messages, if any
    /// Error chain and backtrace, omitted in production
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<Vec<String>>,
}

/// Response from health check endpoint
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct HealthResponse {
    pub status: String, // "ok" when healthy
}
