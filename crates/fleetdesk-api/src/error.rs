//! API error types

use serde_json::Value;
use thiserror::Error;

/// Shown to the user when the server gives no usable message
pub const FALLBACK_MESSAGE: &str = "Something went wrong";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("Request failed with status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ApiError>;

impl ApiError {
    /// Build an error from a non-2xx response body
    pub fn from_response(status: u16, body: &str) -> Self {
        let message = server_message(body).unwrap_or_else(|| FALLBACK_MESSAGE.to_string());
        if status == 401 {
            ApiError::Unauthorized { message }
        } else {
            ApiError::Status { status, message }
        }
    }

    /// HTTP status, when the server answered
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized { .. } => Some(401),
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Text suitable for a user-visible notification
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Unauthorized { message } | ApiError::Status { message, .. } => {
                message.clone()
            }
            _ => FALLBACK_MESSAGE.to_string(),
        }
    }

    /// Connection failures, timeouts and overloaded-server statuses
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Http(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            ApiError::Status { status, .. } => matches!(status, 429 | 500 | 502 | 503 | 504),
            _ => false,
        }
    }
}

/// Pull `message` (or `error`) out of a JSON error payload
fn server_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["message", "error"]
        .iter()
        .filter_map(|key| value.get(*key))
        .find_map(|v| v.as_str())
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}
