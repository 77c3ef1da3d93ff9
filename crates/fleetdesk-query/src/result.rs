//! Query outcomes

use fleetdesk_api::{ApiError, FALLBACK_MESSAGE};
use thiserror::Error;

/// Error shared by every caller waiting on the same request, hence `Clone`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("API error{}: {message}", status.map(|s| format!(" ({})", s)).unwrap_or_default())]
    Api { status: Option<u16>, message: String },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Missing record identifier")]
    MissingId,
}

impl QueryError {
    pub fn status(&self) -> Option<u16> {
        match self {
            QueryError::Api { status, .. } => *status,
            _ => None,
        }
    }

    /// Text suitable for a user-visible notification
    pub fn user_message(&self) -> String {
        match self {
            QueryError::Api { message, .. } => message.clone(),
            _ => FALLBACK_MESSAGE.to_string(),
        }
    }
}

impl From<ApiError> for QueryError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::InvalidResponse(msg) => QueryError::Decode(msg),
            other => QueryError::Api {
                status: other.status(),
                message: other.user_message(),
            },
        }
    }
}

impl From<serde_json::Error> for QueryError {
    fn from(err: serde_json::Error) -> Self {
        QueryError::Decode(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    /// Disabled; no request was made
    Idle,
    /// A request is in flight
    Loading,
    Success,
    Error,
}

/// Snapshot handed to a consumer: data, loading and error flags
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult<T> {
    pub status: QueryStatus,
    pub data: Option<T>,
    pub error: Option<QueryError>,
}

impl<T> QueryResult<T> {
    pub fn idle() -> Self {
        Self {
            status: QueryStatus::Idle,
            data: None,
            error: None,
        }
    }

    /// In flight; `data` carries the previous value if there is one
    pub fn loading(previous: Option<T>) -> Self {
        Self {
            status: QueryStatus::Loading,
            data: previous,
            error: None,
        }
    }

    pub fn success(data: T) -> Self {
        Self {
            status: QueryStatus::Success,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(error: QueryError) -> Self {
        Self {
            status: QueryStatus::Error,
            data: None,
            error: Some(error),
        }
    }

    pub fn is_idle(&self) -> bool {
        self.status == QueryStatus::Idle
    }

    pub fn is_loading(&self) -> bool {
        self.status == QueryStatus::Loading
    }

    pub fn is_error(&self) -> bool {
        self.status == QueryStatus::Error
    }

    pub fn is_success(&self) -> bool {
        self.status == QueryStatus::Success
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> QueryResult<U> {
        QueryResult {
            status: self.status,
            data: self.data.map(f),
            error: self.error,
        }
    }

    /// Convert into a plain `Result`; idle and loading count as no data
    pub fn into_result(self) -> Result<Option<T>, QueryError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.data),
        }
    }
}

impl<T> From<Result<T, QueryError>> for QueryResult<T> {
    fn from(result: Result<T, QueryError>) -> Self {
        match result {
            Ok(data) => Self::success(data),
            Err(error) => Self::error(error),
        }
    }
}
