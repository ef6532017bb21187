use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "message")]
pub enum AppError {
    #[error("API error: {0}")]
    ApiError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimitError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("External service error: {0}")]
    ExternalServiceError(String),

    #[error("Persistence error: {0}")]
    PersistenceError(String),

    #[error("Operation timed out: {0}")]
    Timeout(String),
}

impl AppError {
    /// Connectivity-class failures affect the whole remote endpoint, not a
    /// single job id. The poller counts these toward its disconnect
    /// threshold; per-id application failures never do.
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            AppError::ExternalServiceError(_)
                | AppError::RateLimitError(_)
                | AppError::Unauthorized(_)
        )
    }

    /// Whether a retry of the same operation can plausibly succeed.
    /// Auth failures are terminal: retrying with the same credentials
    /// cannot help.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::ExternalServiceError(_) | AppError::RateLimitError(_) => true,
            AppError::InternalError(_) | AppError::SerializationError(_) => true,
            AppError::ApiError(msg) => {
                !msg.to_lowercase().contains("not found")
                    && !msg.to_lowercase().contains("unauthorized")
                    && !msg.to_lowercase().contains("forbidden")
                    && !msg.to_lowercase().contains("bad request")
            }
            AppError::NotFound(_)
            | AppError::InvalidInput(_)
            | AppError::Unauthorized(_)
            | AppError::ValidationError(_)
            | AppError::PersistenceError(_)
            | AppError::Timeout(_) => false,
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::ExternalServiceError("Request timeout".to_string())
        } else if err.is_connect() {
            AppError::ExternalServiceError("Failed to connect to remote service".to_string())
        } else if let Some(status) = err.status() {
            match status.as_u16() {
                429 => AppError::RateLimitError("Too many requests".to_string()),
                404 => AppError::NotFound("Remote resource not found".to_string()),
                401 | 403 => {
                    AppError::Unauthorized("Not authorized to access remote service".to_string())
                }
                _ => AppError::ApiError(format!("HTTP {}: {}", status, err)),
            }
        } else {
            AppError::ApiError(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::SerializationError(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::PersistenceError(err.to_string())
    }
}

// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;
