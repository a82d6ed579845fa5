//! Application error taxonomy.
//!
//! `AppError` is the shared error type for the persistence and API layers.
//! Each variant carries enough metadata (`http_status_code`, `error_code`,
//! `is_recoverable`, `log_level`) for the HTTP layer to render a consistent
//! error body without matching on variants itself.

use thiserror::Error;

/// Severity used when logging an error at the API boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Warn,
    Error,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),

    /// Uniqueness conflict, e.g. a slug already claimed by another memorial.
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    /// Object-store failure surfaced through the persistence/API layers.
    #[error("storage error: {0}")]
    Storage(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn http_status_code(&self) -> u16 {
        match self {
            AppError::NotFound(_) => 404,
            AppError::Conflict(_) => 409,
            AppError::InvalidInput(_) => 400,
            AppError::PayloadTooLarge(_) => 413,
            AppError::Storage(_) => 502,
            AppError::Database(_) | AppError::Internal(_) => 500,
        }
    }

    /// Machine-readable error code for programmatic handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::InvalidInput(_) => "INVALID_INPUT",
            AppError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            AppError::Storage(_) => "STORAGE_ERROR",
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether retrying the same request can reasonably succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AppError::Storage(_) | AppError::Database(_) | AppError::Internal(_)
        )
    }

    pub fn log_level(&self) -> LogLevel {
        match self {
            AppError::NotFound(_) | AppError::InvalidInput(_) | AppError::PayloadTooLarge(_) => {
                LogLevel::Debug
            }
            AppError::Conflict(_) => LogLevel::Warn,
            AppError::Storage(_) | AppError::Database(_) | AppError::Internal(_) => LogLevel::Error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::NotFound("x".into()).http_status_code(), 404);
        assert_eq!(AppError::Conflict("x".into()).http_status_code(), 409);
        assert_eq!(AppError::InvalidInput("x".into()).http_status_code(), 400);
        assert_eq!(AppError::Storage("x".into()).http_status_code(), 502);
        assert_eq!(AppError::Internal("x".into()).http_status_code(), 500);
    }

    #[test]
    fn test_recoverability() {
        assert!(AppError::Storage("s3 down".into()).is_recoverable());
        assert!(!AppError::Conflict("slug taken".into()).is_recoverable());
        assert!(!AppError::InvalidInput("bad slug".into()).is_recoverable());
    }

    #[test]
    fn test_log_levels() {
        assert_eq!(AppError::NotFound("x".into()).log_level(), LogLevel::Debug);
        assert_eq!(AppError::Conflict("x".into()).log_level(), LogLevel::Warn);
        assert_eq!(AppError::Internal("x".into()).log_level(), LogLevel::Error);
    }
}
