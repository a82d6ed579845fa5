//! HTTP error response conversion.
//!
//! `HttpAppError` wraps `AppError` so `IntoResponse` can be implemented here
//! (orphan rules: both the trait and `AppError` are foreign). Saga errors
//! from `memoria-sync` fold into the same taxonomy.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use memoria_core::{AppError, LogLevel};
use memoria_storage::StorageError;
use memoria_sync::SyncError;

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    /// Machine-readable error code for programmatic handling.
    pub code: String,
    /// Whether retrying the same request can reasonably succeed.
    pub recoverable: bool,
}

#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

impl From<SyncError> for HttpAppError {
    fn from(err: SyncError) -> Self {
        let app = match err {
            SyncError::NotFound(msg) => AppError::NotFound(msg),
            SyncError::Conflict(msg) => AppError::Conflict(msg),
            SyncError::InvalidInput(msg) => AppError::InvalidInput(msg),
            SyncError::Prepare(e) => {
                AppError::InvalidInput(format!("Image could not be processed: {}", e))
            }
            SyncError::Authorization(msg) | SyncError::Transfer(msg) => AppError::Storage(msg),
            SyncError::StorageLayer(msg) => AppError::Internal(msg),
            SyncError::Cancelled => AppError::Internal("Synchronization cancelled".to_string()),
        };
        HttpAppError(app)
    }
}

impl From<StorageError> for HttpAppError {
    fn from(err: StorageError) -> Self {
        HttpAppError(AppError::Storage(err.to_string()))
    }
}

fn log_error(error: &AppError) {
    let code = error.error_code();
    match error.log_level() {
        LogLevel::Debug => tracing::debug!(error = %error, code = code, "Request failed"),
        LogLevel::Warn => tracing::warn!(error = %error, code = code, "Request failed"),
        LogLevel::Error => tracing::error!(error = %error, code = code, "Request failed"),
    }
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let app_error = &self.0;

        let status = StatusCode::from_u16(app_error.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        log_error(app_error);

        let body = Json(ErrorResponse {
            error: app_error.to_string(),
            code: app_error.error_code().to_string(),
            recoverable: app_error.is_recoverable(),
        });

        (status, body).into_response()
    }
}
