//! Upload broker endpoints: mint a presigned PUT for a direct client upload,
//! and remove a stored object. These exist for clients that upload before
//! saving; the memorial upsert path uploads server-side through the
//! synchronization coordinator.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use memoria_core::AppError;
use memoria_storage::{mint_storage_key, storage_key_from_locator};

use crate::error::HttpAppError;
use crate::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct AuthorizeUploadRequest {
    pub file_name: String,
    pub content_type: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthorizeUploadResponse {
    /// Presigned PUT target, valid for `valid_secs`.
    pub upload_url: String,
    /// Public URL the object will have once transferred.
    pub file_url: String,
    pub storage_key: String,
    pub valid_secs: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RemoveUploadResponse {
    pub success: bool,
}

/// Issue a short-lived write authorization for one new object.
#[utoipa::path(
    post,
    path = "/api/uploads",
    request_body = AuthorizeUploadRequest,
    responses(
        (status = 200, description = "Upload authorized", body = AuthorizeUploadResponse),
        (status = 400, description = "Unsupported content type"),
        (status = 502, description = "Credential service unreachable")
    ),
    tag = "uploads"
)]
#[tracing::instrument(skip(state))]
pub async fn authorize_upload(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AuthorizeUploadRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    if !request.content_type.starts_with("image/") {
        return Err(HttpAppError(AppError::InvalidInput(format!(
            "Unsupported content type '{}'",
            request.content_type
        ))));
    }

    let storage_key = mint_storage_key(&request.file_name);
    let authorization = state
        .broker
        .authorize(&storage_key, &request.content_type)
        .await?;

    Ok(Json(AuthorizeUploadResponse {
        upload_url: authorization.url,
        file_url: state.broker.public_url(&storage_key),
        storage_key,
        valid_secs: authorization.valid_secs,
    }))
}

/// Remove one stored object. Idempotent; accepts a bare key or a full
/// public URL (older clients send the URL).
#[utoipa::path(
    delete,
    path = "/api/uploads/{key}",
    params(("key" = String, Path, description = "Storage key or public URL")),
    responses(
        (status = 200, description = "Object removed (or already gone)", body = RemoveUploadResponse),
        (status = 502, description = "Removal failed")
    ),
    tag = "uploads"
)]
#[tracing::instrument(skip(state))]
pub async fn remove_upload(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, HttpAppError> {
    let decoded = percent_encoding::percent_decode_str(&key)
        .decode_utf8_lossy()
        .to_string();
    let storage_key = storage_key_from_locator(&decoded);

    state.broker.remove(&storage_key).await?;

    Ok(Json(RemoveUploadResponse { success: true }))
}
