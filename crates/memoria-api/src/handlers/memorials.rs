//! Memorial CRUD. Create and update run the full asset synchronization
//! workflow; delete removes the rows first (cascade) and reconciles the
//! object store afterwards, best-effort.

use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use utoipa::ToSchema;
use uuid::Uuid;

use memoria_core::constants::MAX_UPLOAD_BYTES;
use memoria_core::models::{AssetCandidate, MemorialUpdate, MemorialWithGallery};
use memoria_core::validation::{normalize_video_ref, slugify, validate_slug};
use memoria_core::AppError;
use memoria_sync::SyncOutcome;

use crate::error::HttpAppError;
use crate::state::AppState;

/// One desired gallery entry: either a reference to an already-stored image
/// (`storage_key`) or a new image carried as base64 bytes.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AssetPayload {
    pub storage_key: Option<String>,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data_base64: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpsertMemorialRequest {
    pub title: String,
    /// Derived from the title when omitted.
    pub slug: Option<String>,
    pub description: Option<String>,
    /// Full YouTube URL or bare 11-character id.
    pub youtube_video_id: Option<String>,
    #[serde(default)]
    pub images: Vec<AssetPayload>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GalleryImageResponse {
    pub id: Uuid,
    pub storage_key: String,
    pub url: String,
    pub caption: Option<String>,
    pub position: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MemorialResponse {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub youtube_video_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub gallery: Vec<GalleryImageResponse>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeleteMemorialResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl MemorialResponse {
    fn from_record(record: MemorialWithGallery, warnings: Vec<String>) -> Self {
        let MemorialWithGallery { memorial, gallery } = record;
        MemorialResponse {
            id: memorial.id,
            title: memorial.title,
            slug: memorial.slug,
            description: memorial.description,
            youtube_video_id: memorial.youtube_video_id,
            created_at: memorial.created_at,
            updated_at: memorial.updated_at,
            gallery: gallery
                .into_iter()
                .map(|image| GalleryImageResponse {
                    id: image.id,
                    storage_key: image.storage_key,
                    url: image.url,
                    caption: image.caption,
                    position: image.position,
                })
                .collect(),
            warnings,
        }
    }

    fn from_outcome(outcome: SyncOutcome) -> Self {
        let warnings = outcome.warnings.iter().map(|w| w.to_string()).collect();
        Self::from_record(outcome.memorial, warnings)
    }
}

fn build_update(request: &UpsertMemorialRequest) -> Result<MemorialUpdate, AppError> {
    let title = request.title.trim().to_string();
    if title.is_empty() {
        return Err(AppError::InvalidInput("Title is required".to_string()));
    }

    // Operator-supplied slugs go through the same normalization the editor
    // applies while typing.
    let slug = match request.slug.as_deref().map(str::trim) {
        Some(s) if !s.is_empty() => slugify(s),
        _ => slugify(&title),
    };
    validate_slug(&slug)?;

    let description = request
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string);

    Ok(MemorialUpdate {
        title,
        slug,
        description,
        youtube_video_id: normalize_video_ref(request.youtube_video_id.as_deref()),
    })
}

/// Convert payload entries into candidates, de-duplicating repeated storage
/// keys: the differ assumes desired keys are unique within one run.
fn build_candidates(payloads: Vec<AssetPayload>) -> Result<Vec<AssetCandidate>, AppError> {
    let mut candidates = Vec::with_capacity(payloads.len());
    let mut seen_keys: HashSet<String> = HashSet::new();

    for payload in payloads {
        if let Some(storage_key) = payload.storage_key {
            if !seen_keys.insert(storage_key.clone()) {
                continue;
            }
            candidates.push(AssetCandidate::Existing {
                storage_key,
                caption: payload.caption,
            });
            continue;
        }

        let content_type = payload
            .content_type
            .ok_or_else(|| {
                AppError::InvalidInput("content_type is required for new images".to_string())
            })?;
        if !content_type.starts_with("image/") {
            return Err(AppError::InvalidInput(format!(
                "Unsupported content type '{}'",
                content_type
            )));
        }
        let data = payload.data_base64.ok_or_else(|| {
            AppError::InvalidInput("data_base64 is required for new images".to_string())
        })?;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(data.as_bytes())
            .map_err(|_| AppError::InvalidInput("data_base64 is not valid base64".to_string()))?;
        if bytes.is_empty() {
            return Err(AppError::InvalidInput("Image data is empty".to_string()));
        }
        if bytes.len() > MAX_UPLOAD_BYTES {
            return Err(AppError::PayloadTooLarge(format!(
                "Image exceeds the maximum upload size of {} MB",
                MAX_UPLOAD_BYTES / 1024 / 1024
            )));
        }

        candidates.push(AssetCandidate::Pending {
            file_name: payload.file_name.unwrap_or_else(|| "imagen.jpg".to_string()),
            content_type,
            bytes,
            caption: payload.caption,
        });
    }

    Ok(candidates)
}

/// Create a memorial with its initial gallery.
#[utoipa::path(
    post,
    path = "/api/memorials",
    request_body = UpsertMemorialRequest,
    responses(
        (status = 201, description = "Memorial created", body = MemorialResponse),
        (status = 400, description = "Invalid request"),
        (status = 409, description = "Slug already in use"),
        (status = 502, description = "Object store unavailable")
    ),
    tag = "memorials"
)]
#[tracing::instrument(skip(state, request))]
pub async fn create_memorial(
    State(state): State<Arc<AppState>>,
    Json(request): Json<UpsertMemorialRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let parent = build_update(&request)?;
    let candidates = build_candidates(request.images)?;

    let outcome = state
        .coordinator
        .create(parent, candidates, CancellationToken::new())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(MemorialResponse::from_outcome(outcome)),
    ))
}

/// Edit a memorial, synchronizing its gallery.
#[utoipa::path(
    put,
    path = "/api/memorials/{id}",
    params(("id" = Uuid, Path, description = "Memorial ID")),
    request_body = UpsertMemorialRequest,
    responses(
        (status = 200, description = "Memorial updated", body = MemorialResponse),
        (status = 400, description = "Invalid request"),
        (status = 404, description = "Memorial not found"),
        (status = 409, description = "Slug already in use"),
        (status = 502, description = "Object store unavailable")
    ),
    tag = "memorials"
)]
#[tracing::instrument(skip(state, request))]
pub async fn update_memorial(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpsertMemorialRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let parent = build_update(&request)?;
    let candidates = build_candidates(request.images)?;

    let outcome = state
        .coordinator
        .synchronize(id, parent, candidates, CancellationToken::new())
        .await?;

    Ok(Json(MemorialResponse::from_outcome(outcome)))
}

/// List all memorials, newest first.
#[utoipa::path(
    get,
    path = "/api/memorials",
    responses(
        (status = 200, description = "All memorials", body = Vec<MemorialResponse>)
    ),
    tag = "memorials"
)]
#[tracing::instrument(skip(state))]
pub async fn list_memorials(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpAppError> {
    let memorials = state.repository.list_memorials().await?;
    let responses: Vec<MemorialResponse> = memorials
        .into_iter()
        .map(|record| MemorialResponse::from_record(record, Vec::new()))
        .collect();
    Ok(Json(responses))
}

/// Fetch one memorial by id.
#[utoipa::path(
    get,
    path = "/api/memorials/{id}",
    params(("id" = Uuid, Path, description = "Memorial ID")),
    responses(
        (status = 200, description = "Memorial", body = MemorialResponse),
        (status = 404, description = "Memorial not found")
    ),
    tag = "memorials"
)]
#[tracing::instrument(skip(state))]
pub async fn get_memorial(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let record = state
        .repository
        .get_memorial(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Memorial not found".to_string()))?;
    Ok(Json(MemorialResponse::from_record(record, Vec::new())))
}

/// Public fetch by slug, used by the memorial page.
#[utoipa::path(
    get,
    path = "/api/recuerdos/{slug}",
    params(("slug" = String, Path, description = "Memorial slug")),
    responses(
        (status = 200, description = "Memorial", body = MemorialResponse),
        (status = 404, description = "Memorial not found")
    ),
    tag = "memorials"
)]
#[tracing::instrument(skip(state))]
pub async fn get_memorial_by_slug(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, HttpAppError> {
    let record = state
        .repository
        .get_memorial_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound("Memorial not found".to_string()))?;
    Ok(Json(MemorialResponse::from_record(record, Vec::new())))
}

/// Delete a memorial. Gallery rows cascade with the parent; the backing
/// objects are removed afterwards, best-effort, with failures reported as
/// warnings.
#[utoipa::path(
    delete,
    path = "/api/memorials/{id}",
    params(("id" = Uuid, Path, description = "Memorial ID")),
    responses(
        (status = 200, description = "Memorial deleted", body = DeleteMemorialResponse),
        (status = 404, description = "Memorial not found")
    ),
    tag = "memorials"
)]
#[tracing::instrument(skip(state))]
pub async fn delete_memorial(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let storage_keys = state
        .repository
        .delete_memorial(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Memorial not found".to_string()))?;

    let warnings = state
        .coordinator
        .reconcile_deleted(&storage_keys)
        .await
        .iter()
        .map(|w| w.to_string())
        .collect();

    Ok(Json(DeleteMemorialResponse {
        success: true,
        warnings,
    }))
}
