use utoipa::OpenApi;

use crate::error::ErrorResponse;
use crate::handlers::health::HealthResponse;
use crate::handlers::memorials::{
    AssetPayload, DeleteMemorialResponse, GalleryImageResponse, MemorialResponse,
    UpsertMemorialRequest,
};
use crate::handlers::uploads::{
    AuthorizeUploadRequest, AuthorizeUploadResponse, RemoveUploadResponse,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health::health,
        crate::handlers::memorials::create_memorial,
        crate::handlers::memorials::update_memorial,
        crate::handlers::memorials::list_memorials,
        crate::handlers::memorials::get_memorial,
        crate::handlers::memorials::get_memorial_by_slug,
        crate::handlers::memorials::delete_memorial,
        crate::handlers::uploads::authorize_upload,
        crate::handlers::uploads::remove_upload,
    ),
    components(schemas(
        ErrorResponse,
        HealthResponse,
        AssetPayload,
        UpsertMemorialRequest,
        MemorialResponse,
        GalleryImageResponse,
        DeleteMemorialResponse,
        AuthorizeUploadRequest,
        AuthorizeUploadResponse,
        RemoveUploadResponse,
    )),
    tags(
        (name = "memorials", description = "Memorial pages and their galleries"),
        (name = "uploads", description = "Direct-upload authorization and removal"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;
