use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One memorial page. Gallery rows live in `memorial_images` and cascade on
/// delete; the corresponding storage objects do not (reconciliation is the
/// synchronization workflow's job).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Memorial {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub youtube_video_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One gallery image row. `storage_key` uniquely identifies one live
/// object-store entry; keys are minted fresh per upload and never reused.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct GalleryImage {
    pub id: Uuid,
    pub memorial_id: Uuid,
    pub storage_key: String,
    pub url: String,
    pub caption: Option<String>,
    pub position: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MemorialWithGallery {
    #[serde(flatten)]
    pub memorial: Memorial,
    /// Ordered by `position` ascending.
    pub gallery: Vec<GalleryImage>,
}

/// Metadata fields applied to the parent row on every save.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemorialUpdate {
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub youtube_video_id: Option<String>,
}

/// Caption change for a kept gallery row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionUpdate {
    pub id: Uuid,
    pub caption: Option<String>,
}

/// Fully-specified insert for an uploaded asset. The storage key and URL are
/// known at this point: the object was already transferred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewGalleryRow {
    pub id: Uuid,
    pub storage_key: String,
    pub url: String,
    pub caption: Option<String>,
    pub position: i32,
}

/// Everything the persistence transaction applies atomically: row deletions,
/// caption updates, insertions, and the parent metadata update.
#[derive(Debug, Clone)]
pub struct PersistPlan {
    pub to_delete: Vec<Uuid>,
    pub to_update: Vec<CaptionUpdate>,
    pub to_insert: Vec<NewGalleryRow>,
    pub parent: MemorialUpdate,
}
