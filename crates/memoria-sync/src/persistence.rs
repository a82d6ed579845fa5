//! Persistence seam of the synchronization workflow.
//!
//! The coordinator only sees this trait; `MemorialRepository` is its
//! production implementation. Tests substitute an in-memory one.

use async_trait::async_trait;
use uuid::Uuid;

use memoria_core::models::{GalleryImage, MemorialUpdate, MemorialWithGallery, NewGalleryRow, PersistPlan};
use memoria_core::AppError;
use memoria_db::MemorialRepository;

#[async_trait]
pub trait GalleryPersistence: Send + Sync {
    /// Persisted gallery of one memorial, or None if the memorial is gone.
    async fn load_gallery(&self, memorial_id: Uuid) -> Result<Option<Vec<GalleryImage>>, AppError>;

    /// Create the parent row plus its initial gallery rows, atomically.
    async fn create(
        &self,
        memorial_id: Uuid,
        parent: &MemorialUpdate,
        inserts: &[NewGalleryRow],
    ) -> Result<MemorialWithGallery, AppError>;

    /// Apply one synchronization diff atomically: all-or-nothing.
    async fn apply(
        &self,
        memorial_id: Uuid,
        plan: &PersistPlan,
    ) -> Result<MemorialWithGallery, AppError>;
}

#[async_trait]
impl GalleryPersistence for MemorialRepository {
    async fn load_gallery(&self, memorial_id: Uuid) -> Result<Option<Vec<GalleryImage>>, AppError> {
        MemorialRepository::load_gallery(self, memorial_id).await
    }

    async fn create(
        &self,
        memorial_id: Uuid,
        parent: &MemorialUpdate,
        inserts: &[NewGalleryRow],
    ) -> Result<MemorialWithGallery, AppError> {
        self.create_memorial(memorial_id, parent, inserts).await
    }

    async fn apply(
        &self,
        memorial_id: Uuid,
        plan: &PersistPlan,
    ) -> Result<MemorialWithGallery, AppError> {
        self.apply_gallery_sync(memorial_id, plan).await
    }
}
