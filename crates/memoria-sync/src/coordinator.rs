//! Synchronization coordinator.
//!
//! Drives one gallery edit end to end: Diffing → Uploading → Committing →
//! Reconciling. Every successfully transferred storage key lands in an
//! `uploaded` ledger before the commit; if the commit (or a later upload)
//! fails, each ledger key is removed exactly once, best-effort. The
//! relational store is never left referencing a key that was not
//! transferred, so a failed run is always safe to retry from scratch.

use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use memoria_core::models::{
    AssetCandidate, CaptionUpdate, MemorialUpdate, MemorialWithGallery, NewGalleryRow, PersistPlan,
};
use memoria_core::AppError;
use memoria_processing::{prepare_asset, PrepareError, PreparePolicy};
use memoria_storage::{mint_storage_key, StorageError, UploadBroker};

use crate::differ::{diff, AddedAsset};
use crate::persistence::GalleryPersistence;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Prepare(#[from] PrepareError),

    #[error("upload authorization failed: {0}")]
    Authorization(String),

    #[error("asset transfer failed: {0}")]
    Transfer(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    InvalidInput(String),

    /// The relational store was unavailable or errored. Its state is
    /// unchanged by transaction atomicity; only uploads needed compensation.
    #[error("persistence failed: {0}")]
    StorageLayer(String),

    #[error("synchronization cancelled")]
    Cancelled,
}

impl From<StorageError> for SyncError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Authorization(msg) => SyncError::Authorization(msg),
            StorageError::Transfer(msg) => SyncError::Transfer(msg),
            // Removal failures never abort a run; reaching here means a
            // broker misreported one as some other operation's failure.
            StorageError::Removal(msg) | StorageError::Config(msg) => SyncError::StorageLayer(msg),
        }
    }
}

impl From<AppError> for SyncError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::NotFound(msg) => SyncError::NotFound(msg),
            AppError::Conflict(msg) => SyncError::Conflict(msg),
            AppError::InvalidInput(msg) => SyncError::InvalidInput(msg),
            other => SyncError::StorageLayer(other.to_string()),
        }
    }
}

/// Non-fatal trouble encountered after the point of no return. The edit
/// succeeded; these accompany the result instead of failing it.
#[derive(Debug, Clone)]
pub struct SyncWarning {
    pub storage_key: String,
    pub detail: String,
}

impl std::fmt::Display for SyncWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.storage_key, self.detail)
    }
}

#[derive(Debug)]
pub struct SyncOutcome {
    pub memorial: MemorialWithGallery,
    pub warnings: Vec<SyncWarning>,
}

struct UploadedAsset {
    storage_key: String,
    url: String,
    caption: Option<String>,
    position: i32,
}

#[derive(Clone)]
pub struct SyncCoordinator {
    broker: Arc<dyn UploadBroker>,
    persistence: Arc<dyn GalleryPersistence>,
    prepare_policy: PreparePolicy,
}

impl SyncCoordinator {
    pub fn new(
        broker: Arc<dyn UploadBroker>,
        persistence: Arc<dyn GalleryPersistence>,
        prepare_policy: PreparePolicy,
    ) -> Self {
        Self {
            broker,
            persistence,
            prepare_policy,
        }
    }

    /// First save of a memorial: every desired asset is an upload, the prior
    /// gallery is empty.
    pub async fn create(
        &self,
        parent: MemorialUpdate,
        desired: Vec<AssetCandidate>,
        cancel: CancellationToken,
    ) -> Result<SyncOutcome, SyncError> {
        let memorial_id = Uuid::new_v4();
        let diffed = diff(&[], desired);

        let uploaded = self.upload_added(diffed.added, &cancel).await?;
        let inserts = insert_rows(&uploaded);

        match self.persistence.create(memorial_id, &parent, &inserts).await {
            Ok(memorial) => {
                tracing::info!(
                    memorial_id = %memorial_id,
                    uploaded = inserts.len(),
                    "Memorial created"
                );
                Ok(SyncOutcome {
                    memorial,
                    warnings: Vec::new(),
                })
            }
            Err(err) => {
                self.rollback_uploads(&uploaded).await;
                Err(err.into())
            }
        }
    }

    /// Edit of an existing memorial: the full synchronization saga.
    pub async fn synchronize(
        &self,
        memorial_id: Uuid,
        parent: MemorialUpdate,
        desired: Vec<AssetCandidate>,
        cancel: CancellationToken,
    ) -> Result<SyncOutcome, SyncError> {
        // Diffing
        let prior = self
            .persistence
            .load_gallery(memorial_id)
            .await
            .map_err(SyncError::from)?
            .ok_or_else(|| SyncError::NotFound("Memorial not found".to_string()))?;
        let diffed = diff(&prior, desired);

        // Uploading
        let uploaded = self.upload_added(diffed.added, &cancel).await?;

        // Committing. No cancellation checks from here until the transaction
        // resolves: atomicity must be allowed to run its course.
        let plan = PersistPlan {
            to_delete: diffed.removed.iter().map(|r| r.id).collect(),
            to_update: diffed
                .kept
                .iter()
                .map(|k| CaptionUpdate {
                    id: k.id,
                    caption: k.caption.clone(),
                })
                .collect(),
            to_insert: insert_rows(&uploaded),
            parent,
        };

        let memorial = match self.persistence.apply(memorial_id, &plan).await {
            Ok(memorial) => memorial,
            Err(err) => {
                self.rollback_uploads(&uploaded).await;
                return Err(err.into());
            }
        };

        // Reconciling: drop the objects the commit dereferenced. Cancellation
        // observed here skips the removals; the commit stands either way.
        let mut warnings = Vec::new();
        if cancel.is_cancelled() {
            for removed in &diffed.removed {
                warnings.push(SyncWarning {
                    storage_key: removed.storage_key.clone(),
                    detail: "removal skipped: run cancelled after commit".to_string(),
                });
            }
        } else {
            let keys: Vec<String> = diffed
                .removed
                .iter()
                .map(|r| r.storage_key.clone())
                .collect();
            warnings.extend(self.remove_keys(&keys).await);
        }

        tracing::info!(
            memorial_id = %memorial_id,
            kept = plan.to_update.len(),
            added = plan.to_insert.len(),
            removed = plan.to_delete.len(),
            warnings = warnings.len(),
            "Gallery synchronized"
        );
        Ok(SyncOutcome { memorial, warnings })
    }

    /// Storage cleanup after a memorial's rows are already gone (cascade
    /// delete). Failures are warnings; the rows cannot come back.
    pub async fn reconcile_deleted(&self, storage_keys: &[String]) -> Vec<SyncWarning> {
        self.remove_keys(storage_keys).await
    }

    /// Prepare and transfer every added candidate, in order. On the first
    /// failure (or observed cancellation) every key transferred so far is
    /// compensated and the triggering error is returned.
    async fn upload_added(
        &self,
        added: Vec<AddedAsset>,
        cancel: &CancellationToken,
    ) -> Result<Vec<UploadedAsset>, SyncError> {
        let mut uploaded: Vec<UploadedAsset> = Vec::with_capacity(added.len());

        for asset in added {
            if cancel.is_cancelled() {
                self.rollback_uploads(&uploaded).await;
                return Err(SyncError::Cancelled);
            }
            match self.upload_one(asset).await {
                Ok(done) => uploaded.push(done),
                Err(err) => {
                    self.rollback_uploads(&uploaded).await;
                    return Err(err);
                }
            }
        }

        Ok(uploaded)
    }

    async fn upload_one(&self, asset: AddedAsset) -> Result<UploadedAsset, SyncError> {
        let AddedAsset {
            file_name,
            content_type,
            bytes,
            caption,
            position,
        } = asset;

        let prepared = prepare_asset(bytes, &content_type, &self.prepare_policy)?;

        let storage_key = mint_storage_key(&file_name);
        let authorization = self
            .broker
            .authorize(&storage_key, &prepared.content_type)
            .await?;
        self.broker.transfer(&authorization, prepared.bytes).await?;

        Ok(UploadedAsset {
            url: self.broker.public_url(&storage_key),
            storage_key,
            caption,
            position,
        })
    }

    /// Compensate a failed run: remove each ledger key exactly once.
    /// Best-effort by design; a leftover object is transient cost, not
    /// corruption, and the triggering error is what the caller must see.
    async fn rollback_uploads(&self, uploaded: &[UploadedAsset]) {
        for asset in uploaded {
            if let Err(err) = self.broker.remove(&asset.storage_key).await {
                tracing::warn!(
                    storage_key = %asset.storage_key,
                    error = %err,
                    "Rollback removal failed, object orphaned"
                );
            }
        }
    }

    async fn remove_keys(&self, storage_keys: &[String]) -> Vec<SyncWarning> {
        let mut warnings = Vec::new();
        for key in storage_keys {
            if let Err(err) = self.broker.remove(key).await {
                tracing::warn!(storage_key = %key, error = %err, "Object removal failed");
                warnings.push(SyncWarning {
                    storage_key: key.clone(),
                    detail: err.to_string(),
                });
            }
        }
        warnings
    }
}

fn insert_rows(uploaded: &[UploadedAsset]) -> Vec<NewGalleryRow> {
    uploaded
        .iter()
        .map(|asset| NewGalleryRow {
            id: Uuid::new_v4(),
            storage_key: asset.storage_key.clone(),
            url: asset.url.clone(),
            caption: asset.caption.clone(),
            position: asset.position,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::Mutex;

    use memoria_core::models::{GalleryImage, Memorial};
    use memoria_storage::WriteAuthorization;

    #[derive(Default)]
    struct MockBroker {
        transferred: Mutex<Vec<String>>,
        removed: Mutex<Vec<String>>,
        fail_authorize: bool,
        /// Fail the transfer whose zero-based ordinal equals this value.
        fail_transfer_at: Option<usize>,
        fail_remove: bool,
    }

    #[async_trait]
    impl UploadBroker for MockBroker {
        async fn authorize(
            &self,
            storage_key: &str,
            content_type: &str,
        ) -> Result<WriteAuthorization, StorageError> {
            if self.fail_authorize {
                return Err(StorageError::Authorization("signer unreachable".into()));
            }
            Ok(WriteAuthorization {
                url: format!("mock://{}", storage_key),
                storage_key: storage_key.to_string(),
                content_type: content_type.to_string(),
                valid_secs: 60,
            })
        }

        async fn transfer(
            &self,
            authorization: &WriteAuthorization,
            _bytes: Vec<u8>,
        ) -> Result<(), StorageError> {
            let mut transferred = self.transferred.lock().unwrap();
            if self.fail_transfer_at == Some(transferred.len()) {
                return Err(StorageError::Transfer("connection reset".into()));
            }
            transferred.push(authorization.storage_key.clone());
            Ok(())
        }

        async fn remove(&self, storage_key: &str) -> Result<(), StorageError> {
            if self.fail_remove {
                return Err(StorageError::Removal("delete rejected".into()));
            }
            self.removed.lock().unwrap().push(storage_key.to_string());
            Ok(())
        }

        fn public_url(&self, storage_key: &str) -> String {
            format!("https://cdn.test/{}", storage_key)
        }
    }

    #[derive(Default)]
    struct MockPersistence {
        gallery: Mutex<Vec<GalleryImage>>,
        applied: Mutex<Vec<PersistPlan>>,
        fail_apply: Option<&'static str>,
        memorial_missing: bool,
    }

    impl MockPersistence {
        fn with_gallery(keys: &[(&str, Option<&str>)]) -> Self {
            let memorial_id = Uuid::new_v4();
            let gallery = keys
                .iter()
                .enumerate()
                .map(|(position, (key, caption))| GalleryImage {
                    id: Uuid::new_v4(),
                    memorial_id,
                    storage_key: key.to_string(),
                    url: format!("https://cdn.test/{}", key),
                    caption: caption.map(str::to_string),
                    position: position as i32,
                    created_at: Utc::now(),
                })
                .collect();
            MockPersistence {
                gallery: Mutex::new(gallery),
                ..Default::default()
            }
        }

        fn snapshot(&self) -> Vec<GalleryImage> {
            self.gallery.lock().unwrap().clone()
        }

        fn build_memorial(&self, memorial_id: Uuid, parent: &MemorialUpdate) -> Memorial {
            Memorial {
                id: memorial_id,
                title: parent.title.clone(),
                slug: parent.slug.clone(),
                description: parent.description.clone(),
                youtube_video_id: parent.youtube_video_id.clone(),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            }
        }
    }

    #[async_trait]
    impl GalleryPersistence for MockPersistence {
        async fn load_gallery(
            &self,
            _memorial_id: Uuid,
        ) -> Result<Option<Vec<GalleryImage>>, AppError> {
            if self.memorial_missing {
                return Ok(None);
            }
            Ok(Some(self.snapshot()))
        }

        async fn create(
            &self,
            memorial_id: Uuid,
            parent: &MemorialUpdate,
            inserts: &[NewGalleryRow],
        ) -> Result<MemorialWithGallery, AppError> {
            if let Some(msg) = self.fail_apply {
                return Err(AppError::Conflict(msg.to_string()));
            }
            let mut gallery = self.gallery.lock().unwrap();
            for row in inserts {
                gallery.push(GalleryImage {
                    id: row.id,
                    memorial_id,
                    storage_key: row.storage_key.clone(),
                    url: row.url.clone(),
                    caption: row.caption.clone(),
                    position: row.position,
                    created_at: Utc::now(),
                });
            }
            Ok(MemorialWithGallery {
                memorial: self.build_memorial(memorial_id, parent),
                gallery: gallery.clone(),
            })
        }

        async fn apply(
            &self,
            memorial_id: Uuid,
            plan: &PersistPlan,
        ) -> Result<MemorialWithGallery, AppError> {
            if let Some(msg) = self.fail_apply {
                return Err(AppError::Conflict(msg.to_string()));
            }
            self.applied.lock().unwrap().push(plan.clone());

            let mut gallery = self.gallery.lock().unwrap();
            gallery.retain(|image| !plan.to_delete.contains(&image.id));
            for update in &plan.to_update {
                if let Some(image) = gallery.iter_mut().find(|image| image.id == update.id) {
                    image.caption = update.caption.clone();
                }
            }
            for row in &plan.to_insert {
                gallery.push(GalleryImage {
                    id: row.id,
                    memorial_id,
                    storage_key: row.storage_key.clone(),
                    url: row.url.clone(),
                    caption: row.caption.clone(),
                    position: row.position,
                    created_at: Utc::now(),
                });
            }
            gallery.sort_by_key(|image| image.position);

            Ok(MemorialWithGallery {
                memorial: self.build_memorial(memorial_id, &plan.parent),
                gallery: gallery.clone(),
            })
        }
    }

    fn coordinator(
        broker: Arc<MockBroker>,
        persistence: Arc<MockPersistence>,
    ) -> SyncCoordinator {
        SyncCoordinator::new(broker, persistence, PreparePolicy::default())
    }

    fn parent(slug: &str) -> MemorialUpdate {
        MemorialUpdate {
            title: "En memoria de la Abuela Ana".to_string(),
            slug: slug.to_string(),
            description: None,
            youtube_video_id: None,
        }
    }

    fn existing(key: &str, caption: &str) -> AssetCandidate {
        AssetCandidate::Existing {
            storage_key: key.to_string(),
            caption: Some(caption.to_string()),
        }
    }

    fn pending(name: &str, caption: &str) -> AssetCandidate {
        AssetCandidate::Pending {
            file_name: name.to_string(),
            content_type: "image/jpeg".to_string(),
            // Under any sane budget, so preparation passes bytes through.
            bytes: vec![0xAB; 32],
            caption: Some(caption.to_string()),
        }
    }

    #[tokio::test]
    async fn test_caption_edit_and_new_upload() {
        let broker = Arc::new(MockBroker::default());
        let persistence = Arc::new(MockPersistence::with_gallery(&[("memorials/a.jpg", Some("x"))]));
        let memorial_id = persistence.snapshot()[0].memorial_id;
        let coordinator = coordinator(broker.clone(), persistence.clone());

        let outcome = coordinator
            .synchronize(
                memorial_id,
                parent("abuela-ana"),
                vec![existing("memorials/a.jpg", "y"), pending("nueva.jpg", "z")],
                CancellationToken::new(),
            )
            .await
            .unwrap();

        assert!(outcome.warnings.is_empty());
        let gallery = outcome.memorial.gallery;
        assert_eq!(gallery.len(), 2);
        assert_eq!(gallery[0].storage_key, "memorials/a.jpg");
        assert_eq!(gallery[0].caption.as_deref(), Some("y"));
        assert_eq!(gallery[1].caption.as_deref(), Some("z"));
        assert!(gallery[1].storage_key.starts_with("memorials/"));

        assert_eq!(broker.transferred.lock().unwrap().len(), 1);
        assert!(broker.removed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_transfer_failure_leaves_both_stores_untouched() {
        let broker = Arc::new(MockBroker {
            fail_transfer_at: Some(0),
            ..Default::default()
        });
        let persistence = Arc::new(MockPersistence::with_gallery(&[("memorials/a.jpg", Some("x"))]));
        let memorial_id = persistence.snapshot()[0].memorial_id;
        let before = persistence.snapshot();
        let coordinator = coordinator(broker.clone(), persistence.clone());

        let err = coordinator
            .synchronize(
                memorial_id,
                parent("abuela-ana"),
                vec![existing("memorials/a.jpg", "y"), pending("nueva.jpg", "z")],
                CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::Transfer(_)));
        // Nothing was committed and no object survived the run.
        assert!(persistence.applied.lock().unwrap().is_empty());
        assert_eq!(persistence.snapshot().len(), before.len());
        assert!(broker.transferred.lock().unwrap().is_empty());
        assert!(broker.removed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_partial_upload_failure_compensates_ledger() {
        let broker = Arc::new(MockBroker {
            fail_transfer_at: Some(1),
            ..Default::default()
        });
        let persistence = Arc::new(MockPersistence::default());
        let coordinator = coordinator(broker.clone(), persistence.clone());

        let err = coordinator
            .create(
                parent("abuela-ana"),
                vec![pending("uno.jpg", ""), pending("dos.jpg", "")],
                CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::Transfer(_)));
        let transferred = broker.transferred.lock().unwrap().clone();
        let removed = broker.removed.lock().unwrap().clone();
        // The one successful upload was compensated, exactly once.
        assert_eq!(transferred.len(), 1);
        assert_eq!(removed, transferred);
    }

    #[tokio::test]
    async fn test_commit_conflict_rolls_back_all_uploads() {
        let broker = Arc::new(MockBroker::default());
        let persistence = Arc::new(MockPersistence {
            fail_apply: Some("slug already exists"),
            ..MockPersistence::with_gallery(&[("memorials/a.jpg", None)])
        });
        let memorial_id = persistence.snapshot()[0].memorial_id;
        let coordinator = coordinator(broker.clone(), persistence.clone());

        let err = coordinator
            .synchronize(
                memorial_id,
                parent("slug-tomado"),
                vec![
                    existing("memorials/a.jpg", ""),
                    pending("uno.jpg", ""),
                    pending("dos.jpg", ""),
                ],
                CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::Conflict(_)));
        let mut transferred = broker.transferred.lock().unwrap().clone();
        let mut removed = broker.removed.lock().unwrap().clone();
        transferred.sort();
        removed.sort();
        assert_eq!(transferred.len(), 2);
        // Rollback completeness: every uploaded key attempted exactly once.
        assert_eq!(removed, transferred);
        // Relational state untouched.
        assert_eq!(persistence.snapshot().len(), 1);
    }

    #[tokio::test]
    async fn test_authorization_failure_is_fatal() {
        let broker = Arc::new(MockBroker {
            fail_authorize: true,
            ..Default::default()
        });
        let persistence = Arc::new(MockPersistence::default());
        let coordinator = coordinator(broker.clone(), persistence.clone());

        let err = coordinator
            .create(
                parent("abuela-ana"),
                vec![pending("uno.jpg", "")],
                CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::Authorization(_)));
        assert!(broker.transferred.lock().unwrap().is_empty());
        assert!(persistence.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_removed_assets_reconciled_after_commit() {
        let broker = Arc::new(MockBroker::default());
        let persistence = Arc::new(MockPersistence::with_gallery(&[
            ("memorials/a.jpg", None),
            ("memorials/b.jpg", None),
        ]));
        let memorial_id = persistence.snapshot()[0].memorial_id;
        let coordinator = coordinator(broker.clone(), persistence.clone());

        let outcome = coordinator
            .synchronize(
                memorial_id,
                parent("abuela-ana"),
                vec![existing("memorials/a.jpg", "")],
                CancellationToken::new(),
            )
            .await
            .unwrap();

        assert!(outcome.warnings.is_empty());
        assert_eq!(outcome.memorial.gallery.len(), 1);
        assert_eq!(
            broker.removed.lock().unwrap().clone(),
            vec!["memorials/b.jpg".to_string()]
        );
    }

    #[tokio::test]
    async fn test_reconcile_failure_is_a_warning_not_an_error() {
        let broker = Arc::new(MockBroker {
            fail_remove: true,
            ..Default::default()
        });
        let persistence = Arc::new(MockPersistence::with_gallery(&[
            ("memorials/a.jpg", None),
            ("memorials/b.jpg", None),
        ]));
        let memorial_id = persistence.snapshot()[0].memorial_id;
        let coordinator = coordinator(broker.clone(), persistence.clone());

        let outcome = coordinator
            .synchronize(
                memorial_id,
                parent("abuela-ana"),
                vec![existing("memorials/a.jpg", "")],
                CancellationToken::new(),
            )
            .await
            .unwrap();

        // The commit stands; the failed removal surfaces as a warning.
        assert_eq!(outcome.memorial.gallery.len(), 1);
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.warnings[0].storage_key, "memorials/b.jpg");
    }

    #[tokio::test]
    async fn test_cancellation_before_uploads_compensates_and_aborts() {
        let broker = Arc::new(MockBroker::default());
        let persistence = Arc::new(MockPersistence::with_gallery(&[("memorials/a.jpg", None)]));
        let memorial_id = persistence.snapshot()[0].memorial_id;
        let coordinator = coordinator(broker.clone(), persistence.clone());

        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = coordinator
            .synchronize(
                memorial_id,
                parent("abuela-ana"),
                vec![pending("uno.jpg", "")],
                cancel,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::Cancelled));
        assert!(broker.transferred.lock().unwrap().is_empty());
        assert!(persistence.applied.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_memorial_is_not_found() {
        let broker = Arc::new(MockBroker::default());
        let persistence = Arc::new(MockPersistence {
            memorial_missing: true,
            ..Default::default()
        });
        let coordinator = coordinator(broker.clone(), persistence);

        let err = coordinator
            .synchronize(
                Uuid::new_v4(),
                parent("abuela-ana"),
                vec![],
                CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_reconcile_deleted_attempts_every_key() {
        let broker = Arc::new(MockBroker::default());
        let persistence = Arc::new(MockPersistence::default());
        let coordinator = coordinator(broker.clone(), persistence);

        let keys = vec!["memorials/a.jpg".to_string(), "memorials/b.jpg".to_string()];
        let warnings = coordinator.reconcile_deleted(&keys).await;

        assert!(warnings.is_empty());
        assert_eq!(broker.removed.lock().unwrap().clone(), keys);

        // Removal is idempotent: a second pass over the same keys succeeds.
        let warnings = coordinator.reconcile_deleted(&keys).await;
        assert!(warnings.is_empty());
    }

    #[tokio::test]
    async fn test_create_uploads_and_persists_in_order() {
        let broker = Arc::new(MockBroker::default());
        let persistence = Arc::new(MockPersistence::default());
        let coordinator = coordinator(broker.clone(), persistence.clone());

        let outcome = coordinator
            .create(
                parent("abuela-ana"),
                vec![pending("uno.jpg", "primera"), pending("dos.jpg", "segunda")],
                CancellationToken::new(),
            )
            .await
            .unwrap();

        let gallery = outcome.memorial.gallery;
        assert_eq!(gallery.len(), 2);
        assert_eq!(gallery[0].position, 0);
        assert_eq!(gallery[1].position, 1);
        assert_ne!(gallery[0].storage_key, gallery[1].storage_key);
        assert_eq!(broker.transferred.lock().unwrap().len(), 2);
    }
}
