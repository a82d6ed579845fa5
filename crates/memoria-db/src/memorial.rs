use std::collections::HashMap;

use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use memoria_core::models::{
    GalleryImage, Memorial, MemorialUpdate, MemorialWithGallery, NewGalleryRow, PersistPlan,
};
use memoria_core::AppError;

const MEMORIAL_COLUMNS: &str =
    "id, title, slug, description, youtube_video_id, created_at, updated_at";
const IMAGE_COLUMNS: &str =
    "id, memorial_id, storage_key, url, caption, position, created_at";

#[derive(Clone)]
pub struct MemorialRepository {
    pool: PgPool,
}

impl MemorialRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a memorial together with its initial gallery rows. The rows'
    /// storage objects must already exist: inserts never precede transfer.
    pub async fn create_memorial(
        &self,
        memorial_id: Uuid,
        parent: &MemorialUpdate,
        inserts: &[NewGalleryRow],
    ) -> Result<MemorialWithGallery, AppError> {
        let mut tx = self.pool.begin().await?;

        if slug_taken(&mut tx, &parent.slug, None).await? {
            return Err(slug_conflict(&parent.slug));
        }

        let memorial = sqlx::query_as::<_, Memorial>(&format!(
            r#"
            INSERT INTO memorials (id, title, slug, description, youtube_video_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {MEMORIAL_COLUMNS}
            "#,
        ))
        .bind(memorial_id)
        .bind(&parent.title)
        .bind(&parent.slug)
        .bind(&parent.description)
        .bind(&parent.youtube_video_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_unique_violation(&parent.slug))?;

        insert_gallery_rows(&mut tx, memorial_id, inserts).await?;
        let gallery = load_gallery_tx(&mut tx, memorial_id).await?;

        tx.commit().await?;

        tracing::info!(memorial_id = %memorial_id, slug = %memorial.slug, "Created memorial");
        Ok(MemorialWithGallery { memorial, gallery })
    }

    /// Apply one synchronization diff atomically: row deletions, caption
    /// updates, insertions, and the parent metadata update. Concurrent
    /// applies for the same memorial serialize on an advisory lock held for
    /// the duration of the transaction, so each run commits against the
    /// state the previous one left behind.
    pub async fn apply_gallery_sync(
        &self,
        memorial_id: Uuid,
        plan: &PersistPlan,
    ) -> Result<MemorialWithGallery, AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(memorial_id.to_string())
            .execute(&mut *tx)
            .await?;

        if slug_taken(&mut tx, &plan.parent.slug, Some(memorial_id)).await? {
            return Err(slug_conflict(&plan.parent.slug));
        }

        if !plan.to_delete.is_empty() {
            sqlx::query("DELETE FROM memorial_images WHERE memorial_id = $1 AND id = ANY($2)")
                .bind(memorial_id)
                .bind(&plan.to_delete)
                .execute(&mut *tx)
                .await?;
        }

        for update in &plan.to_update {
            sqlx::query(
                "UPDATE memorial_images SET caption = $3 WHERE id = $1 AND memorial_id = $2",
            )
            .bind(update.id)
            .bind(memorial_id)
            .bind(&update.caption)
            .execute(&mut *tx)
            .await?;
        }

        insert_gallery_rows(&mut tx, memorial_id, &plan.to_insert).await?;

        let memorial = sqlx::query_as::<_, Memorial>(&format!(
            r#"
            UPDATE memorials
            SET title = $2, slug = $3, description = $4, youtube_video_id = $5,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {MEMORIAL_COLUMNS}
            "#,
        ))
        .bind(memorial_id)
        .bind(&plan.parent.title)
        .bind(&plan.parent.slug)
        .bind(&plan.parent.description)
        .bind(&plan.parent.youtube_video_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_unique_violation(&plan.parent.slug))?
        .ok_or_else(|| AppError::NotFound("Memorial not found".to_string()))?;

        let gallery = load_gallery_tx(&mut tx, memorial_id).await?;

        tx.commit().await?;

        tracing::info!(
            memorial_id = %memorial_id,
            deleted = plan.to_delete.len(),
            updated = plan.to_update.len(),
            inserted = plan.to_insert.len(),
            "Applied gallery synchronization"
        );
        Ok(MemorialWithGallery { memorial, gallery })
    }

    /// Gallery of one memorial, or None if the memorial does not exist.
    pub async fn load_gallery(
        &self,
        memorial_id: Uuid,
    ) -> Result<Option<Vec<GalleryImage>>, AppError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM memorials WHERE id = $1)")
                .bind(memorial_id)
                .fetch_one(&self.pool)
                .await?;
        if !exists {
            return Ok(None);
        }

        let gallery = sqlx::query_as::<_, GalleryImage>(&format!(
            "SELECT {IMAGE_COLUMNS} FROM memorial_images WHERE memorial_id = $1 \
             ORDER BY position ASC, created_at ASC",
        ))
        .bind(memorial_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(gallery))
    }

    pub async fn get_memorial(
        &self,
        memorial_id: Uuid,
    ) -> Result<Option<MemorialWithGallery>, AppError> {
        let memorial = sqlx::query_as::<_, Memorial>(&format!(
            "SELECT {MEMORIAL_COLUMNS} FROM memorials WHERE id = $1",
        ))
        .bind(memorial_id)
        .fetch_optional(&self.pool)
        .await?;

        match memorial {
            Some(memorial) => {
                let gallery = self
                    .load_gallery(memorial.id)
                    .await?
                    .unwrap_or_default();
                Ok(Some(MemorialWithGallery { memorial, gallery }))
            }
            None => Ok(None),
        }
    }

    pub async fn get_memorial_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<MemorialWithGallery>, AppError> {
        let memorial = sqlx::query_as::<_, Memorial>(&format!(
            "SELECT {MEMORIAL_COLUMNS} FROM memorials WHERE slug = $1",
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        match memorial {
            Some(memorial) => {
                let gallery = self
                    .load_gallery(memorial.id)
                    .await?
                    .unwrap_or_default();
                Ok(Some(MemorialWithGallery { memorial, gallery }))
            }
            None => Ok(None),
        }
    }

    /// All memorials, newest first, galleries included.
    pub async fn list_memorials(&self) -> Result<Vec<MemorialWithGallery>, AppError> {
        let memorials = sqlx::query_as::<_, Memorial>(&format!(
            "SELECT {MEMORIAL_COLUMNS} FROM memorials ORDER BY created_at DESC",
        ))
        .fetch_all(&self.pool)
        .await?;

        if memorials.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = memorials.iter().map(|m| m.id).collect();
        let images = sqlx::query_as::<_, GalleryImage>(&format!(
            "SELECT {IMAGE_COLUMNS} FROM memorial_images WHERE memorial_id = ANY($1) \
             ORDER BY position ASC, created_at ASC",
        ))
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_memorial: HashMap<Uuid, Vec<GalleryImage>> = HashMap::new();
        for image in images {
            by_memorial.entry(image.memorial_id).or_default().push(image);
        }

        Ok(memorials
            .into_iter()
            .map(|memorial| {
                let gallery = by_memorial.remove(&memorial.id).unwrap_or_default();
                MemorialWithGallery { memorial, gallery }
            })
            .collect())
    }

    /// Delete a memorial; gallery rows cascade. Returns the storage keys the
    /// caller must reconcile against the object store, or None if the
    /// memorial does not exist.
    pub async fn delete_memorial(
        &self,
        memorial_id: Uuid,
    ) -> Result<Option<Vec<String>>, AppError> {
        let mut tx = self.pool.begin().await?;

        let keys: Vec<String> = sqlx::query_scalar(
            "SELECT storage_key FROM memorial_images WHERE memorial_id = $1",
        )
        .bind(memorial_id)
        .fetch_all(&mut *tx)
        .await?;

        let deleted = sqlx::query("DELETE FROM memorials WHERE id = $1")
            .bind(memorial_id)
            .execute(&mut *tx)
            .await?;

        if deleted.rows_affected() == 0 {
            return Ok(None);
        }

        tx.commit().await?;

        tracing::info!(
            memorial_id = %memorial_id,
            orphaned_keys = keys.len(),
            "Deleted memorial"
        );
        Ok(Some(keys))
    }
}

async fn slug_taken(
    tx: &mut Transaction<'_, Postgres>,
    slug: &str,
    exclude: Option<Uuid>,
) -> Result<bool, AppError> {
    let taken: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM memorials WHERE slug = $1 AND ($2::uuid IS NULL OR id <> $2))",
    )
    .bind(slug)
    .bind(exclude)
    .fetch_one(&mut **tx)
    .await?;
    Ok(taken)
}

async fn insert_gallery_rows(
    tx: &mut Transaction<'_, Postgres>,
    memorial_id: Uuid,
    rows: &[NewGalleryRow],
) -> Result<(), AppError> {
    for row in rows {
        sqlx::query(
            r#"
            INSERT INTO memorial_images (id, memorial_id, storage_key, url, caption, position)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(row.id)
        .bind(memorial_id)
        .bind(&row.storage_key)
        .bind(&row.url)
        .bind(&row.caption)
        .bind(row.position)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

async fn load_gallery_tx(
    tx: &mut Transaction<'_, Postgres>,
    memorial_id: Uuid,
) -> Result<Vec<GalleryImage>, AppError> {
    let gallery = sqlx::query_as::<_, GalleryImage>(&format!(
        "SELECT {IMAGE_COLUMNS} FROM memorial_images WHERE memorial_id = $1 \
         ORDER BY position ASC, created_at ASC",
    ))
    .bind(memorial_id)
    .fetch_all(&mut **tx)
    .await?;
    Ok(gallery)
}

fn slug_conflict(slug: &str) -> AppError {
    AppError::Conflict(format!("A memorial with slug '{}' already exists", slug))
}

/// The unique index can still fire when two saves race past the pre-check;
/// surface that as the same conflict instead of a bare database error.
fn map_unique_violation(slug: &str) -> impl Fn(sqlx::Error) -> AppError + '_ {
    move |e: sqlx::Error| {
        let is_unique = e
            .as_database_error()
            .map(|db| db.is_unique_violation())
            .unwrap_or(false);
        if is_unique {
            slug_conflict(slug)
        } else {
            AppError::Database(e)
        }
    }
}
