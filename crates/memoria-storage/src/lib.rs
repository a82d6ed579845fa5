//! Memoria Storage
//!
//! Object-store side of the synchronization workflow: minting storage keys,
//! issuing short-lived write authorizations (presigned PUT URLs), performing
//! the direct transfer, and removing objects. The relational side never
//! touches this crate directly; the synchronization coordinator owns the
//! ordering between the two.

mod s3;

pub use s3::S3Broker;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use memoria_core::constants::STORAGE_KEY_PREFIX;

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum StorageError {
    /// The credential service could not issue a write authorization.
    /// Fatal to the enclosing save; never retried silently.
    #[error("upload authorization failed: {0}")]
    Authorization(String),

    /// The direct transfer of one asset failed (network error, expired
    /// authorization, rejected content type). Fatal to the enclosing save.
    #[error("asset transfer failed: {0}")]
    Transfer(String),

    /// An object removal failed. Non-fatal: surfaced as a warning, never
    /// blocks or reverses a committed relational change.
    #[error("object removal failed: {0}")]
    Removal(String),

    #[error("storage configuration error: {0}")]
    Config(String),
}

/// A time-limited credential permitting exactly one upload to one
/// destination key with a fixed content type.
#[derive(Debug, Clone)]
pub struct WriteAuthorization {
    pub url: String,
    pub storage_key: String,
    pub content_type: String,
    pub valid_secs: u64,
}

/// Delegated-write access to the object store.
#[async_trait]
pub trait UploadBroker: Send + Sync {
    /// Issue a short-lived write authorization for one destination key.
    async fn authorize(
        &self,
        storage_key: &str,
        content_type: &str,
    ) -> StorageResult<WriteAuthorization>;

    /// PUT the prepared bytes to the authorized URL.
    async fn transfer(
        &self,
        authorization: &WriteAuthorization,
        bytes: Vec<u8>,
    ) -> StorageResult<()>;

    /// Delete one object by key. Idempotent: removing a key that no longer
    /// exists succeeds.
    async fn remove(&self, storage_key: &str) -> StorageResult<()>;

    /// Public read URL for a stored object.
    fn public_url(&self, storage_key: &str) -> String;
}

/// Mint a globally unique destination key for a new upload. Operator-supplied
/// names survive only as a sanitized suffix; the random token guarantees no
/// collision with any asset, existing or future.
pub fn mint_storage_key(file_name: &str) -> String {
    format!(
        "{}/{}-{}",
        STORAGE_KEY_PREFIX,
        Uuid::new_v4(),
        sanitize_file_name(file_name)
    )
}

pub fn sanitize_file_name(file_name: &str) -> String {
    const MAX: usize = 64;
    let base = std::path::Path::new(file_name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(file_name);
    if base.contains("..") {
        return "file".to_string();
    }
    let s: String = base
        .chars()
        .take(MAX)
        .map(|c| {
            if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if s.trim_matches(|c| c == '_' || c == '.').is_empty() {
        "file".to_string()
    } else {
        s
    }
}

/// Recover a storage key from either a bare key or a full public URL.
/// Clients of the removal endpoint historically sent both forms.
pub fn storage_key_from_locator(locator: &str) -> String {
    if let Some((_, rest)) = locator.split_once(".amazonaws.com/") {
        return rest.to_string();
    }
    let marker = format!("/{}/", STORAGE_KEY_PREFIX);
    if let Some(idx) = locator.find(&marker) {
        return locator[idx + 1..].to_string();
    }
    locator.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mint_storage_key_is_unique() {
        let a = mint_storage_key("foto.jpg");
        let b = mint_storage_key("foto.jpg");
        assert_ne!(a, b);
        assert!(a.starts_with("memorials/"));
        assert!(a.ends_with("-foto.jpg"));
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("la abuela (1).jpg"), "la_abuela__1_.jpg");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("..jpg"), "file");
        assert_eq!(sanitize_file_name("???"), "file");
    }

    #[test]
    fn test_storage_key_from_locator() {
        assert_eq!(
            storage_key_from_locator("https://bucket.s3.amazonaws.com/memorials/abc-f.jpg"),
            "memorials/abc-f.jpg"
        );
        assert_eq!(
            storage_key_from_locator("http://localhost:9000/bucket/memorials/abc-f.jpg"),
            "memorials/abc-f.jpg"
        );
        assert_eq!(
            storage_key_from_locator("memorials/abc-f.jpg"),
            "memorials/abc-f.jpg"
        );
    }
}
