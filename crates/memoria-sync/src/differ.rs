//! Gallery diffing.
//!
//! Classifies the operator's desired gallery against the persisted one into
//! three disjoint sets: kept (existing reference, caption possibly changed),
//! added (raw bytes, needs upload), removed (persisted reference absent from
//! the desired set). Desired storage keys are assumed unique within one
//! call; de-duplication is the caller's responsibility.

use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use memoria_core::models::{AssetCandidate, GalleryImage};

/// A persisted asset that survives the edit, with its possibly-edited
/// caption and its original display position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeptAsset {
    pub id: Uuid,
    pub storage_key: String,
    pub caption: Option<String>,
    pub position: i32,
}

/// A not-yet-uploaded asset, positioned after every persisted one.
#[derive(Debug, Clone)]
pub struct AddedAsset {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
    pub caption: Option<String>,
    pub position: i32,
}

/// A persisted asset the operator dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovedAsset {
    pub id: Uuid,
    pub storage_key: String,
}

#[derive(Debug, Clone, Default)]
pub struct GalleryDiff {
    pub kept: Vec<KeptAsset>,
    pub added: Vec<AddedAsset>,
    pub removed: Vec<RemovedAsset>,
}

/// Compute the diff between the persisted gallery and the desired one.
///
/// `kept ∪ removed` reconstructs the prior gallery exactly; `kept ∪ added`
/// (once added are uploaded) reconstructs the desired one. A caption-only
/// edit never moves an asset between buckets. An `Existing` reference whose
/// key is unknown is dropped: all live keys were minted by the broker, so an
/// unknown key cannot be adopted.
pub fn diff(prior: &[GalleryImage], desired: Vec<AssetCandidate>) -> GalleryDiff {
    let prior_by_key: HashMap<&str, &GalleryImage> = prior
        .iter()
        .map(|image| (image.storage_key.as_str(), image))
        .collect();

    let mut kept = Vec::new();
    let mut added = Vec::new();
    let mut matched: HashSet<String> = HashSet::new();

    let mut next_position = prior
        .iter()
        .map(|image| image.position)
        .max()
        .map_or(0, |max| max + 1);

    for candidate in desired {
        match candidate {
            AssetCandidate::Existing {
                storage_key,
                caption,
            } => match prior_by_key.get(storage_key.as_str()) {
                Some(image) => {
                    matched.insert(storage_key.clone());
                    kept.push(KeptAsset {
                        id: image.id,
                        storage_key,
                        caption,
                        position: image.position,
                    });
                }
                None => {
                    tracing::warn!(
                        storage_key = %storage_key,
                        "Dropping desired reference to unknown storage key"
                    );
                }
            },
            AssetCandidate::Pending {
                file_name,
                content_type,
                bytes,
                caption,
            } => {
                added.push(AddedAsset {
                    file_name,
                    content_type,
                    bytes,
                    caption,
                    position: next_position,
                });
                next_position += 1;
            }
        }
    }

    let removed = prior
        .iter()
        .filter(|image| !matched.contains(&image.storage_key))
        .map(|image| RemovedAsset {
            id: image.id,
            storage_key: image.storage_key.clone(),
        })
        .collect();

    GalleryDiff {
        kept,
        added,
        removed,
    }
}
