//! Memoria Sync
//!
//! The asset synchronization workflow: given a memorial's persisted gallery
//! and the operator's desired gallery, compute the minimal diff, upload new
//! assets, commit the diff atomically in Postgres, and reconcile the object
//! store — rolling back uploads whose relational commit failed. This is the
//! one place where the two stores' consistency is decided.

mod coordinator;
mod differ;
mod persistence;

pub use coordinator::{SyncCoordinator, SyncError, SyncOutcome, SyncWarning};
pub use differ::{diff, AddedAsset, GalleryDiff, KeptAsset, RemovedAsset};
pub use persistence::GalleryPersistence;
