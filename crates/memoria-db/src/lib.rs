//! Memoria Database Layer
//!
//! Postgres repositories for memorials and their gallery rows. The gallery
//! apply is the persistence half of the synchronization saga: one
//! transaction, serialized per memorial by an advisory lock.

mod memorial;

pub use memorial::MemorialRepository;
