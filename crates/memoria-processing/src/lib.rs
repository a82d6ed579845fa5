//! Memoria Processing
//!
//! Prepares in-memory image candidates for transfer: anything over the byte
//! budget is downsampled and re-encoded before it touches the network.

mod prepare;

pub use prepare::{prepare_asset, PrepareError, PreparePolicy, PreparedAsset};
