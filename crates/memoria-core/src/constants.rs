//! Application-wide constants.

/// Validity window for a presigned upload URL, in seconds.
/// Long enough for one direct PUT, short enough that a leaked URL is useless.
pub const UPLOAD_AUTHORIZATION_SECS: u64 = 60;

/// Default transfer-size budget per gallery image (10 MB).
pub const DEFAULT_MAX_ASSET_BYTES: usize = 10 * 1024 * 1024;

/// Hard ceiling on a single submitted image, before preparation. Inputs past
/// this are rejected outright rather than re-encoded.
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Neither image dimension may exceed this after preparation. Bounds the
/// worst-case re-encode cost, not visual quality.
pub const MAX_ASSET_DIMENSION_PX: u32 = 2560;

/// Prefix under which all gallery objects are stored.
pub const STORAGE_KEY_PREFIX: &str = "memorials";
