//! Transfer-size preparation.
//!
//! Compliant inputs pass through untouched. Oversized inputs are decoded,
//! downsampled to a fixed pixel ceiling, and re-encoded as JPEG at
//! decreasing quality until they fit the byte budget or the quality floor
//! is reached. The floor-quality result is accepted even when it still
//! exceeds the budget: a save should not fail because one photo compresses
//! poorly.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::GenericImageView;
use thiserror::Error;

use memoria_core::constants::{DEFAULT_MAX_ASSET_BYTES, MAX_ASSET_DIMENSION_PX};

#[derive(Debug, Error)]
pub enum PrepareError {
    #[error("image decoding failed: {0}")]
    Decode(String),

    #[error("image encoding failed: {0}")]
    Encode(String),
}

/// Size and quality policy for one preparation run.
#[derive(Debug, Clone, Copy)]
pub struct PreparePolicy {
    pub max_bytes: usize,
    pub max_dimension: u32,
    pub quality_start: u8,
    pub quality_floor: u8,
    pub quality_step: u8,
}

impl Default for PreparePolicy {
    fn default() -> Self {
        PreparePolicy {
            max_bytes: DEFAULT_MAX_ASSET_BYTES,
            max_dimension: MAX_ASSET_DIMENSION_PX,
            quality_start: 85,
            quality_floor: 40,
            quality_step: 10,
        }
    }
}

impl PreparePolicy {
    pub fn with_max_bytes(max_bytes: usize) -> Self {
        PreparePolicy {
            max_bytes,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct PreparedAsset {
    pub bytes: Vec<u8>,
    pub content_type: String,
    /// True when even the floor-quality encoding exceeded the budget.
    pub over_budget: bool,
}

/// Select a resampling filter by downscale ratio.
fn select_filter(orig_width: u32, orig_height: u32, target: u32) -> FilterType {
    let width_ratio = orig_width as f32 / target as f32;
    let height_ratio = orig_height as f32 / target as f32;
    let max_ratio = width_ratio.max(height_ratio);

    if max_ratio > 2.0 {
        FilterType::Triangle
    } else if max_ratio > 1.5 {
        FilterType::CatmullRom
    } else {
        FilterType::Lanczos3
    }
}

/// Prepare one candidate for transfer.
///
/// Pure transform: no side effects beyond the returned bytes. Existing
/// (already-persisted) assets passed through this gate on a prior save and
/// are never re-prepared.
pub fn prepare_asset(
    bytes: Vec<u8>,
    content_type: &str,
    policy: &PreparePolicy,
) -> Result<PreparedAsset, PrepareError> {
    if bytes.len() <= policy.max_bytes {
        return Ok(PreparedAsset {
            bytes,
            content_type: content_type.to_string(),
            over_budget: false,
        });
    }

    let original_size = bytes.len();
    let img = image::load_from_memory(&bytes).map_err(|e| PrepareError::Decode(e.to_string()))?;

    let (orig_width, orig_height) = img.dimensions();
    let img = if orig_width > policy.max_dimension || orig_height > policy.max_dimension {
        let filter = select_filter(orig_width, orig_height, policy.max_dimension);
        img.resize(policy.max_dimension, policy.max_dimension, filter)
    } else {
        img
    };

    // JPEG output cannot carry alpha.
    let rgb = img.to_rgb8();

    let mut quality = policy.quality_start.max(policy.quality_floor);
    loop {
        let mut out = Vec::new();
        JpegEncoder::new_with_quality(&mut out, quality)
            .encode_image(&rgb)
            .map_err(|e| PrepareError::Encode(e.to_string()))?;

        if out.len() <= policy.max_bytes || quality <= policy.quality_floor {
            let over_budget = out.len() > policy.max_bytes;
            if over_budget {
                tracing::warn!(
                    original_bytes = original_size,
                    encoded_bytes = out.len(),
                    budget_bytes = policy.max_bytes,
                    quality = quality,
                    "Floor-quality encoding still exceeds transfer budget, accepting"
                );
            } else {
                tracing::debug!(
                    original_bytes = original_size,
                    encoded_bytes = out.len(),
                    quality = quality,
                    "Asset re-encoded within transfer budget"
                );
            }
            return Ok(PreparedAsset {
                bytes: out,
                content_type: "image/jpeg".to_string(),
                over_budget,
            });
        }

        quality = quality
            .saturating_sub(policy.quality_step)
            .max(policy.quality_floor);
    }
}
