//! Cache configuration.
//!
//! All options have defaults, so a JSON document only needs to name the
//! values it overrides:
//!
//! ```json
//! { "texture_packer_width": 2048, "texture_packer_height": 2048 }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Largest atlas edge accepted by [`TextureCacheConfig::validate`].
pub const MAX_ATLAS_DIMENSION: u32 = 8192;

/// Texture cache and packer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextureCacheConfig {
    /// Atlas width in pixels.
    pub texture_packer_width: u32,
    /// Atlas height in pixels.
    pub texture_packer_height: u32,
    /// Images whose visible `width * height` exceeds this are never packed.
    pub texture_packer_sub_image_max_dimension_square: u64,
    /// Packed entries not drawn within this many frames may be unpacked
    /// to make room for new ones.
    pub texture_packer_purge_threshold_in_frames: u32,
    /// Above this resident total, entries outside the soft window are evicted.
    pub texture_memory_soft_purge_threshold_in_bytes: u64,
    /// Above this resident total, everything not drawn this frame is evicted.
    pub texture_memory_hard_purge_threshold_in_bytes: u64,
    /// Eviction window used by the soft purge.
    pub texture_memory_soft_purge_threshold_in_frames: u32,
}

impl Default for TextureCacheConfig {
    fn default() -> Self {
        Self {
            texture_packer_width: 1024,
            texture_packer_height: 1024,
            texture_packer_sub_image_max_dimension_square: 128 * 128,
            texture_packer_purge_threshold_in_frames: 30,
            texture_memory_soft_purge_threshold_in_bytes: 32 * 1024 * 1024,
            texture_memory_hard_purge_threshold_in_bytes: 64 * 1024 * 1024,
            texture_memory_soft_purge_threshold_in_frames: 120,
        }
    }
}

impl TextureCacheConfig {
    /// Parse and validate a JSON config document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON config file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&json)?;
        log::info!(
            "Loaded texture cache config from {}: atlas {}x{}",
            path.display(),
            config.texture_packer_width,
            config.texture_packer_height
        );
        Ok(config)
    }

    /// Check option ranges and cross-option consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let in_range = |v: u32| (1..=MAX_ATLAS_DIMENSION).contains(&v);
        if !in_range(self.texture_packer_width) || !in_range(self.texture_packer_height) {
            return Err(ConfigError::AtlasDimensions {
                width: self.texture_packer_width,
                height: self.texture_packer_height,
                max: MAX_ATLAS_DIMENSION,
            });
        }
        if self.texture_packer_sub_image_max_dimension_square == 0 {
            return Err(ConfigError::ZeroSubImageArea);
        }
        if self.texture_memory_soft_purge_threshold_in_bytes
            > self.texture_memory_hard_purge_threshold_in_bytes
        {
            return Err(ConfigError::PurgeThresholds {
                soft: self.texture_memory_soft_purge_threshold_in_bytes,
                hard: self.texture_memory_hard_purge_threshold_in_bytes,
            });
        }
        Ok(())
    }
}
