use thiserror::Error;

/// Failure to load or validate a [`TextureCacheConfig`](crate::TextureCacheConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Config JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Atlas dimensions must be within 1..={max}, got {width}x{height}")]
    AtlasDimensions { width: u32, height: u32, max: u32 },
    #[error("Sub-image max area must be positive")]
    ZeroSubImageArea,
    #[error("Soft purge threshold ({soft} bytes) exceeds hard purge threshold ({hard} bytes)")]
    PurgeThresholds { soft: u64, hard: u64 },
}

/// Invalid variant-selection table handed to
/// [`TextureLoadingData::new`](crate::TextureLoadingData::new).
#[derive(Error, Debug, PartialEq)]
pub enum LoadingDataError {
    #[error("Loading data has no entries")]
    Empty,
    #[error("Loading data entry {index} has a NaN threshold")]
    NanThreshold { index: usize },
}
