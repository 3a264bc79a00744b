//! Variant-selection tables.
//!
//! Each base image gets one [`TextureLoadingData`]: an ascending list of
//! `(threshold, variant)` pairs. For a requested render size the first
//! entry whose threshold is at least that size wins, so a draw never gets
//! a variant coarser than it asked for unless the table runs out.

use crate::error::LoadingDataError;
use crate::id::VariantTag;

/// One row of a selection table.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LoadingThreshold {
    /// Largest render size this variant is good for.
    pub threshold: f32,
    pub variant: VariantTag,
}

impl LoadingThreshold {
    pub const fn new(threshold: f32, variant: VariantTag) -> Self {
        Self { threshold, variant }
    }
}

/// Ascending-by-threshold variant table for one base image.
#[derive(Clone, Debug, PartialEq)]
pub struct TextureLoadingData {
    entries: Vec<LoadingThreshold>,
    needs_refresh: bool,
}

impl TextureLoadingData {
    /// Build a table. Entries are sorted ascending by threshold (stable,
    /// so equal thresholds keep caller order).
    pub fn new(mut entries: Vec<LoadingThreshold>) -> Result<Self, LoadingDataError> {
        if entries.is_empty() {
            return Err(LoadingDataError::Empty);
        }
        if let Some(index) = entries.iter().position(|e| e.threshold.is_nan()) {
            return Err(LoadingDataError::NanThreshold { index });
        }
        entries.sort_by(|a, b| a.threshold.total_cmp(&b.threshold));
        Ok(Self {
            entries,
            needs_refresh: false,
        })
    }

    /// Standard mip ladder for an image whose base variant renders at
    /// `base_size` pixels (its larger edge).
    ///
    /// Level `n` of `levels` is usable up to `base_size / 2^(BASE - n)`; the
    /// base variant is unbounded so every request resolves.
    pub fn mip_ladder(base_size: f32, levels: u8) -> Self {
        let levels = levels.clamp(1, VariantTag::COUNT);
        let first = VariantTag::BASE.index() + 1 - levels;
        let entries = (first..=VariantTag::BASE.index())
            .map(|level| {
                let variant = VariantTag::level(level);
                let threshold = if variant.is_base() {
                    f32::MAX
                } else {
                    base_size / (1u32 << variant.shift_from_base()) as f32
                };
                LoadingThreshold::new(threshold, variant)
            })
            .collect();
        Self {
            entries,
            needs_refresh: false,
        }
    }

    /// Table for an image that only ships its base variant.
    pub fn base_only() -> Self {
        Self {
            entries: vec![LoadingThreshold::new(f32::MAX, VariantTag::BASE)],
            needs_refresh: false,
        }
    }

    /// First variant whose threshold is `>= render_threshold`.
    pub fn select(&self, render_threshold: f32) -> Option<VariantTag> {
        self.entries
            .iter()
            .find(|e| render_threshold <= e.threshold)
            .map(|e| e.variant)
    }

    #[inline]
    pub fn entries(&self) -> &[LoadingThreshold] {
        &self.entries
    }

    /// Set when the table survived a cache purge and should be re-read from
    /// the base texture at the next opportunity.
    #[inline]
    pub fn needs_refresh(&self) -> bool {
        self.needs_refresh
    }

    #[inline]
    pub(crate) fn mark_needs_refresh(&mut self) {
        self.needs_refresh = true;
    }
}
