//! Renderer boundary — the only way the cache touches the GPU.
//!
//! The cache never creates, binds or uploads textures itself. It asks the
//! [`RendererInterface`] for texture resources, polls them through
//! [`TextureResource`], and issues atlas copy commands (`pack`/`unpack`)
//! that the renderer executes on its own schedule. Glyph bitmaps come from
//! a [`Font`].

use std::sync::Arc;

use crate::id::ResourceId;
use crate::loading::TextureLoadingData;
use crate::math::{PointI, RectI, Vec2};
use crate::packer::{NodeId, TexturePacker};

/// Shared handle to a texture resource owned by the renderer.
pub type TextureHandle = Arc<dyn TextureResource>;

/// Layout of a loaded texture, used to build [`TextureReference`]s.
///
/// [`TextureReference`]: crate::TextureReference
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextureMetrics {
    pub width: u32,
    pub height: u32,
    pub atlas_offset: Vec2,
    pub atlas_scale: Vec2,
    pub visible_offset: Vec2,
    pub visible_scale: Vec2,
    pub occlusion_offset: Vec2,
    pub occlusion_scale: Vec2,
}

impl TextureMetrics {
    /// Metrics for a plain `width x height` texture with no atlas remap and
    /// a fully visible, non-occluding region.
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            atlas_offset: Vec2::ZERO,
            atlas_scale: Vec2::ONE,
            visible_offset: Vec2::ZERO,
            visible_scale: Vec2::ONE,
            occlusion_offset: Vec2::ZERO,
            occlusion_scale: Vec2::ZERO,
        }
    }
}

/// An in-flight or ready GPU texture.
///
/// All queries are non-blocking polls. Dropping the last handle of a
/// still-loading resource must be safe.
pub trait TextureResource: Send + Sync {
    /// Still waiting on data.
    fn is_loading(&self) -> bool;

    /// Layout, once loaded.
    fn resolve_texture_metrics(&self) -> Option<TextureMetrics>;

    /// Resident size, once loaded.
    fn resolve_memory_usage_in_bytes(&self) -> Option<u64>;

    /// Resident size, zero while loading.
    fn memory_usage_in_bytes(&self) -> u64 {
        self.resolve_memory_usage_in_bytes().unwrap_or(0)
    }

    /// Whether real dimensions are known (as opposed to a placeholder).
    fn has_dimensions(&self) -> bool;

    /// Variant-selection table for the image this resource was loaded as.
    ///
    /// Only meaningful for the base variant once loading has finished.
    fn resolve_loading_data(&self, _id: &ResourceId) -> Option<TextureLoadingData> {
        None
    }
}

/// GPU backend consumed by the cache.
pub trait RendererInterface {
    /// Drop every atlas region.
    fn clear_pack(&mut self);

    /// Copy `source_rect` of `source` into the atlas at `destination`,
    /// tagging the region with `node`.
    fn pack(&mut self, node: NodeId, source: &TextureHandle, source_rect: RectI, destination: PointI);

    /// The region tagged `node` may be reused.
    fn unpack(&mut self, node: NodeId);

    /// Begin loading the texture named by a direct identifier.
    fn resolve_texture(&mut self, id: &ResourceId) -> TextureHandle;

    /// Create a texture from raw pixel bytes (`stride` bytes per pixel: 1 or 4).
    fn resolve_texture_from_data(
        &mut self,
        data: &[u8],
        width: u32,
        height: u32,
        stride: u32,
        is_full_occluder: bool,
    ) -> TextureHandle;

    /// The shared atlas texture backing `packer`.
    fn resolve_packer_texture(&mut self, packer: &TexturePacker) -> TextureHandle;

    /// Monotonic frame counter used for all LRU comparisons.
    fn render_frame_count(&self) -> u32;
}

/// Single-channel SDF glyph bitmap produced by a [`Font`].
#[derive(Clone, Debug, Default)]
pub struct GlyphBitmap {
    pub width: u32,
    pub height: u32,
    /// `width * height` bytes, one distance sample per pixel.
    pub data: Vec<u8>,
    pub x_offset: f32,
    pub y_offset: f32,
    pub x_advance: f32,
    pub text_height: f32,
}

/// Glyph rasterizer.
pub trait Font {
    /// Stable identifier; glyph tables are keyed by it.
    fn unique_id(&self) -> &str;

    /// Rasterize `code_point` as a signed-distance-field bitmap.
    fn rasterize_sdf(&self, code_point: char) -> Option<GlyphBitmap>;
}
