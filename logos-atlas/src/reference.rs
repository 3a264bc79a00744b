//! Draw-ready texture placement.

use crate::id::VariantTag;
use crate::math::Vec2;
use crate::renderer::{TextureHandle, TextureMetrics};

/// Everything a draw needs to sample one image: which texture, where the
/// image sits inside it, and which part of it is visible or opaque.
#[derive(Clone)]
pub struct TextureReference {
    /// `None` until the entry has loaded.
    pub texture: Option<TextureHandle>,
    /// Origin of the image inside `texture`, normalised.
    pub atlas_offset: Vec2,
    /// Size of the image inside `texture`, normalised.
    pub atlas_scale: Vec2,
    /// Sampling clamp, normalised texture coordinates.
    pub atlas_min: Vec2,
    pub atlas_max: Vec2,
    /// Origin of the non-transparent region, relative to the image.
    pub visible_offset: Vec2,
    /// Size of the non-transparent region, relative to the image.
    pub visible_scale: Vec2,
    /// Fully opaque region, relative to the image; zero scale when none.
    pub occlusion_offset: Vec2,
    pub occlusion_scale: Vec2,
    /// Variant this reference was resolved from.
    pub variant: VariantTag,
}

impl Default for TextureReference {
    fn default() -> Self {
        Self {
            texture: None,
            atlas_offset: Vec2::ZERO,
            atlas_scale: Vec2::ONE,
            atlas_min: Vec2::ZERO,
            atlas_max: Vec2::ONE,
            visible_offset: Vec2::ZERO,
            visible_scale: Vec2::ONE,
            occlusion_offset: Vec2::ZERO,
            occlusion_scale: Vec2::ZERO,
            variant: VariantTag::BASE,
        }
    }
}

impl std::fmt::Debug for TextureReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextureReference")
            .field("texture", &self.texture.is_some())
            .field("atlas_offset", &self.atlas_offset)
            .field("atlas_scale", &self.atlas_scale)
            .field("atlas_min", &self.atlas_min)
            .field("atlas_max", &self.atlas_max)
            .field("visible_offset", &self.visible_offset)
            .field("visible_scale", &self.visible_scale)
            .field("variant", &self.variant)
            .finish()
    }
}

impl TextureReference {
    /// Reference that samples `texture` directly.
    pub fn from_metrics(texture: TextureHandle, metrics: &TextureMetrics, variant: VariantTag) -> Self {
        Self {
            texture: Some(texture),
            atlas_offset: metrics.atlas_offset,
            atlas_scale: metrics.atlas_scale,
            atlas_min: Vec2::ZERO,
            atlas_max: Vec2::ONE,
            visible_offset: metrics.visible_offset,
            visible_scale: metrics.visible_scale,
            occlusion_offset: metrics.occlusion_offset,
            occlusion_scale: metrics.occlusion_scale,
            variant,
        }
    }

    /// Whether a texture is attached.
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.texture.is_some()
    }

    /// Remap for an image copied into an atlas page.
    ///
    /// The packed pixels cover only the visible region, so the image's own
    /// visible-region remap is undone before composing with its atlas
    /// placement. `packed_offset` and `packed_scale` are the normalised
    /// origin and size of the copied region inside the page.
    pub fn packed_into(&self, page: TextureHandle, packed_offset: Vec2, packed_scale: Vec2) -> Self {
        let inv_visible = self.visible_scale.recip_or_zero();
        Self {
            texture: Some(page),
            atlas_offset: packed_scale
                .mul_componentwise(-self.visible_offset)
                .mul_componentwise(inv_visible)
                + packed_offset,
            atlas_scale: packed_scale.mul_componentwise(inv_visible),
            atlas_min: packed_offset,
            atlas_max: packed_offset + packed_scale,
            ..self.clone()
        }
    }
}

/// A drawable reference, tagged with where its pixels live.
#[derive(Clone, Debug)]
pub enum PreparedReference {
    /// Samples the shared atlas page.
    Packed(TextureReference),
    /// Samples the entry's own texture.
    Unpacked(TextureReference),
}

impl PreparedReference {
    #[inline]
    pub fn reference(&self) -> &TextureReference {
        match self {
            PreparedReference::Packed(r) | PreparedReference::Unpacked(r) => r,
        }
    }

    #[inline]
    pub fn into_reference(self) -> TextureReference {
        match self {
            PreparedReference::Packed(r) | PreparedReference::Unpacked(r) => r,
        }
    }

    #[inline]
    pub fn is_packed(&self) -> bool {
        matches!(self, PreparedReference::Packed(_))
    }
}
