//! Texture packer — policy layer over the atlas allocation tree.
//!
//! Turns "pack this glyph" and "pack this sub-image" requests into
//! `guillotiere` allocations plus renderer copy commands. Every allocation
//! is padded by [`PACK_PADDING`] so a one-texel border surrounds the copied
//! pixels and bilinear sampling never bleeds into a neighbour.
//!
//! Packing is best effort: a failed allocation is reported as `None` and the
//! caller decides whether to make room and retry or to draw unpacked.

use std::num::NonZeroU32;

use guillotiere::{size2, AllocId, AtlasAllocator};
use rustc_hash::FxHashMap;

use crate::math::{PointI, RectI, Vec2};
use crate::renderer::{Font, RendererInterface, TextureHandle};

/// Extra pixels added to each allocation edge pair.
pub const PACK_PADDING: i32 = 2;

/// Offset of the copied pixels inside their allocation.
const PACK_BORDER: i32 = PACK_PADDING / 2;

/// Opaque handle to one atlas allocation, shared with the renderer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(NonZeroU32);

impl NodeId {
    /// `None` for zero.
    #[inline]
    pub fn from_raw(raw: u32) -> Option<Self> {
        NonZeroU32::new(raw).map(Self)
    }

    #[inline]
    pub fn get(self) -> u32 {
        self.0.get()
    }
}

/// Result of packing a sub-image: the node and where its pixels landed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PackedRegion {
    pub node: NodeId,
    /// Top-left of the copied pixels in atlas space (inside the border).
    pub origin: PointI,
}

/// Layout of a rasterized glyph in the atlas.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GlyphMetrics {
    pub width: u32,
    pub height: u32,
    pub x_offset: f32,
    pub y_offset: f32,
    pub x_advance: f32,
    pub text_height: f32,
    /// Normalised top-left atlas coordinate. Zero until packed.
    pub uv_min: Vec2,
    /// Normalised bottom-right atlas coordinate. Zero until packed.
    pub uv_max: Vec2,
}

/// A rasterized glyph, packed into the atlas if `node` is set.
#[derive(Clone)]
pub struct PackedGlyph {
    pub node: Option<NodeId>,
    pub metrics: GlyphMetrics,
    /// Standalone texture holding the SDF bitmap; `None` for empty glyphs.
    pub texture: Option<TextureHandle>,
}

/// Allocates atlas space and issues renderer copy commands.
pub struct TexturePacker {
    allocator: AtlasAllocator,
    width: u32,
    height: u32,
    nodes: FxHashMap<NodeId, AllocId>,
    next_node: u32,
}

impl std::fmt::Debug for TexturePacker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TexturePacker")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("nodes", &self.nodes.len())
            .finish()
    }
}

impl TexturePacker {
    /// Create an empty `width x height` atlas.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            allocator: AtlasAllocator::new(size2(to_i32(width), to_i32(height))),
            width,
            height,
            nodes: FxHashMap::default(),
            next_node: 1,
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of live allocations.
    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    /// Pack `source_rect` of `source` into the atlas.
    pub fn pack<R: RendererInterface + ?Sized>(
        &mut self,
        renderer: &mut R,
        source: &TextureHandle,
        source_rect: RectI,
    ) -> Option<PackedRegion> {
        if source_rect.is_empty() {
            return None;
        }
        let (node, origin) = self.allocate(source_rect.width(), source_rect.height())?;
        renderer.pack(node, source, source_rect, origin);
        Some(PackedRegion { node, origin })
    }

    /// Rasterize `code_point`, upload it as a standalone texture and try to
    /// pack it. `None` only when the font has no bitmap for the glyph; a
    /// full atlas yields a glyph with `node == None` that can be retried
    /// with [`TexturePacker::pack_glyph`].
    pub fn pack_font_glyph<R: RendererInterface + ?Sized>(
        &mut self,
        renderer: &mut R,
        font: &dyn Font,
        code_point: char,
    ) -> Option<PackedGlyph> {
        let bitmap = font.rasterize_sdf(code_point)?;
        let mut metrics = GlyphMetrics {
            width: bitmap.width,
            height: bitmap.height,
            x_offset: bitmap.x_offset,
            y_offset: bitmap.y_offset,
            x_advance: bitmap.x_advance,
            text_height: bitmap.text_height,
            ..Default::default()
        };

        let expected = bitmap.width as usize * bitmap.height as usize;
        if expected == 0 || bitmap.data.len() < expected {
            return Some(PackedGlyph {
                node: None,
                metrics,
                texture: None,
            });
        }

        let texture =
            renderer.resolve_texture_from_data(&bitmap.data, bitmap.width, bitmap.height, 1, false);
        let node = self.pack_glyph(renderer, &texture, &mut metrics);
        Some(PackedGlyph {
            node,
            metrics,
            texture: Some(texture),
        })
    }

    /// Pack an already rasterized glyph texture and fill in its UVs.
    pub fn pack_glyph<R: RendererInterface + ?Sized>(
        &mut self,
        renderer: &mut R,
        texture: &TextureHandle,
        metrics: &mut GlyphMetrics,
    ) -> Option<NodeId> {
        let rect = RectI::from_origin_size(0, 0, to_i32(metrics.width), to_i32(metrics.height));
        let region = self.pack(renderer, texture, rect)?;

        let inv_w = 1.0 / self.width as f32;
        let inv_h = 1.0 / self.height as f32;
        metrics.uv_min = Vec2::new(region.origin.x as f32 * inv_w, region.origin.y as f32 * inv_h);
        metrics.uv_max = Vec2::new(
            (region.origin.x + rect.width()) as f32 * inv_w,
            (region.origin.y + rect.height()) as f32 * inv_h,
        );
        Some(region.node)
    }

    /// Free `node`. Returns `false` for unknown nodes.
    pub fn unpack<R: RendererInterface + ?Sized>(&mut self, renderer: &mut R, node: NodeId) -> bool {
        let Some(alloc) = self.nodes.remove(&node) else {
            return false;
        };
        self.allocator.deallocate(alloc);
        renderer.unpack(node);
        true
    }

    /// Drop every allocation.
    pub fn clear<R: RendererInterface + ?Sized>(&mut self, renderer: &mut R) {
        self.allocator.clear();
        self.nodes.clear();
        renderer.clear_pack();
    }

    /// Coalesce free space after a batch of unpacks.
    ///
    /// The tree merges neighbouring free rectangles on every deallocation;
    /// once nothing is live it is reset to a single free rectangle.
    pub fn collect_garbage(&mut self) {
        if self.nodes.is_empty() {
            self.allocator.clear();
        }
    }

    // ───────────────────── internals ─────────────────────

    fn allocate(&mut self, width: i32, height: i32) -> Option<(NodeId, PointI)> {
        let padded = size2(width.checked_add(PACK_PADDING)?, height.checked_add(PACK_PADDING)?);
        let allocation = self.allocator.allocate(padded)?;
        let node = self.next_node_id();
        self.nodes.insert(node, allocation.id);
        let origin = PointI::new(
            allocation.rectangle.min.x + PACK_BORDER,
            allocation.rectangle.min.y + PACK_BORDER,
        );
        Some((node, origin))
    }

    fn next_node_id(&mut self) -> NodeId {
        loop {
            let raw = self.next_node;
            self.next_node = self.next_node.checked_add(1).unwrap_or(1);
            if let Some(node) = NodeId::from_raw(raw) {
                if !self.nodes.contains_key(&node) {
                    return node;
                }
            }
        }
    }
}

#[inline]
fn to_i32(v: u32) -> i32 {
    i32::try_from(v).unwrap_or(i32::MAX)
}

// ===================================================================
// Tests
// ===================================================================
