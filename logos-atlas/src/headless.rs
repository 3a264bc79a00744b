//! In-process renderer for tests, benchmarks and the simulator.
//!
//! [`HeadlessRenderer`] implements the renderer boundary without a GPU:
//!
//! ```text
//! register_image(path, w, h) ──► resolve_texture(id@variant)
//!                                    │  size = base >> shift
//!                                    ▼
//!                           HeadlessTexture (ready at frame + latency)
//!
//! pack(node) ──► pending ──advance_frame()──► resident
//! ```
//!
//! Textures share the renderer's frame clock, so a texture requested with a
//! load latency of `n` frames reports `is_loading() == true` until the
//! renderer has advanced `n` frames. Atlas copies become resident on the
//! next frame, mirroring a GPU that executes copy commands asynchronously.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::id::{ResourceId, VariantTag};
use crate::loading::TextureLoadingData;
use crate::math::{PointI, RectI};
use crate::packer::{NodeId, TexturePacker};
use crate::renderer::{
    Font, GlyphBitmap, RendererInterface, TextureHandle, TextureMetrics, TextureResource,
};

// ───────────────────────────────────────────────────────────────────
// Textures
// ───────────────────────────────────────────────────────────────────

/// Texture whose load completes at a fixed frame.
#[derive(Debug)]
pub struct HeadlessTexture {
    clock: Arc<AtomicU32>,
    ready_frame: u32,
    width: u32,
    height: u32,
    has_dimensions: bool,
    loading_data: Option<TextureLoadingData>,
}

impl HeadlessTexture {
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }
}

impl TextureResource for HeadlessTexture {
    fn is_loading(&self) -> bool {
        self.clock.load(Ordering::Relaxed) < self.ready_frame
    }

    fn resolve_texture_metrics(&self) -> Option<TextureMetrics> {
        (!self.is_loading()).then(|| TextureMetrics::full(self.width, self.height))
    }

    fn resolve_memory_usage_in_bytes(&self) -> Option<u64> {
        (!self.is_loading()).then(|| u64::from(self.width) * u64::from(self.height) * 4)
    }

    fn has_dimensions(&self) -> bool {
        self.has_dimensions
    }

    fn resolve_loading_data(&self, id: &ResourceId) -> Option<TextureLoadingData> {
        if self.is_loading() || id.variant() != Some(VariantTag::BASE) {
            return None;
        }
        self.loading_data.clone()
    }
}

/// One recorded `pack` command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PackOp {
    pub node: NodeId,
    pub source_rect: RectI,
    pub destination: PointI,
}

#[derive(Clone, Debug)]
struct HeadlessImage {
    width: u32,
    height: u32,
    loading_data: Option<TextureLoadingData>,
}

// ───────────────────────────────────────────────────────────────────
// Renderer
// ───────────────────────────────────────────────────────────────────

/// GPU-less [`RendererInterface`].
#[derive(Debug, Default)]
pub struct HeadlessRenderer {
    clock: Arc<AtomicU32>,
    load_latency_frames: u32,
    images: FxHashMap<Arc<str>, HeadlessImage>,
    resolve_requests: Vec<ResourceId>,
    data_uploads: usize,
    pack_ops: Vec<PackOp>,
    unpack_ops: Vec<NodeId>,
    clear_pack_count: usize,
    pending: FxHashSet<NodeId>,
    resident: FxHashSet<NodeId>,
}

impl HeadlessRenderer {
    /// Renderer whose file textures load instantly.
    pub fn new() -> Self {
        Self::default()
    }

    /// Renderer whose file textures take `frames` frames to load.
    pub fn with_load_latency(frames: u32) -> Self {
        Self {
            load_latency_frames: frames,
            ..Self::default()
        }
    }

    /// Register a `width x height` base image at `path`, with the standard
    /// mip ladder as its loading data.
    pub fn register_image(&mut self, path: &str, width: u32, height: u32) {
        let ladder = TextureLoadingData::mip_ladder(width.max(height) as f32, VariantTag::COUNT);
        self.register_image_with_loading_data(path, width, height, Some(ladder));
    }

    /// Register an image with an explicit (or no) variant table.
    pub fn register_image_with_loading_data(
        &mut self,
        path: &str,
        width: u32,
        height: u32,
        loading_data: Option<TextureLoadingData>,
    ) {
        self.images.insert(
            Arc::from(path),
            HeadlessImage {
                width,
                height,
                loading_data,
            },
        );
    }

    /// Current frame.
    #[inline]
    pub fn frame(&self) -> u32 {
        self.clock.load(Ordering::Relaxed)
    }

    /// Advance one frame and commit pending atlas copies.
    pub fn advance_frame(&mut self) -> u32 {
        self.commit_packs();
        self.clock.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Jump the clock to `frame` (never backwards).
    pub fn set_frame(&mut self, frame: u32) {
        self.clock.fetch_max(frame, Ordering::Relaxed);
    }

    /// Make every pending atlas copy resident.
    pub fn commit_packs(&mut self) {
        self.resident.extend(self.pending.drain());
    }

    /// Whether the copy for `node` has executed.
    #[inline]
    pub fn is_resident(&self, node: NodeId) -> bool {
        self.resident.contains(&node)
    }

    /// Every identifier passed to `resolve_texture`, in order.
    #[inline]
    pub fn resolve_requests(&self) -> &[ResourceId] {
        &self.resolve_requests
    }

    pub fn resolve_count(&self, id: &ResourceId) -> usize {
        self.resolve_requests.iter().filter(|r| *r == id).count()
    }

    #[inline]
    pub fn data_upload_count(&self) -> usize {
        self.data_uploads
    }

    #[inline]
    pub fn pack_ops(&self) -> &[PackOp] {
        &self.pack_ops
    }

    #[inline]
    pub fn unpack_ops(&self) -> &[NodeId] {
        &self.unpack_ops
    }

    #[inline]
    pub fn clear_pack_count(&self) -> usize {
        self.clear_pack_count
    }

    /// Nodes whose copy is pending or resident.
    pub fn live_node_count(&self) -> usize {
        self.pending.len() + self.resident.len()
    }

    fn texture(&self, width: u32, height: u32, latency: u32) -> HeadlessTexture {
        HeadlessTexture {
            clock: Arc::clone(&self.clock),
            ready_frame: self.frame().saturating_add(latency),
            width,
            height,
            has_dimensions: true,
            loading_data: None,
        }
    }
}

impl RendererInterface for HeadlessRenderer {
    fn clear_pack(&mut self) {
        self.pending.clear();
        self.resident.clear();
        self.clear_pack_count += 1;
    }

    fn pack(&mut self, node: NodeId, _source: &TextureHandle, source_rect: RectI, destination: PointI) {
        self.pending.insert(node);
        self.pack_ops.push(PackOp {
            node,
            source_rect,
            destination,
        });
    }

    fn unpack(&mut self, node: NodeId) {
        self.pending.remove(&node);
        self.resident.remove(&node);
        self.unpack_ops.push(node);
    }

    fn resolve_texture(&mut self, id: &ResourceId) -> TextureHandle {
        self.resolve_requests.push(id.clone());
        let latency = self.load_latency_frames;

        let image = match id {
            ResourceId::Direct { path, .. } => self.images.get(path.as_ref()).cloned(),
            ResourceId::Indirect(_) => None,
        };
        let Some(image) = image else {
            log::debug!("Headless renderer has no image for {id}; using placeholder");
            let mut placeholder = self.texture(1, 1, latency);
            placeholder.has_dimensions = false;
            return Arc::new(placeholder);
        };

        let shift = id.variant().unwrap_or(VariantTag::BASE).shift_from_base();
        let mut texture = self.texture((image.width >> shift).max(1), (image.height >> shift).max(1), latency);
        texture.loading_data = image.loading_data;
        Arc::new(texture)
    }

    fn resolve_texture_from_data(
        &mut self,
        _data: &[u8],
        width: u32,
        height: u32,
        _stride: u32,
        _is_full_occluder: bool,
    ) -> TextureHandle {
        self.data_uploads += 1;
        Arc::new(self.texture(width, height, 0))
    }

    fn resolve_packer_texture(&mut self, packer: &TexturePacker) -> TextureHandle {
        Arc::new(self.texture(packer.width(), packer.height(), 0))
    }

    fn render_frame_count(&self) -> u32 {
        self.frame()
    }
}

// ───────────────────────────────────────────────────────────────────
// Font
// ───────────────────────────────────────────────────────────────────

/// Font that rasterizes every visible glyph as a fixed-size SDF box.
#[derive(Debug)]
pub struct HeadlessFont {
    id: String,
    glyph_width: u32,
    glyph_height: u32,
    rasterized: AtomicUsize,
}

impl HeadlessFont {
    pub fn new(id: &str, glyph_width: u32, glyph_height: u32) -> Self {
        Self {
            id: id.to_string(),
            glyph_width,
            glyph_height,
            rasterized: AtomicUsize::new(0),
        }
    }

    /// Number of `rasterize_sdf` calls so far.
    pub fn rasterize_count(&self) -> usize {
        self.rasterized.load(Ordering::Relaxed)
    }
}

impl Font for HeadlessFont {
    fn unique_id(&self) -> &str {
        &self.id
    }

    fn rasterize_sdf(&self, code_point: char) -> Option<GlyphBitmap> {
        self.rasterized.fetch_add(1, Ordering::Relaxed);
        if code_point == '\0' {
            return None;
        }

        let advance = self.glyph_width as f32 + 1.0;
        if code_point.is_whitespace() {
            return Some(GlyphBitmap {
                x_advance: advance,
                text_height: self.glyph_height as f32,
                ..Default::default()
            });
        }

        let len = self.glyph_width as usize * self.glyph_height as usize;
        Some(GlyphBitmap {
            width: self.glyph_width,
            height: self.glyph_height,
            data: vec![(u32::from(code_point) & 0xff) as u8; len],
            x_offset: 0.0,
            y_offset: 0.0,
            x_advance: advance,
            text_height: self.glyph_height as f32,
        })
    }
}

// ===================================================================
// Tests
// ===================================================================
