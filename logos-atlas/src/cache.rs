//! Texture cache — the single entry point for draw-time texture lookup.
//!
//! ```text
//!  draw(id, render size)
//!       │
//!       ▼
//!  resolve_bitmap_file_path ──► indirect table / loading data ──► id@variant
//!       │
//!       ▼
//!  resolve ──hit──► entry                          ┌─► Packed(reference)
//!       │ miss                                     │
//!       ▼                                          │
//!  renderer.resolve_texture ─► process_loading ─► budget purge
//!       │
//!       ▼
//!  prepare: Loading ─► ReadyUnpacked ─► NeedsPack ─► ReadyPacked
//!                            │                           │
//!                            └───────► Unpacked(reference)
//! ```
//!
//! The cache never blocks and never fails a draw for lack of atlas space:
//! a texture that cannot be packed is drawn from its own texture, and a
//! texture that is still loading is substituted by an already loaded
//! variant of the same image when one exists.
//!
//! All LRU comparisons use the renderer's frame counter. Entries drawn in
//! frame `f` survive `purge_textures(n)` as long as `f + n > current`.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::bitmap::BitmapDefinition;
use crate::config::TextureCacheConfig;
use crate::error::ConfigError;
use crate::id::{ResourceId, VariantTag};
use crate::indirect::IndirectTextureTable;
use crate::loading::TextureLoadingData;
use crate::lru::{EntryKey, ListEntry, ListKind, ListState, TextureCacheList};
use crate::math::{RectI, Vec2};
use crate::observer::{CacheObserver, EvictionCause};
use crate::packer::{GlyphMetrics, NodeId, PackedRegion, TexturePacker};
use crate::reference::{PreparedReference, TextureReference};
use crate::renderer::{Font, RendererInterface, TextureHandle};

/// Code point → glyph entry, one table per font.
pub type GlyphTable = FxHashMap<char, EntryKey>;

// ───────────────────────────────────────────────────────────────────
// Entries
// ───────────────────────────────────────────────────────────────────

/// One resolved texture variant.
pub struct TextureCacheTextureEntry {
    id: ResourceId,
    texture: TextureHandle,
    unpacked: TextureReference,
    packed: TextureReference,
    /// Unpacked reference has been built from real metrics.
    prepared: bool,
    supports_packing: bool,
    /// Bytes added to the cache total for this entry.
    memory_usage: u64,
    state: ListState,
}

impl TextureCacheTextureEntry {
    fn new(id: ResourceId, texture: TextureHandle, supports_packing: bool) -> Self {
        let variant = id.variant().unwrap_or(VariantTag::BASE);
        let unpacked = TextureReference {
            texture: Some(Arc::clone(&texture)),
            variant,
            ..TextureReference::default()
        };
        Self {
            id,
            texture,
            packed: unpacked.clone(),
            unpacked,
            prepared: false,
            supports_packing,
            memory_usage: 0,
            state: ListState::default(),
        }
    }

    /// Exact identifier, variant included.
    #[inline]
    pub fn id(&self) -> &ResourceId {
        &self.id
    }

    /// Renderer texture, possibly still loading.
    #[inline]
    pub fn texture(&self) -> &TextureHandle {
        &self.texture
    }

    #[inline]
    pub fn is_loading(&self) -> bool {
        self.texture.is_loading()
    }

    /// Reference sampling the entry's own texture.
    #[inline]
    pub fn unpacked_reference(&self) -> &TextureReference {
        &self.unpacked
    }

    /// Atlas reference; only meaningful while packed.
    #[inline]
    pub fn packed_reference(&self) -> &TextureReference {
        &self.packed
    }

    /// `false` once the entry was found too large to ever pack.
    #[inline]
    pub fn supports_packing(&self) -> bool {
        self.supports_packing
    }

    /// Bytes this entry contributes to the cache total.
    #[inline]
    pub fn memory_usage_in_bytes(&self) -> u64 {
        self.memory_usage
    }

    /// Frame of the most recent draw or creation.
    #[inline]
    pub fn last_draw_frame(&self) -> u32 {
        self.state.last_draw_frame()
    }

    /// Atlas node, from the pack request until unpack.
    #[inline]
    pub fn packed_node(&self) -> Option<NodeId> {
        self.state.packed_node()
    }

    /// Whether the renderer confirmed the atlas copy.
    #[inline]
    pub fn is_pack_ready(&self) -> bool {
        self.state.is_pack_ready()
    }
}

impl std::fmt::Debug for TextureCacheTextureEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextureCacheTextureEntry")
            .field("id", &self.id)
            .field("loading", &self.is_loading())
            .field("supports_packing", &self.supports_packing)
            .field("memory_usage", &self.memory_usage)
            .field("state", &self.state)
            .finish()
    }
}

/// One rasterized glyph of one font.
pub struct TextureCacheGlyphEntry {
    code_point: char,
    metrics: GlyphMetrics,
    /// Standalone SDF texture; `None` for empty or unrasterizable glyphs.
    texture: Option<TextureHandle>,
    state: ListState,
}

impl TextureCacheGlyphEntry {
    #[inline]
    pub fn code_point(&self) -> char {
        self.code_point
    }

    /// Layout metrics; UVs are valid while packed.
    #[inline]
    pub fn metrics(&self) -> &GlyphMetrics {
        &self.metrics
    }

    #[inline]
    pub fn texture(&self) -> Option<&TextureHandle> {
        self.texture.as_ref()
    }

    /// Frame of the most recent draw or creation.
    #[inline]
    pub fn last_draw_frame(&self) -> u32 {
        self.state.last_draw_frame()
    }

    /// Atlas node, from the pack request until unpack.
    #[inline]
    pub fn packed_node(&self) -> Option<NodeId> {
        self.state.packed_node()
    }

    /// Whether the renderer confirmed the atlas copy.
    #[inline]
    pub fn is_pack_ready(&self) -> bool {
        self.state.is_pack_ready()
    }
}

impl std::fmt::Debug for TextureCacheGlyphEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextureCacheGlyphEntry")
            .field("code_point", &self.code_point)
            .field("metrics", &self.metrics)
            .field("has_texture", &self.texture.is_some())
            .field("state", &self.state)
            .finish()
    }
}

/// Arena slot: texture entries are tracked globally, glyphs only in the
/// packed list.
#[derive(Debug)]
pub enum CacheEntry {
    Texture(TextureCacheTextureEntry),
    Glyph(TextureCacheGlyphEntry),
}

impl ListEntry for CacheEntry {
    fn list_state(&self) -> &ListState {
        match self {
            CacheEntry::Texture(e) => &e.state,
            CacheEntry::Glyph(e) => &e.state,
        }
    }

    fn list_state_mut(&mut self) -> &mut ListState {
        match self {
            CacheEntry::Texture(e) => &mut e.state,
            CacheEntry::Glyph(e) => &mut e.state,
        }
    }

    fn tracks_globally(&self) -> bool {
        matches!(self, CacheEntry::Texture(_))
    }
}

// ───────────────────────────────────────────────────────────────────
// Statistics
// ───────────────────────────────────────────────────────────────────

/// Running counters, reset with [`TextureCache::clear_stats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Lookups served by an existing texture or glyph entry.
    pub hits: u64,
    /// Lookups that created an entry.
    pub misses: u64,
    /// Texture entries destroyed by `purge_textures`.
    pub evictions: u64,
    /// Entries removed from the atlas.
    pub unpacks: u64,
    /// Pack attempts that failed even after making room.
    pub pack_failures: u64,
    /// Loading variants replaced by a ready one.
    pub substitutions: u64,
}

impl CacheStats {
    /// `hits / (hits + misses)`, zero before the first lookup.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

// ───────────────────────────────────────────────────────────────────
// TextureCache
// ───────────────────────────────────────────────────────────────────

/// Texture and glyph cache in front of a [`RendererInterface`].
pub struct TextureCache<R: RendererInterface> {
    renderer: R,
    config: TextureCacheConfig,
    packer: TexturePacker,
    packer_texture: TextureHandle,
    solid_fill: BitmapDefinition,
    list: TextureCacheList<CacheEntry>,
    textures: FxHashMap<ResourceId, EntryKey>,
    loading_data: FxHashMap<ResourceId, TextureLoadingData>,
    /// Entries whose memory has not been accounted yet.
    loading: Vec<EntryKey>,
    total_memory_bytes: u64,
    fonts: FxHashMap<Arc<str>, GlyphTable>,
    indirect: Arc<IndirectTextureTable>,
    observer: Option<Arc<dyn CacheObserver>>,
    stats: CacheStats,
}

impl<R: RendererInterface> TextureCache<R> {
    /// Create a cache with a private indirect table.
    pub fn new(renderer: R, config: TextureCacheConfig) -> Result<Self, ConfigError> {
        Self::with_indirect_table(renderer, config, Arc::new(IndirectTextureTable::new()))
    }

    /// Create a cache sharing `indirect` with other threads.
    pub fn with_indirect_table(
        mut renderer: R,
        config: TextureCacheConfig,
        indirect: Arc<IndirectTextureTable>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let packer = TexturePacker::new(config.texture_packer_width, config.texture_packer_height);
        let packer_texture = renderer.resolve_packer_texture(&packer);
        log::debug!(
            "Texture cache created: atlas {}x{}",
            packer.width(),
            packer.height()
        );
        Ok(Self {
            renderer,
            config,
            packer,
            packer_texture,
            solid_fill: BitmapDefinition::solid_fill(),
            list: TextureCacheList::new(),
            textures: FxHashMap::default(),
            loading_data: FxHashMap::default(),
            loading: Vec::new(),
            total_memory_bytes: 0,
            fonts: FxHashMap::default(),
            indirect,
            observer: None,
            stats: CacheStats::default(),
        })
    }

    /// Install (or remove) the event hook. The indirect table keeps its own.
    pub fn set_observer(&mut self, observer: Option<Arc<dyn CacheObserver>>) {
        self.observer = observer;
    }

    #[inline]
    fn current_frame(&self) -> u32 {
        self.renderer.render_frame_count()
    }

    // ───────────────────── draw-time resolution ─────────────────────

    /// Reference for `id` drawn at `render_threshold`.
    ///
    /// `None` only when no variant can be named at all (an unmapped indirect
    /// name). A still-loading entry yields an unpacked reference to its
    /// loading texture, or to an already loaded variant of the same image.
    /// An entry first resolved with `use_packed == false` never takes atlas
    /// space.
    pub fn resolve_texture_reference(
        &mut self,
        render_threshold: f32,
        id: &ResourceId,
        use_packed: bool,
    ) -> Option<PreparedReference> {
        self.resolve_path_reference(render_threshold, id, use_packed, use_packed)
    }

    /// Reference for a bitmap descriptor; `None` draws the solid fill.
    pub fn resolve_bitmap_reference(
        &mut self,
        render_threshold: f32,
        bitmap: Option<&BitmapDefinition>,
        use_packed: bool,
    ) -> Option<PreparedReference> {
        let fill;
        let bitmap = match bitmap {
            Some(bitmap) => bitmap,
            None => {
                fill = self.solid_fill.clone();
                &fill
            }
        };

        let can_pack = use_packed && bitmap.can_pack;
        if bitmap.data.is_none() {
            return self.resolve_path_reference(render_threshold, &bitmap.id, use_packed, can_pack);
        }

        let key = self.resolve(&bitmap.id, Some(bitmap), can_pack)?;
        let frame = self.current_frame();
        self.list.use_entry(key, frame);
        self.prepared_reference(key, use_packed)
    }

    fn resolve_path_reference(
        &mut self,
        render_threshold: f32,
        id: &ResourceId,
        use_packed: bool,
        can_pack: bool,
    ) -> Option<PreparedReference> {
        let path = self.resolve_bitmap_file_path(render_threshold, id)?;
        let mut key = self.resolve(&path, None, can_pack)?;
        let frame = self.current_frame();
        self.list.use_entry(key, frame);

        if self.is_entry_loading(key) {
            key = self.substitute_loaded_variant(&path, key);
        }
        self.prepared_reference(key, use_packed)
    }

    /// Pick the variant of `id` to draw at `render_threshold`.
    ///
    /// Indirect names are mapped first (`None` if unmapped). The first row
    /// of the image's loading data whose threshold is `>= render_threshold`
    /// wins; without loading data, or when no row qualifies, the base
    /// variant is used.
    pub fn resolve_bitmap_file_path(
        &mut self,
        render_threshold: f32,
        id: &ResourceId,
    ) -> Option<ResourceId> {
        let direct = if id.is_indirect() {
            let target = self.indirect.lookup(id.name())?;
            if target.is_indirect() {
                return None;
            }
            target
        } else {
            id.clone()
        };

        let base = direct.base();
        let stale = self
            .loading_data
            .get(&base)
            .map_or(true, TextureLoadingData::needs_refresh);
        if stale {
            match self.base_loading_data(&base) {
                Some(data) => {
                    self.loading_data.insert(base.clone(), data);
                }
                None if !self.loading_data.contains_key(&base) => return Some(base),
                None => {}
            }
        }

        let variant = self
            .loading_data
            .get(&base)
            .and_then(|data| data.select(render_threshold))
            .unwrap_or(VariantTag::BASE);
        Some(direct.with_variant(variant))
    }

    /// Loading data from the base entry, once it has loaded.
    fn base_loading_data(&self, base: &ResourceId) -> Option<TextureLoadingData> {
        let entry = self.texture_entry(*self.textures.get(base)?)?;
        if entry.is_loading() {
            return None;
        }
        Some(
            entry
                .texture
                .resolve_loading_data(base)
                .unwrap_or_else(TextureLoadingData::base_only),
        )
    }

    /// Replace a loading entry with the best loaded variant of its image.
    fn substitute_loaded_variant(&mut self, path: &ResourceId, key: EntryKey) -> EntryKey {
        let Some(data) = self.loading_data.get(&path.base()) else {
            return key;
        };
        let requested = path.variant();
        let frame = self.renderer.render_frame_count();

        for row in data.entries().iter().rev() {
            if Some(row.variant) == requested {
                continue;
            }
            let Some(&candidate) = self.textures.get(&path.with_variant(row.variant)) else {
                continue;
            };
            let ready = matches!(
                self.list.get(candidate),
                Some(CacheEntry::Texture(e)) if !e.is_loading()
            );
            if ready {
                log::trace!("Substituting variant {} for loading {path}", row.variant.index());
                self.list.use_entry(candidate, frame);
                self.stats.substitutions += 1;
                return candidate;
            }
        }
        key
    }

    fn prepared_reference(&mut self, key: EntryKey, use_packed: bool) -> Option<PreparedReference> {
        self.prepare(key);
        let entry = self.texture_entry(key)?;
        if use_packed && entry.supports_packing && entry.state.is_pack_ready() {
            Some(PreparedReference::Packed(entry.packed.clone()))
        } else {
            Some(PreparedReference::Unpacked(entry.unpacked.clone()))
        }
    }

    // ───────────────────── resolve / loading ─────────────────────

    /// Entry for the exact identifier `id`, creating it on a miss.
    ///
    /// A miss starts the load (or uploads `bitmap.data` when present),
    /// registers the entry for polling and applies the memory budget. The
    /// new entry counts as drawn this frame so the budget never evicts it.
    pub fn resolve(
        &mut self,
        id: &ResourceId,
        bitmap: Option<&BitmapDefinition>,
        can_pack: bool,
    ) -> Option<EntryKey> {
        if let Some(&key) = self.textures.get(id) {
            self.stats.hits += 1;
            return Some(key);
        }

        let raw = bitmap.and_then(|b| b.data.as_ref().map(|data| (b, data)));
        if id.is_indirect() && raw.is_none() {
            return None;
        }
        self.stats.misses += 1;

        let texture = match raw {
            Some((bitmap, data)) => self.renderer.resolve_texture_from_data(
                data,
                bitmap.width,
                bitmap.height,
                bitmap.stride(),
                bitmap.full_occluder,
            ),
            None => self.renderer.resolve_texture(id),
        };

        let frame = self.current_frame();
        let entry = TextureCacheTextureEntry::new(id.clone(), texture, can_pack);
        let key = self.list.insert(CacheEntry::Texture(entry));
        self.list.use_entry(key, frame);
        self.textures.insert(id.clone(), key);
        self.loading.push(key);
        if let Some(observer) = &self.observer {
            observer.entry_created(id);
        }

        self.process_loading();
        self.enforce_memory_budget();
        self.textures.get(id).copied()
    }

    /// Account memory for entries that finished loading and report their
    /// size. Returns how many are still being polled.
    pub fn process_loading(&mut self) -> usize {
        let list = &mut self.list;
        let total = &mut self.total_memory_bytes;
        self.loading.retain(|&key| {
            let Some(CacheEntry::Texture(entry)) = list.get_mut(key) else {
                return false;
            };
            if entry.texture.is_loading() {
                return true;
            }
            // Keep polling until the resource can report its size.
            let Some(bytes) = entry.texture.resolve_memory_usage_in_bytes() else {
                return true;
            };
            entry.memory_usage = bytes;
            *total += bytes;
            false
        });
        self.loading.len()
    }

    fn enforce_memory_budget(&mut self) {
        let total = self.total_memory_bytes;
        if total > self.config.texture_memory_hard_purge_threshold_in_bytes {
            log::debug!("Texture memory {total} bytes above hard threshold, purging");
            self.purge_textures(1);
        } else if total > self.config.texture_memory_soft_purge_threshold_in_bytes {
            log::debug!("Texture memory {total} bytes above soft threshold, purging");
            self.purge_textures(self.config.texture_memory_soft_purge_threshold_in_frames.max(1));
        }
    }

    #[inline]
    fn is_entry_loading(&self, key: EntryKey) -> bool {
        self.texture_entry(key).is_some_and(|e| e.is_loading())
    }

    // ───────────────────── preparation ─────────────────────

    /// Drive one entry through Loading → ReadyUnpacked → NeedsPack →
    /// ReadyPacked. Does nothing while the texture has no metrics.
    fn prepare(&mut self, key: EntryKey) {
        let max_square = self.config.texture_packer_sub_image_max_dimension_square;
        let Some(CacheEntry::Texture(entry)) = self.list.get_mut(key) else {
            return;
        };
        if entry.state.is_pack_ready() || (!entry.supports_packing && entry.prepared) {
            return;
        }
        if entry.state.packed_node().is_some() {
            // Copy issued, waiting for the renderer to commit it.
            return;
        }
        let Some(metrics) = entry.texture.resolve_texture_metrics() else {
            return;
        };

        let variant = entry.id.variant().unwrap_or(VariantTag::BASE);
        entry.unpacked = TextureReference::from_metrics(Arc::clone(&entry.texture), &metrics, variant);
        entry.prepared = true;
        if !entry.supports_packing {
            return;
        }

        let w = metrics.width as f32;
        let h = metrics.height as f32;
        let left = (metrics.atlas_offset.x + metrics.visible_offset.x * metrics.atlas_scale.x) * w;
        let top = (metrics.atlas_offset.y + metrics.visible_offset.y * metrics.atlas_scale.y) * h;
        let width = (metrics.visible_scale.x * metrics.atlas_scale.x * w).round() as i32;
        let height = (metrics.visible_scale.y * metrics.atlas_scale.y * h).round() as i32;
        let rect = RectI::from_origin_size(left.round() as i32, top.round() as i32, width, height);

        if rect.is_empty() {
            return;
        }
        if rect.area() as u64 > max_square {
            if entry.texture.has_dimensions() {
                entry.supports_packing = false;
                log::debug!(
                    "{} is {}x{}, above the packable area; drawing unpacked",
                    entry.id,
                    rect.width(),
                    rect.height()
                );
            }
            return;
        }

        let texture = Arc::clone(&entry.texture);
        let Some(region) = self.pack_with_room(&texture, rect) else {
            self.stats.pack_failures += 1;
            log::trace!("No atlas room for {:?}; drawing unpacked", self.texture_entry(key).map(|e| &e.id));
            return;
        };
        self.commit_texture_pack(key, region, rect);
    }

    fn pack_with_room(&mut self, texture: &TextureHandle, rect: RectI) -> Option<PackedRegion> {
        if let Some(region) = self.packer.pack(&mut self.renderer, texture, rect) {
            return Some(region);
        }
        if !self.make_room_in_packer() {
            return None;
        }
        log::trace!("Retrying pack of {}x{} after making room", rect.width(), rect.height());
        self.packer.pack(&mut self.renderer, texture, rect)
    }

    fn commit_texture_pack(&mut self, key: EntryKey, region: PackedRegion, rect: RectI) {
        let page_w = self.packer.width() as f32;
        let page_h = self.packer.height() as f32;
        let packed_offset = Vec2::new(region.origin.x as f32 / page_w, region.origin.y as f32 / page_h);
        let packed_scale = Vec2::new(rect.width() as f32 / page_w, rect.height() as f32 / page_h);
        let page = Arc::clone(&self.packer_texture);

        let Some(CacheEntry::Texture(entry)) = self.list.get_mut(key) else {
            return;
        };
        entry.packed = entry.unpacked.packed_into(page, packed_offset, packed_scale);
        if let Some(observer) = &self.observer {
            observer.entry_packed(&entry.id, region.node);
        }
        self.list.pack(key, region.node);
    }

    // ───────────────────── glyphs ─────────────────────

    /// Glyph table for `font`, created empty on first use.
    pub fn resolve_glyph_table(&mut self, font: &dyn Font) -> &GlyphTable {
        self.fonts.entry(Arc::from(font.unique_id())).or_default()
    }

    /// Cached glyph for `code_point`, rasterizing and packing on a miss.
    ///
    /// A glyph is rasterized at most once per cache lifetime; if its atlas
    /// node was reclaimed, the next hit re-packs the stored bitmap.
    pub fn resolve_glyph(&mut self, font: &dyn Font, code_point: char) -> Option<&TextureCacheGlyphEntry> {
        if code_point == '\0' {
            return None;
        }
        let frame = self.current_frame();

        let cached = self
            .fonts
            .get(font.unique_id())
            .and_then(|table| table.get(&code_point))
            .copied()
            .filter(|&key| self.list.contains_key(key));
        if let Some(key) = cached {
            self.stats.hits += 1;
            let needs_repack = matches!(
                self.list.get(key),
                Some(CacheEntry::Glyph(g))
                    if !g.state.is_pack_ready() && g.state.packed_node().is_none() && g.texture.is_some()
            );
            if needs_repack {
                self.repack_glyph(key);
            }
            self.list.use_entry(key, frame);
            return self.glyph_entry(key);
        }

        self.stats.misses += 1;
        let (node, metrics, texture) =
            match self.packer.pack_font_glyph(&mut self.renderer, font, code_point) {
                Some(mut glyph) => {
                    if glyph.node.is_none() {
                        if let Some(texture) = glyph.texture.clone() {
                            glyph.node = self.pack_glyph_with_room(&texture, &mut glyph.metrics);
                        }
                    }
                    (glyph.node, glyph.metrics, glyph.texture)
                }
                None => (None, GlyphMetrics::default(), None),
            };

        let key = self.list.insert(CacheEntry::Glyph(TextureCacheGlyphEntry {
            code_point,
            metrics,
            texture,
            state: ListState::default(),
        }));
        if let Some(node) = node {
            self.list.pack(key, node);
        }
        self.list.use_entry(key, frame);
        self.fonts
            .entry(Arc::from(font.unique_id()))
            .or_default()
            .insert(code_point, key);
        self.glyph_entry(key)
    }

    /// Drawable reference for a glyph: the atlas page once its copy is
    /// confirmed, otherwise the glyph's own texture.
    pub fn resolve_glyph_reference(&mut self, font: &dyn Font, code_point: char) -> Option<PreparedReference> {
        let page = Arc::clone(&self.packer_texture);
        let glyph = self.resolve_glyph(font, code_point)?;
        if glyph.is_pack_ready() {
            let m = glyph.metrics;
            let scale = Vec2::new(m.uv_max.x - m.uv_min.x, m.uv_max.y - m.uv_min.y);
            return Some(PreparedReference::Packed(TextureReference {
                texture: Some(page),
                atlas_offset: m.uv_min,
                atlas_scale: scale,
                atlas_min: m.uv_min,
                atlas_max: m.uv_max,
                ..TextureReference::default()
            }));
        }
        let texture = glyph.texture.clone()?;
        Some(PreparedReference::Unpacked(TextureReference {
            texture: Some(texture),
            ..TextureReference::default()
        }))
    }

    fn pack_glyph_with_room(&mut self, texture: &TextureHandle, metrics: &mut GlyphMetrics) -> Option<NodeId> {
        if let Some(node) = self.packer.pack_glyph(&mut self.renderer, texture, metrics) {
            return Some(node);
        }
        let node = if self.make_room_in_packer() {
            log::trace!("Retrying glyph pack after making room");
            self.packer.pack_glyph(&mut self.renderer, texture, metrics)
        } else {
            None
        };
        if node.is_none() {
            self.stats.pack_failures += 1;
        }
        node
    }

    fn repack_glyph(&mut self, key: EntryKey) {
        let Some(CacheEntry::Glyph(glyph)) = self.list.get(key) else {
            return;
        };
        let Some(texture) = glyph.texture.clone() else {
            return;
        };
        let mut metrics = glyph.metrics;

        let Some(node) = self.pack_glyph_with_room(&texture, &mut metrics) else {
            return;
        };
        if let Some(CacheEntry::Glyph(glyph)) = self.list.get_mut(key) {
            glyph.metrics = metrics;
        }
        self.list.pack(key, node);
    }

    // ───────────────────── prefetch / purge ─────────────────────

    /// Start loading the variant of `id` for `render_threshold` unless
    /// another load is in flight. Returns whether it is fully loaded.
    pub fn prefetch(&mut self, render_threshold: f32, id: &ResourceId) -> bool {
        let Some(path) = self.resolve_bitmap_file_path(render_threshold, id) else {
            return false;
        };
        if let Some(&key) = self.textures.get(&path) {
            return !self.is_entry_loading(key);
        }
        if !self.loading.is_empty() && self.process_loading() > 0 {
            return false;
        }
        match self.resolve(&path, None, true) {
            Some(key) => !self.is_entry_loading(key),
            None => false,
        }
    }

    /// Tear everything down, keeping the loading data of entries drawn in
    /// the previous or current frame (flagged for refresh).
    pub fn purge(&mut self) {
        let keep_frame = self.current_frame().saturating_sub(1);
        let mut kept: Vec<(ResourceId, TextureLoadingData)> = Vec::new();

        for key in self.list.iter_from_head(ListKind::Global) {
            let Some(CacheEntry::Texture(entry)) = self.list.get(key) else {
                continue;
            };
            if entry.last_draw_frame() < keep_frame {
                break;
            }
            let base = entry.id.base();
            if let Some(data) = self.loading_data.get(&base) {
                let mut data = data.clone();
                data.mark_needs_refresh();
                kept.push((base, data));
            }
        }

        self.destroy();
        self.loading_data.extend(kept);
        let kept = self.loading_data.len();
        log::info!("Texture cache purged, kept {kept} loading tables");
        if let Some(observer) = &self.observer {
            observer.purged(kept);
        }
    }

    /// Evict every texture entry not drawn within `frame_threshold` frames,
    /// oldest first. Returns the number evicted.
    pub fn purge_textures(&mut self, frame_threshold: u32) -> usize {
        let current = self.current_frame();
        let mut evicted = 0;
        let mut unpacked = false;

        while let Some(key) = self.list.tail(ListKind::Global) {
            let Some(CacheEntry::Texture(entry)) = self.list.get(key) else {
                break;
            };
            if entry.last_draw_frame().saturating_add(frame_threshold) > current {
                break;
            }
            if let Some(node) = entry.packed_node() {
                self.unpack_entry(key, node);
                unpacked = true;
            }
            self.remove_texture_entry(key, EvictionCause::Expired);
            evicted += 1;
        }

        if unpacked {
            self.packer.collect_garbage();
        }
        if evicted > 0 {
            self.stats.evictions += evicted as u64;
            log::debug!(
                "Evicted {evicted} textures older than {frame_threshold} frames, {} bytes resident",
                self.total_memory_bytes
            );
        }
        evicted
    }

    /// Unpack atlas entries not drawn within the packer window, oldest
    /// first. Returns whether any space was freed.
    pub fn make_room_in_packer(&mut self) -> bool {
        let current = self.current_frame();
        let window = self.config.texture_packer_purge_threshold_in_frames;
        let mut freed = 0usize;

        while let Some(key) = self.list.tail(ListKind::Packed) {
            let Some(entry) = self.list.get(key) else {
                break;
            };
            let state = entry.list_state();
            if state.last_draw_frame().saturating_add(window) >= current {
                break;
            }
            match state.packed_node() {
                Some(node) => self.unpack_entry(key, node),
                None => self.list.unpack(key),
            }
            freed += 1;
        }

        if freed > 0 {
            self.packer.collect_garbage();
            log::debug!("Made room in packer: unpacked {freed} entries");
        }
        freed > 0
    }

    fn unpack_entry(&mut self, key: EntryKey, node: NodeId) {
        self.packer.unpack(&mut self.renderer, node);
        if let (Some(observer), Some(entry)) = (&self.observer, self.texture_entry(key)) {
            observer.entry_unpacked(&entry.id, node);
        }
        self.list.unpack(key);
        self.stats.unpacks += 1;
    }

    fn remove_texture_entry(&mut self, key: EntryKey, cause: EvictionCause) {
        let Some(CacheEntry::Texture(entry)) = self.list.remove(key) else {
            return;
        };
        if self.textures.get(&entry.id) == Some(&key) {
            self.textures.remove(&entry.id);
        }
        self.total_memory_bytes = self.total_memory_bytes.saturating_sub(entry.memory_usage);
        if let Some(pos) = self.loading.iter().position(|&k| k == key) {
            self.loading.swap_remove(pos);
        }
        if let Some(observer) = &self.observer {
            observer.entry_evicted(&entry.id, cause);
        }
    }

    /// Drop every entry, glyph table and loading table and clear the atlas.
    pub fn destroy(&mut self) {
        if let Some(observer) = &self.observer {
            for (_, entry) in self.list.iter() {
                if let CacheEntry::Texture(entry) = entry {
                    observer.entry_evicted(&entry.id, EvictionCause::Destroyed);
                }
            }
        }
        self.list.remove_all();
        self.textures.clear();
        self.fonts.clear();
        self.total_memory_bytes = 0;
        self.loading.clear();
        self.loading_data.clear();
        self.packer.clear(&mut self.renderer);
    }

    // ───────────────────── indirect names ─────────────────────

    /// Map `name` to a direct identifier, or erase it with `None`.
    pub fn update_indirect_texture(&self, name: &str, target: Option<ResourceId>) -> bool {
        self.indirect.update(name, target)
    }

    /// Shared handle for writers on other threads.
    pub fn indirect_table(&self) -> Arc<IndirectTextureTable> {
        Arc::clone(&self.indirect)
    }

    // ───────────────────── pack confirmation ─────────────────────

    /// Flag packed entries whose atlas copy the renderer has committed.
    /// Returns how many became ready.
    pub fn mark_packs_ready(&mut self, mut is_resident: impl FnMut(&R, NodeId) -> bool) -> usize {
        let keys: Vec<EntryKey> = self.list.iter_from_head(ListKind::Packed).collect();
        let mut ready = 0;
        for key in keys {
            let Some(state) = self.list.get(key).map(ListEntry::list_state) else {
                continue;
            };
            if state.is_pack_ready() {
                continue;
            }
            if let Some(node) = state.packed_node() {
                if is_resident(&self.renderer, node) {
                    self.list.set_pack_ready(key, true);
                    ready += 1;
                }
            }
        }
        ready
    }

    /// Forget every confirmation, e.g. after the atlas target was lost.
    pub fn reset_pack_ready(&mut self) {
        let keys: Vec<EntryKey> = self.list.iter_from_head(ListKind::Packed).collect();
        for key in keys {
            self.list.set_pack_ready(key, false);
        }
    }

    // ───────────────────── introspection ─────────────────────

    /// Texture entry behind `key`; `None` for glyphs and stale keys.
    pub fn texture_entry(&self, key: EntryKey) -> Option<&TextureCacheTextureEntry> {
        match self.list.get(key)? {
            CacheEntry::Texture(entry) => Some(entry),
            CacheEntry::Glyph(_) => None,
        }
    }

    /// Glyph entry behind `key`; `None` for textures and stale keys.
    pub fn glyph_entry(&self, key: EntryKey) -> Option<&TextureCacheGlyphEntry> {
        match self.list.get(key)? {
            CacheEntry::Glyph(entry) => Some(entry),
            CacheEntry::Texture(_) => None,
        }
    }

    /// Key of the entry for exactly `id`, without touching it.
    pub fn texture_key(&self, id: &ResourceId) -> Option<EntryKey> {
        self.textures.get(id).copied()
    }

    /// Texture entries, most recently drawn first.
    pub fn texture_entries(&self) -> impl Iterator<Item = (EntryKey, &TextureCacheTextureEntry)> + '_ {
        self.list
            .iter_from_head(ListKind::Global)
            .filter_map(move |key| self.texture_entry(key).map(|e| (key, e)))
    }

    /// Number of texture entries.
    #[inline]
    pub fn entry_count(&self) -> usize {
        self.textures.len()
    }

    /// Glyph entries across every font.
    pub fn glyph_count(&self) -> usize {
        self.fonts.values().map(|t| t.len()).sum()
    }

    /// Entries (textures and glyphs) holding an atlas node.
    pub fn packed_entry_count(&self) -> usize {
        self.list.list_len(ListKind::Packed)
    }

    /// Entries whose load has not been accounted yet.
    #[inline]
    pub fn loading_count(&self) -> usize {
        self.loading.len()
    }

    #[inline]
    pub fn total_memory_usage_in_bytes(&self) -> u64 {
        self.total_memory_bytes
    }

    /// Loading data stored for the base identifier `base`.
    pub fn loading_data(&self, base: &ResourceId) -> Option<&TextureLoadingData> {
        self.loading_data.get(base)
    }

    #[inline]
    pub fn config(&self) -> &TextureCacheConfig {
        &self.config
    }

    #[inline]
    pub fn packer(&self) -> &TexturePacker {
        &self.packer
    }

    #[inline]
    pub fn packer_texture(&self) -> &TextureHandle {
        &self.packer_texture
    }

    #[inline]
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    #[inline]
    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    #[inline]
    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Reset every counter to zero.
    pub fn clear_stats(&mut self) {
        self.stats = CacheStats::default();
    }
}

impl<R: RendererInterface> Drop for TextureCache<R> {
    fn drop(&mut self) {
        self.destroy();
    }
}

// ===================================================================
// Tests
// ===================================================================
