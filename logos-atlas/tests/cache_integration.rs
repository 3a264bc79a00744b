//! Integration tests for the texture cache.
//!
//! Every test drives the public API against the headless renderer, one
//! frame at a time, the way the scene renderer does.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use logos_atlas::{
    BitmapDefinition, CacheObserver, EvictionCause, HeadlessFont, HeadlessRenderer, LoadingThreshold,
    NodeId, PointI, RectI, RendererInterface, ResourceId, TextureCache, TextureCacheConfig,
    TextureHandle, TextureLoadingData, TextureMetrics, TexturePacker, TextureResource, VariantTag,
};

const IMAGE_BYTES_32: u64 = 32 * 32 * 4;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Cache over `count` single-variant 32x32 images named `img/{i}.png`.
fn cache_with_images(config: TextureCacheConfig, count: usize) -> (TextureCache<HeadlessRenderer>, Vec<ResourceId>) {
    init_logging();
    let mut renderer = HeadlessRenderer::new();
    let ids = (0..count)
        .map(|i| {
            let path = format!("img/{i}.png");
            renderer.register_image_with_loading_data(&path, 32, 32, None);
            ResourceId::direct(path)
        })
        .collect();
    (TextureCache::new(renderer, config).unwrap(), ids)
}

fn abc_table() -> TextureLoadingData {
    TextureLoadingData::new(vec![
        LoadingThreshold::new(0.25, VariantTag::level(0)),
        LoadingThreshold::new(0.5, VariantTag::level(1)),
        LoadingThreshold::new(1.0, VariantTag::level(2)),
    ])
    .unwrap()
}

fn confirm_packs(cache: &mut TextureCache<HeadlessRenderer>) -> usize {
    cache.renderer_mut().advance_frame();
    cache.mark_packs_ready(|r, node| r.is_resident(node))
}

// ─── Identity ───────────────────────────────────────────────────────

#[test]
fn test_same_identifier_resolves_to_same_entry() {
    let (mut cache, ids) = cache_with_images(TextureCacheConfig::default(), 1);
    let first = cache.resolve(&ids[0], None, true).unwrap();
    cache.resolve_texture_reference(32.0, &ids[0], true).unwrap();
    let second = cache.resolve(&ids[0], None, true).unwrap();

    assert_eq!(first, second);
    assert_eq!(cache.entry_count(), 1);
    assert_eq!(cache.renderer().resolve_count(&ids[0]), 1);
}

// ─── Variant selection ──────────────────────────────────────────────

#[test]
fn test_mip_fallback_scenario() {
    init_logging();
    let mut renderer = HeadlessRenderer::new();
    renderer.register_image_with_loading_data("mip.png", 256, 256, Some(abc_table()));
    let mut cache = TextureCache::new(renderer, TextureCacheConfig::default()).unwrap();
    let id = ResourceId::direct("mip.png");

    // No table until the base variant has loaded.
    assert_eq!(cache.resolve_bitmap_file_path(0.6, &id), Some(id.clone()));
    cache.resolve_texture_reference(0.6, &id, true).unwrap();

    let pick = |cache: &mut TextureCache<HeadlessRenderer>, t: f32| {
        cache.resolve_bitmap_file_path(t, &id).and_then(|p| p.variant())
    };
    assert_eq!(pick(&mut cache, 0.6), Some(VariantTag::level(2)));
    assert_eq!(pick(&mut cache, 0.4), Some(VariantTag::level(1)));
    assert_eq!(pick(&mut cache, 0.1), Some(VariantTag::level(0)));
    // Nothing qualifies: highest resolution.
    assert_eq!(pick(&mut cache, 2.0), Some(VariantTag::BASE));
}

#[test]
fn test_selection_is_monotonic_in_threshold() {
    init_logging();
    let mut renderer = HeadlessRenderer::new();
    renderer.register_image("photo.png", 1024, 768);
    let mut cache = TextureCache::new(renderer, TextureCacheConfig::default()).unwrap();
    let id = ResourceId::direct("photo.png");
    cache.resolve_texture_reference(1.0e6, &id, false).unwrap();
    cache.resolve_bitmap_file_path(1.0e6, &id).unwrap();
    let table = cache.loading_data(&id).unwrap().clone();

    let mut rng = fastrand::Rng::with_seed(7);
    let mut thresholds: Vec<f32> = (0..200).map(|_| rng.f32() * 2048.0).collect();
    thresholds.sort_by(f32::total_cmp);

    let mut previous = VariantTag::level(0);
    for t in thresholds {
        let variant = cache.resolve_bitmap_file_path(t, &id).unwrap().variant().unwrap();
        assert!(variant >= previous, "threshold {t} selected {variant:?} after {previous:?}");
        previous = variant;

        // Smallest qualifying row.
        let rows = table.entries();
        let chosen = rows.iter().position(|r| r.variant == variant).unwrap();
        assert!(rows[chosen].threshold >= t);
        if chosen > 0 {
            assert!(rows[chosen - 1].threshold < t);
        }
    }
}

#[test]
fn test_loading_variant_substituted_by_ready_one() {
    init_logging();
    let mut renderer = HeadlessRenderer::with_load_latency(2);
    renderer.register_image("hero.png", 256, 256);
    let mut cache = TextureCache::new(renderer, TextureCacheConfig::default()).unwrap();
    let id = ResourceId::direct("hero.png");

    let r = cache.resolve_texture_reference(1000.0, &id, true).unwrap();
    assert!(cache.texture_entry(cache.texture_key(&id).unwrap()).unwrap().is_loading());
    assert_eq!(r.reference().variant, VariantTag::BASE);

    cache.renderer_mut().advance_frame();
    cache.renderer_mut().advance_frame();
    cache.resolve_texture_reference(1000.0, &id, true).unwrap();

    // Level 1 starts loading; the loaded base is drawn meanwhile.
    let r = cache.resolve_texture_reference(20.0, &id, true).unwrap();
    assert_eq!(r.reference().variant, VariantTag::BASE);
    assert_eq!(cache.stats().substitutions, 1);
    let small = id.with_variant(VariantTag::level(1));
    assert!(cache.texture_key(&small).is_some());

    cache.renderer_mut().advance_frame();
    cache.renderer_mut().advance_frame();
    let r = cache.resolve_texture_reference(20.0, &id, true).unwrap();
    assert_eq!(r.reference().variant, VariantTag::level(1));
    assert_eq!(cache.stats().substitutions, 1);
}

#[test]
fn test_loading_without_alternative_draws_loading_texture() {
    init_logging();
    let mut renderer = HeadlessRenderer::with_load_latency(3);
    renderer.register_image("slow.png", 64, 64);
    let mut cache = TextureCache::new(renderer, TextureCacheConfig::default()).unwrap();

    let r = cache
        .resolve_texture_reference(64.0, &ResourceId::direct("slow.png"), true)
        .unwrap();
    assert!(!r.is_packed());
    assert!(r.reference().texture.as_ref().unwrap().is_loading());
    assert_eq!(cache.total_memory_usage_in_bytes(), 0);
    assert_eq!(cache.loading_count(), 1);
}

// ─── Eviction ───────────────────────────────────────────────────────

#[test]
fn test_hard_purge_scenario() {
    let config = TextureCacheConfig {
        texture_memory_soft_purge_threshold_in_bytes: 4 * IMAGE_BYTES_32,
        texture_memory_hard_purge_threshold_in_bytes: 4 * IMAGE_BYTES_32,
        ..Default::default()
    };
    let (mut cache, ids) = cache_with_images(config, 5);

    for id in &ids[..4] {
        cache.resolve_texture_reference(32.0, id, true).unwrap();
    }
    assert_eq!(cache.entry_count(), 4);
    assert_eq!(cache.total_memory_usage_in_bytes(), 4 * IMAGE_BYTES_32);

    cache.renderer_mut().advance_frame();
    cache.resolve_texture_reference(32.0, &ids[1], true).unwrap();
    cache.resolve_texture_reference(32.0, &ids[4], true).unwrap();

    let live: Vec<&str> = cache.texture_entries().map(|(_, e)| e.id().name()).collect();
    assert_eq!(live, vec!["img/4.png", "img/1.png"]);
    assert_eq!(cache.total_memory_usage_in_bytes(), 2 * IMAGE_BYTES_32);
    assert_eq!(cache.stats().evictions, 3);
}

#[test]
fn test_soft_purge_uses_soft_window() {
    let config = TextureCacheConfig {
        texture_memory_soft_purge_threshold_in_bytes: 2 * IMAGE_BYTES_32,
        texture_memory_hard_purge_threshold_in_bytes: 100 * IMAGE_BYTES_32,
        texture_memory_soft_purge_threshold_in_frames: 5,
        ..Default::default()
    };
    let (mut cache, ids) = cache_with_images(config, 4);

    cache.resolve_texture_reference(32.0, &ids[0], true);
    cache.renderer_mut().set_frame(3);
    cache.resolve_texture_reference(32.0, &ids[1], true);
    cache.renderer_mut().set_frame(6);
    // Above soft: only entries last drawn at frame <= 1 go.
    cache.resolve_texture_reference(32.0, &ids[2], true);

    assert!(cache.texture_key(&ids[0]).is_none());
    assert!(cache.texture_key(&ids[1]).is_some());
    assert!(cache.texture_key(&ids[2]).is_some());
}

#[test]
fn test_purge_textures_unpacks_evicted_entries() {
    let (mut cache, ids) = cache_with_images(TextureCacheConfig::default(), 3);
    for id in &ids {
        cache.resolve_texture_reference(32.0, id, true);
    }
    assert_eq!(cache.packed_entry_count(), 3);

    cache.renderer_mut().set_frame(2);
    cache.resolve_texture_reference(32.0, &ids[2], true);
    assert_eq!(cache.purge_textures(2), 2);
    assert_eq!(cache.packed_entry_count(), 1);
    assert_eq!(cache.packer().node_count(), 1);
    assert_eq!(cache.renderer().unpack_ops().len(), 2);
}

// ─── Packing ────────────────────────────────────────────────────────

#[test]
fn test_pack_never_fails_draw() {
    let config = TextureCacheConfig {
        texture_packer_width: 64,
        texture_packer_height: 64,
        ..Default::default()
    };
    let (mut cache, ids) = cache_with_images(config, 12);

    for _ in 0..3 {
        let mut packed = 0;
        for id in &ids {
            let r = cache.resolve_texture_reference(32.0, id, true).unwrap();
            assert!(r.reference().is_ready());
            if r.is_packed() {
                packed += 1;
            }
        }
        // A 64x64 page holds at most one padded 32x32 image per quadrant.
        assert!(packed <= 4);
        confirm_packs(&mut cache);
    }
    assert!(cache.packed_entry_count() >= 1);
    assert!(cache.stats().pack_failures > 0);
}

#[test]
fn test_make_room_then_retry_pack() {
    init_logging();
    let mut renderer = HeadlessRenderer::new();
    renderer.register_image_with_loading_data("a.png", 62, 62, None);
    renderer.register_image_with_loading_data("b.png", 62, 62, None);
    let config = TextureCacheConfig {
        texture_packer_width: 64,
        texture_packer_height: 64,
        ..Default::default()
    };
    let mut cache = TextureCache::new(renderer, config).unwrap();
    let a = ResourceId::direct("a.png");
    let b = ResourceId::direct("b.png");

    cache.resolve_texture_reference(62.0, &a, true);
    cache.resolve_texture_reference(62.0, &b, true);
    let key_a = cache.texture_key(&a).unwrap();
    let key_b = cache.texture_key(&b).unwrap();
    assert!(cache.texture_entry(key_a).unwrap().packed_node().is_some());
    assert!(cache.texture_entry(key_b).unwrap().packed_node().is_none());

    cache.renderer_mut().set_frame(31);
    cache.resolve_texture_reference(62.0, &b, true);
    assert!(cache.texture_entry(key_a).unwrap().packed_node().is_none());
    assert!(cache.texture_entry(key_b).unwrap().packed_node().is_some());
    assert_eq!(cache.entry_count(), 2);
}

#[test]
fn test_unpacked_draws_never_touch_atlas() {
    let (mut cache, ids) = cache_with_images(TextureCacheConfig::default(), 2);
    let pixels = vec![0xffu8; 4 * 4 * 4];
    let raw = BitmapDefinition::from_rgba("generated/swatch", pixels, 4, 4);

    for _ in 0..3 {
        assert!(!cache.resolve_texture_reference(32.0, &ids[0], false).unwrap().is_packed());
        let bitmap = BitmapDefinition::from_id(ids[1].clone());
        assert!(!cache.resolve_bitmap_reference(32.0, Some(&bitmap), false).unwrap().is_packed());
        assert!(!cache.resolve_bitmap_reference(4.0, Some(&raw), false).unwrap().is_packed());
        confirm_packs(&mut cache);
    }

    assert_eq!(cache.packed_entry_count(), 0);
    assert!(cache.renderer().pack_ops().is_empty());
    assert_eq!(cache.packer().node_count(), 0);
}

#[test]
fn test_oversized_entry_never_retried() {
    init_logging();
    let mut renderer = HeadlessRenderer::new();
    renderer.register_image_with_loading_data("poster.png", 200, 200, None);
    let mut cache = TextureCache::new(renderer, TextureCacheConfig::default()).unwrap();
    let id = ResourceId::direct("poster.png");

    for _ in 0..5 {
        let r = cache.resolve_texture_reference(200.0, &id, true).unwrap();
        assert!(!r.is_packed());
        cache.renderer_mut().advance_frame();
    }
    let entry = cache.texture_entry(cache.texture_key(&id).unwrap()).unwrap();
    assert!(!entry.supports_packing());
    assert!(cache.renderer().pack_ops().is_empty());
}

#[test]
fn test_can_pack_false_stays_unpacked() {
    let (mut cache, ids) = cache_with_images(TextureCacheConfig::default(), 1);
    let bitmap = BitmapDefinition::from_id(ids[0].clone()).with_can_pack(false);
    cache.resolve_bitmap_reference(32.0, Some(&bitmap), true).unwrap();
    confirm_packs(&mut cache);
    let r = cache.resolve_bitmap_reference(32.0, Some(&bitmap), true).unwrap();
    assert!(!r.is_packed());
    assert_eq!(cache.packed_entry_count(), 0);
}

#[test]
fn test_packed_reference_requires_confirmation() {
    let (mut cache, ids) = cache_with_images(TextureCacheConfig::default(), 1);
    assert!(!cache.resolve_texture_reference(32.0, &ids[0], true).unwrap().is_packed());
    // Not yet resident: nothing to confirm.
    assert_eq!(cache.mark_packs_ready(|r, node| r.is_resident(node)), 0);
    assert_eq!(confirm_packs(&mut cache), 1);

    let r = cache.resolve_texture_reference(32.0, &ids[0], true).unwrap();
    assert!(r.is_packed());
    let r = r.into_reference();
    assert!(Arc::ptr_eq(r.texture.as_ref().unwrap(), cache.packer_texture()));
    assert!(r.atlas_min.x >= 0.0 && r.atlas_max.x <= 1.0);
    assert!((r.atlas_max.x - r.atlas_min.x - 32.0 / 1024.0).abs() < 1e-6);
}

#[test]
fn test_raw_bitmap_uploaded_once() {
    let (mut cache, _) = cache_with_images(TextureCacheConfig::default(), 0);
    let pixels = vec![0x80u8; 8 * 8 * 4];
    let bitmap = BitmapDefinition::from_rgba("generated/gradient", pixels, 8, 8);
    for _ in 0..3 {
        cache.resolve_bitmap_reference(8.0, Some(&bitmap), true).unwrap();
    }
    assert_eq!(cache.renderer().data_upload_count(), 1);
    assert!(cache.renderer().resolve_requests().is_empty());
    assert_eq!(cache.total_memory_usage_in_bytes(), 8 * 8 * 4);
}

// ─── Memory accounting ──────────────────────────────────────────────

/// Loaded texture whose size query only answers from the second poll on.
struct LateSizeTexture {
    edge: u32,
    size_polls: AtomicUsize,
}

impl TextureResource for LateSizeTexture {
    fn is_loading(&self) -> bool {
        false
    }

    fn resolve_texture_metrics(&self) -> Option<TextureMetrics> {
        Some(TextureMetrics::full(self.edge, self.edge))
    }

    fn resolve_memory_usage_in_bytes(&self) -> Option<u64> {
        let polls = self.size_polls.fetch_add(1, Ordering::Relaxed);
        (polls > 0).then(|| u64::from(self.edge) * u64::from(self.edge) * 4)
    }

    fn has_dimensions(&self) -> bool {
        true
    }
}

/// Headless renderer handing out [`LateSizeTexture`]s for file loads.
struct LateSizeRenderer {
    inner: HeadlessRenderer,
}

impl RendererInterface for LateSizeRenderer {
    fn clear_pack(&mut self) {
        self.inner.clear_pack();
    }

    fn pack(&mut self, node: NodeId, source: &TextureHandle, source_rect: RectI, destination: PointI) {
        self.inner.pack(node, source, source_rect, destination);
    }

    fn unpack(&mut self, node: NodeId) {
        self.inner.unpack(node);
    }

    fn resolve_texture(&mut self, _id: &ResourceId) -> TextureHandle {
        Arc::new(LateSizeTexture {
            edge: 64,
            size_polls: AtomicUsize::new(0),
        })
    }

    fn resolve_texture_from_data(
        &mut self,
        data: &[u8],
        width: u32,
        height: u32,
        stride: u32,
        is_full_occluder: bool,
    ) -> TextureHandle {
        self.inner.resolve_texture_from_data(data, width, height, stride, is_full_occluder)
    }

    fn resolve_packer_texture(&mut self, packer: &TexturePacker) -> TextureHandle {
        self.inner.resolve_packer_texture(packer)
    }

    fn render_frame_count(&self) -> u32 {
        self.inner.render_frame_count()
    }
}

#[test]
fn test_late_size_report_is_still_accounted() {
    init_logging();
    let renderer = LateSizeRenderer {
        inner: HeadlessRenderer::new(),
    };
    let mut cache = TextureCache::new(renderer, TextureCacheConfig::default()).unwrap();
    let a = ResourceId::direct("late/a.png");
    let b = ResourceId::direct("late/b.png");

    cache.resolve(&a, None, false).unwrap();
    // Loaded but size unknown: still polled, nothing accounted.
    assert_eq!(cache.loading_count(), 1);
    assert_eq!(cache.total_memory_usage_in_bytes(), 0);

    cache.resolve(&b, None, false).unwrap();
    assert_eq!(cache.total_memory_usage_in_bytes(), 64 * 64 * 4);
    assert_eq!(cache.process_loading(), 0);

    let summed: u64 = cache.texture_entries().map(|(_, e)| e.memory_usage_in_bytes()).sum();
    let reported: u64 = cache.texture_entries().map(|(_, e)| e.texture().memory_usage_in_bytes()).sum();
    assert_eq!(cache.total_memory_usage_in_bytes(), 2 * 64 * 64 * 4);
    assert_eq!(summed, reported);
    assert_eq!(summed, cache.total_memory_usage_in_bytes());
}

// ─── Glyphs ─────────────────────────────────────────────────────────

#[test]
fn test_glyph_cache_hit_scenario() {
    let (mut cache, _) = cache_with_images(TextureCacheConfig::default(), 0);
    let font = HeadlessFont::new("F", 10, 14);

    let first_frame = cache.resolve_glyph(&font, 'A').unwrap().last_draw_frame();
    cache.renderer_mut().advance_frame();
    let second_frame = cache.resolve_glyph(&font, 'A').unwrap().last_draw_frame();

    assert_eq!((first_frame, second_frame), (0, 1));
    assert_eq!(font.rasterize_count(), 1);
    assert_eq!(cache.renderer().pack_ops().len(), 1);
    assert_eq!(cache.stats().hits, 1);
    assert_eq!(cache.stats().misses, 1);
    assert_eq!(cache.resolve_glyph_table(&font).len(), 1);
}

#[test]
fn test_glyph_repacked_after_reclaim_without_rasterizing() {
    let config = TextureCacheConfig {
        texture_packer_width: 16,
        texture_packer_height: 16,
        ..Default::default()
    };
    let (mut cache, _) = cache_with_images(config, 0);
    let font = HeadlessFont::new("F", 12, 12);

    assert!(cache.resolve_glyph(&font, 'A').unwrap().packed_node().is_some());
    // Atlas full and 'A' is recent: 'B' stays unpacked.
    assert!(cache.resolve_glyph(&font, 'B').unwrap().packed_node().is_none());

    cache.renderer_mut().set_frame(31);
    assert!(cache.resolve_glyph(&font, 'B').unwrap().packed_node().is_some());
    cache.renderer_mut().set_frame(62);
    assert!(cache.resolve_glyph(&font, 'A').unwrap().packed_node().is_some());
    assert_eq!(font.rasterize_count(), 2);
}

#[test]
fn test_whitespace_glyph_cached_without_texture() {
    let (mut cache, _) = cache_with_images(TextureCacheConfig::default(), 0);
    let font = HeadlessFont::new("F", 8, 8);
    let space = cache.resolve_glyph(&font, ' ').unwrap();
    assert!(space.texture().is_none());
    assert!(space.metrics().x_advance > 0.0);
    cache.resolve_glyph(&font, ' ').unwrap();
    assert_eq!(font.rasterize_count(), 1);
    assert!(cache.resolve_glyph_reference(&font, ' ').is_none());
}

#[test]
fn test_glyph_tables_are_per_font() {
    let (mut cache, _) = cache_with_images(TextureCacheConfig::default(), 0);
    let regular = HeadlessFont::new("regular", 8, 8);
    let bold = HeadlessFont::new("bold", 9, 9);
    cache.resolve_glyph(&regular, 'x');
    cache.resolve_glyph(&bold, 'x');
    assert_eq!(regular.rasterize_count(), 1);
    assert_eq!(bold.rasterize_count(), 1);
    assert_eq!(cache.glyph_count(), 2);
    assert_eq!(cache.packed_entry_count(), 2);
}

// ─── Purge ──────────────────────────────────────────────────────────

#[test]
fn test_quality_persists_across_purge() {
    init_logging();
    let mut renderer = HeadlessRenderer::new();
    renderer.register_image("hero.png", 256, 256);
    let mut cache = TextureCache::new(renderer, TextureCacheConfig::default()).unwrap();
    let id = ResourceId::direct("hero.png");
    let small = id.with_variant(VariantTag::level(1));

    cache.resolve_texture_reference(20.0, &id, true);
    let r = cache.resolve_texture_reference(20.0, &id, true).unwrap();
    assert_eq!(r.reference().variant, VariantTag::level(1));

    cache.purge();
    assert_eq!(cache.entry_count(), 0);
    assert!(cache.loading_data(&id).unwrap().needs_refresh());

    let r = cache.resolve_texture_reference(20.0, &id, true).unwrap();
    assert_eq!(r.reference().variant, VariantTag::level(1));
    assert_eq!(cache.renderer().resolve_requests().last(), Some(&small));
}

#[test]
fn test_purge_drops_stale_loading_data() {
    init_logging();
    let mut renderer = HeadlessRenderer::new();
    renderer.register_image("hero.png", 256, 256);
    let mut cache = TextureCache::new(renderer, TextureCacheConfig::default()).unwrap();
    let id = ResourceId::direct("hero.png");

    cache.resolve_texture_reference(20.0, &id, true);
    cache.resolve_texture_reference(20.0, &id, true);
    cache.renderer_mut().set_frame(5);
    cache.purge();

    assert!(cache.loading_data(&id).is_none());
    let path = cache.resolve_bitmap_file_path(20.0, &id).unwrap();
    assert_eq!(path.variant(), Some(VariantTag::BASE));
}

#[test]
fn test_prefetch_serializes_loads() {
    init_logging();
    let mut renderer = HeadlessRenderer::with_load_latency(1);
    renderer.register_image_with_loading_data("a.png", 16, 16, None);
    renderer.register_image_with_loading_data("b.png", 16, 16, None);
    let mut cache = TextureCache::new(renderer, TextureCacheConfig::default()).unwrap();
    let a = ResourceId::direct("a.png");
    let b = ResourceId::direct("b.png");

    assert!(!cache.prefetch(16.0, &a));
    // `a` still in flight: `b` is not started.
    assert!(!cache.prefetch(16.0, &b));
    assert!(cache.texture_key(&b).is_none());

    cache.renderer_mut().advance_frame();
    assert!(cache.prefetch(16.0, &a));
    assert!(!cache.prefetch(16.0, &b));
    assert!(cache.texture_key(&b).is_some());
    assert!(!cache.prefetch(16.0, &ResourceId::indirect("unmapped")));
}

// ─── Indirect names ─────────────────────────────────────────────────

#[test]
fn test_indirect_updates_from_another_thread() {
    init_logging();
    let mut renderer = HeadlessRenderer::new();
    let targets: Vec<ResourceId> = (0..8)
        .map(|i| {
            let path = format!("avatars/{i}.png");
            renderer.register_image_with_loading_data(&path, 24, 24, None);
            ResourceId::direct(path)
        })
        .collect();
    let mut cache = TextureCache::new(renderer, TextureCacheConfig::default()).unwrap();
    cache.update_indirect_texture("player", Some(targets[0].clone()));

    let table = cache.indirect_table();
    let writer_targets = targets.clone();
    let writer = std::thread::spawn(move || {
        for i in 0..500 {
            table.update("player", Some(writer_targets[i % writer_targets.len()].clone()));
        }
    });

    let player = ResourceId::indirect("player");
    for _ in 0..500 {
        let path = cache.resolve_bitmap_file_path(24.0, &player).unwrap();
        assert!(targets.contains(&path));
        assert!(cache.resolve_texture_reference(24.0, &player, true).is_some());
    }
    writer.join().unwrap();

    cache.update_indirect_texture("player", None);
    assert!(cache.resolve_texture_reference(24.0, &player, true).is_none());
}

// ─── Observer ───────────────────────────────────────────────────────

#[derive(Default)]
struct CountingObserver {
    created: AtomicUsize,
    expired: AtomicUsize,
    destroyed: AtomicUsize,
    packed: AtomicUsize,
    unpacked: AtomicUsize,
    purges: AtomicUsize,
}

impl CacheObserver for CountingObserver {
    fn entry_created(&self, _id: &ResourceId) {
        self.created.fetch_add(1, Ordering::Relaxed);
    }

    fn entry_evicted(&self, _id: &ResourceId, cause: EvictionCause) {
        match cause {
            EvictionCause::Expired => self.expired.fetch_add(1, Ordering::Relaxed),
            EvictionCause::Destroyed => self.destroyed.fetch_add(1, Ordering::Relaxed),
        };
    }

    fn entry_packed(&self, _id: &ResourceId, _node: NodeId) {
        self.packed.fetch_add(1, Ordering::Relaxed);
    }

    fn entry_unpacked(&self, _id: &ResourceId, _node: NodeId) {
        self.unpacked.fetch_add(1, Ordering::Relaxed);
    }

    fn purged(&self, _kept: usize) {
        self.purges.fetch_add(1, Ordering::Relaxed);
    }
}

#[test]
fn test_observer_sees_lifecycle() {
    let (mut cache, ids) = cache_with_images(TextureCacheConfig::default(), 3);
    let observer = Arc::new(CountingObserver::default());
    cache.set_observer(Some(observer.clone()));

    for id in &ids {
        cache.resolve_texture_reference(32.0, id, true);
    }
    cache.renderer_mut().set_frame(10);
    cache.resolve_texture_reference(32.0, &ids[0], true);
    cache.purge_textures(5);
    cache.purge();

    assert_eq!(observer.created.load(Ordering::Relaxed), 3);
    assert_eq!(observer.packed.load(Ordering::Relaxed), 3);
    assert_eq!(observer.expired.load(Ordering::Relaxed), 2);
    assert_eq!(observer.unpacked.load(Ordering::Relaxed), 2);
    assert_eq!(observer.destroyed.load(Ordering::Relaxed), 1);
    assert_eq!(observer.purges.load(Ordering::Relaxed), 1);
}

// ─── Config ─────────────────────────────────────────────────────────

#[test]
fn test_config_file_drives_atlas_size() {
    init_logging();
    let path = std::env::temp_dir().join(format!("logos-atlas-config-{}.json", std::process::id()));
    std::fs::write(&path, r#"{ "texture_packer_width": 512, "texture_packer_height": 256 }"#).unwrap();
    let config = TextureCacheConfig::from_json_file(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    let cache = TextureCache::new(HeadlessRenderer::new(), config).unwrap();
    assert_eq!(cache.packer().width(), 512);
    assert_eq!(cache.packer().height(), 256);
    assert_eq!(cache.config().texture_packer_purge_threshold_in_frames, 30);
}
