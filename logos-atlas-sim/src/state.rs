//! Simulation state — owns the cache and a synthetic scene.
//!
//! `SimState` stands in for the scene renderer: every frame it draws a
//! sliding window over a fixed set of images at a zoom-dependent render
//! size, draws a line of text, remaps an indirect avatar name now and
//! then, and confirms the previous frame's atlas copies.

use logos_atlas::{
    BitmapDefinition, ConfigError, HeadlessFont, HeadlessRenderer, ResourceId, TextureCache,
    TextureCacheConfig,
};

/// Images drawn per frame.
const VISIBLE_IMAGES: usize = 48;
/// Image sizes cycled through by the demo scene.
const IMAGE_SIZES: [u32; 6] = [16, 24, 48, 64, 128, 512];
const AVATAR_SLOT: &str = "hud/avatar";
const BANNER: &str = "scene/banner.png";
const LABEL: &str = "Logos atlas simulator - frame";

/// Per-frame counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameStats {
    pub draws: usize,
    pub packed_draws: usize,
    pub skipped_draws: usize,
    pub glyphs: usize,
}

/// Camera zoom, oscillating so render sizes sweep across variants.
#[derive(Debug, Clone)]
pub struct Camera {
    pub zoom: f32,
}

impl Camera {
    fn zoom_for_frame(frame: u32) -> f32 {
        let phase = (frame % 240) as f32 / 240.0;
        0.25 + 1.75 * (phase * std::f32::consts::TAU).sin().abs()
    }
}

pub struct SimState {
    pub cache: TextureCache<HeadlessRenderer>,
    pub camera: Camera,
    font: HeadlessFont,
    images: Vec<(ResourceId, u32)>,
    avatars: Vec<ResourceId>,
    window_start: usize,
}

impl SimState {
    pub fn new(config: TextureCacheConfig, load_latency_frames: u32) -> Result<Self, ConfigError> {
        let renderer = HeadlessRenderer::with_load_latency(load_latency_frames);
        Ok(Self {
            cache: TextureCache::new(renderer, config)?,
            camera: Camera { zoom: 1.0 },
            font: HeadlessFont::new("sim-sans", 12, 16),
            images: Vec::new(),
            avatars: Vec::new(),
            window_start: 0,
        })
    }

    /// Register the demo images with the renderer.
    pub fn load_demo_scene(&mut self, image_count: usize) {
        let renderer = self.cache.renderer_mut();
        for i in 0..image_count {
            let size = IMAGE_SIZES[i % IMAGE_SIZES.len()];
            let path = format!("scene/image_{i:04}.png");
            renderer.register_image(&path, size, size);
            self.images.push((ResourceId::direct(path), size));
        }
        renderer.register_image(BANNER, 96, 32);
        for i in 0..4 {
            let path = format!("avatars/{i}.png");
            renderer.register_image(&path, 96, 96);
            self.avatars.push(ResourceId::direct(path));
        }
        if let Some(first) = self.avatars.first() {
            self.cache.update_indirect_texture(AVATAR_SLOT, Some(first.clone()));
        }
        log::info!(
            "Demo scene loaded: {} images, {} avatars",
            self.images.len(),
            self.avatars.len()
        );
    }

    /// Draw one frame, then advance the renderer clock.
    pub fn render_frame(&mut self) -> FrameStats {
        let frame = self.cache.renderer().frame();
        self.camera.zoom = Camera::zoom_for_frame(frame);
        let mut stats = FrameStats::default();

        if frame % 100 == 50 && !self.avatars.is_empty() {
            let next = &self.avatars[(frame as usize / 100) % self.avatars.len()];
            self.cache.update_indirect_texture(AVATAR_SLOT, Some(next.clone()));
        }

        let count = self.images.len();
        for i in 0..VISIBLE_IMAGES.min(count) {
            let (id, size) = &self.images[(self.window_start + i) % count];
            let render_size = *size as f32 * self.camera.zoom;
            record(
                &mut stats,
                self.cache.resolve_texture_reference(render_size, id, true).map(|r| r.is_packed()),
            );
        }
        self.window_start = (self.window_start + 3) % count.max(1);

        let avatar = ResourceId::indirect(AVATAR_SLOT);
        record(
            &mut stats,
            self.cache
                .resolve_texture_reference(96.0 * self.camera.zoom, &avatar, true)
                .map(|r| r.is_packed()),
        );
        record(
            &mut stats,
            self.cache.resolve_bitmap_reference(1.0, None, true).map(|r| r.is_packed()),
        );
        // Tiled banner: sampled with wrapping, so it must stay out of the atlas.
        let banner = BitmapDefinition::from_id(ResourceId::direct(BANNER)).with_can_pack(false);
        record(
            &mut stats,
            self.cache.resolve_bitmap_reference(32.0, Some(&banner), true).map(|r| r.is_packed()),
        );

        let label = format!("{LABEL} {frame}");
        for ch in label.chars() {
            if self.cache.resolve_glyph(&self.font, ch).is_some() {
                stats.glyphs += 1;
            }
        }

        // Copies issued this frame land with the frame; confirm them next.
        self.cache.renderer_mut().advance_frame();
        self.cache.mark_packs_ready(|renderer, node| renderer.is_resident(node));
        self.cache.process_loading();
        stats
    }
}

fn record(stats: &mut FrameStats, drawn: Option<bool>) {
    match drawn {
        Some(packed) => {
            stats.draws += 1;
            if packed {
                stats.packed_draws += 1;
            }
        }
        None => stats.skipped_draws += 1,
    }
}
