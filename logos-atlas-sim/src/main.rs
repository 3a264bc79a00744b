//! Logos Atlas Simulator — headless frame loop over the texture cache.
//!
//! Drives `logos-atlas` with the in-process renderer so cache behaviour
//! (variant selection, packing, eviction) can be observed without a GPU.
//!
//! ```text
//! logos-atlas-sim [config.json] [frames]
//! ```
//!
//! Set `RUST_LOG=debug` to see evictions and packer room-making.

mod state;

use std::process::ExitCode;

use log::info;
use logos_atlas::TextureCacheConfig;

use state::SimState;

const DEFAULT_FRAMES: u32 = 600;
const DEMO_IMAGES: usize = 400;
const LOAD_LATENCY_FRAMES: u32 = 2;

fn main() -> ExitCode {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => match TextureCacheConfig::from_json_file(&path) {
            Ok(config) => config,
            Err(e) => {
                log::error!("Failed to load config {path}: {e}");
                return ExitCode::FAILURE;
            }
        },
        None => TextureCacheConfig::default(),
    };
    let frames = match args.next().map(|s| s.parse::<u32>()) {
        Some(Ok(frames)) => frames,
        Some(Err(e)) => {
            log::error!("Invalid frame count: {e}");
            return ExitCode::FAILURE;
        }
        None => DEFAULT_FRAMES,
    };

    info!("Starting Logos Atlas Simulator for {frames} frames...");

    let mut state = match SimState::new(config, LOAD_LATENCY_FRAMES) {
        Ok(state) => state,
        Err(e) => {
            log::error!("Invalid config: {e}");
            return ExitCode::FAILURE;
        }
    };
    state.load_demo_scene(DEMO_IMAGES);

    let mut skipped = 0;
    for frame in 1..=frames {
        let stats = state.render_frame();
        skipped += stats.skipped_draws;
        if frame % 60 == 0 {
            info!(
                "Frame {frame}: zoom {:.2}, {} draws ({} packed), {} glyphs, {} entries, {} packed, {} bytes",
                state.camera.zoom,
                stats.draws,
                stats.packed_draws,
                stats.glyphs,
                state.cache.entry_count(),
                state.cache.packed_entry_count(),
                state.cache.total_memory_usage_in_bytes()
            );
        }
    }

    let stats = state.cache.stats();
    match serde_json::to_string(&stats) {
        Ok(json) => info!("Cache stats: {json}"),
        Err(e) => log::warn!("Could not serialize cache stats: {e}"),
    }
    info!(
        "Finished {frames} frames: hit rate {:.3}, {skipped} skipped draws",
        stats.hit_rate()
    );

    state.cache.purge();
    ExitCode::SUCCESS
}
