//! # logos-atlas
//!
//! Texture cache and atlas packer for the Logos 2D renderer. Resolves
//! logical image identifiers to draw-ready texture references, picks the
//! resolution variant per draw, packs small images and SDF glyphs into a
//! shared atlas, and evicts least-recently-drawn entries under an atlas
//! budget and a texture-memory budget.
//!
//! ## Architecture
//!
//! ```text
//! scene draw ──► TextureCache ──► IndirectTextureTable (RwLock, shared)
//!                    │
//!       ┌────────────┼──────────────────┐
//!       ▼            ▼                  ▼
//! TextureCacheList  TexturePacker    TextureLoadingData
//! (slotmap arena,   (guillotiere     (threshold → variant)
//!  global + packed   allocations)
//!  LRU orderings)    │
//!       │            ▼
//!       └──────► RendererInterface ◄── HeadlessRenderer (tests, sim)
//! ```
//!
//! - **`cache`** — `TextureCache` façade: resolution, preparation, purges.
//! - **`lru`** — entry arena with intrusive LRU orderings.
//! - **`packer`** — atlas allocation and renderer copy commands.
//! - **`loading`** — per-image variant-selection tables.
//! - **`indirect`** — thread-safe symbolic-name table.
//! - **`renderer`** — GPU boundary traits; **`headless`** implements them.

pub mod bitmap;
pub mod cache;
pub mod config;
pub mod error;
pub mod headless;
pub mod id;
pub mod indirect;
pub mod loading;
pub mod lru;
pub mod math;
pub mod observer;
pub mod packer;
pub mod reference;
pub mod renderer;

// Re-exports for ergonomic use.
pub use bitmap::BitmapDefinition;
pub use cache::{CacheEntry, CacheStats, GlyphTable, TextureCache, TextureCacheGlyphEntry, TextureCacheTextureEntry};
pub use config::TextureCacheConfig;
pub use error::{ConfigError, LoadingDataError};
pub use headless::{HeadlessFont, HeadlessRenderer};
pub use id::{ResourceId, VariantTag};
pub use indirect::IndirectTextureTable;
pub use loading::{LoadingThreshold, TextureLoadingData};
pub use lru::EntryKey;
pub use math::{PointI, RectI, Vec2};
pub use observer::{CacheObserver, EvictionCause};
pub use packer::{GlyphMetrics, NodeId, TexturePacker};
pub use reference::{PreparedReference, TextureReference};
pub use renderer::{Font, GlyphBitmap, RendererInterface, TextureHandle, TextureMetrics, TextureResource};
