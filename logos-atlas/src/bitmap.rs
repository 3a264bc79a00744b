//! Bitmap descriptors handed to the cache by the scene renderer.

use std::sync::Arc;

use crate::id::ResourceId;

/// Path under which the built-in solid-fill bitmap is cached.
pub const SOLID_FILL_PATH: &str = "logos-atlas/solid-fill";

/// One drawable bitmap: either a path to load or raw pixels to upload.
#[derive(Clone, Debug, PartialEq)]
pub struct BitmapDefinition {
    pub id: ResourceId,
    /// Raw pixels; when present the id is only a cache key.
    pub data: Option<Arc<[u8]>>,
    pub width: u32,
    pub height: u32,
    pub full_occluder: bool,
    pub can_pack: bool,
}

impl BitmapDefinition {
    /// A file-backed bitmap.
    pub fn from_id(id: ResourceId) -> Self {
        Self {
            id,
            data: None,
            width: 0,
            height: 0,
            full_occluder: false,
            can_pack: true,
        }
    }

    /// An in-memory RGBA bitmap cached under `key`.
    pub fn from_rgba(key: impl Into<Arc<str>>, data: impl Into<Arc<[u8]>>, width: u32, height: u32) -> Self {
        Self {
            id: ResourceId::direct(key),
            data: Some(data.into()),
            width,
            height,
            full_occluder: false,
            can_pack: true,
        }
    }

    /// The 1x1 opaque white bitmap used for untextured fills.
    pub fn solid_fill() -> Self {
        Self {
            full_occluder: true,
            ..Self::from_rgba(SOLID_FILL_PATH, vec![0xffu8; 4], 1, 1)
        }
    }

    #[inline]
    pub fn with_can_pack(mut self, can_pack: bool) -> Self {
        self.can_pack = can_pack;
        self
    }

    /// Bytes per pixel of `data`, inferred from its length.
    pub fn stride(&self) -> u32 {
        let pixels = self.width as usize * self.height as usize;
        match &self.data {
            Some(data) if pixels > 0 && data.len() < pixels * 4 => 1,
            _ => 4,
        }
    }
}
