//! Indirect texture names.
//!
//! Symbolic names (avatars, skinnable UI slots) are mapped to concrete
//! direct identifiers at runtime. The table is the only cache state that
//! other threads may write, so it lives behind an `RwLock` and is shared
//! through an `Arc`.

use std::sync::{Arc, PoisonError, RwLock};

use rustc_hash::FxHashMap;

use crate::id::ResourceId;
use crate::observer::CacheObserver;

/// Thread-safe `name -> direct ResourceId` map.
#[derive(Default)]
pub struct IndirectTextureTable {
    map: RwLock<FxHashMap<Arc<str>, ResourceId>>,
    observer: Option<Arc<dyn CacheObserver>>,
}

impl std::fmt::Debug for IndirectTextureTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndirectTextureTable")
            .field("len", &self.len())
            .finish()
    }
}

impl IndirectTextureTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_observer(observer: Arc<dyn CacheObserver>) -> Self {
        Self {
            map: RwLock::default(),
            observer: Some(observer),
        }
    }

    /// Direct identifier currently mapped to `name`.
    pub fn lookup(&self, name: &str) -> Option<ResourceId> {
        let map = self.map.read().unwrap_or_else(PoisonError::into_inner);
        map.get(name).cloned()
    }

    /// Map `name` to `target`, or erase it with `None`.
    ///
    /// Returns `false` (and leaves the table unchanged) when `target` is
    /// itself indirect.
    pub fn update(&self, name: &str, target: Option<ResourceId>) -> bool {
        if let Some(target) = &target {
            if target.is_indirect() {
                log::warn!("Rejected indirect texture {name}: target {target} is not a direct id");
                return false;
            }
        }

        {
            let mut map = self.map.write().unwrap_or_else(PoisonError::into_inner);
            match &target {
                Some(target) => {
                    map.insert(Arc::from(name), target.clone());
                }
                None => {
                    map.remove(name);
                }
            }
        }

        if let Some(observer) = &self.observer {
            observer.indirect_updated(name, target.as_ref());
        }
        true
    }

    pub fn len(&self) -> usize {
        self.map.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
