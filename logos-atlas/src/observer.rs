//! Optional introspection hooks.
//!
//! Tools that want to mirror cache state (debug overlays, leak checks,
//! tests) implement [`CacheObserver`] and attach it to a cache or an
//! indirect table. Every hook has a no-op default.

use crate::id::ResourceId;
use crate::packer::NodeId;

/// Why an entry left the cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EvictionCause {
    /// Not drawn within the purge window.
    Expired,
    /// Full teardown.
    Destroyed,
}

pub trait CacheObserver: Send + Sync {
    /// An indirect name was mapped (`Some`) or erased (`None`).
    fn indirect_updated(&self, _name: &str, _target: Option<&ResourceId>) {}

    /// A texture entry was created and its load requested.
    fn entry_created(&self, _id: &ResourceId) {}

    fn entry_evicted(&self, _id: &ResourceId, _cause: EvictionCause) {}

    fn entry_packed(&self, _id: &ResourceId, _node: NodeId) {}

    fn entry_unpacked(&self, _id: &ResourceId, _node: NodeId) {}

    /// Full purge finished; `kept` loading-data tables survived.
    fn purged(&self, _kept: usize) {}
}
