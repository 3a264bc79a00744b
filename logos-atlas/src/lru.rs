//! Entry arena with two intrusive LRU orderings.
//!
//! Every cache entry lives in one [`SlotMap`] and is addressed by a
//! generation-checked [`EntryKey`]. Entries carry their own list links
//! ([`ListState`]), threading two independent doubly-linked lists through
//! the arena:
//!
//! * **global** — every texture entry, most recently drawn at the head;
//! * **packed** — every entry (texture or glyph) currently holding an atlas
//!   node, most recently drawn at the head.
//!
//! Both lists are sorted by last-drawn frame because entries only ever move
//! to the head, and only when drawn. Eviction walks from the tail and stops
//! at the first entry that is recent enough.

use slotmap::SlotMap;

use crate::packer::NodeId;

slotmap::new_key_type! {
    /// Handle to an entry in a [`TextureCacheList`].
    pub struct EntryKey;
}

/// Which ordering to walk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListKind {
    Global,
    Packed,
}

#[derive(Clone, Copy, Debug, Default)]
struct Links {
    prev: Option<EntryKey>,
    next: Option<EntryKey>,
    linked: bool,
}

#[derive(Clone, Copy, Debug, Default)]
struct Ends {
    head: Option<EntryKey>,
    tail: Option<EntryKey>,
}

/// Per-entry LRU and packing state.
#[derive(Clone, Debug, Default)]
pub struct ListState {
    last_draw_frame: u32,
    packed_node: Option<NodeId>,
    pack_ready: bool,
    global: Links,
    packed: Links,
}

impl ListState {
    #[inline]
    pub fn last_draw_frame(&self) -> u32 {
        self.last_draw_frame
    }

    /// Atlas node, `Some` iff the entry is in the packed list.
    #[inline]
    pub fn packed_node(&self) -> Option<NodeId> {
        self.packed_node
    }

    /// The renderer has committed the atlas copy for `packed_node`.
    #[inline]
    pub fn is_pack_ready(&self) -> bool {
        self.pack_ready
    }

    #[inline]
    fn links(&self, kind: ListKind) -> &Links {
        match kind {
            ListKind::Global => &self.global,
            ListKind::Packed => &self.packed,
        }
    }

    #[inline]
    fn links_mut(&mut self, kind: ListKind) -> &mut Links {
        match kind {
            ListKind::Global => &mut self.global,
            ListKind::Packed => &mut self.packed,
        }
    }
}

/// Anything stored in a [`TextureCacheList`].
pub trait ListEntry {
    fn list_state(&self) -> &ListState;
    fn list_state_mut(&mut self) -> &mut ListState;

    /// Whether `use_entry` threads this entry through the global list.
    fn tracks_globally(&self) -> bool;
}

/// Arena of entries plus the head/tail of both orderings.
#[derive(Debug)]
pub struct TextureCacheList<T: ListEntry> {
    entries: SlotMap<EntryKey, T>,
    global: Ends,
    packed: Ends,
}

impl<T: ListEntry> Default for TextureCacheList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ListEntry> TextureCacheList<T> {
    pub fn new() -> Self {
        Self {
            entries: SlotMap::with_key(),
            global: Ends::default(),
            packed: Ends::default(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn get(&self, key: EntryKey) -> Option<&T> {
        self.entries.get(key)
    }

    #[inline]
    pub fn get_mut(&mut self, key: EntryKey) -> Option<&mut T> {
        self.entries.get_mut(key)
    }

    #[inline]
    pub fn contains_key(&self, key: EntryKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Add an entry. It joins no list until first used or packed.
    pub fn insert(&mut self, value: T) -> EntryKey {
        self.entries.insert(value)
    }

    /// Unlink from both lists and drop from the arena.
    pub fn remove(&mut self, key: EntryKey) -> Option<T> {
        self.unlink(ListKind::Packed, key);
        self.unlink(ListKind::Global, key);
        self.entries.remove(key)
    }

    /// Drop everything.
    pub fn remove_all(&mut self) {
        self.entries.clear();
        self.global = Ends::default();
        self.packed = Ends::default();
    }

    // ───────────────────── traversal ─────────────────────

    #[inline]
    pub fn head(&self, kind: ListKind) -> Option<EntryKey> {
        self.ends(kind).head
    }

    #[inline]
    pub fn tail(&self, kind: ListKind) -> Option<EntryKey> {
        self.ends(kind).tail
    }

    #[inline]
    pub fn next(&self, kind: ListKind, key: EntryKey) -> Option<EntryKey> {
        self.entries.get(key)?.list_state().links(kind).next
    }

    #[inline]
    pub fn prev(&self, kind: ListKind, key: EntryKey) -> Option<EntryKey> {
        self.entries.get(key)?.list_state().links(kind).prev
    }

    /// Keys from most to least recently drawn.
    pub fn iter_from_head(&self, kind: ListKind) -> impl Iterator<Item = EntryKey> + '_ {
        std::iter::successors(self.head(kind), move |&key| self.next(kind, key))
    }

    /// Number of entries linked into `kind`.
    pub fn list_len(&self, kind: ListKind) -> usize {
        self.iter_from_head(kind).count()
    }

    /// All live entries in arena order.
    pub fn iter(&self) -> impl Iterator<Item = (EntryKey, &T)> {
        self.entries.iter()
    }

    // ───────────────────── LRU transitions ─────────────────────

    /// Mark drawn in `frame`: move to the head of the global list (if
    /// tracked globally) and of the packed list (if packed).
    pub fn use_entry(&mut self, key: EntryKey, frame: u32) {
        let Some(entry) = self.entries.get_mut(key) else {
            return;
        };
        entry.list_state_mut().last_draw_frame = frame;
        let global = entry.tracks_globally();
        let packed = entry.list_state().packed_node.is_some();
        if global {
            self.link_front(ListKind::Global, key);
        }
        if packed {
            self.link_front(ListKind::Packed, key);
        }
    }

    /// Record an atlas allocation and move to the head of the packed list.
    /// The entry is not pack-ready until the renderer confirms the copy.
    pub fn pack(&mut self, key: EntryKey, node: NodeId) {
        let Some(entry) = self.entries.get_mut(key) else {
            return;
        };
        let state = entry.list_state_mut();
        state.packed_node = Some(node);
        state.pack_ready = false;
        self.link_front(ListKind::Packed, key);
    }

    /// Forget the atlas allocation and leave the packed list.
    pub fn unpack(&mut self, key: EntryKey) {
        self.unlink(ListKind::Packed, key);
        if let Some(entry) = self.entries.get_mut(key) {
            let state = entry.list_state_mut();
            state.packed_node = None;
            state.pack_ready = false;
        }
    }

    pub fn set_pack_ready(&mut self, key: EntryKey, ready: bool) {
        if let Some(entry) = self.entries.get_mut(key) {
            let state = entry.list_state_mut();
            state.pack_ready = ready && state.packed_node.is_some();
        }
    }

    // ───────────────────── link plumbing ─────────────────────

    #[inline]
    fn ends(&self, kind: ListKind) -> &Ends {
        match kind {
            ListKind::Global => &self.global,
            ListKind::Packed => &self.packed,
        }
    }

    #[inline]
    fn ends_mut(&mut self, kind: ListKind) -> &mut Ends {
        match kind {
            ListKind::Global => &mut self.global,
            ListKind::Packed => &mut self.packed,
        }
    }

    #[inline]
    fn links_mut(&mut self, kind: ListKind, key: EntryKey) -> Option<&mut Links> {
        self.entries
            .get_mut(key)
            .map(|e| e.list_state_mut().links_mut(kind))
    }

    fn link_front(&mut self, kind: ListKind, key: EntryKey) {
        if !self.entries.contains_key(key) {
            return;
        }
        self.unlink(kind, key);

        let old_head = self.ends(kind).head;
        if let Some(links) = self.links_mut(kind, key) {
            *links = Links {
                prev: None,
                next: old_head,
                linked: true,
            };
        }
        match old_head {
            Some(head) => {
                if let Some(links) = self.links_mut(kind, head) {
                    links.prev = Some(key);
                }
            }
            None => self.ends_mut(kind).tail = Some(key),
        }
        self.ends_mut(kind).head = Some(key);
    }

    fn unlink(&mut self, kind: ListKind, key: EntryKey) {
        let Some(links) = self
            .entries
            .get(key)
            .map(|e| *e.list_state().links(kind))
        else {
            return;
        };
        if !links.linked {
            return;
        }

        match links.prev {
            Some(prev) => {
                if let Some(l) = self.links_mut(kind, prev) {
                    l.next = links.next;
                }
            }
            None => self.ends_mut(kind).head = links.next,
        }
        match links.next {
            Some(next) => {
                if let Some(l) = self.links_mut(kind, next) {
                    l.prev = links.prev;
                }
            }
            None => self.ends_mut(kind).tail = links.prev,
        }

        if let Some(l) = self.links_mut(kind, key) {
            *l = Links::default();
        }
    }
}

// ===================================================================
// Tests
// ===================================================================
