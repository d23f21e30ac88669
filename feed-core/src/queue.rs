//! Pending insert/remove queue for feedq.
//!
//! The queue accumulates intents from the change detector and the user
//! until they are flushed:
//! - Inserts map an id to its target position among unpinned stubs
//!   (`0` = prepend, `n` = after the n-th unpinned stub).
//! - Removes are a set of ids.
//!
//! Both sides are guarded against the store: an id already rendered is never
//! queued for insert, and an id not rendered is never queued for removal.
//! Guarded calls are silent no-ops.

use feedq_types::PostId;
use std::collections::{BTreeMap, BTreeSet};

use crate::store::ItemStore;

/// Number of pending inserts and removes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueCounts {
    /// Pending inserts.
    pub inserts: usize,
    /// Pending removes.
    pub removes: usize,
}

impl QueueCounts {
    /// Create counts.
    pub fn new(inserts: usize, removes: usize) -> Self {
        Self { inserts, removes }
    }

    /// Inserts plus removes.
    pub fn total(&self) -> usize {
        self.inserts + self.removes
    }

    /// Check if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Which entries one side of a flush should use.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FlushSource<T> {
    /// Use the standing queue.
    #[default]
    Queued,
    /// Skip this side entirely.
    Skip,
    /// Use exactly these entries instead of the standing queue.
    Only(T),
}

/// Standing insert and remove queues.
#[derive(Debug, Clone, Default)]
pub struct PendingQueue {
    inserts: BTreeMap<PostId, usize>,
    removes: BTreeSet<PostId>,
}

impl PendingQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an insert, overwriting any earlier position for the id.
    ///
    /// Returns `false` (and changes nothing) if the id is already rendered.
    pub fn insert(&mut self, store: &ItemStore, id: PostId, position: usize) -> bool {
        if store.contains(&id) {
            return false;
        }
        self.inserts.insert(id, position);
        true
    }

    /// Queue a removal.
    ///
    /// Returns `false` (and changes nothing) if the id is not rendered.
    pub fn remove(&mut self, store: &ItemStore, id: PostId) -> bool {
        if !store.contains(&id) {
            return false;
        }
        self.removes.insert(id);
        true
    }

    /// Current pending counts.
    pub fn counts(&self) -> QueueCounts {
        QueueCounts::new(self.inserts.len(), self.removes.len())
    }

    /// Check if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.inserts.is_empty() && self.removes.is_empty()
    }

    /// Pending inserts keyed by id.
    pub fn inserts(&self) -> &BTreeMap<PostId, usize> {
        &self.inserts
    }

    /// Pending removes.
    pub fn removes(&self) -> &BTreeSet<PostId> {
        &self.removes
    }

    /// Check if an id is queued for insert.
    pub fn has_insert(&self, id: &PostId) -> bool {
        self.inserts.contains_key(id)
    }

    /// Check if an id is queued for removal.
    pub fn has_remove(&self, id: &PostId) -> bool {
        self.removes.contains(id)
    }

    /// Drop a pending insert. No-op if absent.
    pub fn clear_insert(&mut self, id: &PostId) {
        self.inserts.remove(id);
    }

    /// Drop a pending removal. No-op if absent.
    pub fn clear_remove(&mut self, id: &PostId) {
        self.removes.remove(id);
    }

    /// Resolve the insert side of a flush.
    pub fn resolve_inserts(
        &self,
        source: FlushSource<BTreeMap<PostId, usize>>,
    ) -> BTreeMap<PostId, usize> {
        match source {
            FlushSource::Queued => self.inserts.clone(),
            FlushSource::Skip => BTreeMap::new(),
            FlushSource::Only(entries) => entries,
        }
    }

    /// Resolve the remove side of a flush.
    pub fn resolve_removes(&self, source: FlushSource<BTreeSet<PostId>>) -> BTreeSet<PostId> {
        match source {
            FlushSource::Queued => self.removes.clone(),
            FlushSource::Skip => BTreeSet::new(),
            FlushSource::Only(ids) => ids,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Stub;
    use feedq_types::Fragment;

    fn store_with(ids: &[&str]) -> ItemStore {
        ItemStore::from_stubs(ids.iter().map(|id| Stub::new(*id, Fragment::new(*id)))).unwrap()
    }

    fn id(raw: &str) -> PostId {
        PostId::from(raw)
    }

    #[test]
    fn insert_records_position() {
        let store = ItemStore::new();
        let mut queue = PendingQueue::new();

        assert!(queue.insert(&store, id("42"), 0));
        assert_eq!(queue.inserts().get(&id("42")), Some(&0));
        assert_eq!(queue.counts(), QueueCounts::new(1, 0));
    }

    #[test]
    fn insert_overwrites_position() {
        let store = ItemStore::new();
        let mut queue = PendingQueue::new();

        queue.insert(&store, id("42"), 0);
        queue.insert(&store, id("42"), 3);
        assert_eq!(queue.inserts().get(&id("42")), Some(&3));
        assert_eq!(queue.counts().inserts, 1);
    }

    #[test]
    fn insert_of_rendered_id_is_noop() {
        let store = store_with(&["42"]);
        let mut queue = PendingQueue::new();

        assert!(!queue.insert(&store, id("42"), 0));
        assert!(queue.is_empty());
    }

    #[test]
    fn remove_of_missing_id_is_noop() {
        let store = store_with(&["1"]);
        let mut queue = PendingQueue::new();

        assert!(!queue.remove(&store, id("2")));
        assert!(queue.is_empty());
    }

    #[test]
    fn remove_is_a_set() {
        let store = store_with(&["1"]);
        let mut queue = PendingQueue::new();

        assert!(queue.remove(&store, id("1")));
        assert!(queue.remove(&store, id("1")));
        assert_eq!(queue.counts(), QueueCounts::new(0, 1));
    }

    #[test]
    fn resolve_respects_flush_source() {
        let store = store_with(&["1"]);
        let mut queue = PendingQueue::new();
        queue.insert(&store, id("2"), 0);
        queue.remove(&store, id("1"));

        assert_eq!(queue.resolve_inserts(FlushSource::Queued).len(), 1);
        assert!(queue.resolve_inserts(FlushSource::Skip).is_empty());
        assert!(queue.resolve_removes(FlushSource::Skip).is_empty());

        let only: BTreeMap<PostId, usize> = [(id("9"), 4)].into_iter().collect();
        let resolved = queue.resolve_inserts(FlushSource::Only(only.clone()));
        assert_eq!(resolved, only);
        // The standing queue is untouched by an override
        assert!(queue.has_insert(&id("2")));
    }

    #[test]
    fn counts_total() {
        let counts = QueueCounts::new(2, 3);
        assert_eq!(counts.total(), 5);
        assert!(!counts.is_empty());
        assert!(QueueCounts::default().is_empty());
    }
}
