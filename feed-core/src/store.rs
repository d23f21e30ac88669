//! Item store for feedq.
//!
//! The store is the live, ordered list of rendered stubs. It keeps an
//! in-memory id index so presence checks never depend on rendered markup.
//!
//! Positions are derived from order. The store itself knows nothing about
//! pin exclusion: [`ItemStore::inject`] counts every stub currently held.
//! Callers that need pin-excluded positions detach pinned stubs first (see
//! [`crate::pins`]).

use feedq_types::{Fragment, PostId, Snapshot};
use std::collections::HashSet;
use thiserror::Error;

/// Error type for store mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The id is already rendered in the feed.
    #[error("post {0} is already in the feed")]
    Duplicate(PostId),
}

/// One rendered item in the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stub {
    /// Stable post id.
    pub id: PostId,
    /// Whether the stub is held at a fixed position.
    pub pinned: bool,
    /// Server-rendered markup.
    pub fragment: Fragment,
}

impl Stub {
    /// Create an unpinned stub.
    pub fn new(id: impl Into<PostId>, fragment: Fragment) -> Self {
        Self {
            id: id.into(),
            pinned: false,
            fragment,
        }
    }

    /// Create a pinned stub.
    pub fn pinned(id: impl Into<PostId>, fragment: Fragment) -> Self {
        Self {
            id: id.into(),
            pinned: true,
            fragment,
        }
    }
}

/// Ordered collection of stubs with unique ids.
#[derive(Debug, Clone, Default)]
pub struct ItemStore {
    stubs: Vec<Stub>,
    index: HashSet<PostId>,
}

impl ItemStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from stubs in render order.
    ///
    /// Returns an error on the first repeated id.
    pub fn from_stubs(stubs: impl IntoIterator<Item = Stub>) -> Result<Self, StoreError> {
        let mut store = Self::new();
        for stub in stubs {
            let end = store.len();
            store.inject(end, stub)?;
        }
        Ok(store)
    }

    /// Check whether an id is rendered.
    pub fn contains(&self, id: &PostId) -> bool {
        self.index.contains(id)
    }

    /// Number of rendered stubs.
    pub fn len(&self) -> usize {
        self.stubs.len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.stubs.is_empty()
    }

    /// All stubs in render order.
    pub fn stubs(&self) -> &[Stub] {
        &self.stubs
    }

    /// Look up a stub by id.
    pub fn get(&self, id: &PostId) -> Option<&Stub> {
        if !self.contains(id) {
            return None;
        }
        self.stubs.iter().find(|s| &s.id == id)
    }

    /// Index of a stub in full render order.
    pub fn position_of(&self, id: &PostId) -> Option<usize> {
        if !self.contains(id) {
            return None;
        }
        self.stubs.iter().position(|s| &s.id == id)
    }

    /// All ids in render order.
    pub fn ids(&self) -> Vec<PostId> {
        self.stubs.iter().map(|s| s.id.clone()).collect()
    }

    /// Ids of pinned stubs in render order.
    pub fn pinned_ids(&self) -> Vec<PostId> {
        self.stubs
            .iter()
            .filter(|s| s.pinned)
            .map(|s| s.id.clone())
            .collect()
    }

    /// Ids of unpinned stubs in render order.
    pub fn unpinned_ids(&self) -> Vec<PostId> {
        self.stubs
            .iter()
            .filter(|s| !s.pinned)
            .map(|s| s.id.clone())
            .collect()
    }

    /// Summarize the store for diffing against the server.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::new(self.unpinned_ids(), self.pinned_ids())
    }

    /// Insert a stub at a position.
    ///
    /// `0` prepends. `n > 0` places the stub right after the n-th stub
    /// (1-based) currently held, which is index `n`. Positions past the end
    /// append. Returns the index the stub landed at.
    pub fn inject(&mut self, position: usize, stub: Stub) -> Result<usize, StoreError> {
        if self.index.contains(&stub.id) {
            return Err(StoreError::Duplicate(stub.id));
        }
        let at = position.min(self.stubs.len());
        self.index.insert(stub.id.clone());
        self.stubs.insert(at, stub);
        Ok(at)
    }

    /// Remove a stub by id, returning it.
    pub fn remove(&mut self, id: &PostId) -> Option<Stub> {
        let at = self.position_of(id)?;
        self.index.remove(id);
        Some(self.stubs.remove(at))
    }

    /// Flip the pinned flag of a stub. Returns the new flag.
    pub fn toggle_pin(&mut self, id: &PostId) -> Option<bool> {
        let at = self.position_of(id)?;
        let stub = &mut self.stubs[at];
        stub.pinned = !stub.pinned;
        Some(stub.pinned)
    }

    /// Move a stub to a new index in full render order.
    ///
    /// The target is clamped to the end. Returns `false` for unknown ids.
    pub fn move_to(&mut self, id: &PostId, target: usize) -> bool {
        let Some(from) = self.position_of(id) else {
            return false;
        };
        let stub = self.stubs.remove(from);
        let at = target.min(self.stubs.len());
        self.stubs.insert(at, stub);
        true
    }

    /// Detach every pinned stub, returning each with its former index.
    pub(crate) fn take_pinned(&mut self) -> Vec<(usize, Stub)> {
        let mut taken = Vec::new();
        let mut kept = Vec::with_capacity(self.stubs.len());
        for (i, stub) in self.stubs.drain(..).enumerate() {
            if stub.pinned {
                taken.push((i, stub));
            } else {
                kept.push(stub);
            }
        }
        self.stubs = kept;
        for (_, stub) in &taken {
            self.index.remove(&stub.id);
        }
        taken
    }
}
