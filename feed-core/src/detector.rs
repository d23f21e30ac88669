//! Snapshot diffing.
//!
//! The detector keeps two snapshots: the accepted baseline the editor is
//! working against, and the last snapshot the polling primitive reported.
//! A tick that repeats the last observation is ignored. Otherwise the tick
//! is diffed against the baseline and turned into queue intents.
//!
//! The baseline only moves on [`ChangeDetector::accept`], so intents keep
//! being reported for unaccepted changes; the queue guards make repeats
//! harmless.

use feedq_types::{PostId, Snapshot};
use std::collections::HashSet;

/// A queue operation derived from a snapshot diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Post published remotely; `position` is its index among remote
    /// unpinned ids.
    Insert {
        /// Post id.
        id: PostId,
        /// Target position among unpinned stubs.
        position: usize,
    },
    /// Post deleted remotely.
    Remove {
        /// Post id.
        id: PostId,
    },
}

/// Compares polled snapshots against an accepted baseline.
#[derive(Debug, Clone, Default)]
pub struct ChangeDetector {
    baseline: Snapshot,
    last_observed: Option<Snapshot>,
}

impl ChangeDetector {
    /// Start from the snapshot the editor was loaded with.
    pub fn new(baseline: Snapshot) -> Self {
        Self {
            baseline,
            last_observed: None,
        }
    }

    /// The accepted baseline.
    pub fn baseline(&self) -> &Snapshot {
        &self.baseline
    }

    /// The most recent snapshot passed to [`observe`](Self::observe).
    pub fn last_observed(&self) -> Option<&Snapshot> {
        self.last_observed.as_ref()
    }

    /// Feed one polled snapshot.
    ///
    /// Returns no intents if the snapshot equals the last one observed, or
    /// the baseline when nothing was observed yet.
    pub fn observe(&mut self, external: Snapshot) -> Vec<Intent> {
        let previous = self.last_observed.as_ref().unwrap_or(&self.baseline);
        if *previous == external {
            return Vec::new();
        }
        let intents = diff(&self.baseline, &external);
        self.last_observed = Some(external);
        intents
    }

    /// Make the last observed snapshot the new baseline.
    ///
    /// Returns `false` if nothing has been observed since the last accept.
    pub fn accept(&mut self) -> bool {
        match self.last_observed.take() {
            Some(snapshot) => {
                self.baseline = snapshot;
                true
            }
            None => false,
        }
    }

    /// Replace the baseline outright, forgetting any observation.
    pub fn rebase(&mut self, baseline: Snapshot) {
        self.baseline = baseline;
        self.last_observed = None;
    }
}

/// Intents that take `local` to `external`.
///
/// Inserts come first, in remote order, followed by removals of unpinned
/// ids and then pinned ids. An id removed from both lists is reported once.
pub fn diff(local: &Snapshot, external: &Snapshot) -> Vec<Intent> {
    let local_ids: HashSet<&PostId> = local.ids.iter().collect();
    let external_ids: HashSet<&PostId> = external.ids.iter().collect();
    let external_pinned: HashSet<&PostId> = external.pinned_ids.iter().collect();

    let mut intents: Vec<Intent> = external
        .ids
        .iter()
        .enumerate()
        .filter(|(_, id)| !local_ids.contains(id))
        .map(|(position, id)| Intent::Insert {
            id: id.clone(),
            position,
        })
        .collect();

    let mut removed: HashSet<&PostId> = HashSet::new();
    let deleted = local.ids.iter().filter(|id| !external_ids.contains(id));
    let deleted_pinned = local
        .pinned_ids
        .iter()
        .filter(|id| !external_pinned.contains(id));
    for id in deleted.chain(deleted_pinned) {
        if removed.insert(id) {
            intents.push(Intent::Remove { id: id.clone() });
        }
    }
    intents
}
