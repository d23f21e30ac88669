//! Comparable summaries of feed state.
//!
//! The polling primitive reports the authoritative feed as two comma-joined
//! id lists. A [`Snapshot`] is the parsed form, used on both sides of a diff.
//! Pinned posts are listed separately so they stay out of position math.

use serde::{Deserialize, Serialize};

use crate::PostId;

/// A point-in-time summary of which posts are in the feed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Ordered ids of unpinned posts.
    pub ids: Vec<PostId>,
    /// Ordered ids of pinned posts.
    pub pinned_ids: Vec<PostId>,
}

impl Snapshot {
    /// Create a snapshot from id lists.
    pub fn new(ids: Vec<PostId>, pinned_ids: Vec<PostId>) -> Self {
        Self { ids, pinned_ids }
    }

    /// Parse a heartbeat tick.
    pub fn from_tick(tick: &HeartbeatTick) -> Self {
        Self {
            ids: parse_id_list(&tick.ids),
            pinned_ids: parse_id_list(&tick.pinned),
        }
    }

    /// Render this snapshot as a heartbeat tick.
    pub fn to_tick(&self) -> HeartbeatTick {
        HeartbeatTick {
            ids: join_id_list(&self.ids),
            pinned: join_id_list(&self.pinned_ids),
        }
    }

    /// Whether the snapshot names no posts at all.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty() && self.pinned_ids.is_empty()
    }
}

/// Payload delivered by the polling primitive on each tick.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartbeatTick {
    /// Comma-joined ids of unpinned posts.
    #[serde(rename = "fm_feed_ids", default)]
    pub ids: String,
    /// Comma-joined ids of pinned posts.
    #[serde(rename = "fm_feed_pinned", default)]
    pub pinned: String,
}

/// Split a comma-joined list, dropping empty segments.
fn parse_id_list(raw: &str) -> Vec<PostId> {
    raw.split(',').filter_map(PostId::parse).collect()
}

fn join_id_list(ids: &[PostId]) -> String {
    ids.iter()
        .map(PostId::as_str)
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[&str]) -> Vec<PostId> {
        raw.iter().map(|s| PostId::from(*s)).collect()
    }

    #[test]
    fn empty_tick_is_empty_snapshot() {
        let snapshot = Snapshot::from_tick(&HeartbeatTick::default());
        assert!(snapshot.is_empty());
    }

    #[test]
    fn tick_lists_are_split_and_trimmed() {
        let tick = HeartbeatTick {
            ids: "1, 2,,3 ".into(),
            pinned: "7".into(),
        };
        let snapshot = Snapshot::from_tick(&tick);
        assert_eq!(snapshot.ids, ids(&["1", "2", "3"]));
        assert_eq!(snapshot.pinned_ids, ids(&["7"]));
    }

    #[test]
    fn tick_uses_heartbeat_field_names() {
        let json = r#"{"fm_feed_ids":"4,5","fm_feed_pinned":""}"#;
        let tick: HeartbeatTick = serde_json::from_str(json).unwrap();
        let snapshot = Snapshot::from_tick(&tick);
        assert_eq!(snapshot.ids, ids(&["4", "5"]));
        assert!(snapshot.pinned_ids.is_empty());
    }

    #[test]
    fn to_tick_joins_with_commas() {
        let snapshot = Snapshot::new(ids(&["1", "3"]), ids(&["2"]));
        let tick = snapshot.to_tick();
        assert_eq!(tick.ids, "1,3");
        assert_eq!(tick.pinned, "2");
        assert_eq!(Snapshot::from_tick(&tick), snapshot);
    }
}
