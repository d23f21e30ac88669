//! Diff two feed snapshots.

use feedq_core::{diff, Intent};
use feedq_types::{HeartbeatTick, Snapshot};

/// Run the diff command.
pub fn run(local: &str, local_pinned: &str, remote: &str, remote_pinned: &str) {
    let local = parse_snapshot(local, local_pinned);
    let remote = parse_snapshot(remote, remote_pinned);

    for line in format_intents(&diff(&local, &remote)) {
        println!("{line}");
    }
}

/// Parse comma-joined lists the way a heartbeat tick carries them.
fn parse_snapshot(ids: &str, pinned: &str) -> Snapshot {
    Snapshot::from_tick(&HeartbeatTick {
        ids: ids.to_string(),
        pinned: pinned.to_string(),
    })
}

/// One line per intent: `insert <id> <position>` or `remove <id>`.
fn format_intents(intents: &[Intent]) -> Vec<String> {
    intents
        .iter()
        .map(|intent| match intent {
            Intent::Insert { id, position } => format!("insert {id} {position}"),
            Intent::Remove { id } => format!("remove {id}"),
        })
        .collect()
}
