//! Replay a scripted editing session.
//!
//! A script describes the feed the editor opens with, extra posts the
//! server knows about, and a list of steps. Server-side steps (`publish`,
//! `delete_post`, `fail_fetch`) drive the mock endpoint; every other step
//! goes through the feed manager exactly as a host UI would.
//!
//! ```json
//! {
//!   "feed": [{ "id": "1", "title": "One" }, { "id": "2", "title": "Two", "pinned": true }],
//!   "posts": [{ "id": "9", "title": "Catalog" }],
//!   "steps": [
//!     { "step": "publish", "id": "4", "title": "Four" },
//!     { "step": "heartbeat" },
//!     { "step": "accept" }
//!   ]
//! }
//! ```

use anyhow::{Context, Result};
use feedq_client::{
    spawn_heartbeat, ClientError, FeedManager, MockEndpoint, RenderAdapter, SubmitDecision,
};
use feedq_core::{ApplyReport, NoticeAction, SearchResults, Stub};
use feedq_types::{PostId, Snapshot};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

use crate::config::Config;

/// A replay script.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Script {
    /// Feed the editor opens with, in render order.
    #[serde(default)]
    pub feed: Vec<ScriptPost>,
    /// Posts the server knows about but the feed does not show.
    #[serde(default)]
    pub posts: Vec<ScriptPost>,
    /// Steps to run in order.
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// A post in a script.
#[derive(Debug, Clone, Deserialize)]
pub struct ScriptPost {
    /// Post id.
    pub id: PostId,
    /// Post title.
    #[serde(default)]
    pub title: String,
    /// Whether the post starts pinned (feed only).
    #[serde(default)]
    pub pinned: bool,
}

/// One replay step.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    /// Server: publish a post at the top of the feed.
    Publish {
        /// Post id.
        id: PostId,
        /// Post title.
        #[serde(default)]
        title: String,
    },
    /// Server: delete a post.
    DeletePost {
        /// Post id.
        id: PostId,
    },
    /// Server: fail the next batch fetch.
    FailFetch {
        /// Error message.
        #[serde(default = "default_fetch_error")]
        error: String,
    },
    /// Let time pass (the background heartbeat may fire).
    Wait {
        /// Milliseconds to sleep.
        ms: u64,
    },
    /// Poll the server once.
    Heartbeat,
    /// Click the pending-changes notice.
    Accept,
    /// Flush the standing queue.
    Flush,
    /// Queue an insert.
    Insert {
        /// Post id.
        id: PostId,
        /// Target position among unpinned posts.
        #[serde(default)]
        position: usize,
    },
    /// Queue a removal.
    Remove {
        /// Post id.
        id: PostId,
    },
    /// Insert one post right away.
    InsertSingle {
        /// Post id.
        id: PostId,
        /// Target position among unpinned posts.
        #[serde(default)]
        position: usize,
    },
    /// Remove one post right away.
    RemoveSingle {
        /// Post id.
        id: PostId,
    },
    /// Type into the search box.
    Search {
        /// Full input value.
        query: String,
    },
    /// Pick a search result (the highlighted one unless `index` is given).
    Select {
        /// Result to highlight first.
        #[serde(default)]
        index: Option<usize>,
    },
    /// Toggle a post's pin.
    Pin {
        /// Post id.
        id: PostId,
    },
    /// Drag a post to a render index.
    Drag {
        /// Post id.
        id: PostId,
        /// Target index in render order.
        to: usize,
    },
    /// Submit the form, answering the prompt with `confirm` if one appears.
    Submit {
        /// Answer to the confirmation prompt.
        #[serde(default)]
        confirm: bool,
    },
}

fn default_fetch_error() -> String {
    "injected failure".to_string()
}

impl Step {
    /// Script name of the step.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Publish { .. } => "publish",
            Self::DeletePost { .. } => "delete_post",
            Self::FailFetch { .. } => "fail_fetch",
            Self::Wait { .. } => "wait",
            Self::Heartbeat => "heartbeat",
            Self::Accept => "accept",
            Self::Flush => "flush",
            Self::Insert { .. } => "insert",
            Self::Remove { .. } => "remove",
            Self::InsertSingle { .. } => "insert_single",
            Self::RemoveSingle { .. } => "remove_single",
            Self::Search { .. } => "search",
            Self::Select { .. } => "select",
            Self::Pin { .. } => "pin",
            Self::Drag { .. } => "drag",
            Self::Submit { .. } => "submit",
        }
    }
}

impl Script {
    /// Load a script from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read script {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse script {}", path.display()))
    }

    /// Initial stubs and the matching server feed.
    fn initial_feed(&self) -> (Vec<Stub>, Snapshot) {
        let mut stubs = Vec::with_capacity(self.feed.len());
        let mut snapshot = Snapshot::default();
        for post in &self.feed {
            let fragment = MockEndpoint::fragment_for(&post.id, &post.title);
            if post.pinned {
                stubs.push(Stub::pinned(post.id.clone(), fragment));
                snapshot.pinned_ids.push(post.id.clone());
            } else {
                stubs.push(Stub::new(post.id.clone(), fragment));
                snapshot.ids.push(post.id.clone());
            }
        }
        (stubs, snapshot)
    }
}

/// Prints notices and search results as they change.
#[derive(Debug, Default)]
struct PrintRenderer;

impl RenderAdapter for PrintRenderer {
    fn notice(&self, action: &NoticeAction) {
        if let NoticeAction::Show(message) = action {
            println!("  notice: {message}");
        }
    }

    fn search_results(&self, results: Option<&SearchResults>) {
        let Some(results) = results else {
            return;
        };
        for (i, hit) in results.hits().iter().enumerate() {
            let marker = if i == results.active_index() { ">" } else { " " };
            println!("  {marker} {} {}", hit.id, hit.title);
        }
    }
}

/// Run the replay command.
pub async fn run(path: &Path, config: &Config) -> Result<()> {
    let script = Script::from_file(path)?;

    let endpoint = MockEndpoint::new();
    for post in script.posts.iter().chain(&script.feed) {
        endpoint.add_post(post.id.clone(), &post.title);
    }
    let (stubs, server_feed) = script.initial_feed();
    endpoint.set_feed(server_feed);

    let manager = Arc::new(FeedManager::new(
        config.manager_config(),
        endpoint.clone(),
        PrintRenderer,
        stubs,
    )?);
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let heartbeat = spawn_heartbeat(Arc::clone(&manager), shutdown_rx);

    println!("start: {}", render_order(&manager.stubs().await));
    for (n, step) in script.steps.iter().enumerate() {
        println!("[{}] {}", n + 1, step.name());
        if let Err(e) = apply(&manager, &endpoint, step).await {
            tracing::warn!("Step {} ({}) failed: {}", n + 1, step.name(), e);
            println!("  error: {e}");
        }
        println!("  feed: {}", render_order(&manager.stubs().await));
    }

    // The loop may already be gone when the heartbeat is disabled
    let _ = shutdown_tx.send(());
    heartbeat.await.context("Heartbeat task failed")?;
    Ok(())
}

async fn apply<R: RenderAdapter>(
    manager: &FeedManager<MockEndpoint, R>,
    endpoint: &MockEndpoint,
    step: &Step,
) -> Result<(), ClientError> {
    match step {
        Step::Publish { id, title } => {
            endpoint.publish(id.clone(), title);
        }
        Step::DeletePost { id } => {
            endpoint.delete_post(id);
        }
        Step::FailFetch { error } => {
            endpoint.fail_next_fetch(error);
        }
        Step::Wait { ms } => {
            tokio::time::sleep(Duration::from_millis(*ms)).await;
        }
        Step::Heartbeat => {
            let counts = manager.poll_heartbeat().await?;
            println!(
                "  pending: {} inserts, {} removes",
                counts.inserts, counts.removes
            );
        }
        Step::Accept => print_report(manager.accept_pending().await?),
        Step::Flush => print_report(manager.flush().await?),
        Step::Insert { id, position } => {
            let queued = manager.insert(id.clone(), *position).await;
            println!("  queued: {queued}");
        }
        Step::Remove { id } => {
            let queued = manager.remove(id.clone()).await;
            println!("  queued: {queued}");
        }
        Step::InsertSingle { id, position } => {
            print_report(manager.insert_single(id.clone(), *position).await?)
        }
        Step::RemoveSingle { id } => print_report(manager.remove_single(id.clone()).await?),
        Step::Search { query } => {
            let outcome = manager.search_input(query).await?;
            println!("  search: {outcome:?}");
        }
        Step::Select { index } => {
            if let Some(index) = index {
                manager.search_hover(*index).await;
            }
            print_report(manager.select_search_result().await?)
        }
        Step::Pin { id } => match manager.toggle_pin(id).await {
            Some(true) => println!("  pinned {id}"),
            Some(false) => println!("  unpinned {id}"),
            None => println!("  unknown post {id}"),
        },
        Step::Drag { id, to } => match manager.begin_drag(id).await {
            Some(session) => {
                manager.drag_to(&session, *to).await;
                manager.end_drag(session).await;
            }
            None => println!("  {id} cannot be dragged"),
        },
        Step::Submit { confirm } => match manager.request_submit().await {
            SubmitDecision::Proceed => println!("  submit: proceed"),
            SubmitDecision::NeedsConfirmation(prompt) => {
                println!("  prompt: {prompt}");
                let proceed = manager.confirm_submit(*confirm).await;
                println!(
                    "  submit: {}",
                    if proceed { "proceed" } else { "cancelled" }
                );
            }
        },
    }
    Ok(())
}

fn print_report(report: Option<ApplyReport>) {
    let Some(report) = report else {
        println!("  nothing to apply");
        return;
    };
    println!(
        "  applied: inserted [{}] removed [{}]",
        join_ids(&report.inserted),
        join_ids(&report.removed)
    );
    if !report.dropped.is_empty() {
        println!("  dropped: [{}]", join_ids(&report.dropped));
    }
}

fn join_ids(ids: &[PostId]) -> String {
    ids.iter()
        .map(PostId::as_str)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Render order with pinned posts marked `*`.
fn render_order(stubs: &[Stub]) -> String {
    if stubs.is_empty() {
        return "(empty)".to_string();
    }
    stubs
        .iter()
        .map(|stub| {
            if stub.pinned {
                format!("{}*", stub.id)
            } else {
                stub.id.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedq_client::{ManagerConfig, NullRenderer};

    const SCRIPT: &str = r#"{
        "feed": [
            { "id": "1", "title": "One" },
            { "id": "2", "title": "Two", "pinned": true },
            { "id": 3, "title": "Three" }
        ],
        "posts": [{ "id": "9", "title": "Catalog" }],
        "steps": [
            { "step": "publish", "id": "4", "title": "Four" },
            { "step": "heartbeat" },
            { "step": "submit", "confirm": false },
            { "step": "accept" },
            { "step": "drag", "id": "3", "to": 0 },
            { "step": "search", "query": "cat" },
            { "step": "select" }
        ]
    }"#;

    fn manager_for(script: &Script) -> (FeedManager<MockEndpoint, NullRenderer>, MockEndpoint) {
        let endpoint = MockEndpoint::new();
        for post in script.posts.iter().chain(&script.feed) {
            endpoint.add_post(post.id.clone(), &post.title);
        }
        let (stubs, server_feed) = script.initial_feed();
        endpoint.set_feed(server_feed);
        let config = ManagerConfig::default().with_heartbeat_interval(Duration::ZERO);
        let manager = FeedManager::new(config, endpoint.clone(), NullRenderer, stubs).unwrap();
        (manager, endpoint)
    }

    // ===========================================
    // Script Parsing Tests
    // ===========================================

    #[test]
    fn script_parses_steps_and_numeric_ids() {
        let script: Script = serde_json::from_str(SCRIPT).unwrap();

        assert_eq!(script.feed.len(), 3);
        assert_eq!(script.feed[2].id, PostId::from("3"));
        assert!(script.feed[1].pinned);
        assert_eq!(script.steps.len(), 7);
        assert_eq!(
            script.steps[4],
            Step::Drag {
                id: PostId::from("3"),
                to: 0
            }
        );
        assert_eq!(script.steps[6], Step::Select { index: None });
    }

    #[test]
    fn unknown_step_is_rejected() {
        let result: Result<Script, _> = serde_json::from_str(r#"{ "steps": [{ "step": "explode" }] }"#);
        assert!(result.is_err());
    }

    #[test]
    fn fail_fetch_has_default_message() {
        let step: Step = serde_json::from_str(r#"{ "step": "fail_fetch" }"#).unwrap();
        assert_eq!(
            step,
            Step::FailFetch {
                error: "injected failure".into()
            }
        );
    }

    #[test]
    fn initial_feed_splits_pinned_ids() {
        let script: Script = serde_json::from_str(SCRIPT).unwrap();
        let (stubs, snapshot) = script.initial_feed();

        assert_eq!(stubs.len(), 3);
        assert_eq!(snapshot.ids, vec![PostId::from("1"), PostId::from("3")]);
        assert_eq!(snapshot.pinned_ids, vec![PostId::from("2")]);
    }

    #[test]
    fn render_order_marks_pins() {
        let script: Script = serde_json::from_str(SCRIPT).unwrap();
        let (stubs, _) = script.initial_feed();

        assert_eq!(render_order(&stubs), "1 2* 3");
        assert_eq!(render_order(&[]), "(empty)");
    }

    // ===========================================
    // Replay Tests
    // ===========================================

    #[tokio::test(start_paused = true)]
    async fn steps_drive_the_manager() {
        let script: Script = serde_json::from_str(SCRIPT).unwrap();
        let (manager, endpoint) = manager_for(&script);

        for step in &script.steps {
            apply(&manager, &endpoint, step).await.unwrap();
        }

        let order: Vec<String> = manager
            .order()
            .await
            .iter()
            .map(|id| id.to_string())
            .collect();
        // Pinned 2 holds index 1 through the accept, the drag and the select
        assert_eq!(order, ["9", "2", "3", "4", "1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_fetch_step_surfaces_error() {
        let (manager, endpoint) = manager_for(&Script::default());
        endpoint.add_post("5", "Five");

        for _ in 0..3 {
            let step = Step::FailFetch {
                error: "boom".into(),
            };
            apply(&manager, &endpoint, &step).await.unwrap();
        }
        let insert = Step::InsertSingle {
            id: "5".into(),
            position: 0,
        };

        assert!(apply(&manager, &endpoint, &insert).await.is_err());
        assert!(manager.order().await.is_empty());
        assert_eq!(endpoint.fetch_requests().len(), 3);
    }
}
