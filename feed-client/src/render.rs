//! Render adapter hooks.
//!
//! The manager reports every visible change through a [`RenderAdapter`].
//! All hooks have empty defaults so a host only implements what it draws.

use feedq_core::{NoticeAction, QueueCounts, SearchResults, Stub};

/// Receives view updates from a [`FeedManager`](crate::FeedManager).
///
/// Hooks are called synchronously while the manager holds its state lock;
/// they must not call back into the manager.
pub trait RenderAdapter: Send + Sync {
    /// The rendered feed changed; `stubs` is the full render order.
    fn feed_changed(&self, _stubs: &[Stub]) {}

    /// The pending queue changed.
    fn queue_changed(&self, _counts: QueueCounts) {}

    /// A notice action should be shown (`Show`, `Hide`, `BlockSubmit`, ...).
    fn notice(&self, _action: &NoticeAction) {}

    /// Search results changed. `None` hides the result list.
    fn search_results(&self, _results: Option<&SearchResults>) {}
}

/// Adapter that draws nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullRenderer;

impl RenderAdapter for NullRenderer {}
