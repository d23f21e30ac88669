//! Mock endpoint for testing.
//!
//! Simulates a feed server: known posts, the authoritative feed order, and
//! canned failures. Every fetch and search request is recorded.

use super::{EndpointError, FeedEndpoint};
use async_trait::async_trait;
use feedq_types::{
    FetchEntry, FetchRequest, FetchResponse, Fragment, HeartbeatTick, PostId, SearchHit,
    SearchRequest, SearchResponse, Snapshot,
};
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Canned response for the next fetch.
#[derive(Debug, Clone)]
enum FetchFault {
    Fail(String),
    Malformed,
    ErrorStatus,
    Body(String),
}

/// Mock endpoint for testing.
///
/// Clones share state, so a test can keep a handle after moving one into
/// a manager.
#[derive(Debug, Default)]
pub struct MockEndpoint {
    inner: Arc<Mutex<MockEndpointInner>>,
}

#[derive(Debug, Default)]
struct MockEndpointInner {
    posts: BTreeMap<PostId, String>,
    feed: Snapshot,
    fetch_requests: Vec<FetchRequest>,
    search_queries: Vec<String>,
    fetch_faults: VecDeque<FetchFault>,
    fail_next_search: Option<String>,
    search_delay: Option<Duration>,
    fail_next_heartbeat: Option<String>,
}

impl MockEndpoint {
    /// Create an empty mock server.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rendered fragment the mock serves for a post.
    pub fn fragment_for(id: &PostId, title: &str) -> Fragment {
        Fragment::new(format!("<li data-id=\"{id}\">{title}</li>"))
    }

    /// Register a post without publishing it to the feed.
    pub fn add_post(&self, id: impl Into<PostId>, title: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.posts.insert(id.into(), title.to_string());
    }

    /// Register a post and put it at the top of the feed.
    pub fn publish(&self, id: impl Into<PostId>, title: &str) {
        let id = id.into();
        let mut inner = self.inner.lock().unwrap();
        inner.posts.insert(id.clone(), title.to_string());
        inner.feed.ids.retain(|existing| *existing != id);
        inner.feed.ids.insert(0, id);
    }

    /// Delete a post server-side, dropping it from the feed.
    pub fn delete_post(&self, id: &PostId) {
        let mut inner = self.inner.lock().unwrap();
        inner.posts.remove(id);
        inner.feed.ids.retain(|existing| existing != id);
        inner.feed.pinned_ids.retain(|existing| existing != id);
    }

    /// Replace the authoritative feed.
    pub fn set_feed(&self, feed: Snapshot) {
        let mut inner = self.inner.lock().unwrap();
        inner.feed = feed;
    }

    /// The authoritative feed.
    pub fn feed(&self) -> Snapshot {
        let inner = self.inner.lock().unwrap();
        inner.feed.clone()
    }

    /// All fetch requests received.
    pub fn fetch_requests(&self) -> Vec<FetchRequest> {
        let inner = self.inner.lock().unwrap();
        inner.fetch_requests.clone()
    }

    /// All search queries received.
    pub fn search_queries(&self) -> Vec<String> {
        let inner = self.inner.lock().unwrap();
        inner.search_queries.clone()
    }

    /// Cause the next fetch to fail with the given error.
    ///
    /// Calls stack: each queued failure is consumed by one fetch.
    pub fn fail_next_fetch(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fetch_faults.push_back(FetchFault::Fail(error.to_string()));
    }

    /// Cause the next fetch to return a body that is not JSON.
    pub fn malformed_next_fetch(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.fetch_faults.push_back(FetchFault::Malformed);
    }

    /// Cause the next fetch to return a `status: "error"` envelope.
    pub fn error_status_next_fetch(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.fetch_faults.push_back(FetchFault::ErrorStatus);
    }

    /// Answer the next fetch with a verbatim response body.
    pub fn respond_next_fetch(&self, body: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fetch_faults.push_back(FetchFault::Body(body.to_string()));
    }

    /// Cause the next search to fail with the given error.
    pub fn fail_next_search(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next_search = Some(error.to_string());
    }

    /// Hold the next search response back for `delay`.
    pub fn delay_next_search(&self, delay: Duration) {
        let mut inner = self.inner.lock().unwrap();
        inner.search_delay = Some(delay);
    }

    /// Cause the next heartbeat to fail with the given error.
    pub fn fail_next_heartbeat(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next_heartbeat = Some(error.to_string());
    }
}

impl Clone for MockEndpoint {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl FeedEndpoint for MockEndpoint {
    async fn fetch(&self, request: &FetchRequest) -> Result<String, EndpointError> {
        let mut inner = self.inner.lock().unwrap();
        inner.fetch_requests.push(request.clone());

        let response = match inner.fetch_faults.pop_front() {
            Some(FetchFault::Fail(error)) => return Err(EndpointError::RequestFailed(error)),
            Some(FetchFault::Malformed) => return Ok("<html>Fatal error</html>".to_string()),
            Some(FetchFault::ErrorStatus) => FetchResponse::error(),
            Some(FetchFault::Body(body)) => return Ok(body),
            None => {
                let data = request
                    .queue
                    .iter()
                    .map(|(id, position)| {
                        let entry = inner.posts.get(id).map(|title| {
                            FetchEntry::rendered(*position, Self::fragment_for(id, title))
                        });
                        (id.clone(), entry)
                    })
                    .collect();
                FetchResponse::ok(data)
            }
        };

        response
            .to_json()
            .map_err(|e| EndpointError::RequestFailed(e.to_string()))
    }

    async fn search(&self, request: &SearchRequest) -> Result<String, EndpointError> {
        let delay = self.inner.lock().unwrap().search_delay.take();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut inner = self.inner.lock().unwrap();
        inner.search_queries.push(request.query.clone());

        if let Some(error) = inner.fail_next_search.take() {
            return Err(EndpointError::RequestFailed(error));
        }

        let needle = request.query.to_lowercase();
        let hits = inner
            .posts
            .iter()
            .filter(|(_, title)| title.to_lowercase().contains(&needle))
            .map(|(id, title)| SearchHit::new(id.clone(), title))
            .collect();

        SearchResponse::ok(hits)
            .to_json()
            .map_err(|e| EndpointError::RequestFailed(e.to_string()))
    }

    async fn heartbeat(&self) -> Result<HeartbeatTick, EndpointError> {
        let mut inner = self.inner.lock().unwrap();

        if let Some(error) = inner.fail_next_heartbeat.take() {
            return Err(EndpointError::RequestFailed(error));
        }

        Ok(inner.feed.to_tick())
    }
}
