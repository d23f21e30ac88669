//! Request and response envelopes for the batch-fetch and search endpoints.
//!
//! Responses come from a loosely typed server, so decoding is lenient where
//! the server is known to vary: positions may be numbers, numeric strings or
//! absent, a missing fragment or a whole missing entry may be `false` or
//! `null`, and an empty map may be encoded as `[]`.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::{FeedError, Fragment, PostId};

/// Action name sent with batch-fetch requests.
pub const FETCH_ACTION: &str = "fm_feed_request";

/// Action name sent with search requests.
pub const SEARCH_ACTION: &str = "fm_feed_search";

/// Response status reported by the endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// The request was handled.
    #[default]
    Ok,
    /// The request failed server-side.
    Error,
}

/// Request rendered fragments for a set of ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchRequest {
    /// Endpoint action name.
    pub action: String,
    /// Ids to render, mapped to their target positions.
    pub queue: BTreeMap<PostId, usize>,
}

impl FetchRequest {
    /// Build a fetch request for the given id → position map.
    pub fn new(queue: BTreeMap<PostId, usize>) -> Self {
        Self {
            action: FETCH_ACTION.to_string(),
            queue,
        }
    }

    /// Serialize to a JSON body.
    pub fn to_json(&self) -> Result<String, FeedError> {
        serde_json::to_string(self).map_err(FeedError::Serialization)
    }
}

/// One rendered entry in a batch-fetch response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchEntry {
    /// Target position echoed back by the server, if it sent a usable one.
    #[serde(
        default,
        deserialize_with = "lenient_position",
        skip_serializing_if = "Option::is_none"
    )]
    pub position: Option<usize>,
    /// Rendered fragment, or `None` when the post no longer exists.
    #[serde(default, deserialize_with = "lenient_fragment")]
    pub object: Option<Fragment>,
}

impl FetchEntry {
    /// An entry carrying a rendered fragment.
    pub fn rendered(position: usize, object: Fragment) -> Self {
        Self {
            position: Some(position),
            object: Some(object),
        }
    }

    /// An entry for a post that could not be rendered.
    pub fn missing(position: usize) -> Self {
        Self {
            position: Some(position),
            object: None,
        }
    }
}

/// Batch-fetch response envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FetchResponse {
    /// Response status.
    pub status: Status,
    /// Entries keyed by id. `None` means the server returned nothing for it.
    pub data: BTreeMap<PostId, Option<FetchEntry>>,
}

impl FetchResponse {
    /// A successful response.
    pub fn ok(data: BTreeMap<PostId, Option<FetchEntry>>) -> Self {
        Self {
            status: Status::Ok,
            data,
        }
    }

    /// An error response.
    pub fn error() -> Self {
        Self {
            status: Status::Error,
            data: BTreeMap::new(),
        }
    }

    /// Serialize to a JSON body.
    pub fn to_json(&self) -> Result<String, FeedError> {
        serde_json::to_string(self).map_err(FeedError::Serialization)
    }

    /// Decode a response body.
    ///
    /// Returns [`FeedError::ErrorStatus`] for `status: "error"` envelopes.
    pub fn from_json(body: &str) -> Result<Self, FeedError> {
        let raw: RawEnvelope = serde_json::from_str(body).map_err(FeedError::Deserialization)?;
        if raw.status == Status::Error {
            return Err(FeedError::ErrorStatus);
        }
        let raw_entries: BTreeMap<PostId, Value> = match raw.data {
            Value::Null => BTreeMap::new(),
            Value::Array(items) if items.is_empty() => BTreeMap::new(),
            other => serde_json::from_value(other).map_err(FeedError::Deserialization)?,
        };
        // One unrenderable post must not sink the rest of the batch
        let data = raw_entries
            .into_iter()
            .map(|(id, value)| (id, decode_entry(value)))
            .collect();
        Ok(Self::ok(data))
    }

    /// Flatten into the entries the server answered with, dropping empty ones.
    pub fn into_entries(self) -> BTreeMap<PostId, FetchEntry> {
        self.data
            .into_iter()
            .filter_map(|(id, entry)| entry.map(|e| (id, e)))
            .collect()
    }
}

/// Free-text search request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Endpoint action name.
    pub action: String,
    /// The query as typed.
    pub query: String,
}

impl SearchRequest {
    /// Build a search request.
    pub fn new(query: &str) -> Self {
        Self {
            action: SEARCH_ACTION.to_string(),
            query: query.to_string(),
        }
    }
}

/// One search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Post id.
    pub id: PostId,
    /// Post title for display.
    #[serde(default)]
    pub title: String,
}

impl SearchHit {
    /// Create a search hit.
    pub fn new(id: impl Into<PostId>, title: &str) -> Self {
        Self {
            id: id.into(),
            title: title.to_string(),
        }
    }
}

/// Search response envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchResponse {
    /// Response status.
    pub status: Status,
    /// Ordered hits, best first.
    pub data: Vec<SearchHit>,
}

impl SearchResponse {
    /// A successful response.
    pub fn ok(data: Vec<SearchHit>) -> Self {
        Self {
            status: Status::Ok,
            data,
        }
    }

    /// Serialize to a JSON body.
    pub fn to_json(&self) -> Result<String, FeedError> {
        serde_json::to_string(self).map_err(FeedError::Serialization)
    }

    /// Decode a response body.
    pub fn from_json(body: &str) -> Result<Self, FeedError> {
        let raw: RawEnvelope = serde_json::from_str(body).map_err(FeedError::Deserialization)?;
        if raw.status == Status::Error {
            return Err(FeedError::ErrorStatus);
        }
        let data = match raw.data {
            Value::Null => Vec::new(),
            other => serde_json::from_value(other).map_err(FeedError::Deserialization)?,
        };
        Ok(Self::ok(data))
    }
}

/// Envelope decoded before the data shape is known.
#[derive(Deserialize)]
struct RawEnvelope {
    #[serde(default)]
    status: Status,
    #[serde(default)]
    data: Value,
}

/// Decode one fetch entry. Anything other than an object (`null`, `false`,
/// an error string) means the server has nothing to render for that id.
fn decode_entry(value: Value) -> Option<FetchEntry> {
    match value {
        Value::Object(_) => serde_json::from_value(value).ok(),
        _ => None,
    }
}

fn lenient_position<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<usize>, D::Error> {
    let position = match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_u64().and_then(|v| usize::try_from(v).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    Ok(position)
}

fn lenient_fragment<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Fragment>, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(markup) => Ok(Some(Fragment::new(markup))),
        _ => Ok(None),
    }
}
