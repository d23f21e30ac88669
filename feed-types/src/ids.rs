//! Identity and payload types for feedq.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A stable identifier for a post in the feed.
///
/// Ids arrive from several sources (heartbeat lists, fetch maps, search
/// results) and are compared as trimmed strings. Integer ids in JSON are
/// accepted and normalized to their decimal form.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PostId(String);

impl PostId {
    /// Create a PostId from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Parse an id from raw text, trimming whitespace.
    ///
    /// Returns `None` for empty input.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// Get the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PostId({})", self.0)
    }
}

impl From<&str> for PostId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for PostId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<u64> for PostId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl Serialize for PostId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for PostId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PostIdVisitor;

        impl Visitor<'_> for PostIdVisitor {
            type Value = PostId;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a post id as a string or integer")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<PostId, E> {
                PostId::parse(v).ok_or_else(|| E::custom("empty post id"))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<PostId, E> {
                Ok(PostId::from(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<PostId, E> {
                Ok(PostId(v.to_string()))
            }
        }

        deserializer.deserialize_any(PostIdVisitor)
    }
}

/// An opaque, server-rendered fragment for one stub.
///
/// The core never parses or mutates a fragment; it only positions it and
/// hands it to the render adapter verbatim.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fragment(String);

impl Fragment {
    /// Wrap rendered markup.
    pub fn new(markup: impl Into<String>) -> Self {
        Self(markup.into())
    }

    /// Borrow the markup.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Take the markup out of the fragment.
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Size of the markup in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the fragment is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fragment([{} bytes])", self.0.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_trims_whitespace() {
        assert_eq!(PostId::parse(" 42 "), Some(PostId::from("42")));
        assert_eq!(PostId::parse("   "), None);
        assert_eq!(PostId::parse(""), None);
    }

    #[test]
    fn deserializes_from_string_or_integer() {
        let from_str: PostId = serde_json::from_str("\"17\"").unwrap();
        let from_int: PostId = serde_json::from_str("17").unwrap();
        assert_eq!(from_str, from_int);
    }

    #[test]
    fn empty_string_id_is_rejected() {
        let result: Result<PostId, _> = serde_json::from_str("\"\"");
        assert!(result.is_err());
    }

    #[test]
    fn serializes_as_plain_string() {
        let json = serde_json::to_string(&PostId::from(9u64)).unwrap();
        assert_eq!(json, "\"9\"");
    }

    #[test]
    fn fragment_debug_hides_markup() {
        let fragment = Fragment::new("<li class=\"stub\">secret draft</li>");
        let debug = format!("{:?}", fragment);
        assert!(!debug.contains("secret"));
        assert!(debug.contains("bytes"));
    }
}
