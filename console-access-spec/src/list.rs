use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Sort key assigned to missing or unparsable creation timestamps.
pub const UNKNOWN_TIMESTAMP: i64 = -1;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListMetadata {
    #[serde(
        rename = "continue",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub continue_token: Option<String>,
}

/// One page of resources, newest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceList<T> {
    pub items: Vec<T>,
    #[serde(default)]
    pub metadata: ListMetadata,
}

impl<T> Default for ResourceList<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> ResourceList<T> {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            metadata: ListMetadata::default(),
        }
    }

    pub fn new(items: Vec<T>, continue_token: Option<String>) -> Self {
        Self {
            items,
            metadata: ListMetadata { continue_token },
        }
    }

    pub fn continue_token(&self) -> Option<&str> {
        self.metadata
            .continue_token
            .as_deref()
            .filter(|token| !token.is_empty())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Translate every item, keeping the page metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> ResourceList<U> {
        ResourceList {
            items: self.items.into_iter().map(f).collect(),
            metadata: self.metadata,
        }
    }
}

impl<T: Created> ResourceList<T> {
    /// Stable sort by descending creation time; unknown timestamps last.
    pub fn sort_newest_first(&mut self) {
        sort_newest_first(&mut self.items);
    }
}

/// Anything carrying a creation timestamp.
pub trait Created {
    fn created_millis(&self) -> i64;
}

impl Created for Value {
    fn created_millis(&self) -> i64 {
        timestamp_millis(
            self.pointer("/metadata/creationTimestamp")
                .and_then(Value::as_str),
        )
    }
}

pub fn sort_newest_first<T: Created>(items: &mut [T]) {
    items.sort_by_key(|item| std::cmp::Reverse(item.created_millis()));
}

/// Epoch milliseconds of an RFC 3339 timestamp, or [`UNKNOWN_TIMESTAMP`].
pub fn timestamp_millis(timestamp: Option<&str>) -> i64 {
    timestamp
        .and_then(|value| OffsetDateTime::parse(value, &Rfc3339).ok())
        .map(|parsed| (parsed.unix_timestamp_nanos() / 1_000_000) as i64)
        .filter(|millis| *millis >= 0)
        .unwrap_or(UNKNOWN_TIMESTAMP)
}
