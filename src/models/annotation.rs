//! Annotation records and search pages.

use std::cmp::Ordering;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use super::SortField;

/// An annotation as stored by the server.
///
/// Only the fields the bulk engine relies on are typed; everything else is
/// carried through untouched in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// Server-assigned id (absent before creation).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    /// Creator, e.g. `acct:alice@hypothes.is`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Annotation {
    /// Create an empty annotation payload for a group.
    pub fn new(group: impl Into<String>) -> Self {
        Self {
            group: Some(group.into()),
            ..Default::default()
        }
    }

    /// Set an untyped field (text, uri, tags, target, permissions, ...).
    pub fn with_field(mut self, key: &str, value: serde_json::Value) -> Self {
        self.extra.insert(key.to_string(), value);
        self
    }

    /// Get an untyped field.
    pub fn field(&self, key: &str) -> Option<&serde_json::Value> {
        self.extra.get(key)
    }

    /// Value of the given sort field.
    pub fn sort_value(&self, field: SortField) -> Option<&str> {
        match field {
            SortField::Created => self.created.as_deref(),
            SortField::Updated => self.updated.as_deref(),
        }
    }

    /// Copy of this annotation without server-assigned fields, suitable for
    /// submitting as a new annotation.
    pub fn as_new(&self) -> Self {
        let mut copy = self.clone();
        copy.id = None;
        copy.user = None;
        copy.created = None;
        copy.updated = None;
        for key in ["links", "flagged", "hidden", "moderation", "user_info"] {
            copy.extra.remove(key);
        }
        copy
    }
}

/// Compare two sort-field values.
///
/// RFC 3339 timestamps are compared as instants; anything else falls back to
/// plain string comparison. Missing values sort first.
pub fn compare_sort_values(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => match (parse_timestamp(a), parse_timestamp(b)) {
            (Some(ta), Some(tb)) => ta.cmp(&tb),
            _ => a.cmp(b),
        },
    }
}

fn parse_timestamp(s: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(s).ok()
}

/// One page of search results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchPage {
    /// Server count of all matching records, not just this page.
    pub total: usize,
    #[serde(default)]
    pub rows: Vec<Annotation>,
}

/// Response of a delete call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub id: String,
    pub deleted: bool,
}
