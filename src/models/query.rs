//! Search query construction.

use serde::{Deserialize, Serialize};

/// Largest page the search endpoint will return in one request.
pub const PAGE_SIZE: usize = 200;

/// Keys owned by the pagination logic; never taken from free-form filters.
const RESERVED_KEYS: &[&str] = &["limit", "offset", "search_after", "sort", "order"];

/// Field a search can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    Created,
    #[default]
    Updated,
}

impl SortField {
    /// Parse a sort field. Only `created` and `updated` are accepted.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "created" => Some(Self::Created),
            "updated" => Some(Self::Updated),
            _ => None,
        }
    }

    /// Parse a sort field, falling back to `updated` for anything else.
    pub fn parse_or_default(s: Option<&str>) -> Self {
        s.and_then(Self::parse).unwrap_or_default()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// Search filters plus pagination controls.
///
/// Cheap to clone; every page request gets its own copy.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchQuery {
    /// Free-form filters (group, uri, user, tag, any, ...). Keys may repeat.
    pub filters: Vec<(String, String)>,
    /// Requested total, may exceed one page.
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub search_after: Option<String>,
    pub sort: Option<SortField>,
    pub order: Option<SortOrder>,
}

impl SearchQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a filter. Pagination keys are ignored here; use the dedicated setters.
    pub fn filter(mut self, key: &str, value: impl Into<String>) -> Self {
        if !RESERVED_KEYS.contains(&key) {
            self.filters.push((key.to_string(), value.into()));
        }
        self
    }

    pub fn group(self, group: impl Into<String>) -> Self {
        self.filter("group", group)
    }

    pub fn uri(self, uri: impl Into<String>) -> Self {
        self.filter("uri", uri)
    }

    pub fn user(self, user: impl Into<String>) -> Self {
        self.filter("user", user)
    }

    pub fn tag(self, tag: impl Into<String>) -> Self {
        self.filter("tag", tag)
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_search_after(mut self, cursor: impl Into<String>) -> Self {
        self.search_after = Some(cursor.into());
        self
    }

    pub fn sorted_by(mut self, sort: SortField, order: SortOrder) -> Self {
        self.sort = Some(sort);
        self.order = Some(order);
        self
    }

    pub fn with_order(mut self, order: SortOrder) -> Self {
        self.order = Some(order);
        self
    }

    /// First value of a filter key.
    pub fn filter_value(&self, key: &str) -> Option<&str> {
        self.filters
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Copy of this query for a single page request.
    ///
    /// The page limit is clamped to [`PAGE_SIZE`].
    pub fn page(&self, offset: usize, limit: usize) -> Self {
        let mut page = self.clone();
        page.offset = Some(offset);
        page.limit = Some(limit.min(PAGE_SIZE));
        page
    }

    /// Encode as query-string parameters.
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params: Vec<(String, String)> = self
            .filters
            .iter()
            .filter(|(k, _)| !RESERVED_KEYS.contains(&k.as_str()))
            .cloned()
            .collect();

        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.min(PAGE_SIZE).to_string()));
        }
        if let Some(offset) = self.offset {
            params.push(("offset".to_string(), offset.to_string()));
        }
        if let Some(ref cursor) = self.search_after {
            params.push(("search_after".to_string(), cursor.clone()));
        }
        if let Some(sort) = self.sort {
            params.push(("sort".to_string(), sort.as_str().to_string()));
        }
        if let Some(order) = self.order {
            params.push(("order".to_string(), order.as_str().to_string()));
        }
        params
    }
}
