use std::collections::BTreeMap;

/// A dataset row as returned by the API. Concrete shapes are not modelled.
pub type Record = serde_json::Value;

/// Identity of a list request, used to discard superseded responses.
pub type RequestId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageMode {
    #[default]
    Offset,
    Cursor,
}

/// Where the browser is (or wants to be) in a collection.
///
/// Only one of `page`/`cursor` is authoritative: `page` in offset mode,
/// `cursor` in cursor mode. Constructors reset the other field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCursor {
    pub mode: PageMode,
    pub page: u32,
    pub cursor: Option<String>,
    pub limit: u32,
}

impl PageCursor {
    pub fn first(limit: u32) -> Self {
        Self::offset(1, limit)
    }

    pub fn offset(page: u32, limit: u32) -> Self {
        Self {
            mode: PageMode::Offset,
            page: page.max(1),
            cursor: None,
            limit,
        }
    }

    /// Start of a cursor traversal: no cursor yet, the server begins at the front.
    pub fn cursor_start(limit: u32) -> Self {
        Self {
            mode: PageMode::Cursor,
            page: 1,
            cursor: None,
            limit,
        }
    }

    pub fn at_cursor(cursor: impl Into<String>, limit: u32) -> Self {
        Self {
            mode: PageMode::Cursor,
            page: 1,
            cursor: Some(cursor.into()),
            limit,
        }
    }

    /// Query parameters for this position. Offset mode never carries a cursor
    /// and cursor mode never carries a page.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::with_capacity(3);
        match self.mode {
            PageMode::Offset => {
                pairs.push(("page".to_string(), self.page.to_string()));
                pairs.push(("limit".to_string(), self.limit.to_string()));
            }
            PageMode::Cursor => {
                pairs.push(("limit".to_string(), self.limit.to_string()));
                pairs.push(("useCursor".to_string(), "true".to_string()));
                if let Some(cursor) = &self.cursor {
                    pairs.push(("cursor".to_string(), cursor.clone()));
                }
            }
        }
        pairs
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetPageInfo {
    pub page: u32,
    pub total: Option<u64>,
    pub has_more: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorPageInfo {
    pub has_more: bool,
    pub next_cursor: Option<String>,
}

/// Pagination block of a list response, tagged by the mode of the request
/// that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageInfo {
    Offset(OffsetPageInfo),
    Cursor(CursorPageInfo),
}

impl PageInfo {
    pub fn mode(&self) -> PageMode {
        match self {
            PageInfo::Offset(_) => PageMode::Offset,
            PageInfo::Cursor(_) => PageMode::Cursor,
        }
    }

    pub fn has_more(&self) -> bool {
        match self {
            PageInfo::Offset(info) => info.has_more,
            PageInfo::Cursor(info) => info.has_more,
        }
    }

    pub fn total(&self) -> Option<u64> {
        match self {
            PageInfo::Offset(info) => info.total,
            PageInfo::Cursor(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageResult {
    pub items: Vec<Record>,
    pub pagination: PageInfo,
}

/// Named free-text filters. Blank values are treated as absent.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterState {
    fields: BTreeMap<String, String>,
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(field, value);
        self
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.fields.clear();
    }

    /// Filters with a non-blank value, trimmed, in field-name order.
    pub fn active(&self) -> Vec<(String, String)> {
        self.fields
            .iter()
            .map(|(field, value)| (field, value.trim()))
            .filter(|(_, value)| !value.is_empty())
            .map(|(field, value)| (field.clone(), value.to_string()))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.active().is_empty()
    }
}

/// A list request the engine should execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub request_id: RequestId,
    pub filters: FilterState,
    pub position: PageCursor,
}

impl PageRequest {
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = self.filters.active();
        pairs.extend(self.position.query_pairs());
        pairs
    }
}
