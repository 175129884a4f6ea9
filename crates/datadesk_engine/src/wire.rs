//! JSON shapes the API answers with, and their conversion into core types.

use datadesk_core::upload::ChunkReport;
use datadesk_core::{
    CursorPageInfo, JobError, JobSnapshot, OffsetPageInfo, PageCursor, PageInfo, PageMode,
    PageResult, Record,
};
use serde::Deserialize;
use serde_json::Value;

use crate::resource::{ListLayout, ProgressEnvelope};
use crate::{ApiError, FailureKind};

/// Union of every pagination block the list endpoints produce.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct RawPagination {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub total: Option<u64>,
    pub has_more: Option<bool>,
    pub has_next_page: Option<bool>,
    pub total_pages: Option<u32>,
    pub pages: Option<u32>,
    pub next_cursor: Option<String>,
}

impl RawPagination {
    /// Interpret the block for the mode that was requested.
    pub fn into_info(self, requested: &PageCursor) -> PageInfo {
        let explicit = self.has_more.or(self.has_next_page);
        match requested.mode {
            PageMode::Cursor => {
                let next_cursor = self.next_cursor.filter(|c| !c.is_empty());
                PageInfo::Cursor(CursorPageInfo {
                    has_more: explicit.unwrap_or(next_cursor.is_some()),
                    next_cursor,
                })
            }
            PageMode::Offset => {
                let page = self.page.unwrap_or(requested.page).max(1);
                let limit = self.limit.unwrap_or(requested.limit) as u64;
                let has_more = explicit
                    .or_else(|| self.total_pages.or(self.pages).map(|last| page < last))
                    .or_else(|| self.total.map(|total| page as u64 * limit < total))
                    .unwrap_or(false);
                PageInfo::Offset(OffsetPageInfo {
                    page,
                    total: self.total,
                    has_more,
                })
            }
        }
    }
}

/// Pull items and pagination out of a list response.
pub(crate) fn decode_page(
    layout: ListLayout,
    body: Value,
    requested: &PageCursor,
) -> Result<PageResult, ApiError> {
    reject_unsuccessful(&body)?;

    let (items, pagination) = match layout {
        ListLayout::Flat => (body.get("data"), body.get("pagination")),
        ListLayout::Nested { items } => {
            let data = body.get("data");
            (
                data.and_then(|d| d.get(items)),
                data.and_then(|d| d.get("pagination")),
            )
        }
        ListLayout::TopLevel => (body.get("data"), Some(&body)),
    };

    let items: Vec<Record> = match items {
        Some(Value::Array(items)) => items.clone(),
        _ => {
            return Err(ApiError::new(
                FailureKind::Decode,
                "list response has no item array",
            ))
        }
    };
    let raw: RawPagination = match pagination {
        Some(block) => serde_json::from_value(block.clone())
            .map_err(|err| ApiError::new(FailureKind::Decode, err.to_string()))?,
        None => RawPagination::default(),
    };

    Ok(PageResult {
        items,
        pagination: raw.into_info(requested),
    })
}

/// `success: false` bodies arrive with a 2xx status and still mean failure.
pub(crate) fn reject_unsuccessful(body: &Value) -> Result<(), ApiError> {
    if body.get("success") == Some(&Value::Bool(false)) {
        let message = body
            .get("message")
            .or_else(|| body.get("error"))
            .and_then(Value::as_str)
            .unwrap_or("Request was rejected by the server");
        return Err(ApiError::new(FailureKind::Rejected, message));
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum WireJobError {
    Detailed {
        #[serde(alias = "file", default)]
        filename: String,
        #[serde(default)]
        error: String,
    },
    Plain(String),
}

impl From<WireJobError> for JobError {
    fn from(wire: WireJobError) -> Self {
        match wire {
            WireJobError::Detailed { filename, error } => JobError { filename, error },
            WireJobError::Plain(error) => JobError {
                filename: String::new(),
                error,
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct WireSnapshot {
    current_file: Option<String>,
    processed: u64,
    total: u64,
    upserted: u64,
    modified: u64,
    errors: Vec<WireJobError>,
    is_complete: bool,
    is_running: bool,
}

// Some progress endpoints only report `isComplete`; a missing `isRunning`
// must not end polling on the first tick.
impl Default for WireSnapshot {
    fn default() -> Self {
        Self {
            current_file: None,
            processed: 0,
            total: 0,
            upserted: 0,
            modified: 0,
            errors: Vec::new(),
            is_complete: false,
            is_running: true,
        }
    }
}

impl From<WireSnapshot> for JobSnapshot {
    fn from(wire: WireSnapshot) -> Self {
        JobSnapshot {
            current_file: wire.current_file.filter(|f| !f.is_empty()),
            processed: wire.processed,
            total: wire.total,
            upserted: wire.upserted,
            modified: wire.modified,
            errors: wire.errors.into_iter().map(JobError::from).collect(),
            is_complete: wire.is_complete,
            is_running: wire.is_running,
        }
    }
}

pub(crate) fn decode_snapshot(
    envelope: ProgressEnvelope,
    body: Value,
) -> Result<JobSnapshot, ApiError> {
    reject_unsuccessful(&body)?;
    let inner = match envelope {
        ProgressEnvelope::Data => body.get("data"),
        ProgressEnvelope::Progress => body.get("progress"),
        ProgressEnvelope::Bare => Some(&body),
    };
    let Some(inner) = inner else {
        return Err(ApiError::new(
            FailureKind::Decode,
            "progress response has no snapshot",
        ));
    };
    let wire: WireSnapshot = serde_json::from_value(inner.clone())
        .map_err(|err| ApiError::new(FailureKind::Decode, err.to_string()))?;
    Ok(wire.into())
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct StartResponse {
    pub success: Option<bool>,
    pub message: Option<String>,
    pub process_id: Option<String>,
}

impl StartResponse {
    pub fn into_process_id(self) -> Result<Option<String>, ApiError> {
        if self.success == Some(false) {
            return Err(ApiError::new(
                FailureKind::Rejected,
                self.message
                    .unwrap_or_else(|| "Failed to start import".to_string()),
            ));
        }
        Ok(self.process_id)
    }
}

/// Per-chunk answer of the SS-URL import endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ChunkResponse {
    #[serde(rename = "totalcount")]
    pub total_count: u64,
    pub success: u64,
    pub errors: u64,
    #[serde(rename = "notfound")]
    pub not_found: u64,
    #[serde(rename = "errormessages")]
    pub error_messages: Option<Value>,
    #[serde(rename = "resultdebug")]
    pub result_debug: Option<Value>,
}

impl ChunkResponse {
    /// Diagnostic lines the server attached to the chunk, flattened to text.
    pub fn diagnostics(&self) -> Vec<String> {
        [&self.error_messages, &self.result_debug]
            .into_iter()
            .flatten()
            .flat_map(|value| match value {
                Value::Null => Vec::new(),
                Value::String(text) if text.is_empty() => Vec::new(),
                Value::String(text) => vec![text.clone()],
                Value::Array(lines) => lines
                    .iter()
                    .map(|line| match line {
                        Value::String(text) => text.clone(),
                        other => other.to_string(),
                    })
                    .collect(),
                other => vec![other.to_string()],
            })
            .collect()
    }
}

impl From<ChunkResponse> for ChunkReport {
    fn from(wire: ChunkResponse) -> Self {
        ChunkReport {
            total: wire.total_count,
            success: wire.success,
            errors: wire.errors,
            not_found: wire.not_found,
        }
    }
}
