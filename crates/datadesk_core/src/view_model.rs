use crate::{JobSnapshot, LogEntry, PageMode, PollPhase, Record};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BrowseView {
    pub mode: PageMode,
    pub page: u32,
    pub cursor: Option<String>,
    pub limit: u32,
    /// Committed (submitted) filters.
    pub filters: Vec<(String, String)>,
    pub items: Vec<Record>,
    pub total: Option<u64>,
    pub loading: bool,
    pub error: Option<String>,
    pub can_next: bool,
    pub can_prev: bool,
    /// Offset-mode page links around the current page.
    pub page_links: Vec<u32>,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PollerView {
    pub phase: PollPhase,
    pub percent: u32,
    pub status_text: String,
    pub snapshot: JobSnapshot,
    pub logs: Vec<LogEntry>,
    pub polling: bool,
    pub can_start: bool,
    pub can_stop: bool,
    pub last_error: Option<String>,
    pub dirty: bool,
}
