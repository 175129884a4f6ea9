use std::time::Duration;

use crate::view_model::{BrowseView, PollerView};
use crate::{
    FilterState, JobSnapshot, LogBook, LogEntry, PageCursor, PageInfo, PageMode, PageRequest,
    PageResult, Record, RequestId,
};

pub const DEFAULT_PAGE_LIMIT: u32 = 500;
/// Offset pages beyond this are reached through cursor traversal instead.
pub const DEFAULT_DEEP_PAGE_THRESHOLD: u32 = 1000;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);
pub const DEFAULT_STOP_GRACE: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserConfig {
    pub limit: u32,
    pub deep_page_threshold: u32,
    /// Whether the collection endpoint understands `useCursor`.
    pub cursor_supported: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_LIMIT,
            deep_page_threshold: DEFAULT_DEEP_PAGE_THRESHOLD,
            cursor_supported: true,
        }
    }
}

/// Data browser state.
///
/// `requested` is the navigation target and changes as soon as the user acts;
/// `current`, `info` and `items` describe the last page that actually loaded
/// and only change on success.
#[derive(Debug, Clone, PartialEq)]
pub struct BrowserState {
    config: BrowserConfig,
    draft: FilterState,
    query: FilterState,
    requested: PageCursor,
    current: Option<PageCursor>,
    info: Option<PageInfo>,
    items: Vec<Record>,
    in_flight: Option<RequestId>,
    last_request_id: RequestId,
    error: Option<String>,
    dirty: bool,
}

impl Default for BrowserState {
    fn default() -> Self {
        Self::new(BrowserConfig::default())
    }
}

impl BrowserState {
    pub fn new(config: BrowserConfig) -> Self {
        let requested = PageCursor::first(config.limit);
        Self {
            config,
            draft: FilterState::new(),
            query: FilterState::new(),
            requested,
            current: None,
            info: None,
            items: Vec::new(),
            in_flight: None,
            last_request_id: 0,
            error: None,
            dirty: false,
        }
    }

    pub fn view(&self) -> BrowseView {
        let loading = self.in_flight.is_some();
        let can_next = !loading && self.next_target().is_some();
        let can_prev = !loading && self.prev_target().is_some();
        let page_links = match (&self.current, &self.info) {
            (Some(current), Some(info)) if current.mode == PageMode::Offset => {
                visible_page_links(current.page, info.has_more())
            }
            _ => Vec::new(),
        };
        BrowseView {
            mode: self.requested.mode,
            page: self.requested.page,
            cursor: self.requested.cursor.clone(),
            limit: self.requested.limit,
            filters: self.query.active(),
            items: self.items.clone(),
            total: self.info.as_ref().and_then(PageInfo::total),
            loading,
            error: self.error.clone(),
            can_next,
            can_prev,
            page_links,
            dirty: self.dirty,
        }
    }

    pub fn config(&self) -> &BrowserConfig {
        &self.config
    }

    pub fn requested(&self) -> &PageCursor {
        &self.requested
    }

    pub fn current(&self) -> Option<&PageCursor> {
        self.current.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn edit_filter(&mut self, field: String, value: String) {
        self.draft.set(field, value);
        self.dirty = true;
    }

    pub(crate) fn commit_filters(&mut self) {
        self.query = self.draft.clone();
        self.requested = PageCursor::first(self.config.limit);
    }

    /// Target of "next", if the last loaded page allows one.
    pub(crate) fn next_target(&self) -> Option<PageCursor> {
        let current = self.current.as_ref()?;
        match self.info.as_ref()? {
            PageInfo::Offset(info) if info.has_more => current
                .page
                .checked_add(1)
                .map(|page| PageCursor::offset(page, self.config.limit)),
            PageInfo::Cursor(info) => info
                .next_cursor
                .as_ref()
                .map(|cursor| PageCursor::at_cursor(cursor.clone(), self.config.limit)),
            PageInfo::Offset(_) => None,
        }
    }

    /// Target of "previous". Cursor traversal keeps no history, so it falls
    /// back to the first offset page.
    pub(crate) fn prev_target(&self) -> Option<PageCursor> {
        let current = self.current.as_ref()?;
        match current.mode {
            PageMode::Offset if current.page > 1 => {
                Some(PageCursor::offset(current.page - 1, self.config.limit))
            }
            PageMode::Offset => None,
            PageMode::Cursor => Some(PageCursor::first(self.config.limit)),
        }
    }

    pub(crate) fn jump_target(&self, page: u32) -> Option<PageCursor> {
        if page == 0 {
            return None;
        }
        if page > self.config.deep_page_threshold && self.config.cursor_supported {
            Some(PageCursor::cursor_start(self.config.limit))
        } else {
            Some(PageCursor::offset(page, self.config.limit))
        }
    }

    /// Sets the navigation target and allocates a request for it. Any
    /// outstanding request is superseded.
    pub(crate) fn begin_request(&mut self, target: PageCursor) -> PageRequest {
        self.requested = target;
        self.last_request_id += 1;
        self.in_flight = Some(self.last_request_id);
        self.error = None;
        self.dirty = true;
        PageRequest {
            request_id: self.last_request_id,
            filters: self.query.clone(),
            position: self.requested.clone(),
        }
    }

    pub(crate) fn is_current_request(&self, request_id: RequestId) -> bool {
        self.in_flight == Some(request_id)
    }

    pub(crate) fn apply_page(&mut self, result: PageResult) {
        self.in_flight = None;
        self.current = Some(self.requested.clone());
        self.info = Some(result.pagination);
        self.items = result.items;
        self.error = None;
        self.dirty = true;
    }

    pub(crate) fn apply_failure(&mut self, message: String) {
        self.in_flight = None;
        self.error = Some(message);
        self.dirty = true;
    }
}

/// Page numbers shown around `current`: up to two behind, and up to two
/// ahead only while the server reports more data.
fn visible_page_links(current: u32, has_more: bool) -> Vec<u32> {
    let start = current.saturating_sub(2).max(1);
    let end = current.saturating_add(2);
    (start..=end)
        .filter(|&page| page <= current || has_more)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollerConfig {
    pub poll_interval: Duration,
    pub stop_grace: Duration,
    /// Whether the job exposes a stop endpoint.
    pub stoppable: bool,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            stop_grace: DEFAULT_STOP_GRACE,
            stoppable: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PollPhase {
    #[default]
    Idle,
    /// Job accepted, no snapshot seen yet.
    Starting,
    Running,
    /// Stop requested; still polling until the grace window ends.
    Stopping,
    Complete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollerState {
    config: PollerConfig,
    phase: PollPhase,
    start_pending: bool,
    polling: bool,
    disposed: bool,
    process_id: Option<String>,
    snapshot: JobSnapshot,
    logs: LogBook,
    last_error: Option<String>,
    dirty: bool,
}

impl Default for PollerState {
    fn default() -> Self {
        Self::new(PollerConfig::default())
    }
}

impl PollerState {
    pub fn new(config: PollerConfig) -> Self {
        Self {
            config,
            phase: PollPhase::Idle,
            start_pending: false,
            polling: false,
            disposed: false,
            process_id: None,
            snapshot: JobSnapshot::default(),
            logs: LogBook::new(),
            last_error: None,
            dirty: false,
        }
    }

    pub fn view(&self) -> PollerView {
        let busy = self.start_pending
            || matches!(
                self.phase,
                PollPhase::Starting | PollPhase::Running | PollPhase::Stopping
            );
        PollerView {
            phase: self.phase,
            percent: self.snapshot.percent(),
            status_text: self.snapshot.status_text(),
            snapshot: self.snapshot.clone(),
            logs: self.logs.entries().to_vec(),
            polling: self.polling,
            can_start: !busy && !self.disposed,
            can_stop: self.config.stoppable
                && matches!(self.phase, PollPhase::Starting | PollPhase::Running),
            last_error: self.last_error.clone(),
            dirty: self.dirty,
        }
    }

    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    pub fn phase(&self) -> PollPhase {
        self.phase
    }

    pub fn is_polling(&self) -> bool {
        self.polling
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// True once nothing further will happen without a new `StartClicked`.
    pub fn is_settled(&self) -> bool {
        !self.start_pending && !self.polling
    }

    pub fn snapshot(&self) -> &JobSnapshot {
        &self.snapshot
    }

    pub fn logs(&self) -> &LogBook {
        &self.logs
    }

    pub fn process_id(&self) -> Option<&str> {
        self.process_id.as_deref()
    }

    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn can_start(&self) -> bool {
        !self.disposed
            && !self.start_pending
            && matches!(self.phase, PollPhase::Idle | PollPhase::Complete)
    }

    pub(crate) fn reset_for_start(&mut self) {
        self.phase = PollPhase::Idle;
        self.start_pending = true;
        self.process_id = None;
        self.snapshot = JobSnapshot::default();
        self.logs.clear();
        self.last_error = None;
        self.dirty = true;
    }

    pub(crate) fn take_start_pending(&mut self) -> bool {
        std::mem::take(&mut self.start_pending)
    }

    pub(crate) fn begin_polling(&mut self, process_id: Option<String>) {
        self.process_id = process_id;
        self.phase = PollPhase::Starting;
        self.polling = true;
        self.log(LogEntry::success("Starting import process..."));
    }

    pub(crate) fn set_phase(&mut self, phase: PollPhase) {
        self.phase = phase;
        self.dirty = true;
    }

    pub(crate) fn halt(&mut self, phase: PollPhase) {
        self.polling = false;
        self.set_phase(phase);
    }

    pub(crate) fn fail(&mut self, message: String, log_line: String) {
        self.polling = false;
        self.phase = PollPhase::Idle;
        self.last_error = Some(message);
        self.log(LogEntry::error(log_line));
    }

    pub(crate) fn dispose(&mut self) {
        self.disposed = true;
        self.polling = false;
        self.start_pending = false;
    }

    pub(crate) fn apply_snapshot(&mut self, snapshot: JobSnapshot) {
        if let Some(file) = snapshot.current_file.as_deref() {
            if snapshot.processed > 0 {
                let line = format!("Processing {file}: {} records", snapshot.processed);
                self.logs.push_unless_repeated(LogEntry::success(line));
            }
        }
        for error in &snapshot.errors {
            let line = format!("Error in {}: {}", error.filename, error.error);
            self.logs.push_unless_repeated(LogEntry::error(line));
        }
        self.snapshot = snapshot;
        self.dirty = true;
    }

    pub(crate) fn log(&mut self, entry: LogEntry) {
        self.logs.push(entry);
        self.dirty = true;
    }
}
