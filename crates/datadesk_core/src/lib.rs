//! Datadesk core: pure pagination and import-polling state machines.
mod effect;
mod msg;
mod page;
mod progress;
mod state;
mod update;
pub mod upload;
mod view_model;

pub use effect::{BrowseEffect, PollEffect};
pub use msg::{BrowseMsg, PollMsg};
pub use page::{
    CursorPageInfo, FilterState, OffsetPageInfo, PageCursor, PageInfo, PageMode, PageRequest,
    PageResult, Record, RequestId,
};
pub use progress::{progress_percent, JobError, JobSnapshot, LogBook, LogEntry, LogKind};
pub use state::{
    BrowserConfig, BrowserState, PollPhase, PollerConfig, PollerState, DEFAULT_DEEP_PAGE_THRESHOLD,
    DEFAULT_PAGE_LIMIT, DEFAULT_POLL_INTERVAL, DEFAULT_STOP_GRACE,
};
pub use update::{update_browser, update_poller};
pub use view_model::{BrowseView, PollerView};
