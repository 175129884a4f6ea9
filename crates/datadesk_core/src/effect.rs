use std::time::Duration;

use crate::PageRequest;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowseEffect {
    /// Fetch a page. Supersedes any outstanding fetch of the same browser.
    Fetch(PageRequest),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollEffect {
    RequestStart,
    /// Cancel any running poll loop, then poll immediately and every `interval`.
    StartPolling {
        process_id: Option<String>,
        interval: Duration,
    },
    /// Cancel the poll loop and any pending grace timer.
    StopPolling,
    RequestStop { process_id: Option<String> },
    ScheduleGrace { after: Duration },
}
