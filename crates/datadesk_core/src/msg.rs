use crate::{JobSnapshot, PageResult, RequestId};

/// Input to the data browser.
#[derive(Debug, Clone, PartialEq)]
pub enum BrowseMsg {
    /// User edited a filter field (draft only, nothing is fetched).
    FilterEdited { field: String, value: String },
    /// User submitted the filter form.
    FiltersSubmitted,
    /// User clicked "next".
    NextPage,
    /// User clicked "previous".
    PrevPage,
    /// User clicked a page number.
    JumpToPage(u32),
    /// Initial load or retry of the current target.
    Refresh,
    /// Engine finished a list request.
    PageLoaded {
        request_id: RequestId,
        result: PageResult,
    },
    /// Engine failed a list request.
    PageFailed {
        request_id: RequestId,
        message: String,
    },
}

/// Input to the import poller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollMsg {
    /// User clicked Start.
    StartClicked,
    /// Start endpoint accepted the job.
    StartSucceeded { process_id: Option<String> },
    /// Start endpoint failed or rejected the job.
    StartFailed { message: String },
    /// A poll tick returned a snapshot.
    SnapshotReceived(JobSnapshot),
    /// A poll tick failed.
    SnapshotFailed { message: String },
    /// User clicked Stop.
    StopClicked,
    /// Stop endpoint acknowledged.
    StopAcknowledged,
    /// Stop endpoint failed.
    StopFailed { message: String },
    /// The post-stop grace window ran out.
    GraceElapsed,
    /// The owning view went away.
    Disposed,
}

