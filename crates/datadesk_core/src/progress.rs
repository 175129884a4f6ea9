#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JobError {
    pub filename: String,
    pub error: String,
}

/// Server-reported state of a long-running job. Never computed locally.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JobSnapshot {
    pub current_file: Option<String>,
    pub processed: u64,
    pub total: u64,
    pub upserted: u64,
    pub modified: u64,
    pub errors: Vec<JobError>,
    pub is_complete: bool,
    pub is_running: bool,
}

impl JobSnapshot {
    pub fn is_terminal(&self) -> bool {
        self.is_complete || !self.is_running
    }

    pub fn percent(&self) -> u32 {
        progress_percent(self.processed, self.total)
    }

    /// Short status line for the job, as shown next to the progress bar.
    pub fn status_text(&self) -> String {
        if self.is_running {
            return match &self.current_file {
                Some(file) => format!("Processing: {file}"),
                None => "Starting...".to_string(),
            };
        }
        if self.is_complete {
            "Completed".to_string()
        } else {
            "Idle".to_string()
        }
    }
}

/// `round(processed / total * 100)`, or 0 when `total` is 0.
pub fn progress_percent(processed: u64, total: u64) -> u32 {
    if total == 0 {
        return 0;
    }
    ((processed as f64 / total as f64) * 100.0).round() as u32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub kind: LogKind,
    pub message: String,
}

impl LogEntry {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: LogKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: LogKind::Error,
            message: message.into(),
        }
    }
}

/// Append-only job log.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LogBook {
    entries: Vec<LogEntry>,
}

impl LogBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: LogEntry) {
        self.entries.push(entry);
    }

    /// Appends unless the message equals the immediately preceding entry's.
    /// Older duplicates are not considered. Returns whether it was appended.
    pub fn push_unless_repeated(&mut self, entry: LogEntry) -> bool {
        if self
            .entries
            .last()
            .is_some_and(|last| last.message == entry.message)
        {
            return false;
        }
        self.entries.push(entry);
        true
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_of_empty_job_is_zero() {
        assert_eq!(progress_percent(0, 0), 0);
        assert_eq!(progress_percent(7, 0), 0);
    }

    #[test]
    fn percent_rounds_to_nearest() {
        assert_eq!(progress_percent(1, 3), 33);
        assert_eq!(progress_percent(2, 3), 67);
        assert_eq!(progress_percent(10, 10), 100);
    }

    #[test]
    fn repeated_message_is_only_compared_with_last_entry() {
        let mut book = LogBook::new();
        assert!(book.push_unless_repeated(LogEntry::success("a")));
        assert!(!book.push_unless_repeated(LogEntry::success("a")));
        assert!(book.push_unless_repeated(LogEntry::error("b")));
        assert!(book.push_unless_repeated(LogEntry::success("a")));
        assert_eq!(book.len(), 3);
    }

    #[test]
    fn status_text_follows_running_flags() {
        let mut snapshot = JobSnapshot {
            is_running: true,
            ..JobSnapshot::default()
        };
        assert_eq!(snapshot.status_text(), "Starting...");
        snapshot.current_file = Some("a.csv".into());
        assert_eq!(snapshot.status_text(), "Processing: a.csv");
        snapshot.is_running = false;
        snapshot.is_complete = true;
        assert_eq!(snapshot.status_text(), "Completed");
        snapshot.is_complete = false;
        assert_eq!(snapshot.status_text(), "Idle");
    }
}
