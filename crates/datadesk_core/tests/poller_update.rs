use std::sync::Once;
use std::time::Duration;

use datadesk_core::{
    update_poller, JobError, JobSnapshot, LogKind, PollEffect, PollMsg, PollPhase, PollerConfig,
    PollerState,
};
use pretty_assertions::assert_eq;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(desk_logging::initialize_for_tests);
}

fn config(stoppable: bool) -> PollerConfig {
    PollerConfig {
        poll_interval: Duration::from_millis(2000),
        stop_grace: Duration::from_millis(3000),
        stoppable,
    }
}

fn running(file: &str, processed: u64, total: u64) -> JobSnapshot {
    JobSnapshot {
        current_file: Some(file.to_string()),
        processed,
        total,
        is_running: true,
        ..JobSnapshot::default()
    }
}

fn started(stoppable: bool) -> PollerState {
    let (state, effects) = update_poller(PollerState::new(config(stoppable)), PollMsg::StartClicked);
    assert_eq!(effects, vec![PollEffect::RequestStart]);
    let (state, effects) = update_poller(state, PollMsg::StartSucceeded { process_id: None });
    assert_eq!(
        effects,
        vec![PollEffect::StartPolling {
            process_id: None,
            interval: Duration::from_millis(2000),
        }]
    );
    state
}

fn messages(state: &PollerState) -> Vec<String> {
    state
        .logs()
        .entries()
        .iter()
        .map(|entry| entry.message.clone())
        .collect()
}

#[test]
fn start_success_begins_polling_and_logs() {
    init_logging();
    let state = started(false);
    assert_eq!(state.phase(), PollPhase::Starting);
    assert!(state.is_polling());
    assert_eq!(messages(&state), vec!["Starting import process..."]);
}

#[test]
fn start_failure_stays_idle_without_polling() {
    init_logging();
    let (state, _) = update_poller(PollerState::default(), PollMsg::StartClicked);
    let (state, effects) = update_poller(
        state,
        PollMsg::StartFailed {
            message: "Import already running".into(),
        },
    );
    assert!(effects.is_empty());
    assert_eq!(state.phase(), PollPhase::Idle);
    assert!(!state.is_polling());
    let view = state.view();
    assert_eq!(view.last_error.as_deref(), Some("Import already running"));
    assert_eq!(view.logs[0].kind, LogKind::Error);
    assert!(view.can_start);
}

#[test]
fn double_start_is_ignored_while_busy() {
    init_logging();
    let (state, _) = update_poller(PollerState::default(), PollMsg::StartClicked);
    let (state, effects) = update_poller(state, PollMsg::StartClicked);
    assert!(effects.is_empty());
    let (state, _) = update_poller(state, PollMsg::StartSucceeded { process_id: None });
    let (_state, effects) = update_poller(state, PollMsg::StartClicked);
    assert!(effects.is_empty());
}

#[test]
fn running_snapshot_updates_progress_and_dedupes_logs() {
    init_logging();
    let state = started(false);
    let (state, effects) = update_poller(state, PollMsg::SnapshotReceived(running("a.csv", 10, 100)));
    assert!(effects.is_empty());
    let (state, _) = update_poller(state, PollMsg::SnapshotReceived(running("a.csv", 10, 100)));

    assert_eq!(state.phase(), PollPhase::Running);
    assert_eq!(state.view().percent, 10);
    assert_eq!(
        messages(&state),
        vec!["Starting import process...", "Processing a.csv: 10 records"]
    );
}

#[test]
fn dedupe_only_looks_at_previous_line() {
    init_logging();
    let state = started(false);
    let (state, _) = update_poller(state, PollMsg::SnapshotReceived(running("a.csv", 10, 100)));
    let (state, _) = update_poller(state, PollMsg::SnapshotReceived(running("b.csv", 20, 100)));
    let (state, _) = update_poller(state, PollMsg::SnapshotReceived(running("a.csv", 10, 100)));
    assert_eq!(
        messages(&state)[1..].to_vec(),
        vec![
            "Processing a.csv: 10 records",
            "Processing b.csv: 20 records",
            "Processing a.csv: 10 records",
        ]
    );
}

#[test]
fn snapshot_errors_become_error_lines() {
    init_logging();
    let state = started(false);
    let mut snapshot = running("a.csv", 5, 10);
    snapshot.errors = vec![JobError {
        filename: "bad.csv".into(),
        error: "missing header".into(),
    }];
    let (state, _) = update_poller(state, PollMsg::SnapshotReceived(snapshot.clone()));
    let (state, _) = update_poller(state, PollMsg::SnapshotReceived(snapshot));

    let errors: Vec<_> = state
        .logs()
        .entries()
        .iter()
        .filter(|e| e.kind == LogKind::Error)
        .map(|e| e.message.as_str())
        .collect();
    // The progress line sits between the two error lines, so the second
    // error line is not a consecutive repeat.
    assert_eq!(
        errors,
        vec!["Error in bad.csv: missing header", "Error in bad.csv: missing header"]
    );
}

#[test]
fn zero_processed_is_not_logged_and_percent_is_zero() {
    init_logging();
    let state = started(false);
    let (state, _) = update_poller(state, PollMsg::SnapshotReceived(running("a.csv", 0, 0)));
    assert_eq!(state.view().percent, 0);
    assert_eq!(state.logs().len(), 1);
}

#[test]
fn complete_snapshot_stops_polling() {
    init_logging();
    let state = started(false);
    let (state, _) = update_poller(state, PollMsg::SnapshotReceived(running("a.csv", 5, 10)));
    let done = JobSnapshot {
        current_file: Some("a.csv".into()),
        processed: 10,
        total: 10,
        is_complete: true,
        is_running: false,
        ..JobSnapshot::default()
    };
    let (state, effects) = update_poller(state, PollMsg::SnapshotReceived(done));
    assert_eq!(effects, vec![PollEffect::StopPolling]);
    assert_eq!(state.phase(), PollPhase::Complete);
    assert!(!state.is_polling());
    assert_eq!(state.view().percent, 100);
    assert_eq!(
        messages(&state).last().map(String::as_str),
        Some("Import completed successfully")
    );

    // Late ticks are ignored once polling has stopped.
    let (state, effects) = update_poller(state, PollMsg::SnapshotReceived(running("a.csv", 1, 10)));
    assert!(effects.is_empty());
    assert_eq!(state.view().percent, 100);
}

#[test]
fn not_running_snapshot_is_terminal() {
    init_logging();
    let state = started(false);
    let idle = JobSnapshot::default();
    let (state, effects) = update_poller(state, PollMsg::SnapshotReceived(idle));
    assert_eq!(effects, vec![PollEffect::StopPolling]);
    assert_eq!(state.phase(), PollPhase::Complete);
}

#[test]
fn poll_failure_returns_to_idle() {
    init_logging();
    let state = started(false);
    let (state, effects) = update_poller(
        state,
        PollMsg::SnapshotFailed {
            message: "timeout".into(),
        },
    );
    assert_eq!(effects, vec![PollEffect::StopPolling]);
    assert_eq!(state.phase(), PollPhase::Idle);
    assert_eq!(
        messages(&state).last().map(String::as_str),
        Some("Error fetching progress: timeout")
    );
}

#[test]
fn restart_after_completion_resets_logs_and_snapshot() {
    init_logging();
    let state = started(false);
    let (state, _) = update_poller(state, PollMsg::SnapshotReceived(JobSnapshot::default()));
    assert_eq!(state.phase(), PollPhase::Complete);

    let (state, effects) = update_poller(state, PollMsg::StartClicked);
    assert_eq!(effects, vec![PollEffect::RequestStart]);
    assert!(state.logs().is_empty());
    assert_eq!(state.snapshot(), &JobSnapshot::default());
}

#[test]
fn stop_polls_through_grace_window() {
    init_logging();
    let state = started(true);
    let (state, _) = update_poller(state, PollMsg::SnapshotReceived(running("a.csv", 5, 10)));

    let (state, effects) = update_poller(state, PollMsg::StopClicked);
    assert_eq!(effects, vec![PollEffect::RequestStop { process_id: None }]);
    assert_eq!(state.phase(), PollPhase::Stopping);
    assert!(state.is_polling());

    let (state, effects) = update_poller(state, PollMsg::StopAcknowledged);
    assert_eq!(
        effects,
        vec![PollEffect::ScheduleGrace {
            after: Duration::from_millis(3000)
        }]
    );

    // Still accepting snapshots during the grace window.
    let (state, effects) = update_poller(state, PollMsg::SnapshotReceived(running("a.csv", 7, 10)));
    assert!(effects.is_empty());
    assert_eq!(state.view().percent, 70);

    let (state, effects) = update_poller(state, PollMsg::GraceElapsed);
    assert_eq!(effects, vec![PollEffect::StopPolling]);
    assert_eq!(state.phase(), PollPhase::Complete);
    assert_eq!(messages(&state).last().map(String::as_str), Some("Import stopped"));
}

#[test]
fn stop_is_unavailable_for_jobs_without_stop_endpoint() {
    init_logging();
    let state = started(false);
    assert!(!state.view().can_stop);
    let (state, effects) = update_poller(state, PollMsg::StopClicked);
    assert!(effects.is_empty());
    assert_eq!(state.phase(), PollPhase::Starting);
}

#[test]
fn stop_failure_halts_polling() {
    init_logging();
    let state = started(true);
    let (state, _) = update_poller(state, PollMsg::StopClicked);
    let (state, effects) = update_poller(
        state,
        PollMsg::StopFailed {
            message: "no active process".into(),
        },
    );
    assert_eq!(effects, vec![PollEffect::StopPolling]);
    assert_eq!(state.phase(), PollPhase::Idle);
    assert!(!state.is_polling());
}

#[test]
fn process_id_is_threaded_into_stop() {
    init_logging();
    let (state, _) = update_poller(PollerState::new(config(true)), PollMsg::StartClicked);
    let (state, effects) = update_poller(
        state,
        PollMsg::StartSucceeded {
            process_id: Some("p-1".into()),
        },
    );
    assert_eq!(
        effects,
        vec![PollEffect::StartPolling {
            process_id: Some("p-1".into()),
            interval: Duration::from_millis(2000),
        }]
    );
    let (_state, effects) = update_poller(state, PollMsg::StopClicked);
    assert_eq!(
        effects,
        vec![PollEffect::RequestStop {
            process_id: Some("p-1".into())
        }]
    );
}

#[test]
fn disposal_stops_polling_and_ignores_later_messages() {
    init_logging();
    let state = started(true);
    let (state, effects) = update_poller(state, PollMsg::Disposed);
    assert_eq!(effects, vec![PollEffect::StopPolling]);
    assert!(state.is_settled());

    let (state, effects) = update_poller(state, PollMsg::SnapshotReceived(running("a.csv", 1, 2)));
    assert!(effects.is_empty());
    let (_state, effects) = update_poller(state, PollMsg::StartClicked);
    assert!(effects.is_empty());
}
