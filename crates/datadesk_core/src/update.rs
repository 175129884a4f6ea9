use crate::{
    BrowseEffect, BrowseMsg, BrowserState, LogEntry, PageCursor, PollEffect, PollMsg, PollPhase,
    PollerState,
};

/// Pure update function for the data browser.
pub fn update_browser(mut state: BrowserState, msg: BrowseMsg) -> (BrowserState, Vec<BrowseEffect>) {
    let effects = match msg {
        BrowseMsg::FilterEdited { field, value } => {
            state.edit_filter(field, value);
            Vec::new()
        }
        BrowseMsg::FiltersSubmitted => {
            state.commit_filters();
            let target = state.requested().clone();
            vec![BrowseEffect::Fetch(state.begin_request(target))]
        }
        BrowseMsg::Refresh => {
            let target = state.requested().clone();
            vec![BrowseEffect::Fetch(state.begin_request(target))]
        }
        // Navigation is disabled while a request is outstanding.
        BrowseMsg::NextPage => navigate(&mut state, BrowserState::next_target),
        BrowseMsg::PrevPage => navigate(&mut state, BrowserState::prev_target),
        BrowseMsg::JumpToPage(page) => navigate(&mut state, |s| s.jump_target(page)),
        BrowseMsg::PageLoaded { request_id, result } => {
            if state.is_current_request(request_id) {
                state.apply_page(result);
            }
            Vec::new()
        }
        BrowseMsg::PageFailed {
            request_id,
            message,
        } => {
            if state.is_current_request(request_id) {
                state.apply_failure(message);
            }
            Vec::new()
        }
    };

    (state, effects)
}

fn navigate(
    state: &mut BrowserState,
    target: impl FnOnce(&BrowserState) -> Option<PageCursor>,
) -> Vec<BrowseEffect> {
    if state.is_loading() {
        return Vec::new();
    }
    match target(state) {
        Some(target) => vec![BrowseEffect::Fetch(state.begin_request(target))],
        None => Vec::new(),
    }
}

/// Pure update function for an import poller.
pub fn update_poller(mut state: PollerState, msg: PollMsg) -> (PollerState, Vec<PollEffect>) {
    if state.is_disposed() {
        return (state, Vec::new());
    }

    let effects = match msg {
        PollMsg::StartClicked => {
            if state.can_start() {
                state.reset_for_start();
                vec![PollEffect::RequestStart]
            } else {
                Vec::new()
            }
        }
        PollMsg::StartSucceeded { process_id } => {
            if state.take_start_pending() {
                state.begin_polling(process_id.clone());
                vec![PollEffect::StartPolling {
                    process_id,
                    interval: state.config().poll_interval,
                }]
            } else {
                Vec::new()
            }
        }
        PollMsg::StartFailed { message } => {
            if state.take_start_pending() {
                let line = format!("Failed to start import: {message}");
                state.fail(message, line);
            }
            Vec::new()
        }
        PollMsg::SnapshotReceived(snapshot) => {
            if !state.is_polling() {
                return (state, Vec::new());
            }
            let terminal = snapshot.is_terminal();
            state.apply_snapshot(snapshot);
            if terminal {
                let line = if state.phase() == PollPhase::Stopping {
                    "Import stopped"
                } else {
                    "Import completed successfully"
                };
                state.log(LogEntry::success(line));
                state.halt(PollPhase::Complete);
                vec![PollEffect::StopPolling]
            } else {
                if state.phase() == PollPhase::Starting {
                    state.set_phase(PollPhase::Running);
                }
                Vec::new()
            }
        }
        PollMsg::SnapshotFailed { message } => {
            if !state.is_polling() {
                return (state, Vec::new());
            }
            let line = format!("Error fetching progress: {message}");
            state.fail(message, line);
            vec![PollEffect::StopPolling]
        }
        PollMsg::StopClicked => {
            let active = matches!(state.phase(), PollPhase::Starting | PollPhase::Running);
            if active && state.config().stoppable {
                state.set_phase(PollPhase::Stopping);
                vec![PollEffect::RequestStop {
                    process_id: state.process_id().map(ToOwned::to_owned),
                }]
            } else {
                Vec::new()
            }
        }
        PollMsg::StopAcknowledged => {
            if state.phase() == PollPhase::Stopping {
                state.log(LogEntry::success(
                    "Stop requested, waiting for final status",
                ));
                vec![PollEffect::ScheduleGrace {
                    after: state.config().stop_grace,
                }]
            } else {
                Vec::new()
            }
        }
        PollMsg::StopFailed { message } => {
            if state.phase() == PollPhase::Stopping {
                let line = format!("Failed to stop import: {message}");
                state.fail(message, line);
                vec![PollEffect::StopPolling]
            } else {
                Vec::new()
            }
        }
        PollMsg::GraceElapsed => {
            if state.phase() == PollPhase::Stopping {
                state.log(LogEntry::success("Import stopped"));
                state.halt(PollPhase::Complete);
                vec![PollEffect::StopPolling]
            } else {
                Vec::new()
            }
        }
        PollMsg::Disposed => {
            state.dispose();
            vec![PollEffect::StopPolling]
        }
    };

    (state, effects)
}
