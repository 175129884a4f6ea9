use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use datadesk_core::{update_poller, PollEffect, PollMsg, PollerConfig, PollerState, PollerView};
use desk_logging::{desk_debug, desk_info, desk_warn};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::api::JobApi;

/// A spawned background task that is cancelled when the handle is dropped.
pub struct PollHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl PollHandle {
    fn spawn<F>(token: CancellationToken, future: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let task = tokio::spawn(future);
        Self { token, task }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Drives one import job: start, fixed-interval polling, stop with a grace
/// window, and disposal.
///
/// All timers and requests hang off one root token, so disposal (explicit or
/// by drop) cancels everything the poller has spawned.
pub struct ImportPoller<J: JobApi + 'static> {
    api: Arc<J>,
    state: PollerState,
    tx: mpsc::UnboundedSender<PollMsg>,
    rx: mpsc::UnboundedReceiver<PollMsg>,
    root: CancellationToken,
    ticker: Option<PollHandle>,
    grace: Option<PollHandle>,
    requests: Vec<PollHandle>,
}

impl<J: JobApi + 'static> ImportPoller<J> {
    pub fn new(api: J, mut config: PollerConfig) -> Self {
        config.stoppable = api.stoppable();
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            api: Arc::new(api),
            state: PollerState::new(config),
            tx,
            rx,
            root: CancellationToken::new(),
            ticker: None,
            grace: None,
            requests: Vec::new(),
        }
    }

    pub fn state(&self) -> &PollerState {
        &self.state
    }

    pub fn view(&self) -> PollerView {
        self.state.view()
    }

    pub fn start(&mut self) {
        self.dispatch(PollMsg::StartClicked);
    }

    pub fn stop(&mut self) {
        self.dispatch(PollMsg::StopClicked);
    }

    pub fn dispose(&mut self) {
        self.dispatch(PollMsg::Disposed);
        self.root.cancel();
        self.requests.clear();
    }

    pub fn dispatch(&mut self, msg: PollMsg) {
        let state = std::mem::take(&mut self.state);
        let (state, effects) = update_poller(state, msg);
        self.state = state;
        for effect in effects {
            self.execute(effect);
        }
    }

    /// Wait for the next engine message and apply it. `None` once the poller
    /// is settled and nothing further will arrive.
    pub async fn next_update(&mut self) -> Option<PollerView> {
        if self.state.is_settled() {
            return None;
        }
        let msg = self.rx.recv().await?;
        self.dispatch(msg);
        Some(self.state.view())
    }

    /// Apply messages until the job completes, fails or is stopped.
    pub async fn run_to_end(&mut self) -> PollerView {
        while self.next_update().await.is_some() {}
        self.state.view()
    }

    fn execute(&mut self, effect: PollEffect) {
        match effect {
            PollEffect::RequestStart => {
                // Leftovers from a previous run must not reach the new one.
                while self.rx.try_recv().is_ok() {}
                self.requests.retain(|handle| !handle.is_finished());
                let api = self.api.clone();
                let tx = self.tx.clone();
                self.spawn_request(async move {
                    let msg = match api.start().await {
                        Ok(process_id) => {
                            desk_info!("Job started (process id {:?})", process_id);
                            PollMsg::StartSucceeded { process_id }
                        }
                        Err(err) => {
                            desk_warn!("Job start failed: {}", err);
                            PollMsg::StartFailed {
                                message: err.message,
                            }
                        }
                    };
                    let _ = tx.send(msg);
                });
            }
            PollEffect::StartPolling {
                process_id,
                interval,
            } => {
                self.cancel_polling();
                let token = self.root.child_token();
                let future = tick(
                    self.api.clone(),
                    process_id,
                    interval,
                    token.clone(),
                    self.tx.clone(),
                );
                self.ticker = Some(PollHandle::spawn(token, future));
            }
            PollEffect::StopPolling => self.cancel_polling(),
            PollEffect::RequestStop { process_id } => {
                let api = self.api.clone();
                let tx = self.tx.clone();
                self.spawn_request(async move {
                    let msg = match api.stop(process_id.as_deref()).await {
                        Ok(()) => PollMsg::StopAcknowledged,
                        Err(err) => {
                            desk_warn!("Job stop failed: {}", err);
                            PollMsg::StopFailed {
                                message: err.message,
                            }
                        }
                    };
                    let _ = tx.send(msg);
                });
            }
            PollEffect::ScheduleGrace { after } => {
                if let Some(previous) = self.grace.take() {
                    previous.cancel();
                }
                let token = self.root.child_token();
                let cancelled = token.clone();
                let tx = self.tx.clone();
                self.grace = Some(PollHandle::spawn(token, async move {
                    tokio::select! {
                        _ = cancelled.cancelled() => {}
                        _ = tokio::time::sleep(after) => {
                            let _ = tx.send(PollMsg::GraceElapsed);
                        }
                    }
                }));
            }
        }
    }

    fn spawn_request<F>(&mut self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let token = self.root.child_token();
        let cancelled = token.clone();
        self.requests.push(PollHandle::spawn(token, async move {
            tokio::select! {
                _ = cancelled.cancelled() => {}
                _ = future => {}
            }
        }));
    }

    /// Cancels the poll loop and any pending grace timer.
    fn cancel_polling(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.cancel();
        }
        if let Some(grace) = self.grace.take() {
            grace.cancel();
        }
    }
}

impl<J: JobApi + 'static> Drop for ImportPoller<J> {
    fn drop(&mut self) {
        self.root.cancel();
    }
}

/// Fetch immediately, then every `interval` after the previous fetch
/// finished. Exits on its own after a terminal snapshot or a failed fetch.
async fn tick<J: JobApi + 'static>(
    api: Arc<J>,
    process_id: Option<String>,
    interval: Duration,
    token: CancellationToken,
    tx: mpsc::UnboundedSender<PollMsg>,
) {
    loop {
        let result = tokio::select! {
            _ = token.cancelled() => break,
            result = api.progress(process_id.as_deref()) => result,
        };
        match result {
            Ok(snapshot) => {
                let terminal = snapshot.is_terminal();
                desk_debug!(
                    "Progress {}/{} (terminal: {})",
                    snapshot.processed,
                    snapshot.total,
                    terminal
                );
                let _ = tx.send(PollMsg::SnapshotReceived(snapshot));
                if terminal {
                    break;
                }
            }
            Err(err) => {
                desk_warn!("Progress fetch failed: {}", err);
                let _ = tx.send(PollMsg::SnapshotFailed {
                    message: err.message,
                });
                break;
            }
        }
        tokio::select! {
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }
}
