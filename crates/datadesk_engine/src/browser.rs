use std::sync::Arc;

use datadesk_core::{
    update_browser, BrowseEffect, BrowseMsg, BrowseView, BrowserConfig, BrowserState, PageRequest,
};
use desk_logging::{desk_debug, desk_warn};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::api::ListApi;

/// Runs the browser state machine against a list endpoint.
///
/// Fetch effects are spawned on the current tokio runtime. A new fetch aborts
/// the outstanding one; its late response, if any, is dropped by request id.
pub struct Browser<A: ListApi + 'static> {
    api: Arc<A>,
    state: BrowserState,
    tx: mpsc::UnboundedSender<BrowseMsg>,
    rx: mpsc::UnboundedReceiver<BrowseMsg>,
    in_flight: Option<JoinHandle<()>>,
}

impl<A: ListApi + 'static> Browser<A> {
    pub fn new(api: A, mut config: BrowserConfig) -> Self {
        config.cursor_supported &= api.cursor_supported();
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            api: Arc::new(api),
            state: BrowserState::new(config),
            tx,
            rx,
            in_flight: None,
        }
    }

    pub fn state(&self) -> &BrowserState {
        &self.state
    }

    pub fn view(&self) -> BrowseView {
        self.state.view()
    }

    pub fn dispatch(&mut self, msg: BrowseMsg) {
        let state = std::mem::take(&mut self.state);
        let (state, effects) = update_browser(state, msg);
        self.state = state;
        for effect in effects {
            self.execute(effect);
        }
    }

    /// Apply engine responses until no request is outstanding.
    pub async fn settle(&mut self) -> BrowseView {
        while self.state.is_loading() {
            match self.rx.recv().await {
                Some(msg) => self.dispatch(msg),
                None => break,
            }
        }
        self.state.view()
    }

    pub fn edit_filter(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.dispatch(BrowseMsg::FilterEdited {
            field: field.into(),
            value: value.into(),
        });
    }

    pub async fn submit_filters(&mut self) -> BrowseView {
        self.dispatch(BrowseMsg::FiltersSubmitted);
        self.settle().await
    }

    pub async fn refresh(&mut self) -> BrowseView {
        self.dispatch(BrowseMsg::Refresh);
        self.settle().await
    }

    pub async fn next_page(&mut self) -> BrowseView {
        self.dispatch(BrowseMsg::NextPage);
        self.settle().await
    }

    pub async fn prev_page(&mut self) -> BrowseView {
        self.dispatch(BrowseMsg::PrevPage);
        self.settle().await
    }

    pub async fn jump_to_page(&mut self, page: u32) -> BrowseView {
        self.dispatch(BrowseMsg::JumpToPage(page));
        self.settle().await
    }

    fn execute(&mut self, effect: BrowseEffect) {
        match effect {
            BrowseEffect::Fetch(request) => {
                if let Some(previous) = self.in_flight.take() {
                    previous.abort();
                }
                let api = self.api.clone();
                let tx = self.tx.clone();
                self.in_flight = Some(tokio::spawn(async move {
                    let _ = tx.send(fetch(api.as_ref(), request).await);
                }));
            }
        }
    }
}

impl<A: ListApi + 'static> Drop for Browser<A> {
    fn drop(&mut self) {
        if let Some(task) = self.in_flight.take() {
            task.abort();
        }
    }
}

async fn fetch(api: &dyn ListApi, request: PageRequest) -> BrowseMsg {
    desk_debug!(
        "Fetching page request {} ({:?})",
        request.request_id,
        request.position
    );
    match api.fetch_page(&request).await {
        Ok(result) => BrowseMsg::PageLoaded {
            request_id: request.request_id,
            result,
        },
        Err(err) => {
            desk_warn!("Page request {} failed: {}", request.request_id, err);
            BrowseMsg::PageFailed {
                request_id: request.request_id,
                message: err.message,
            }
        }
    }
}
