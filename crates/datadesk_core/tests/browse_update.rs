use std::sync::Once;

use datadesk_core::{
    update_browser, BrowseEffect, BrowseMsg, BrowserConfig, BrowserState, CursorPageInfo,
    OffsetPageInfo, PageInfo, PageMode, PageRequest, PageResult,
};
use pretty_assertions::assert_eq;
use serde_json::json;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(desk_logging::initialize_for_tests);
}

fn config() -> BrowserConfig {
    BrowserConfig {
        limit: 50,
        deep_page_threshold: 1000,
        cursor_supported: true,
    }
}

fn single_fetch(effects: Vec<BrowseEffect>) -> PageRequest {
    assert_eq!(effects.len(), 1, "expected exactly one fetch: {effects:?}");
    match effects.into_iter().next() {
        Some(BrowseEffect::Fetch(request)) => request,
        None => unreachable!(),
    }
}

fn offset_page(page: u32, has_more: bool) -> PageResult {
    PageResult {
        items: vec![json!({ "_id": format!("row-{page}") })],
        pagination: PageInfo::Offset(OffsetPageInfo {
            page,
            total: Some(50),
            has_more,
        }),
    }
}

fn cursor_page(next: Option<&str>) -> PageResult {
    PageResult {
        items: vec![json!({ "_id": "c" })],
        pagination: PageInfo::Cursor(CursorPageInfo {
            has_more: next.is_some(),
            next_cursor: next.map(ToOwned::to_owned),
        }),
    }
}

/// Runs `msg`, answers the resulting fetch with `respond`, returns the state
/// and the request that was issued.
fn step(
    state: BrowserState,
    msg: BrowseMsg,
    respond: impl FnOnce(&PageRequest) -> PageResult,
) -> (BrowserState, PageRequest) {
    let (state, effects) = update_browser(state, msg);
    let request = single_fetch(effects);
    let result = respond(&request);
    let (state, effects) = update_browser(
        state,
        BrowseMsg::PageLoaded {
            request_id: request.request_id,
            result,
        },
    );
    assert!(effects.is_empty());
    (state, request)
}

fn has_key(request: &PageRequest, key: &str) -> bool {
    request.query_pairs().iter().any(|(k, _)| k == key)
}

fn value_of(request: &PageRequest, key: &str) -> Option<String> {
    request
        .query_pairs()
        .into_iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v)
}

#[test]
fn initial_refresh_requests_first_offset_page() {
    init_logging();
    let (state, effects) = update_browser(BrowserState::new(config()), BrowseMsg::Refresh);
    let request = single_fetch(effects);
    assert_eq!(value_of(&request, "page").as_deref(), Some("1"));
    assert_eq!(value_of(&request, "limit").as_deref(), Some("50"));
    assert!(!has_key(&request, "cursor"));
    assert!(state.view().loading);
}

#[test]
fn next_and_prev_track_net_movement_with_floor_of_one() {
    init_logging();
    let (mut state, _) = step(BrowserState::new(config()), BrowseMsg::Refresh, |r| {
        offset_page(r.position.page, true)
    });

    let moves = [
        BrowseMsg::NextPage,
        BrowseMsg::NextPage,
        BrowseMsg::PrevPage,
        BrowseMsg::NextPage,
    ];
    for msg in moves {
        let (next, request) = step(state, msg, |r| offset_page(r.position.page, true));
        assert!(request.position.page >= 1);
        state = next;
    }
    assert_eq!(state.view().page, 3);

    for _ in 0..2 {
        let (next, _) = step(state, BrowseMsg::PrevPage, |r| {
            offset_page(r.position.page, true)
        });
        state = next;
    }
    assert_eq!(state.view().page, 1);

    // Already on page 1: previous issues nothing.
    let (state, effects) = update_browser(state, BrowseMsg::PrevPage);
    assert!(effects.is_empty());
    assert_eq!(state.view().page, 1);
    assert!(!state.view().can_prev);
}

#[test]
fn next_is_a_noop_when_server_reports_no_more() {
    init_logging();
    let (state, _) = step(BrowserState::new(config()), BrowseMsg::JumpToPage(3), |_| {
        offset_page(3, false)
    });
    let (state, _) = step(state, BrowseMsg::Refresh, |_| offset_page(3, false));
    assert!(!state.view().can_next);

    let (state, effects) = update_browser(state, BrowseMsg::NextPage);
    assert!(effects.is_empty());
    assert_eq!(state.view().page, 3);
    assert!(!state.view().loading);
}

#[test]
fn submitting_filters_resets_to_first_offset_page() {
    init_logging();
    let (state, _) = step(BrowserState::new(config()), BrowseMsg::JumpToPage(5000), |_| {
        cursor_page(Some("abc"))
    });
    let (state, _) = step(state, BrowseMsg::NextPage, |_| cursor_page(Some("def")));
    assert_eq!(state.view().mode, PageMode::Cursor);

    let (state, effects) = update_browser(
        state,
        BrowseMsg::FilterEdited {
            field: "searchCompany".into(),
            value: "acme".into(),
        },
    );
    assert!(effects.is_empty(), "editing a filter must not fetch");

    let (state, effects) = update_browser(state, BrowseMsg::FiltersSubmitted);
    let view = state.view();
    assert_eq!(view.mode, PageMode::Offset);
    assert_eq!(view.page, 1);
    assert_eq!(view.cursor, None);

    let request = single_fetch(effects);
    assert_eq!(value_of(&request, "searchCompany").as_deref(), Some("acme"));
    assert_eq!(value_of(&request, "page").as_deref(), Some("1"));
    assert!(!has_key(&request, "cursor"));
    assert!(!has_key(&request, "useCursor"));
}

#[test]
fn deep_jump_switches_to_cursor_mode() {
    init_logging();
    let (state, effects) =
        update_browser(BrowserState::new(config()), BrowseMsg::JumpToPage(1001));
    assert_eq!(state.view().mode, PageMode::Cursor);
    let request = single_fetch(effects);
    assert_eq!(value_of(&request, "useCursor").as_deref(), Some("true"));
    assert!(!has_key(&request, "page"));

    let (_state, effects) =
        update_browser(BrowserState::new(config()), BrowseMsg::JumpToPage(1000));
    let request = single_fetch(effects);
    assert_eq!(value_of(&request, "page").as_deref(), Some("1000"));
}

#[test]
fn deep_jump_stays_offset_without_cursor_support() {
    init_logging();
    let config = BrowserConfig {
        cursor_supported: false,
        ..config()
    };
    let (state, effects) = update_browser(BrowserState::new(config), BrowseMsg::JumpToPage(4000));
    assert_eq!(state.view().mode, PageMode::Offset);
    assert_eq!(value_of(&single_fetch(effects), "page").as_deref(), Some("4000"));
}

#[test]
fn last_representable_offset_page_has_no_next() {
    init_logging();
    let config = BrowserConfig {
        cursor_supported: false,
        ..config()
    };
    let (state, _) = step(BrowserState::new(config), BrowseMsg::Refresh, |r| {
        offset_page(r.position.page, true)
    });
    let (state, request) = step(state, BrowseMsg::JumpToPage(u32::MAX), |r| {
        offset_page(r.position.page, true)
    });
    assert_eq!(request.position.page, u32::MAX);

    let view = state.view();
    assert_eq!(view.page, u32::MAX);
    assert!(!view.can_next);
    assert_eq!(
        view.page_links,
        vec![u32::MAX - 2, u32::MAX - 1, u32::MAX]
    );

    let (_, effects) = update_browser(state, BrowseMsg::NextPage);
    assert!(effects.is_empty());
}

#[test]
fn cursor_next_sends_cursor_and_no_page() {
    init_logging();
    let (state, _) = step(BrowserState::new(config()), BrowseMsg::JumpToPage(2000), |_| {
        cursor_page(Some("abc"))
    });
    let (_state, effects) = update_browser(state, BrowseMsg::NextPage);
    let request = single_fetch(effects);
    assert_eq!(value_of(&request, "cursor").as_deref(), Some("abc"));
    assert!(!has_key(&request, "page"));
}

#[test]
fn cursor_next_without_next_cursor_is_a_noop() {
    init_logging();
    let (state, _) = step(BrowserState::new(config()), BrowseMsg::JumpToPage(2000), |_| {
        cursor_page(None)
    });
    let (_state, effects) = update_browser(state, BrowseMsg::NextPage);
    assert!(effects.is_empty());
}

#[test]
fn cursor_prev_falls_back_to_first_offset_page() {
    init_logging();
    let (state, _) = step(BrowserState::new(config()), BrowseMsg::JumpToPage(2000), |_| {
        cursor_page(Some("abc"))
    });
    let (state, effects) = update_browser(state, BrowseMsg::PrevPage);
    let request = single_fetch(effects);
    assert_eq!(request.position.mode, PageMode::Offset);
    assert_eq!(state.view().page, 1);
    assert_eq!(state.view().cursor, None);
}

#[test]
fn navigation_is_ignored_while_loading() {
    init_logging();
    let (state, _) = step(BrowserState::new(config()), BrowseMsg::Refresh, |_| {
        offset_page(1, true)
    });
    let (state, effects) = update_browser(state, BrowseMsg::NextPage);
    assert_eq!(effects.len(), 1);
    assert!(!state.view().can_next);

    let (state, effects) = update_browser(state, BrowseMsg::NextPage);
    assert!(effects.is_empty());
    assert_eq!(state.view().page, 2);
}

#[test]
fn superseded_response_is_discarded() {
    init_logging();
    let (state, effects) = update_browser(BrowserState::new(config()), BrowseMsg::Refresh);
    let stale = single_fetch(effects);
    let (state, effects) = update_browser(state, BrowseMsg::FiltersSubmitted);
    let fresh = single_fetch(effects);
    assert_ne!(stale.request_id, fresh.request_id);

    let (state, _) = update_browser(
        state,
        BrowseMsg::PageLoaded {
            request_id: stale.request_id,
            result: offset_page(9, true),
        },
    );
    assert!(state.view().loading);
    assert!(state.view().items.is_empty());

    let (state, _) = update_browser(
        state,
        BrowseMsg::PageLoaded {
            request_id: fresh.request_id,
            result: offset_page(1, false),
        },
    );
    let view = state.view();
    assert!(!view.loading);
    assert_eq!(view.items, vec![json!({ "_id": "row-1" })]);
}

#[test]
fn failure_keeps_last_good_page_and_retry_reissues_target() {
    init_logging();
    let (state, _) = step(BrowserState::new(config()), BrowseMsg::Refresh, |_| {
        offset_page(1, true)
    });
    let (state, effects) = update_browser(state, BrowseMsg::NextPage);
    let failed = single_fetch(effects);
    let (state, _) = update_browser(
        state,
        BrowseMsg::PageFailed {
            request_id: failed.request_id,
            message: "Server unavailable".into(),
        },
    );

    let view = state.view();
    assert_eq!(view.error.as_deref(), Some("Server unavailable"));
    assert_eq!(view.items, vec![json!({ "_id": "row-1" })]);
    assert_eq!(state.current().map(|c| c.page), Some(1));

    // Next still starts from the last good page, so there is no drift.
    let (state, effects) = update_browser(state, BrowseMsg::NextPage);
    assert_eq!(single_fetch(effects).position.page, 2);
    let (state, _) = update_browser(
        state,
        BrowseMsg::PageFailed {
            request_id: 3,
            message: "again".into(),
        },
    );

    let (state, effects) = update_browser(state, BrowseMsg::Refresh);
    assert_eq!(single_fetch(effects).position.page, 2);
    assert_eq!(state.view().error, None);
}

#[test]
fn page_links_show_forward_pages_only_with_more_data() {
    init_logging();
    let (state, _) = step(BrowserState::new(config()), BrowseMsg::JumpToPage(4), |_| {
        offset_page(4, true)
    });
    assert_eq!(state.view().page_links, vec![2, 3, 4, 5, 6]);

    let (state, _) = step(state, BrowseMsg::Refresh, |_| offset_page(4, false));
    assert_eq!(state.view().page_links, vec![2, 3, 4]);

    let (state, _) = step(state, BrowseMsg::JumpToPage(1), |_| offset_page(1, true));
    assert_eq!(state.view().page_links, vec![1, 2, 3]);
}

#[test]
fn dirty_flag_is_consumed_once() {
    init_logging();
    let (mut state, _) = update_browser(BrowserState::new(config()), BrowseMsg::Refresh);
    assert!(state.consume_dirty());
    assert!(!state.consume_dirty());
}
