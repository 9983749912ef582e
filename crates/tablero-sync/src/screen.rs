// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use tablero_app::ScreenKind;
use tracing::debug;

use crate::{
    FetchKind, FilterState, ListBuffer, ListMachine, ListPhase, ListRow, PageData, PageRequest,
    QueryCache, ScrollGate, Selection,
};

// What an apply/reset produced: a query string to push into the address
// state (None when the apply was an idempotent no-op), an optional fetch
// for the runtime to execute, and whether rows were restored from cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyOutcome {
    pub navigation: Option<String>,
    pub fetch: Option<PageRequest>,
    pub from_cache: bool,
}

impl ApplyOutcome {
    pub fn noop() -> Self {
        Self {
            navigation: None,
            fetch: None,
            from_cache: false,
        }
    }

    pub fn is_noop(&self) -> bool {
        self.navigation.is_none() && self.fetch.is_none()
    }
}

// One list screen's synchronized state: active/draft filter sets, the
// fetch phase machine, the materialized row buffer, the scroll gate, the
// selection, and the query cache. All the protocol verbs live here; the
// runtime executes the fetches this type hands out and feeds results
// back in.
#[derive(Debug, Clone)]
pub struct ListScreen<T> {
    screen: ScreenKind,
    defaults: FilterState,
    active: FilterState,
    draft: FilterState,
    machine: ListMachine,
    buffer: ListBuffer<T>,
    gate: ScrollGate,
    selection: Selection,
    cache: QueryCache<T>,
    refresh_in_flight: bool,
    last_error: Option<String>,
}

impl<T: ListRow + Clone> ListScreen<T> {
    pub fn new(screen: ScreenKind) -> Self {
        let defaults = FilterState::default_for(screen);
        Self {
            screen,
            active: defaults.clone(),
            draft: defaults.clone(),
            defaults,
            machine: ListMachine::new(),
            buffer: ListBuffer::new(),
            gate: ScrollGate::new(),
            selection: Selection::new(),
            cache: QueryCache::new(),
            refresh_in_flight: false,
            last_error: None,
        }
    }

    pub fn screen(&self) -> ScreenKind {
        self.screen
    }

    pub fn phase(&self) -> ListPhase {
        self.machine.phase()
    }

    pub fn rows(&self) -> &[T] {
        self.buffer.rows()
    }

    pub fn total_all(&self) -> u64 {
        self.buffer.total_all()
    }

    pub fn total_filtered(&self) -> u64 {
        self.buffer.total_filtered()
    }

    pub fn active_filter(&self) -> &FilterState {
        &self.active
    }

    pub fn draft(&self) -> &FilterState {
        &self.draft
    }

    // Keystroke-level edits land here and nowhere else; nothing fetches
    // until the draft is explicitly applied.
    pub fn draft_mut(&mut self) -> &mut FilterState {
        &mut self.draft
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn take_error(&mut self) -> Option<String> {
        self.last_error.take()
    }

    // First mount: the baseline filter set comes from the server-provided
    // URL state (or the defaults) and triggers the initial load.
    pub fn mount(&mut self, baseline: FilterState) -> ApplyOutcome {
        self.active = baseline.normalized();
        self.draft = self.active.clone();
        self.machine.reset();
        self.start_from_page_one(false)
    }

    // Explicit user confirmation of the draft. Re-applying an identical
    // filter set is a no-op: no navigation, no refetch.
    pub fn apply_draft(&mut self) -> ApplyOutcome {
        let normalized = self.draft.normalized();
        if normalized == self.active && self.machine.phase() != ListPhase::Idle {
            debug!(screen = self.screen.as_str(), "filter apply was identical; no-op");
            return ApplyOutcome::noop();
        }
        self.draft = normalized.clone();
        self.active = normalized;
        self.start_from_page_one(true)
    }

    // Reset restores the documented default set regardless of prior state.
    pub fn reset(&mut self) -> ApplyOutcome {
        self.draft = self.defaults.clone();
        self.apply_draft()
    }

    fn start_from_page_one(&mut self, navigate: bool) -> ApplyOutcome {
        let signature = self.active.signature();
        self.selection.clear();
        self.refresh_in_flight = false;

        // Read-through: a clean cached snapshot renders immediately with
        // no fetch; a dirty one renders immediately and refetches in the
        // background.
        if let Some(entry) = self.cache.list(&signature) {
            let dirty = entry.dirty;
            self.buffer.replace_with(PageData {
                rows: entry.rows.clone(),
                total_all: entry.total_all,
                total_filtered: entry.total_filtered,
            });
            // Cached snapshot counts as the initial load.
            self.machine.begin_initial();
            self.machine.loaded();
            self.gate.reset(self.buffer.has_next());
            let fetch = if dirty { self.begin_refresh() } else { None };
            return ApplyOutcome {
                navigation: navigate.then(|| signature.clone()),
                fetch,
                from_cache: true,
            };
        }

        self.buffer.clear();
        self.gate.reset(false);
        self.machine.begin_initial();
        debug!(
            screen = self.screen.as_str(),
            signature = signature.as_str(),
            "initial fetch"
        );
        ApplyOutcome {
            navigation: navigate.then(|| signature.clone()),
            fetch: Some(PageRequest {
                kind: FetchKind::Initial,
                offset: 0,
                limit: self.active.limit,
                signature,
            }),
            from_cache: false,
        }
    }

    // Sentinel visibility changed. At most one next-page fetch is granted
    // per settle cycle.
    pub fn sentinel_visible(&mut self, visible: bool) -> Option<PageRequest> {
        if self.machine.phase() != ListPhase::Ready {
            return None;
        }
        if !self.gate.observe(visible) {
            return None;
        }
        self.machine.begin_next_page();
        Some(PageRequest {
            kind: FetchKind::NextPage,
            offset: self.buffer.len(),
            limit: self.active.limit,
            signature: self.active.signature(),
        })
    }

    // A page the runtime fetched has arrived. Responses fetched under a
    // superseded filter signature are dropped, never merged.
    pub fn page_loaded(&mut self, request: &PageRequest, page: PageData<T>) {
        if request.signature != self.active.signature() {
            debug!(
                screen = self.screen.as_str(),
                "dropping stale page for superseded filter set"
            );
            return;
        }
        match request.kind {
            FetchKind::Initial => {
                self.buffer.replace_with(page);
                self.machine.loaded();
            }
            FetchKind::NextPage => {
                self.buffer.extend_page(page);
                self.machine.loaded();
            }
            FetchKind::Refresh => {
                // Background reconcile: the fresh first page replaces the
                // materialized list wholesale.
                self.buffer.replace_with(page);
                self.refresh_in_flight = false;
            }
        }
        self.gate.settle(self.buffer.has_next());
        self.cache.store_list(
            &request.signature,
            self.buffer.rows().to_vec(),
            self.buffer.total_all(),
            self.buffer.total_filtered(),
        );
    }

    // A fetch failed: previously materialized rows stay visible and
    // pagination halts until the user retries.
    pub fn page_failed(&mut self, request: &PageRequest, error: impl Into<String>) {
        if request.signature != self.active.signature() {
            return;
        }
        if request.kind == FetchKind::Refresh {
            self.refresh_in_flight = false;
        } else {
            self.machine.failed();
        }
        self.gate.settle(self.buffer.has_next());
        self.last_error = Some(error.into());
    }

    pub fn toggle_selected(&mut self, uid: &str) -> bool {
        self.selection.toggle(uid)
    }

    pub fn select_all_visible(&mut self) {
        let visible = self.buffer.uids();
        self.selection.select_all(visible);
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    // A delete action succeeded server-side. In order: synchronous
    // optimistic patch of rows + counts, then invalidation of the cache
    // key for the background refetch.
    pub fn apply_deletion(&mut self, uids: &[String]) -> Option<PageRequest> {
        let signature = self.active.signature();
        self.buffer.remove(uids);
        self.selection.remove(uids);
        self.cache.remove_rows(&signature, uids);
        self.cache.invalidate(&signature);
        self.gate.settle(self.buffer.has_next());
        debug!(
            screen = self.screen.as_str(),
            removed = uids.len(),
            "optimistic delete patched; cache invalidated"
        );
        self.begin_refresh()
    }

    // An update action succeeded server-side: merge the fields into the
    // visible rows and the cache, then reconcile in the background.
    pub fn apply_update(&mut self, updated: T) -> Option<PageRequest> {
        let signature = self.active.signature();
        self.buffer.merge(updated.clone());
        self.cache.merge_row(&signature, &updated);
        self.cache.invalidate(&signature);
        self.begin_refresh()
    }

    // A create or reorder succeeded: the rows' positions under the
    // active filter set are the server's call, so there is nothing to
    // patch locally -- invalidate and refetch.
    pub fn invalidate_and_refresh(&mut self) -> Option<PageRequest> {
        let signature = self.active.signature();
        self.cache.invalidate(&signature);
        self.begin_refresh()
    }

    pub fn detail_loaded(&mut self, record: T) {
        self.cache.put_detail(record);
    }

    pub fn detail(&self, uid: &str) -> Option<&T> {
        self.cache.detail(uid)
    }

    fn begin_refresh(&mut self) -> Option<PageRequest> {
        if self.refresh_in_flight || self.machine.phase() != ListPhase::Ready {
            return None;
        }
        self.refresh_in_flight = true;
        Some(PageRequest {
            kind: FetchKind::Refresh,
            offset: 0,
            limit: self.active.limit,
            signature: self.active.signature(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{ApplyOutcome, ListScreen};
    use crate::{FetchKind, ListPhase, ListRow, PageData, PageRequest};
    use tablero_app::ScreenKind;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Row {
        uid: String,
        label: String,
    }

    impl Row {
        fn new(uid: &str) -> Self {
            Self {
                uid: uid.to_owned(),
                label: uid.to_owned(),
            }
        }
    }

    impl ListRow for Row {
        fn row_uid(&self) -> &str {
            &self.uid
        }
    }

    fn rows(uids: &[&str]) -> Vec<Row> {
        uids.iter().map(|uid| Row::new(uid)).collect()
    }

    fn mounted(total_all: u64, total_filtered: u64, uids: &[&str]) -> ListScreen<Row> {
        let mut screen = ListScreen::new(ScreenKind::Users);
        let outcome = screen.mount(screen.draft().clone());
        let request = outcome.fetch.expect("mount should fetch");
        screen.page_loaded(
            &request,
            PageData {
                rows: rows(uids),
                total_all,
                total_filtered,
            },
        );
        screen
    }

    #[test]
    fn mount_fetches_page_one() {
        let mut screen: ListScreen<Row> = ListScreen::new(ScreenKind::Users);
        let outcome = screen.mount(screen.draft().clone());
        let request = outcome.fetch.expect("initial fetch");
        assert_eq!(request.kind, FetchKind::Initial);
        assert_eq!(request.offset, 0);
        assert_eq!(screen.phase(), ListPhase::LoadingInitial);
    }

    #[test]
    fn identical_apply_is_a_no_op() {
        let mut screen = mounted(10, 10, &["a", "b"]);
        let outcome = screen.apply_draft();
        assert_eq!(outcome, ApplyOutcome::noop());
        assert!(outcome.is_noop());
        assert_eq!(screen.rows().len(), 2);
    }

    #[test]
    fn changed_draft_navigates_and_restarts_from_page_one() {
        let mut screen = mounted(10, 10, &["a", "b"]);
        screen.toggle_selected("a");
        screen.draft_mut().q = "kim".to_owned();

        let outcome = screen.apply_draft();
        let navigation = outcome.navigation.expect("query string pushed");
        assert!(navigation.contains("q=kim"));
        let request = outcome.fetch.expect("refetch from page one");
        assert_eq!(request.offset, 0);
        // Filter changes drop the selection.
        assert!(screen.selection().is_empty());
    }

    #[test]
    fn reset_restores_defaults() {
        let mut screen = mounted(10, 10, &["a"]);
        screen.draft_mut().q = "kim".to_owned();
        screen.apply_draft();

        screen.reset();
        assert_eq!(screen.active_filter(), &screen.draft().clone());
        assert!(screen.active_filter().q.is_empty());
    }

    #[test]
    fn sentinel_triggers_exactly_one_next_page_fetch() {
        let mut screen = mounted(50, 20, &["a", "b"]);

        let first = screen.sentinel_visible(true);
        let request = first.expect("one fetch granted");
        assert_eq!(request.kind, FetchKind::NextPage);
        assert_eq!(request.offset, 2);

        // Second visibility event while the fetch is pending.
        assert!(screen.sentinel_visible(true).is_none());
        assert_eq!(screen.phase(), ListPhase::LoadingNextPage);
    }

    #[test]
    fn no_sentinel_fetch_when_everything_is_materialized() {
        let mut screen = mounted(2, 2, &["a", "b"]);
        assert!(screen.sentinel_visible(true).is_none());
    }

    #[test]
    fn next_page_appends_with_dedup() {
        let mut screen = mounted(50, 20, &["a", "b"]);
        let request = screen.sentinel_visible(true).expect("fetch");
        screen.page_loaded(
            &request,
            PageData {
                rows: rows(&["b", "c"]),
                total_all: 50,
                total_filtered: 20,
            },
        );
        let uids: Vec<_> = screen.rows().iter().map(|row| row.uid.clone()).collect();
        assert_eq!(uids, vec!["a", "b", "c"]);
        assert_eq!(screen.phase(), ListPhase::Ready);
    }

    #[test]
    fn stale_page_for_superseded_filter_is_dropped() {
        let mut screen = mounted(50, 20, &["a", "b"]);
        let stale = screen.sentinel_visible(true).expect("fetch");

        // The filter changes while the page request is in flight.
        screen.draft_mut().q = "park".to_owned();
        let outcome = screen.apply_draft();
        let fresh = outcome.fetch.expect("new initial fetch");

        screen.page_loaded(
            &stale,
            PageData {
                rows: rows(&["zombie"]),
                total_all: 99,
                total_filtered: 99,
            },
        );
        assert!(screen.rows().is_empty());

        screen.page_loaded(
            &fresh,
            PageData {
                rows: rows(&["p1"]),
                total_all: 1,
                total_filtered: 1,
            },
        );
        assert_eq!(screen.rows().len(), 1);
    }

    #[test]
    fn failed_page_keeps_materialized_rows() {
        let mut screen = mounted(50, 20, &["a", "b"]);
        let request = screen.sentinel_visible(true).expect("fetch");

        screen.page_failed(&request, "boom");
        assert_eq!(screen.phase(), ListPhase::Ready);
        assert_eq!(screen.rows().len(), 2);
        assert_eq!(screen.take_error().as_deref(), Some("boom"));
        assert!(screen.take_error().is_none());

        // Pagination can be retried afterwards.
        assert!(screen.sentinel_visible(true).is_some());
    }

    #[test]
    fn bulk_delete_patches_counts_before_the_refetch() {
        let mut screen = mounted(50, 20, &["u0", "u1", "u2", "u3", "u4"]);
        screen.toggle_selected("u1");
        screen.toggle_selected("u3");
        screen.toggle_selected("u4");

        let selected = screen.selection().uids();
        let refresh = screen.apply_deletion(&selected);

        assert_eq!(screen.total_all(), 47);
        assert_eq!(screen.total_filtered(), 17);
        assert_eq!(screen.rows().len(), 2);
        assert!(screen.selection().is_empty());

        // The background reconcile fetch was issued against the same
        // signature.
        let refresh = refresh.expect("refresh scheduled");
        assert_eq!(refresh.kind, FetchKind::Refresh);
        assert_eq!(refresh.signature, screen.active_filter().signature());
    }

    #[test]
    fn refresh_response_replaces_the_buffer() {
        let mut screen = mounted(50, 20, &["a", "b", "c"]);
        let refresh = screen
            .apply_deletion(&["b".to_owned()])
            .expect("refresh scheduled");

        screen.page_loaded(
            &refresh,
            PageData {
                rows: rows(&["a", "c", "d"]),
                total_all: 49,
                total_filtered: 19,
            },
        );
        assert_eq!(screen.rows().len(), 3);
        assert_eq!(screen.total_all(), 49);
        assert_eq!(screen.phase(), ListPhase::Ready);
    }

    #[test]
    fn only_one_refresh_runs_at_a_time() {
        let mut screen = mounted(50, 20, &["a", "b", "c"]);
        assert!(screen.apply_deletion(&["a".to_owned()]).is_some());
        assert!(screen.apply_deletion(&["b".to_owned()]).is_none());
    }

    #[test]
    fn update_merges_into_rows_and_detail_cache() {
        let mut screen = mounted(3, 3, &["a", "b", "c"]);
        let mut updated = Row::new("b");
        updated.label = "renamed".to_owned();

        screen.apply_update(updated);
        assert_eq!(screen.rows()[1].label, "renamed");
        assert_eq!(screen.detail("b").expect("cached detail").label, "renamed");
    }

    #[test]
    fn remount_with_cached_signature_skips_the_fetch() {
        let mut screen = mounted(2, 2, &["a", "b"]);
        let baseline = screen.active_filter().clone();

        // Navigate away and back with the same filter set.
        let outcome = screen.mount(baseline);
        assert!(outcome.from_cache);
        assert!(outcome.fetch.is_none());
        assert_eq!(screen.rows().len(), 2);
        assert_eq!(screen.phase(), ListPhase::Ready);
    }

    #[test]
    fn remount_with_dirty_cache_refetches_in_background() {
        let mut screen = mounted(3, 3, &["a", "b", "c"]);
        screen.apply_deletion(&["a".to_owned()]);
        let baseline = screen.active_filter().clone();

        let outcome = screen.mount(baseline);
        assert!(outcome.from_cache);
        let fetch = outcome.fetch.expect("background reconcile");
        assert_eq!(fetch.kind, FetchKind::Refresh);
        // Rows render immediately from the patched snapshot.
        assert_eq!(screen.rows().len(), 2);
    }

    #[test]
    fn period_filter_is_normalized_on_apply() {
        use time::macros::date;

        let mut screen = mounted(10, 10, &["a"]);
        screen.draft_mut().start_date = Some(date!(2024 - 06 - 01));
        screen.draft_mut().end_date = Some(date!(2024 - 01 - 01));

        let outcome = screen.apply_draft();
        assert!(!outcome.is_noop());
        assert_eq!(
            screen.active_filter().start_date,
            Some(date!(2024 - 01 - 01))
        );
        assert_eq!(screen.active_filter().end_date, Some(date!(2024 - 06 - 01)));
    }
}
