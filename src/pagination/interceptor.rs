//! Fail-fast-and-count response hook
//!
//! Attached to every paginated request. When the response arrives it
//! raises on failure, otherwise it extracts the page's items and adds
//! their count to the paginator's tally. This runs on arrival, so in async
//! mode a prefetched page is counted even before the caller looks at it.

use super::types::PaginationStrategy;
use crate::error::Result;
use crate::http::{Response, ResponseHook};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

/// Running item counts shared between a paginator and its in-flight requests
///
/// Counts are kept per page so a snapshot can report exactly what was
/// received before its resume point. Once a page fails, nothing at or
/// after it counts, even a prefetched page that landed first. Pages sent
/// in the background stay pending until they land or fail.
#[derive(Debug, Default)]
pub(crate) struct Tally {
    carried: u64,
    state: Mutex<TallyState>,
}

#[derive(Debug, Default)]
struct TallyState {
    pages: BTreeMap<u32, u64>,
    pending: BTreeSet<u32>,
    failed: Option<u32>,
}

impl TallyState {
    fn sum(&self) -> u64 {
        self.pages.values().sum()
    }
}

impl Tally {
    /// Start from a count carried over from a snapshot
    pub(crate) fn with_carried(carried: u64) -> Self {
        Self {
            carried,
            ..Default::default()
        }
    }

    fn lock(&self) -> MutexGuard<'_, TallyState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add `count` items for `page`, returning the new total
    pub(crate) fn record(&self, page: u32, count: u64) -> u64 {
        let mut state = self.lock();
        state.pending.remove(&page);
        if state.failed.is_some_and(|failed| page >= failed) {
            debug!("Ignoring {} items from page {} after a failure", count, page);
        } else {
            *state.pages.entry(page).or_insert(0) += count;
        }
        self.carried + state.sum()
    }

    pub(crate) fn total(&self) -> u64 {
        self.carried + self.lock().sum()
    }

    /// Total for pages strictly before `page`
    pub(crate) fn total_before(&self, page: u32) -> u64 {
        let state = self.lock();
        self.carried + state.pages.range(..page).map(|(_, count)| count).sum::<u64>()
    }

    /// Remember that `page` failed; the lowest failed page wins
    pub(crate) fn mark_failed(&self, page: u32) {
        let mut state = self.lock();
        let failed = state.failed.map_or(page, |earlier| earlier.min(page));
        state.failed = Some(failed);
        state.pages.retain(|&counted, _| counted < failed);
        state.pending.remove(&page);
    }

    pub(crate) fn failed_page(&self) -> Option<u32> {
        self.lock().failed
    }

    /// Note that `page` was sent and its count has not landed yet
    pub(crate) fn expect(&self, page: u32) {
        self.lock().pending.insert(page);
    }

    /// Lowest page whose count is still outstanding
    pub(crate) fn earliest_pending(&self) -> Option<u32> {
        self.lock().pending.first().copied()
    }
}

/// Response hook that throws on failure and counts items on success
pub struct ThrowAndCountItems<S> {
    strategy: S,
    tally: Arc<Tally>,
    page: u32,
}

impl<S: PaginationStrategy> ThrowAndCountItems<S> {
    pub(crate) fn new(strategy: S, tally: Arc<Tally>, page: u32) -> Self {
        Self {
            strategy,
            tally,
            page,
        }
    }
}

impl<S: PaginationStrategy> ResponseHook for ThrowAndCountItems<S> {
    fn on_response(&self, response: &Response) -> Result<()> {
        if let Err(e) = response.throw() {
            warn!("Page {} failed: {}", self.page, e);
            self.tally.mark_failed(self.page);
            return Err(e);
        }

        let items = self.strategy.page_items(response).inspect_err(|e| {
            warn!("Page {} could not be read: {}", self.page, e);
            self.tally.mark_failed(self.page);
        })?;

        let total = self.tally.record(self.page, items.len() as u64);
        debug!(
            "Page {} arrived with {} items ({} total)",
            self.page,
            items.len(),
            total
        );
        Ok(())
    }
}

impl<S> std::fmt::Debug for ThrowAndCountItems<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThrowAndCountItems")
            .field("page", &self.page)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::pagination::PageNumberStrategy;
    use serde_json::json;

    fn hook(tally: &Arc<Tally>, page: u32) -> ThrowAndCountItems<PageNumberStrategy> {
        ThrowAndCountItems::new(PageNumberStrategy::default(), Arc::clone(tally), page)
    }

    #[test]
    fn test_counts_items_on_success() {
        let tally = Arc::new(Tally::default());

        hook(&tally, 1)
            .on_response(&Response::json_ok(&json!({"data": [1, 2, 3]})))
            .unwrap();
        hook(&tally, 2)
            .on_response(&Response::json_ok(&json!({"data": [4, 5]})))
            .unwrap();

        assert_eq!(tally.total(), 5);
        assert_eq!(tally.total_before(2), 3);
        assert_eq!(tally.failed_page(), None);
    }

    #[test]
    fn test_failure_throws_without_counting() {
        let tally = Arc::new(Tally::default());

        let err = hook(&tally, 1)
            .on_response(&Response::new(500, r#"{"data": [1, 2]}"#))
            .unwrap_err();

        assert!(matches!(err, Error::HttpStatus { status: 500, .. }));
        assert_eq!(tally.total(), 0);
        assert_eq!(tally.failed_page(), Some(1));
    }

    #[test]
    fn test_malformed_page_is_an_error() {
        let tally = Arc::new(Tally::default());

        let err = hook(&tally, 1)
            .on_response(&Response::json_ok(&json!({"items": []})))
            .unwrap_err();

        assert!(matches!(err, Error::MalformedPage { .. }));
        assert_eq!(tally.total(), 0);
    }

    #[test]
    fn test_carried_total() {
        let tally = Tally::with_carried(15);
        tally.record(4, 5);
        assert_eq!(tally.total(), 20);
        assert_eq!(tally.total_before(4), 15);
        assert_eq!(tally.total_before(5), 20);
    }

    #[test]
    fn test_lowest_failed_page_wins() {
        let tally = Tally::default();
        tally.mark_failed(4);
        tally.mark_failed(3);
        tally.mark_failed(5);
        assert_eq!(tally.failed_page(), Some(3));
    }

    #[test]
    fn test_pages_after_failure_do_not_count() {
        let tally = Tally::default();
        tally.record(1, 5);
        tally.record(4, 5);
        tally.mark_failed(3);
        assert_eq!(tally.total(), 5);

        assert_eq!(tally.record(5, 5), 5);
        assert_eq!(tally.record(2, 5), 10);
    }

    #[test]
    fn test_pending_pages_clear_on_arrival_or_failure() {
        let tally = Tally::default();
        tally.expect(2);
        tally.expect(3);
        tally.expect(4);
        assert_eq!(tally.earliest_pending(), Some(2));

        tally.record(2, 0);
        assert_eq!(tally.earliest_pending(), Some(3));

        tally.mark_failed(3);
        assert_eq!(tally.earliest_pending(), Some(4));

        tally.record(4, 5);
        assert_eq!(tally.earliest_pending(), None);
        assert_eq!(tally.total(), 0);
    }
}
