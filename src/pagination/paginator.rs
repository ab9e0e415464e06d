//! The paginator state machine
//!
//! A `Paginator` walks an API page by page. It owns a clone of the
//! connector and of the request template, asks its strategy how to encode
//! each page, and attaches a [`ThrowAndCountItems`] hook to every request
//! so failures abort and item counts are tallied on arrival.
//!
//! In synchronous mode each pull awaits exactly one round-trip. In async
//! mode the first page is always awaited (its total page count bounds the
//! run), then every pull hands out the page dispatched on the previous
//! pull and dispatches the next one, keeping one page in flight ahead of
//! the caller.

use super::interceptor::{Tally, ThrowAndCountItems};
use super::snapshot::{PaginatorSnapshot, SNAPSHOT_VERSION};
use super::types::{PageContext, PaginationStrategy};
use crate::error::{Error, Result};
use crate::http::{send_async, Connector, Request, Response, ResponseFuture};
use crate::types::JsonValue;
use futures::stream::{self, Stream, TryStreamExt};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Where the paginator is in its run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginatorStatus {
    /// Nothing fetched since construction, resume or rewind
    NotStarted,
    /// A page was yielded and the next one has not been dispatched
    HasPage,
    /// The next page is already in flight (async mode)
    Fetching,
    /// The last page was yielded
    Exhausted,
    /// A fetch failed; iteration stopped at the failed page
    Failed,
}

#[derive(Debug)]
enum PageState {
    NotStarted,
    HasPage,
    Fetching(ResponseFuture),
    Exhausted,
    Failed,
}

/// Output of [`Paginator::collect`]
#[derive(Debug, Clone)]
pub enum Collected {
    /// Every item in page order
    Items(Vec<JsonValue>),
    /// Every page response in order
    Pages(Vec<Response>),
}

/// Resumable sequence of pages over a connector
pub struct Paginator<C, S> {
    connector: Arc<C>,
    request: Request,
    strategy: S,
    page: u32,
    starting_page: u32,
    current_response: Option<Response>,
    tally: Arc<Tally>,
    async_requested: bool,
    total_pages: Option<u32>,
    state: PageState,
}

impl<C, S> Paginator<C, S>
where
    C: Connector,
    S: PaginationStrategy,
{
    /// Create a paginator over clones of `connector` and `request`
    pub fn new(connector: &C, request: &Request, strategy: S) -> Self
    where
        C: Clone,
    {
        Self::from_parts(Arc::new(connector.clone()), request.clone(), strategy)
    }

    fn from_parts(connector: Arc<C>, request: Request, strategy: S) -> Self {
        Self {
            connector,
            request,
            strategy,
            page: 1,
            starting_page: 1,
            current_response: None,
            tally: Arc::new(Tally::default()),
            async_requested: false,
            total_pages: None,
            state: PageState::NotStarted,
        }
    }

    /// Rebuild a paginator from a snapshot, continuing where it stopped
    pub fn resume(connector: &C, snapshot: PaginatorSnapshot<S>) -> Result<Self>
    where
        C: Clone,
    {
        snapshot.check_version()?;
        snapshot
            .strategy
            .validate(&snapshot.request)
            .map_err(|e| Error::resume_mismatch(e.to_string()))?;
        if snapshot.async_enabled && !snapshot.strategy.supports_async() {
            return Err(Error::resume_mismatch(format!(
                "snapshot enables async pagination but strategy '{}' does not support it",
                snapshot.strategy.name()
            )));
        }

        let mut paginator = Self::from_parts(
            Arc::new(connector.clone()),
            snapshot.request,
            snapshot.strategy,
        );
        paginator.page = snapshot.starting_page;
        paginator.starting_page = snapshot.starting_page;
        paginator.tally = Arc::new(Tally::with_carried(snapshot.total_results));
        paginator.async_requested = snapshot.async_enabled;
        if snapshot.exhausted {
            paginator.state = PageState::Exhausted;
        }

        info!(
            "Resuming {} pagination at page {} ({} results so far)",
            paginator.strategy.name(),
            paginator.page,
            snapshot.total_results
        );
        Ok(paginator)
    }

    /// Start from a later page
    #[must_use]
    pub fn starting_at(mut self, page: u32) -> Self {
        let page = page.max(1);
        self.page = page;
        self.starting_page = page;
        self
    }

    /// Opt in or out of async pagination
    pub fn with_async(mut self, enabled: bool) -> Result<Self> {
        if enabled && !self.strategy.supports_async() {
            return Err(Error::AsyncUnsupported {
                strategy: self.strategy.name().to_string(),
            });
        }
        self.async_requested = enabled;
        Ok(self)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Page the next pull will yield
    pub fn page(&self) -> u32 {
        self.page
    }

    /// Page a rewind returns to
    pub fn starting_page(&self) -> u32 {
        self.starting_page
    }

    /// Items received so far
    pub fn total_results(&self) -> u64 {
        self.tally.total()
    }

    /// Most recent response, absent before the first fetch
    pub fn current_response(&self) -> Option<&Response> {
        self.current_response.as_ref()
    }

    /// Total page count, known after the first page in async mode
    pub fn total_pages(&self) -> Option<u32> {
        self.total_pages
    }

    /// The request template
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// The pagination strategy
    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    /// Whether pages are prefetched
    pub fn is_async_enabled(&self) -> bool {
        self.async_requested && self.strategy.supports_async()
    }

    /// Current state of the run
    pub fn status(&self) -> PaginatorStatus {
        match self.state {
            PageState::NotStarted => PaginatorStatus::NotStarted,
            PageState::HasPage => PaginatorStatus::HasPage,
            PageState::Fetching(_) => PaginatorStatus::Fetching,
            PageState::Exhausted => PaginatorStatus::Exhausted,
            PageState::Failed => PaginatorStatus::Failed,
        }
    }

    /// Whether another pull may yield a page
    pub fn has_more(&self) -> bool {
        !matches!(self.state, PageState::Exhausted | PageState::Failed)
    }

    // ========================================================================
    // Iteration protocol
    // ========================================================================

    /// Reset to the starting page and forget everything fetched
    ///
    /// An in-flight prefetch is detached, not cancelled. It reports into
    /// the old tally, so it can not affect the new count.
    pub fn rewind(&mut self) {
        if matches!(self.state, PageState::Fetching(_)) {
            debug!("Detaching in-flight page {} on rewind", self.page);
        }
        self.page = self.starting_page;
        self.current_response = None;
        self.tally = Arc::new(Tally::default());
        self.total_pages = None;
        self.state = PageState::NotStarted;
        self.strategy.on_rewind();
        debug!("Rewound to page {}", self.page);
    }

    /// Pull the next page
    ///
    /// In synchronous mode the returned future is always resolved. In async
    /// mode only the first page is; later ones may still be in flight.
    /// Returns `None` once the run is over or after a failure. A strategy
    /// that can not paginate the request template fails the first pull.
    pub async fn next_page(&mut self) -> Option<Result<ResponseFuture>> {
        if matches!(self.state, PageState::NotStarted) {
            if let Err(e) = self.strategy.validate(&self.request) {
                return Some(Err(self.halt(self.page, e)));
            }
        }

        if self.is_async_enabled() {
            self.next_async().await
        } else {
            self.next_sync()
                .await
                .map(|result| result.map(ResponseFuture::ready))
        }
    }

    /// Pull the next page and wait for its response
    pub async fn next_response(&mut self) -> Option<Result<Response>> {
        let page = self.next_page().await?;
        Some(match page {
            Ok(pending) => pending.await,
            Err(e) => Err(e),
        })
    }

    async fn next_sync(&mut self) -> Option<Result<Response>> {
        if !self.has_more() {
            return None;
        }

        let page = self.page;
        debug!("Fetching page {}", page);
        let response = match self.connector.send(self.request_for(page)).await {
            Ok(response) => response,
            Err(e) => return Some(Err(self.halt(page, e))),
        };

        let context = PageContext {
            page,
            total_results: self.tally.total(),
        };
        let is_last = match self.strategy.is_last_page(&response, &context) {
            Ok(is_last) => is_last,
            Err(e) => return Some(Err(self.halt(page, e))),
        };

        self.current_response = Some(response.clone());
        if let Err(e) = self.advance(&response) {
            return Some(Err(self.halt(page, e)));
        }

        if is_last {
            info!(
                "Reached last page ({}) with {} results",
                page,
                self.tally.total()
            );
            self.state = PageState::Exhausted;
        } else {
            self.state = PageState::HasPage;
        }
        Some(Ok(response))
    }

    async fn next_async(&mut self) -> Option<Result<ResponseFuture>> {
        let page = self.page;
        if let Some(failed) = self.tally.failed_page() {
            if failed < page {
                warn!("Stopping before page {}: page {} failed", page, failed);
                self.page = failed;
                self.state = PageState::Failed;
                return None;
            }
        }

        let pending = match std::mem::replace(&mut self.state, PageState::Exhausted) {
            PageState::Exhausted => return None,
            PageState::Failed => {
                self.state = PageState::Failed;
                return None;
            }
            PageState::Fetching(pending) => {
                if self.tally.failed_page() == Some(page) {
                    // hand the failure to the caller, dispatch nothing further
                    warn!("Page {} failed in the background", page);
                    self.state = PageState::Failed;
                    return Some(Ok(pending));
                }
                pending
            }
            PageState::NotStarted | PageState::HasPage => {
                if self.current_response.is_some() {
                    self.dispatch(page)
                } else {
                    match self.fetch_first(page).await {
                        Ok(response) => ResponseFuture::ready(response),
                        Err(e) => return Some(Err(self.halt(page, e))),
                    }
                }
            }
        };

        self.page += 1;
        let total_pages = self.total_pages.unwrap_or(0);
        if self.page <= total_pages {
            self.state = PageState::Fetching(self.dispatch(self.page));
        } else {
            debug!("All {} pages dispatched", total_pages);
            self.state = PageState::Exhausted;
        }
        Some(Ok(pending))
    }

    /// First async fetch: awaited so the page count is known up front
    async fn fetch_first(&mut self, page: u32) -> Result<Response> {
        let response = self.dispatch(page).await?;
        let total_pages = self.strategy.total_pages(&response)?;
        info!("First page reports {} pages", total_pages);
        self.total_pages = Some(total_pages);
        self.current_response = Some(response.clone());
        Ok(response)
    }

    fn advance(&mut self, response: &Response) -> Result<()> {
        self.page += 1;
        self.strategy.on_next(response)
    }

    /// Clone the template, apply pagination and attach the counting hook
    fn request_for(&self, page: u32) -> Request {
        let mut request = self.strategy.apply_pagination(self.request.clone(), page);
        request.on_response(ThrowAndCountItems::new(
            self.strategy.clone(),
            Arc::clone(&self.tally),
            page,
        ));
        request
    }

    fn dispatch(&self, page: u32) -> ResponseFuture {
        debug!("Dispatching page {}", page);
        let tally = Arc::clone(&self.tally);
        tally.expect(page);
        let pending = send_async(Arc::clone(&self.connector), self.request_for(page));
        ResponseFuture::spawned(tokio::spawn(async move {
            pending.await.inspect_err(|_| tally.mark_failed(page))
        }))
    }

    fn halt(&mut self, page: u32, error: Error) -> Error {
        warn!("Pagination stopped at page {}: {}", page, error);
        self.tally.mark_failed(page);
        self.page = page;
        self.state = PageState::Failed;
        error
    }

    // ========================================================================
    // Views
    // ========================================================================

    /// Lazy sequence of pages
    pub fn pages(&mut self) -> impl Stream<Item = Result<ResponseFuture>> + '_ {
        stream::unfold(self, |paginator| async move {
            let page = paginator.next_page().await?;
            Some((page, paginator))
        })
    }

    /// Lazy sequence of resolved page responses
    pub fn responses(&mut self) -> impl Stream<Item = Result<Response>> + '_ {
        stream::unfold(self, |paginator| async move {
            let response = paginator.next_response().await?;
            Some((response, paginator))
        })
    }

    /// Lazy sequence of individual items, in page order
    ///
    /// In async mode the unit of work is the page, so each element is a
    /// whole page body instead of an item.
    pub fn items(&mut self) -> impl Stream<Item = Result<JsonValue>> + '_ {
        let buffered: VecDeque<JsonValue> = VecDeque::new();
        stream::unfold(
            (self, buffered, false),
            |(paginator, mut buffered, done)| async move {
                if done {
                    return None;
                }
                loop {
                    if let Some(item) = buffered.pop_front() {
                        return Some((Ok(item), (paginator, buffered, false)));
                    }
                    let Some(next) = paginator.next_response().await else {
                        return None;
                    };
                    let items = next.and_then(|response| {
                        if paginator.is_async_enabled() {
                            response.json_value().map(|body| vec![body])
                        } else {
                            paginator.strategy.page_items(&response)
                        }
                    });
                    match items {
                        Ok(items) => buffered.extend(items),
                        Err(e) => return Some((Err(e), (paginator, buffered, true))),
                    }
                }
            },
        )
    }

    /// Drain every item into a vector
    pub async fn collect_items(&mut self) -> Result<Vec<JsonValue>> {
        self.items().try_collect().await
    }

    /// Drain every page into a vector, awaiting in-flight pages in order
    pub async fn collect_pages(&mut self) -> Result<Vec<Response>> {
        self.responses().try_collect().await
    }

    /// Drain items or pages
    ///
    /// Async mode always drains pages.
    pub async fn collect(&mut self, through_items: bool) -> Result<Collected> {
        if through_items && !self.is_async_enabled() {
            self.collect_items().await.map(Collected::Items)
        } else {
            self.collect_pages().await.map(Collected::Pages)
        }
    }
}

impl<C, S> Paginator<C, S>
where
    C: Connector,
    S: PaginationStrategy,
{
    /// Freeze the current position and capture resumable state
    ///
    /// The starting page moves to the current page, so a later rewind
    /// returns here as well. In async mode a page that was handed out but
    /// has not landed yet is not counted; the snapshot resumes from it so
    /// it is fetched again.
    pub fn snapshot(&mut self) -> PaginatorSnapshot<S> {
        let resume_at = [self.tally.earliest_pending(), self.tally.failed_page()]
            .into_iter()
            .flatten()
            .fold(self.page, u32::min);
        if resume_at < self.page {
            debug!("Page {} has not landed, snapshot resumes there", resume_at);
        }
        self.starting_page = resume_at;
        self.strategy.on_snapshot();

        let snapshot = PaginatorSnapshot {
            version: SNAPSHOT_VERSION,
            request: self.request.clone(),
            strategy: self.strategy.clone(),
            starting_page: resume_at,
            total_results: self.tally.total_before(resume_at),
            async_enabled: self.async_requested,
            exhausted: matches!(self.state, PageState::Exhausted) && resume_at == self.page,
        };
        info!(
            "Snapshot taken at page {} ({} results)",
            snapshot.starting_page, snapshot.total_results
        );
        snapshot
    }
}

impl<C, S: std::fmt::Debug> std::fmt::Debug for Paginator<C, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Paginator")
            .field("request", &self.request)
            .field("strategy", &self.strategy)
            .field("page", &self.page)
            .field("starting_page", &self.starting_page)
            .field("total_results", &self.tally.total())
            .field("async", &self.async_requested)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
