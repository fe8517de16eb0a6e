//! Cursor paginator over a [`ProductCatalog`].

use std::sync::Arc;

use shopnow_core::{CursorState, PageRequest};
use tokio::sync::watch;
use tracing::{debug, instrument};

use super::{CatalogState, FetchError, FetchMode, FetchOutcome, Phase, SkipReason};
use crate::remote::ProductCatalog;

/// Fetches pages of products and keeps the cumulative list.
///
/// At most one fetch runs at a time: a second request while one is in flight
/// is dropped with [`SkipReason::Busy`], never queued. The guard is taken and
/// released inside the watch channel, so no lock is held across the catalog
/// call.
pub struct Paginator {
    catalog: Arc<dyn ProductCatalog>,
    page_size: usize,
    state: watch::Sender<CatalogState>,
}

impl Paginator {
    /// Create a paginator requesting `page_size` products per page.
    #[must_use]
    pub fn new(catalog: Arc<dyn ProductCatalog>, page_size: usize) -> Self {
        let (state, _) = watch::channel(CatalogState::default());
        Self {
            catalog,
            page_size: page_size.max(1),
            state,
        }
    }

    #[must_use]
    pub const fn page_size(&self) -> usize {
        self.page_size
    }

    /// Subscribe to state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CatalogState> {
        self.state.subscribe()
    }

    /// Copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> CatalogState {
        self.state.borrow().clone()
    }

    /// Fetch one page in `mode`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] when the catalog call fails. The product list
    /// and cursor are left untouched and `last_error` is recorded.
    pub async fn fetch_page(&self, mode: FetchMode) -> Result<FetchOutcome, FetchError> {
        self.fetch(mode, false).await
    }

    /// Reset fetch triggered by pull-to-refresh; `refreshing` is set while it runs.
    ///
    /// # Errors
    ///
    /// Same as [`Paginator::fetch_page`].
    pub async fn refresh(&self) -> Result<FetchOutcome, FetchError> {
        self.fetch(FetchMode::Reset, true).await
    }

    /// Stop accepting fetches and ignore results still in flight.
    pub fn detach(&self) {
        self.state.send_modify(|state| {
            state.phase = Phase::Detached;
            state.loading = false;
            state.loading_more = false;
            state.refreshing = false;
        });
    }

    #[instrument(skip(self), fields(page_size = self.page_size))]
    async fn fetch(&self, mode: FetchMode, user_refresh: bool) -> Result<FetchOutcome, FetchError> {
        let request = match self.begin(mode, user_refresh) {
            Ok(request) => request,
            Err(reason) => {
                debug!(?reason, "fetch skipped");
                return Ok(FetchOutcome::Skipped(reason));
            }
        };

        let result = self.catalog.fetch_page(request).await;

        let mut detached = false;
        let outcome = match result {
            Ok(page) => {
                let count = page.len();
                let cursor = CursorState::after_page(&page, self.page_size);
                let exhausted = cursor.is_exhausted();
                self.state.send_modify(|state| {
                    release(state, mode);
                    if state.phase == Phase::Detached {
                        detached = true;
                        return;
                    }
                    match mode {
                        FetchMode::Reset => state.products = page.products,
                        FetchMode::Append => state.products.extend(page.products),
                    }
                    state.cursor = cursor;
                    state.phase = Phase::Ready;
                });
                if !detached {
                    debug!(count, exhausted, "page merged");
                }
                Ok(FetchOutcome::Loaded { count, exhausted })
            }
            Err(source) => {
                let message = source.to_string();
                self.state.send_modify(|state| {
                    release(state, mode);
                    if state.phase == Phase::Detached {
                        detached = true;
                        return;
                    }
                    state.last_error = Some(message);
                    state.phase = if state.cursor == CursorState::NotStarted {
                        Phase::Idle
                    } else {
                        Phase::Ready
                    };
                });
                Err(FetchError { mode, source })
            }
        };

        if detached {
            debug!("result arrived after teardown, discarded");
            return Ok(FetchOutcome::Discarded);
        }
        outcome
    }

    /// Take the busy guard and build the request, or say why not.
    fn begin(&self, mode: FetchMode, user_refresh: bool) -> Result<PageRequest, SkipReason> {
        let mut begun = Err(SkipReason::Busy);
        self.state.send_if_modified(|state| {
            if state.phase == Phase::Detached {
                begun = Err(SkipReason::Detached);
                return false;
            }
            if state.is_busy() {
                return false;
            }
            match mode {
                FetchMode::Reset => {
                    state.phase = if state.phase == Phase::Idle {
                        Phase::InitialLoad
                    } else {
                        Phase::RefreshLoad
                    };
                    state.loading = true;
                    state.refreshing = user_refresh;
                    begun = Ok(PageRequest::first(self.page_size).fresh());
                }
                FetchMode::Append => match &state.cursor {
                    CursorState::NotStarted => {
                        begun = Err(SkipReason::NotStarted);
                        return false;
                    }
                    CursorState::Exhausted => {
                        begun = Err(SkipReason::Exhausted);
                        return false;
                    }
                    CursorState::HasMore(cursor) => {
                        begun = Ok(PageRequest::after(self.page_size, cursor.clone()));
                        state.phase = Phase::AppendLoad;
                        state.loading_more = true;
                    }
                },
            }
            state.last_error = None;
            true
        });
        begun
    }
}

/// Release the busy flags owned by a fetch in `mode`.
fn release(state: &mut CatalogState, mode: FetchMode) {
    match mode {
        FetchMode::Reset => {
            state.loading = false;
            state.refreshing = false;
        }
        FetchMode::Append => state.loading_more = false,
    }
}
