use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use estatedesk_core::{AppError, AppResult, RecordId};
use estatedesk_domain::{
    DateRange, EntityKind, FilterSet, FilterValue, ListQueryState, ListRecord, PageSize,
    Pagination, QueryParams, RecordPage, SelectionSet, SortSpec,
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::crm_ports::{CrmBackend, Notice, Notifier, TokenStore};

/// Result of one list fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Rows of this request are now displayed.
    Applied,
    /// No token was stored; the list was emptied without a request.
    Unauthenticated,
    /// A newer request was issued meanwhile; this response was discarded.
    Superseded,
}

/// Read-only view of a list for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct ListSnapshot {
    /// Entity shown by the list.
    pub entity: EntityKind,
    /// Loaded rows with the local sort applied.
    pub rows: Vec<ListRecord>,
    /// Pagination of the last applied response.
    pub pagination: Pagination,
    /// Query state the rows were requested with.
    pub query: ListQueryState,
    /// Selected row ids.
    pub selected_ids: Vec<RecordId>,
    /// Whether a fetch is in flight.
    pub loading: bool,
}

#[derive(Debug)]
struct ListViewState {
    query: ListQueryState,
    rows: Vec<ListRecord>,
    pagination: Pagination,
    selection: SelectionSet,
    loading: bool,
}

/// Per-view list state bound to one entity endpoint.
///
/// Every query change triggers a fetch. Responses are tagged with the id of
/// the request that produced them and only the latest issued request may
/// update the rows.
pub struct ListController {
    entity: EntityKind,
    backend: Arc<dyn CrmBackend>,
    tokens: Arc<dyn TokenStore>,
    notifier: Arc<dyn Notifier>,
    state: Mutex<ListViewState>,
    latest_request_id: AtomicU64,
}

impl ListController {
    /// Creates a list view for an entity on its first page.
    #[must_use]
    pub fn new(
        entity: EntityKind,
        page_size: PageSize,
        backend: Arc<dyn CrmBackend>,
        tokens: Arc<dyn TokenStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self::with_query(
            entity,
            ListQueryState::new(page_size),
            backend,
            tokens,
            notifier,
        )
    }

    /// Creates a list view with a prepared query; nothing is fetched until
    /// [`ListController::refresh`].
    #[must_use]
    pub fn with_query(
        entity: EntityKind,
        query: ListQueryState,
        backend: Arc<dyn CrmBackend>,
        tokens: Arc<dyn TokenStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            entity,
            backend,
            tokens,
            notifier,
            state: Mutex::new(ListViewState {
                query,
                rows: Vec::new(),
                pagination: Pagination::default(),
                selection: SelectionSet::new(),
                loading: false,
            }),
            latest_request_id: AtomicU64::new(0),
        }
    }

    /// Returns the entity shown by this list.
    #[must_use]
    pub fn entity(&self) -> EntityKind {
        self.entity
    }

    /// Returns the current rows, pagination, query and selection.
    pub async fn snapshot(&self) -> ListSnapshot {
        let state = self.state.lock().await;
        let mut rows = state.rows.clone();
        state.query.sort_rows(&mut rows);

        ListSnapshot {
            entity: self.entity,
            rows,
            pagination: state.pagination,
            query: state.query.clone(),
            selected_ids: state.selection.selected_ids(),
            loading: state.loading,
        }
    }

    /// Returns the parameters the next fetch would send.
    pub async fn query_params(&self) -> QueryParams {
        self.state.lock().await.query.query_params()
    }

    /// Moves to a page and fetches it.
    pub async fn set_page(&self, page: u32) -> AppResult<FetchOutcome> {
        self.update_and_fetch(|query| query.set_page(page)).await
    }

    /// Changes the page size, returns to page 1 and fetches.
    pub async fn set_page_size(&self, page_size: u32) -> AppResult<FetchOutcome> {
        let page_size = PageSize::new(page_size)?;
        self.update_and_fetch(|query| query.set_page_size(page_size))
            .await
    }

    /// Changes the search term, returns to page 1 and fetches.
    pub async fn set_search(&self, term: impl Into<String>) -> AppResult<FetchOutcome> {
        let term = term.into();
        self.update_and_fetch(|query| query.set_search(term)).await
    }

    /// Sets one column filter, returns to page 1 and fetches.
    pub async fn set_filter_value(
        &self,
        key: impl Into<String>,
        value: FilterValue,
    ) -> AppResult<FetchOutcome> {
        let key = key.into();
        self.update_and_fetch(|query| query.set_filter_value(key, value))
            .await
    }

    /// Replaces all column filters (an applied filter panel), returns to page 1 and fetches.
    pub async fn apply_filters(&self, filters: &FilterSet) -> AppResult<FetchOutcome> {
        let filters = filters.clone();
        self.update_and_fetch(|query| query.replace_filters(filters))
            .await
    }

    /// Removes one column filter immediately and fetches.
    pub async fn clear_filter(&self, key: &str) -> AppResult<FetchOutcome> {
        self.update_and_fetch(|query| {
            query.set_filter_value(key, FilterValue::Text(String::new()));
        })
        .await
    }

    /// Sets the global date range, returns to page 1 and fetches.
    pub async fn set_date_range(&self, range: Option<DateRange>) -> AppResult<FetchOutcome> {
        self.update_and_fetch(|query| query.set_date_range(range))
            .await
    }

    /// Clears every criterion, returns to page 1 and fetches.
    pub async fn clear_all(&self) -> AppResult<FetchOutcome> {
        self.update_and_fetch(ListQueryState::clear_all).await
    }

    /// Changes the local sort of loaded rows; no fetch is issued.
    pub async fn set_sort(&self, sort: Option<SortSpec>) {
        self.state.lock().await.query.set_sort(sort);
    }

    /// Toggles one row in the selection; ids outside the loaded page are ignored.
    pub async fn toggle_selection(&self, id: RecordId) {
        let mut state = self.state.lock().await;
        if state.rows.iter().any(|row| row.id() == &id) {
            state.selection.toggle(id);
        }
    }

    /// Selects every loaded row, or clears when all are already selected.
    pub async fn select_all_visible(&self) {
        let mut state = self.state.lock().await;
        let ListViewState {
            rows, selection, ..
        } = &mut *state;
        selection.select_all_visible(rows.iter().map(ListRecord::id));
    }

    /// Clears the selection.
    pub async fn clear_selection(&self) {
        self.state.lock().await.selection.clear();
    }

    /// Returns the selected ids.
    pub async fn selected_ids(&self) -> Vec<RecordId> {
        self.state.lock().await.selection.selected_ids()
    }

    /// Returns a loaded row by id.
    pub async fn find_loaded(&self, id: &RecordId) -> Option<ListRecord> {
        self.state
            .lock()
            .await
            .rows
            .iter()
            .find(|row| row.id() == id)
            .cloned()
    }

    /// Re-fetches the current page with the current query.
    ///
    /// On failure the rows are emptied and a notice is shown; a 401 shows the
    /// session-expired notice. Failures of superseded requests are dropped.
    pub async fn refresh(&self) -> AppResult<FetchOutcome> {
        let (request_id, params) = {
            let mut state = self.state.lock().await;
            state.loading = true;
            let request_id = self.latest_request_id.fetch_add(1, Ordering::SeqCst) + 1;
            (request_id, state.query.query_params())
        };

        debug!(
            entity = self.entity.as_str(),
            request_id,
            params = ?params.pairs(),
            "list fetch issued"
        );

        let result = match self.tokens.load_token().await {
            Ok(Some(token)) => self
                .backend
                .list_records(&token, self.entity, &params)
                .await
                .map(Some),
            Ok(None) => Ok(None),
            Err(error) => Err(error),
        };

        let mut state = self.state.lock().await;
        if self.latest_request_id.load(Ordering::SeqCst) != request_id {
            debug!(
                entity = self.entity.as_str(),
                request_id, "discarding superseded list response"
            );
            return Ok(FetchOutcome::Superseded);
        }

        state.loading = false;
        match result {
            Ok(Some(page)) => {
                info!(
                    entity = self.entity.as_str(),
                    request_id,
                    rows = page.rows.len(),
                    total = page.pagination.total,
                    "list page applied"
                );
                apply_page(&mut state, page);
                Ok(FetchOutcome::Applied)
            }
            Ok(None) => {
                warn!(entity = self.entity.as_str(), "no session token, list emptied");
                apply_page(&mut state, RecordPage::empty());
                Ok(FetchOutcome::Unauthenticated)
            }
            Err(error) => {
                warn!(
                    entity = self.entity.as_str(),
                    request_id,
                    error = %error,
                    "list fetch failed"
                );
                apply_page(&mut state, RecordPage::empty());
                drop(state);
                self.notifier.notify(failure_notice(
                    &error,
                    format!("Failed to load {}", self.entity.plural_name().to_lowercase()),
                ));
                Err(error)
            }
        }
    }

    async fn update_and_fetch<F>(&self, update: F) -> AppResult<FetchOutcome>
    where
        F: FnOnce(&mut ListQueryState),
    {
        {
            let mut state = self.state.lock().await;
            update(&mut state.query);
        }

        self.refresh().await
    }
}

fn apply_page(state: &mut ListViewState, page: RecordPage) {
    let mut pagination = page.pagination;
    if pagination.page == 0 {
        pagination.page = state.query.page();
    }
    if pagination.limit == 0 {
        pagination.limit = state.query.page_size().get();
    }
    if pagination.total_pages == 0 && pagination.total > 0 {
        pagination.total_pages =
            u32::try_from(pagination.total.div_ceil(u64::from(pagination.limit)))
                .unwrap_or(u32::MAX);
    }

    state.rows = page.rows;
    state.pagination = pagination;
    state.selection.retain_visible(state.rows.iter().map(ListRecord::id));
}

/// Builds the notice for a failed request: session expiry for auth errors,
/// the server message when present, otherwise the fallback text.
pub(crate) fn failure_notice(error: &AppError, fallback: String) -> Notice {
    if error.is_session_expired() {
        return Notice::SessionExpired;
    }

    let message = error.message().trim();
    if message.is_empty() {
        Notice::Error(fallback)
    } else {
        Notice::Error(message.to_owned())
    }
}
