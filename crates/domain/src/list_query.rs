use std::cmp::Ordering;

use estatedesk_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::filter::DATE_FORMAT;
use crate::{DateRange, FilterSet, FilterValue, ListRecord};

/// Page sizes offered by list views.
pub const PAGE_SIZES: [u32; 6] = [5, 10, 15, 25, 50, 100];

/// Validated page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct PageSize(u32);

impl PageSize {
    /// Creates a page size from one of the offered values.
    pub fn new(value: u32) -> AppResult<Self> {
        if !PAGE_SIZES.contains(&value) {
            return Err(AppError::Validation(format!(
                "page size must be one of {PAGE_SIZES:?}, got {value}"
            )));
        }

        Ok(Self(value))
    }

    /// Returns the numeric size.
    #[must_use]
    pub fn get(&self) -> u32 {
        self.0
    }
}

impl Default for PageSize {
    fn default() -> Self {
        Self(10)
    }
}

impl TryFrom<u32> for PageSize {
    type Error = AppError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PageSize> for u32 {
    fn from(value: PageSize) -> Self {
        value.0
    }
}

/// Sort direction for local column sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    /// Ascending order.
    Asc,
    /// Descending order.
    Desc,
}

/// Active column sort.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    /// Row field to sort by.
    pub key: String,
    /// Direction.
    pub direction: SortDirection,
}

impl SortSpec {
    /// Creates a sort spec.
    #[must_use]
    pub fn new(key: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            key: key.into(),
            direction,
        }
    }
}

/// Query parameters sent with a list fetch, in emission order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    /// Returns the parameter pairs.
    #[must_use]
    pub fn pairs(&self) -> &[(String, String)] {
        &self.0
    }

    /// Returns the first value for a key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(candidate, _)| candidate == key)
            .map(|(_, value)| value.as_str())
    }
}

/// Pagination, search, filter, sort and date-range state of one list view.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ListQueryState {
    page: u32,
    page_size: PageSize,
    search_term: String,
    sort: Option<SortSpec>,
    filters: FilterSet,
    date_range: Option<DateRange>,
}

impl ListQueryState {
    /// Creates the initial state: first page, default size, no criteria.
    #[must_use]
    pub fn new(page_size: PageSize) -> Self {
        Self {
            page: 1,
            page_size,
            ..Self::default()
        }
    }

    /// Returns the current page, starting at 1.
    #[must_use]
    pub fn page(&self) -> u32 {
        self.page.max(1)
    }

    /// Returns the page size.
    #[must_use]
    pub fn page_size(&self) -> PageSize {
        self.page_size
    }

    /// Returns the search term as typed.
    #[must_use]
    pub fn search_term(&self) -> &str {
        self.search_term.as_str()
    }

    /// Returns the local sort override.
    #[must_use]
    pub fn sort(&self) -> Option<&SortSpec> {
        self.sort.as_ref()
    }

    /// Returns the active column filters.
    #[must_use]
    pub fn filters(&self) -> &FilterSet {
        &self.filters
    }

    /// Returns the global date range.
    #[must_use]
    pub fn date_range(&self) -> Option<&DateRange> {
        self.date_range.as_ref()
    }

    /// Moves to a page; page numbers below 1 are clamped.
    pub fn set_page(&mut self, page: u32) {
        self.page = page.max(1);
    }

    /// Changes the page size and returns to the first page.
    pub fn set_page_size(&mut self, page_size: PageSize) {
        self.page_size = page_size;
        self.page = 1;
    }

    /// Changes the search term and returns to the first page.
    pub fn set_search(&mut self, term: impl Into<String>) {
        self.search_term = term.into();
        self.page = 1;
    }

    /// Sets one column filter and returns to the first page.
    pub fn set_filter_value(&mut self, key: impl Into<String>, value: FilterValue) {
        self.filters.set(key, value);
        self.page = 1;
    }

    /// Replaces all column filters and returns to the first page.
    pub fn replace_filters(&mut self, filters: FilterSet) {
        self.filters = filters;
        self.page = 1;
    }

    /// Sets the global date range and returns to the first page.
    pub fn set_date_range(&mut self, range: Option<DateRange>) {
        self.date_range = range.filter(|range| !range.is_empty());
        self.page = 1;
    }

    /// Sets the local sort; the page is kept because sorting is client-side.
    pub fn set_sort(&mut self, sort: Option<SortSpec>) {
        self.sort = sort;
    }

    /// Drops search, filters, date range and sort, returning to the first page.
    pub fn clear_all(&mut self) {
        self.search_term.clear();
        self.filters = FilterSet::new();
        self.date_range = None;
        self.sort = None;
        self.page = 1;
    }

    /// Counts active criteria: search, date range and each present filter.
    #[must_use]
    pub fn active_filter_count(&self) -> usize {
        usize::from(!self.search_term.trim().is_empty())
            + usize::from(self.date_range.is_some())
            + self.filters.active_count()
    }

    /// Builds the query parameters for the list endpoint.
    #[must_use]
    pub fn query_params(&self) -> QueryParams {
        let mut pairs = vec![
            ("page".to_owned(), self.page().to_string()),
            ("limit".to_owned(), self.page_size.get().to_string()),
        ];

        let search = self.search_term.trim();
        if !search.is_empty() {
            pairs.push(("search".to_owned(), search.to_owned()));
        }

        if let Some(range) = &self.date_range {
            if let Some(from) = range.from {
                pairs.push(("fromDate".to_owned(), from.format(DATE_FORMAT).to_string()));
            }
            if let Some(to) = range.to {
                pairs.push(("toDate".to_owned(), to.format(DATE_FORMAT).to_string()));
            }
        }

        pairs.extend(self.filters.query_pairs());
        QueryParams(pairs)
    }

    /// Applies the local sort override to loaded rows.
    pub fn sort_rows(&self, rows: &mut [ListRecord]) {
        let Some(sort) = &self.sort else {
            return;
        };

        rows.sort_by(|left, right| {
            let ordering = compare_fields(left.field(&sort.key), right.field(&sort.key));
            match sort.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        });
    }
}

fn compare_fields(left: Option<&Value>, right: Option<&Value>) -> Ordering {
    match (left, right) {
        (Some(Value::Number(left)), Some(Value::Number(right))) => left
            .as_f64()
            .partial_cmp(&right.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(left)), Some(Value::String(right))) => {
            left.to_lowercase().cmp(&right.to_lowercase())
        }
        (Some(Value::Null) | None, Some(Value::Null) | None) => Ordering::Equal,
        (Some(Value::Null) | None, Some(_)) => Ordering::Greater,
        (Some(_), Some(Value::Null) | None) => Ordering::Less,
        (Some(left), Some(right)) => left.to_string().cmp(&right.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use proptest::prelude::*;
    use serde_json::json;

    use super::{ListQueryState, PAGE_SIZES, PageSize, SortDirection, SortSpec};
    use crate::{DateRange, FilterValue, ListRecord};

    fn state_on_page(page: u32) -> ListQueryState {
        let mut state = ListQueryState::new(PageSize::default());
        state.set_page(page);
        state
    }

    #[test]
    fn page_size_rejects_unlisted_values() {
        assert!(PageSize::new(20).is_err());
        assert!(PageSize::new(25).is_ok());
    }

    #[test]
    fn initial_params_only_carry_pagination() {
        let state = ListQueryState::new(PageSize::default());
        let params = state.query_params();
        assert_eq!(params.get("page"), Some("1"));
        assert_eq!(params.get("limit"), Some("10"));
        assert_eq!(params.pairs().len(), 2);
    }

    #[test]
    fn criteria_mutations_reset_page() {
        let mut state = state_on_page(4);
        state.set_search("asha");
        assert_eq!(state.page(), 1);

        state.set_page(3);
        state.set_filter_value("status", FilterValue::Text("pending".to_owned()));
        assert_eq!(state.page(), 1);

        state.set_page(3);
        state.set_date_range(Some(DateRange::new(
            NaiveDate::from_ymd_opt(2024, 1, 1),
            None,
        )));
        assert_eq!(state.page(), 1);
        assert_eq!(state.query_params().get("fromDate"), Some("2024-01-01"));
        assert_eq!(state.active_filter_count(), 3);
    }

    #[test]
    fn sort_does_not_reset_page() {
        let mut state = state_on_page(3);
        state.set_sort(Some(SortSpec::new("name", SortDirection::Asc)));
        assert_eq!(state.page(), 3);
    }

    #[test]
    fn blank_search_is_not_sent() {
        let mut state = ListQueryState::new(PageSize::default());
        state.set_search("   ");
        assert_eq!(state.query_params().get("search"), None);
        assert_eq!(state.active_filter_count(), 0);
    }

    #[test]
    fn clear_all_restores_initial_params() {
        let initial = ListQueryState::new(PageSize::default()).query_params();
        let mut state = state_on_page(2);
        state.set_search("x");
        state.set_filter_value("status", FilterValue::Many(vec!["a".to_owned()]));
        state.clear_all();
        assert_eq!(state.query_params(), initial);
    }

    #[test]
    fn sort_rows_orders_with_missing_values_last() {
        let mut rows: Vec<ListRecord> = [
            json!({"id": 1, "bookingAmount": 500}),
            json!({"id": 2}),
            json!({"id": 3, "bookingAmount": 100}),
        ]
        .into_iter()
        .filter_map(|value| ListRecord::from_value(value).ok())
        .collect();

        let mut state = ListQueryState::new(PageSize::default());
        state.set_sort(Some(SortSpec::new("bookingAmount", SortDirection::Asc)));
        state.sort_rows(&mut rows);

        let ids: Vec<String> = rows.iter().map(|row| row.id().to_string()).collect();
        assert_eq!(ids, vec!["3", "1", "2"]);
    }

    proptest! {
        #[test]
        fn page_size_change_always_returns_to_first_page(
            page in 1_u32..500,
            size_index in 0_usize..PAGE_SIZES.len(),
        ) {
            let mut state = state_on_page(page);
            let size = PageSize::new(PAGE_SIZES[size_index]).unwrap_or_default();
            state.set_page_size(size);
            prop_assert_eq!(state.page(), 1);
        }

        #[test]
        fn filter_apply_then_clear_restores_params(
            key in "[a-z]{1,8}",
            value in "[a-zA-Z0-9]{1,12}",
        ) {
            let mut state = ListQueryState::new(PageSize::default());
            let before = state.query_params();
            state.set_filter_value(key.clone(), FilterValue::Text(value));
            state.set_filter_value(key, FilterValue::Text(String::new()));
            prop_assert_eq!(state.query_params(), before);
        }

        #[test]
        fn search_apply_then_clear_restores_params(term in "[a-z ]{0,16}") {
            let mut state = ListQueryState::new(PageSize::default());
            let before = state.query_params();
            state.set_search(term);
            state.set_search("");
            prop_assert_eq!(state.query_params(), before);
        }

        #[test]
        fn date_range_apply_then_clear_restores_params(offset in 0_i64..3650) {
            let mut state = ListQueryState::new(PageSize::default());
            let before = state.query_params();
            let from = NaiveDate::from_ymd_opt(2020, 1, 1)
                .and_then(|day| day.checked_add_signed(chrono::Duration::days(offset)));
            state.set_date_range(Some(DateRange::new(from, None)));
            state.set_date_range(None);
            prop_assert_eq!(state.query_params(), before);
        }
    }
}
