use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use estatedesk_application::{CrmBackend, PermissionSource};
use estatedesk_core::{AppError, AppResult, AuthToken, RecordId};
use estatedesk_domain::{
    BookingStatus, BookingSubmission, BookingTransition, DateRange, EntityKind, FilterSet,
    FilterValue, ListRecord, Pagination, PermissionDefinition, PermissionGrant, QueryParams,
    RecordPage,
};
use serde_json::{Map, Value};
use tokio::sync::RwLock;

const DEFAULT_LIMIT: u32 = 10;
const CREATED_AT_FIELD: &str = "createdAt";

/// In-memory CRM backend that filters and paginates like the REST server.
///
/// Used for offline CLI runs and adapter tests.
#[derive(Debug, Default)]
pub struct InMemoryCrmBackend {
    records: RwLock<HashMap<EntityKind, Vec<Value>>>,
    page_grants: RwLock<Vec<PermissionGrant>>,
    catalog: RwLock<Vec<PermissionDefinition>>,
}

impl InMemoryCrmBackend {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends rows to an entity list.
    pub async fn seed(&self, entity: EntityKind, rows: impl IntoIterator<Item = Value>) {
        self.records
            .write()
            .await
            .entry(entity)
            .or_default()
            .extend(rows);
    }

    /// Replaces the grants returned for every role.
    pub async fn set_page_grants(&self, grants: Vec<PermissionGrant>) {
        *self.page_grants.write().await = grants;
    }

    /// Replaces the permission catalog.
    pub async fn set_catalog(&self, catalog: Vec<PermissionDefinition>) {
        *self.catalog.write().await = catalog;
    }

    /// Returns a copy of the stored rows of an entity.
    pub async fn rows(&self, entity: EntityKind) -> Vec<Value> {
        self.records
            .read()
            .await
            .get(&entity)
            .cloned()
            .unwrap_or_default()
    }
}

fn row_id(row: &Value) -> Option<RecordId> {
    ListRecord::from_value(row.clone())
        .ok()
        .map(|record| record.id().clone())
}

fn position_of(rows: &[Value], id: &RecordId) -> Option<usize> {
    rows.iter().position(|row| row_id(row).as_ref() == Some(id))
}

fn parse_number(params: &QueryParams, key: &str, default: u32) -> AppResult<u32> {
    match params.get(key) {
        None => Ok(default),
        Some(value) => value.trim().parse::<u32>().map_err(|error| {
            AppError::Validation(format!("invalid '{key}' parameter '{value}': {error}"))
        }),
    }
}

/// Filters a list request encodes.
///
/// A comma-joined value is either a multi-select column or free text that
/// contains a comma; such columns match when either reading does.
#[derive(Debug, Default)]
struct RequestFilters {
    exact: FilterSet,
    joined: Vec<(FilterSet, FilterSet)>,
}

impl RequestFilters {
    fn matches(&self, row: &Value) -> bool {
        self.exact.matches(row)
            && self
                .joined
                .iter()
                .all(|(options, text)| options.matches(row) || text.matches(row))
    }
}

fn single_filter(key: &str, value: FilterValue) -> FilterSet {
    let mut filters = FilterSet::new();
    filters.set(key, value);
    filters
}

fn filters_from_params(params: &QueryParams) -> AppResult<RequestFilters> {
    let mut filters = RequestFilters::default();
    let mut ranges: HashMap<String, (String, String)> = HashMap::new();

    for (key, value) in params.pairs() {
        match key.as_str() {
            "page" | "limit" | "search" => {}
            "fromDate" => ranges.entry(CREATED_AT_FIELD.to_owned()).or_default().0 = value.clone(),
            "toDate" => ranges.entry(CREATED_AT_FIELD.to_owned()).or_default().1 = value.clone(),
            _ => {
                if let Some(field) = key.strip_suffix("From").filter(|_| is_date(value)) {
                    ranges.entry(field.to_owned()).or_default().0 = value.clone();
                } else if let Some(field) = key.strip_suffix("To").filter(|_| is_date(value)) {
                    ranges.entry(field.to_owned()).or_default().1 = value.clone();
                } else if value.contains(',') {
                    let options = value.split(',').map(str::to_owned).collect();
                    filters.joined.push((
                        single_filter(key, FilterValue::Many(options)),
                        single_filter(key, FilterValue::Text(value.clone())),
                    ));
                } else {
                    filters.exact.set(key.as_str(), FilterValue::Text(value.clone()));
                }
            }
        }
    }

    for (field, (from, to)) in ranges {
        filters
            .exact
            .set(field, FilterValue::Range(DateRange::parse(&from, &to)?));
    }

    Ok(filters)
}

fn is_date(value: &str) -> bool {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").is_ok()
}

fn matches_search(row: &Value, term: &str) -> bool {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return true;
    }

    row.as_object().is_some_and(|object| {
        object.values().any(|value| match value {
            Value::String(text) => text.to_lowercase().contains(&term),
            Value::Number(number) => number.to_string().contains(&term),
            _ => false,
        })
    })
}

fn set_field(row: &mut Value, key: &str, value: Value) {
    if let Some(object) = row.as_object_mut() {
        object.insert(key.to_owned(), value);
    }
}

#[async_trait]
impl CrmBackend for InMemoryCrmBackend {
    async fn list_records(
        &self,
        _token: &AuthToken,
        entity: EntityKind,
        params: &QueryParams,
    ) -> AppResult<RecordPage> {
        let page = parse_number(params, "page", 1)?.max(1);
        let limit = parse_number(params, "limit", DEFAULT_LIMIT)?.max(1);
        let search = params.get("search").unwrap_or_default();
        let filters = filters_from_params(params)?;

        let records = self.records.read().await;
        let matching: Vec<&Value> = records
            .get(&entity)
            .map(|rows| {
                rows.iter()
                    .filter(|row| matches_search(row, search) && filters.matches(row))
                    .collect()
            })
            .unwrap_or_default();

        let total = matching.len() as u64;
        let offset = (page as usize - 1) * limit as usize;
        let rows = matching
            .into_iter()
            .skip(offset)
            .take(limit as usize)
            .map(|row| ListRecord::from_value(row.clone()))
            .collect::<AppResult<Vec<_>>>()?;

        Ok(RecordPage {
            rows,
            pagination: Pagination {
                total,
                page,
                limit,
                total_pages: total.div_ceil(u64::from(limit)) as u32,
            },
        })
    }

    async fn delete_record(
        &self,
        _token: &AuthToken,
        entity: EntityKind,
        id: &RecordId,
    ) -> AppResult<()> {
        let mut records = self.records.write().await;
        let rows = records.entry(entity).or_default();
        let index = position_of(rows, id).ok_or_else(|| {
            AppError::NotFound(format!("{} '{id}' does not exist", entity.singular_name()))
        })?;
        rows.remove(index);
        Ok(())
    }

    async fn bulk_delete(
        &self,
        _token: &AuthToken,
        entity: EntityKind,
        ids: &[RecordId],
    ) -> AppResult<()> {
        let mut records = self.records.write().await;
        let rows = records.entry(entity).or_default();
        rows.retain(|row| row_id(row).is_none_or(|id| !ids.contains(&id)));
        Ok(())
    }

    async fn bulk_assign(
        &self,
        _token: &AuthToken,
        entity: EntityKind,
        ids: &[RecordId],
        assignee_id: &RecordId,
    ) -> AppResult<()> {
        let assignee = serde_json::to_value(assignee_id)
            .map_err(|error| AppError::Internal(format!("failed to encode assignee: {error}")))?;

        let mut records = self.records.write().await;
        let rows = records.entry(entity).or_default();
        for row in rows.iter_mut() {
            if row_id(row).is_some_and(|id| ids.contains(&id)) {
                set_field(row, "assignedTo", assignee.clone());
            }
        }
        Ok(())
    }

    async fn transition_booking(
        &self,
        _token: &AuthToken,
        booking_id: &RecordId,
        transition: BookingTransition,
    ) -> AppResult<()> {
        let mut records = self.records.write().await;
        let rows = records.entry(EntityKind::Bookings).or_default();
        let index = position_of(rows, booking_id)
            .ok_or_else(|| AppError::NotFound(format!("booking '{booking_id}' does not exist")))?;

        let row = &mut rows[index];
        let current = row
            .get("status")
            .and_then(Value::as_str)
            .unwrap_or(BookingStatus::Pending.as_str())
            .parse::<BookingStatus>()?;
        let next = current.apply(transition)?;

        set_field(row, "status", Value::String(next.as_str().to_owned()));
        set_field(row, "approvedByName", Value::String("Admin".to_owned()));
        set_field(row, "approvedAt", Value::String(Utc::now().to_rfc3339()));
        Ok(())
    }

    async fn save_booking(
        &self,
        _token: &AuthToken,
        booking_id: Option<&RecordId>,
        submission: &BookingSubmission,
    ) -> AppResult<()> {
        let fields = match serde_json::to_value(submission) {
            Ok(Value::Object(fields)) => fields,
            Ok(_) => Map::new(),
            Err(error) => {
                return Err(AppError::Internal(format!(
                    "failed to encode booking: {error}"
                )));
            }
        };

        let mut records = self.records.write().await;
        let rows = records.entry(EntityKind::Bookings).or_default();

        if let Some(id) = booking_id {
            let index = position_of(rows, id)
                .ok_or_else(|| AppError::NotFound(format!("booking '{id}' does not exist")))?;
            for (key, value) in fields {
                set_field(&mut rows[index], key.as_str(), value);
            }
            return Ok(());
        }

        let next_id = rows
            .iter()
            .filter_map(|row| match row_id(row) {
                Some(RecordId::Number(value)) => Some(value),
                _ => None,
            })
            .max()
            .unwrap_or(0)
            + 1;

        let mut row = Value::Object(fields);
        set_field(&mut row, "id", Value::from(next_id));
        set_field(&mut row, "status", Value::String(BookingStatus::Pending.as_str().to_owned()));
        set_field(&mut row, CREATED_AT_FIELD, Value::String(Utc::now().to_rfc3339()));
        rows.push(row);
        Ok(())
    }
}

#[async_trait]
impl PermissionSource for InMemoryCrmBackend {
    async fn fetch_page_grants(
        &self,
        _token: &AuthToken,
        _role_id: &str,
    ) -> AppResult<Vec<PermissionGrant>> {
        Ok(self.page_grants.read().await.clone())
    }

    async fn fetch_permission_catalog(
        &self,
        _token: &AuthToken,
    ) -> AppResult<Vec<PermissionDefinition>> {
        Ok(self.catalog.read().await.clone())
    }
}
