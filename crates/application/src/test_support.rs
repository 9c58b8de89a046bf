//! Fakes for application ports shared by service tests.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use std::sync::Arc;

use estatedesk_core::{AppError, AppResult, AuthToken, RecordId, SessionUser, UserRole};
use estatedesk_domain::{
    BookingSubmission, BookingTransition, CapabilityIds, EntityKind, ListRecord, Pagination,
    PermissionDefinition, PermissionGrant, QueryParams, RecordPage,
};
use serde_json::{Value, json};
use tokio::sync::{Mutex, oneshot};

use crate::PermissionSessionService;
use crate::crm_ports::{CrmBackend, Notice, Notifier, PermissionSource, TokenStore};

pub(crate) struct FakeTokenStore(pub Option<&'static str>);

#[async_trait]
impl TokenStore for FakeTokenStore {
    async fn load_token(&self) -> AppResult<Option<AuthToken>> {
        Ok(self.0.and_then(AuthToken::new))
    }
}

#[derive(Default)]
pub(crate) struct RecordingNotifier {
    pub notices: std::sync::Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn take(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .map(|mut notices| std::mem::take(&mut *notices))
            .unwrap_or_default()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        if let Ok(mut notices) = self.notices.lock() {
            notices.push(notice);
        }
    }
}

/// Backend serving rows from memory, optionally holding list responses until released.
#[derive(Default)]
pub(crate) struct FakeCrmBackend {
    pub rows: Mutex<Vec<Value>>,
    pub list_calls: Mutex<Vec<QueryParams>>,
    pub mutation_calls: Mutex<Vec<String>>,
    pub list_failure: Mutex<Option<(u16, String)>>,
    pub mutation_failure: Mutex<Option<(u16, String)>>,
    pub hold_lists: AtomicBool,
    pub held: Mutex<Vec<(String, oneshot::Sender<()>)>>,
}

impl FakeCrmBackend {
    pub fn with_rows(rows: Vec<Value>) -> Self {
        Self {
            rows: Mutex::new(rows),
            ..Self::default()
        }
    }

    pub async fn mutation_calls(&self) -> Vec<String> {
        self.mutation_calls.lock().await.clone()
    }

    /// Releases the held list request issued with the given search term.
    pub async fn release(&self, search: &str) -> bool {
        let mut held = self.held.lock().await;
        let Some(position) = held.iter().position(|(term, _)| term == search) else {
            return false;
        };
        let (_, sender) = held.remove(position);
        sender.send(()).is_ok()
    }

    pub async fn held_count(&self) -> usize {
        self.held.lock().await.len()
    }

    async fn record_mutation(&self, call: String) -> AppResult<()> {
        self.mutation_calls.lock().await.push(call);
        match self.mutation_failure.lock().await.clone() {
            Some((status, message)) => Err(status_error(status, message)),
            None => Ok(()),
        }
    }
}

pub(crate) fn status_error(status: u16, message: String) -> AppError {
    match status {
        401 => AppError::Unauthorized(message),
        403 => AppError::Forbidden(message),
        404 => AppError::NotFound(message),
        _ => AppError::Internal(message),
    }
}

pub(crate) fn ids(values: &[i64]) -> Vec<RecordId> {
    values.iter().copied().map(RecordId::Number).collect()
}

fn id_matches(row: &Value, id: &RecordId) -> bool {
    match (row.get("id"), id) {
        (Some(Value::Number(number)), RecordId::Number(expected)) => {
            number.as_i64() == Some(*expected)
        }
        (Some(Value::String(text)), RecordId::Text(expected)) => text == expected,
        _ => false,
    }
}

#[async_trait]
impl CrmBackend for FakeCrmBackend {
    async fn list_records(
        &self,
        _token: &AuthToken,
        _entity: EntityKind,
        params: &QueryParams,
    ) -> AppResult<RecordPage> {
        self.list_calls.lock().await.push(params.clone());
        let search = params.get("search").unwrap_or_default().to_owned();

        if self.hold_lists.load(Ordering::SeqCst) {
            let (sender, receiver) = oneshot::channel();
            self.held.lock().await.push((search.clone(), sender));
            let _ = receiver.await;
        }

        if let Some((status, message)) = self.list_failure.lock().await.clone() {
            return Err(status_error(status, message));
        }

        let page = params
            .get("page")
            .and_then(|value| value.parse::<usize>().ok())
            .unwrap_or(1);
        let limit = params
            .get("limit")
            .and_then(|value| value.parse::<usize>().ok())
            .unwrap_or(10);

        let matching: Vec<Value> = self
            .rows
            .lock()
            .await
            .iter()
            .filter(|row| {
                search.is_empty()
                    || row
                        .get("name")
                        .and_then(Value::as_str)
                        .is_some_and(|name| name.contains(search.as_str()))
            })
            .cloned()
            .collect();
        let total = matching.len();

        let rows = matching
            .into_iter()
            .skip((page - 1) * limit)
            .take(limit)
            .filter_map(|row| ListRecord::from_value(row).ok())
            .collect();

        Ok(RecordPage {
            rows,
            pagination: Pagination {
                total: total as u64,
                page: page as u32,
                limit: limit as u32,
                total_pages: total.div_ceil(limit) as u32,
            },
        })
    }

    async fn delete_record(
        &self,
        _token: &AuthToken,
        entity: EntityKind,
        id: &RecordId,
    ) -> AppResult<()> {
        self.record_mutation(format!("delete:{}:{id}", entity.as_str()))
            .await?;
        self.rows.lock().await.retain(|row| !id_matches(row, id));
        Ok(())
    }

    async fn bulk_delete(
        &self,
        _token: &AuthToken,
        entity: EntityKind,
        ids: &[RecordId],
    ) -> AppResult<()> {
        let joined = ids.iter().map(ToString::to_string).collect::<Vec<_>>();
        self.record_mutation(format!("bulk_delete:{}:{}", entity.as_str(), joined.join(",")))
            .await?;
        self.rows
            .lock()
            .await
            .retain(|row| !ids.iter().any(|id| id_matches(row, id)));
        Ok(())
    }

    async fn bulk_assign(
        &self,
        _token: &AuthToken,
        entity: EntityKind,
        ids: &[RecordId],
        assignee_id: &RecordId,
    ) -> AppResult<()> {
        let joined = ids.iter().map(ToString::to_string).collect::<Vec<_>>();
        self.record_mutation(format!(
            "bulk_assign:{}:{}:{assignee_id}",
            entity.as_str(),
            joined.join(",")
        ))
        .await
    }

    async fn transition_booking(
        &self,
        _token: &AuthToken,
        booking_id: &RecordId,
        transition: BookingTransition,
    ) -> AppResult<()> {
        self.record_mutation(format!(
            "POST /bookings/bookings/{booking_id}/{}",
            transition.path_segment()
        ))
        .await?;

        for row in self.rows.lock().await.iter_mut() {
            if id_matches(row, booking_id)
                && let Some(object) = row.as_object_mut()
            {
                object.insert(
                    "status".to_owned(),
                    json!(transition.target_status().as_str()),
                );
                object.insert("approvedByName".to_owned(), json!("Admin One"));
                object.insert("approvedAt".to_owned(), json!("2024-05-01T09:30:00Z"));
            }
        }
        Ok(())
    }

    async fn save_booking(
        &self,
        _token: &AuthToken,
        booking_id: Option<&RecordId>,
        submission: &BookingSubmission,
    ) -> AppResult<()> {
        let target = booking_id.map_or_else(|| "new".to_owned(), ToString::to_string);
        self.record_mutation(format!(
            "save_booking:{target}:{}",
            submission.customer_name
        ))
        .await
    }
}

pub(crate) struct FakePermissionSource {
    pub grants: Vec<PermissionGrant>,
    pub catalog: Vec<PermissionDefinition>,
}

#[async_trait]
impl PermissionSource for FakePermissionSource {
    async fn fetch_page_grants(
        &self,
        _token: &AuthToken,
        _role_id: &str,
    ) -> AppResult<Vec<PermissionGrant>> {
        Ok(self.grants.clone())
    }

    async fn fetch_permission_catalog(
        &self,
        _token: &AuthToken,
    ) -> AppResult<Vec<PermissionDefinition>> {
        Ok(self.catalog.clone())
    }
}

/// Loads a permission session holding the given grants and an empty catalog.
pub(crate) async fn loaded_permissions(grants: Vec<PermissionGrant>) -> PermissionSessionService {
    let service = PermissionSessionService::new(
        Arc::new(FakePermissionSource {
            grants,
            catalog: Vec::new(),
        }),
        Arc::new(FakeTokenStore(Some("token"))),
        CapabilityIds::default(),
    );
    let _ = service
        .load(&SessionUser::new("Tester", "1", UserRole::Admin))
        .await;
    service
}
