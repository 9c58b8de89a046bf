use async_trait::async_trait;
use estatedesk_application::{CrmBackend, PermissionSource};
use estatedesk_core::{AppError, AppResult, AuthToken, RecordId};
use estatedesk_domain::{
    BookingSubmission, BookingTransition, EntityKind, PermissionDefinition, PermissionGrant,
    QueryParams, RecordPage,
};
use reqwest::{RequestBuilder, StatusCode, header};
use serde_json::{Value, json};
use tracing::debug;

use crate::response_normalization::{
    normalize_catalog, normalize_grants, normalize_record_page, server_message,
};

mod routes;

use routes::ApiRoutes;

/// REST adapter for the CRM backend.
///
/// Sends the bearer token on every call and maps HTTP failures to
/// [`AppError`] categories. Nothing is retried.
pub struct HttpCrmBackend {
    http_client: reqwest::Client,
    routes: ApiRoutes,
}

impl HttpCrmBackend {
    /// Creates a backend adapter for an API base URL such as
    /// `http://127.0.0.1:5000/api`.
    #[must_use]
    pub fn new(http_client: reqwest::Client, api_base_url: &str) -> Self {
        Self {
            http_client,
            routes: ApiRoutes::new(api_base_url),
        }
    }

    async fn send(
        &self,
        token: &AuthToken,
        builder: RequestBuilder,
        call: &str,
    ) -> AppResult<Value> {
        let response = builder
            .header(header::AUTHORIZATION, format!("Bearer {}", token.as_str()))
            .send()
            .await
            .map_err(|error| AppError::Internal(format!("failed to call {call}: {error}")))?;

        let status = response.status();
        let body = response.text().await.map_err(|error| {
            AppError::Internal(format!("failed to read {call} response: {error}"))
        })?;
        let payload = parse_body(body.as_str());
        debug!(call, status = status.as_u16(), "backend call finished");

        if !status.is_success() {
            return Err(status_error(status, &payload, call));
        }

        if payload.get("success") == Some(&Value::Bool(false)) {
            return Err(AppError::Internal(
                server_message(&payload).unwrap_or_else(|| format!("{call} was not successful")),
            ));
        }

        Ok(payload)
    }
}

fn parse_body(body: &str) -> Value {
    if body.trim().is_empty() {
        return Value::Null;
    }

    serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_owned()))
}

/// Maps a non-success status to an error, preferring the server's own message.
fn status_error(status: StatusCode, payload: &Value, call: &str) -> AppError {
    let message = server_message(payload)
        .unwrap_or_else(|| format!("{call} returned status {}", status.as_u16()));

    match status {
        StatusCode::UNAUTHORIZED => AppError::Unauthorized(message),
        StatusCode::FORBIDDEN => AppError::Forbidden(message),
        StatusCode::NOT_FOUND => AppError::NotFound(message),
        StatusCode::CONFLICT => AppError::Conflict(message),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            AppError::Validation(message)
        }
        _ => AppError::Internal(message),
    }
}

#[async_trait]
impl CrmBackend for HttpCrmBackend {
    async fn list_records(
        &self,
        token: &AuthToken,
        entity: EntityKind,
        params: &QueryParams,
    ) -> AppResult<RecordPage> {
        let builder = self
            .http_client
            .get(self.routes.list(entity))
            .query(params.pairs());
        let payload = self.send(token, builder, "list endpoint").await?;
        normalize_record_page(&payload)
    }

    async fn delete_record(
        &self,
        token: &AuthToken,
        entity: EntityKind,
        id: &RecordId,
    ) -> AppResult<()> {
        let builder = self.http_client.delete(self.routes.delete(entity, id));
        self.send(token, builder, "delete endpoint").await?;
        Ok(())
    }

    async fn bulk_delete(
        &self,
        token: &AuthToken,
        entity: EntityKind,
        ids: &[RecordId],
    ) -> AppResult<()> {
        let builder = self
            .http_client
            .post(self.routes.bulk_delete(entity))
            .json(&json!({ "ids": ids }));
        self.send(token, builder, "bulk delete endpoint").await?;
        Ok(())
    }

    async fn bulk_assign(
        &self,
        token: &AuthToken,
        entity: EntityKind,
        ids: &[RecordId],
        assignee_id: &RecordId,
    ) -> AppResult<()> {
        let builder = self
            .http_client
            .post(self.routes.bulk_assign(entity))
            .json(&json!({ "ids": ids, "assigneeId": assignee_id }));
        self.send(token, builder, "bulk assign endpoint").await?;
        Ok(())
    }

    async fn transition_booking(
        &self,
        token: &AuthToken,
        booking_id: &RecordId,
        transition: BookingTransition,
    ) -> AppResult<()> {
        let builder = self
            .http_client
            .post(self.routes.booking_transition(booking_id, transition));
        self.send(token, builder, "booking transition endpoint")
            .await?;
        Ok(())
    }

    async fn save_booking(
        &self,
        token: &AuthToken,
        booking_id: Option<&RecordId>,
        submission: &BookingSubmission,
    ) -> AppResult<()> {
        let builder = match booking_id {
            Some(id) => self.http_client.put(self.routes.update_booking(id)),
            None => self.http_client.post(self.routes.create_booking()),
        };
        self.send(token, builder.json(submission), "booking save endpoint")
            .await?;
        Ok(())
    }
}

#[async_trait]
impl PermissionSource for HttpCrmBackend {
    async fn fetch_page_grants(
        &self,
        token: &AuthToken,
        role_id: &str,
    ) -> AppResult<Vec<PermissionGrant>> {
        let builder = self.http_client.get(self.routes.role_grants(role_id));
        let payload = self.send(token, builder, "role permissions endpoint").await?;
        normalize_grants(&payload)
    }

    async fn fetch_permission_catalog(
        &self,
        token: &AuthToken,
    ) -> AppResult<Vec<PermissionDefinition>> {
        let builder = self.http_client.get(self.routes.permission_catalog());
        let payload = self.send(token, builder, "permission catalog endpoint").await?;
        normalize_catalog(&payload)
    }
}
