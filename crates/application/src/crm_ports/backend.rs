use async_trait::async_trait;
use estatedesk_core::{AppResult, AuthToken, RecordId};
use estatedesk_domain::{
    BookingSubmission, BookingTransition, EntityKind, PermissionDefinition, PermissionGrant,
    QueryParams, RecordPage,
};

/// Port for the REST backend serving entity lists and mutations.
///
/// Implementations normalize response envelopes before returning; callers
/// never see transport shapes.
#[async_trait]
pub trait CrmBackend: Send + Sync {
    /// Fetches one page of an entity list with server-side filtering.
    async fn list_records(
        &self,
        token: &AuthToken,
        entity: EntityKind,
        params: &QueryParams,
    ) -> AppResult<RecordPage>;

    /// Deletes one record.
    async fn delete_record(
        &self,
        token: &AuthToken,
        entity: EntityKind,
        id: &RecordId,
    ) -> AppResult<()>;

    /// Deletes many records in one request.
    async fn bulk_delete(
        &self,
        token: &AuthToken,
        entity: EntityKind,
        ids: &[RecordId],
    ) -> AppResult<()>;

    /// Assigns many records to one user.
    async fn bulk_assign(
        &self,
        token: &AuthToken,
        entity: EntityKind,
        ids: &[RecordId],
        assignee_id: &RecordId,
    ) -> AppResult<()>;

    /// Approves or rejects a booking.
    async fn transition_booking(
        &self,
        token: &AuthToken,
        booking_id: &RecordId,
        transition: BookingTransition,
    ) -> AppResult<()>;

    /// Creates a booking, or updates it when an id is given.
    async fn save_booking(
        &self,
        token: &AuthToken,
        booking_id: Option<&RecordId>,
        submission: &BookingSubmission,
    ) -> AppResult<()>;
}

/// Port for the two independent permission sources.
#[async_trait]
pub trait PermissionSource: Send + Sync {
    /// Fetches the page grants of a role.
    async fn fetch_page_grants(
        &self,
        token: &AuthToken,
        role_id: &str,
    ) -> AppResult<Vec<PermissionGrant>>;

    /// Fetches the global permission catalog.
    async fn fetch_permission_catalog(
        &self,
        token: &AuthToken,
    ) -> AppResult<Vec<PermissionDefinition>>;
}
