use estatedesk_core::RecordId;
use estatedesk_domain::{BookingTransition, EntityKind};

/// Endpoint paths of the CRM backend, relative to the API base URL.
#[derive(Debug, Clone)]
pub(super) struct ApiRoutes {
    base_url: String,
}

impl ApiRoutes {
    pub(super) fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }

    pub(super) fn list(&self, entity: EntityKind) -> String {
        format!(
            "{}/{}/getAll{}",
            self.base_url,
            entity.api_path(),
            entity.plural_name()
        )
    }

    pub(super) fn delete(&self, entity: EntityKind, id: &RecordId) -> String {
        format!(
            "{}/{}/delete{}/{}",
            self.base_url,
            entity.api_path(),
            entity.singular_name(),
            id.as_path_segment()
        )
    }

    pub(super) fn bulk_delete(&self, entity: EntityKind) -> String {
        format!("{}/{}/bulkDelete", self.base_url, entity.api_path())
    }

    pub(super) fn bulk_assign(&self, entity: EntityKind) -> String {
        format!("{}/{}/bulkAssign", self.base_url, entity.api_path())
    }

    pub(super) fn booking_transition(
        &self,
        booking_id: &RecordId,
        transition: BookingTransition,
    ) -> String {
        format!(
            "{}/{}/{}/{}",
            self.base_url,
            EntityKind::Bookings.api_path(),
            booking_id.as_path_segment(),
            transition.path_segment()
        )
    }

    pub(super) fn create_booking(&self) -> String {
        format!("{}/{}/createBooking", self.base_url, EntityKind::Bookings.api_path())
    }

    pub(super) fn update_booking(&self, booking_id: &RecordId) -> String {
        format!(
            "{}/{}/updateBooking/{}",
            self.base_url,
            EntityKind::Bookings.api_path(),
            booking_id.as_path_segment()
        )
    }

    pub(super) fn role_grants(&self, role_id: &str) -> String {
        format!("{}/rolePermissions/getByRole/{}", self.base_url, role_id.trim())
    }

    pub(super) fn permission_catalog(&self) -> String {
        format!("{}/permissions/getAllPermissions", self.base_url)
    }
}
