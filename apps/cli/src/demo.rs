use async_trait::async_trait;
use estatedesk_application::TokenStore;
use estatedesk_core::{AppResult, AuthToken};
use estatedesk_domain::{
    Capability, EntityKind, PermissionDefinition, PermissionGrant,
};
use estatedesk_infrastructure::InMemoryCrmBackend;
use serde_json::json;

/// Token store that is always signed in.
pub struct DemoTokenStore;

#[async_trait]
impl TokenStore for DemoTokenStore {
    async fn load_token(&self) -> AppResult<Option<AuthToken>> {
        Ok(AuthToken::new("demo"))
    }
}

/// Builds an in-memory backend with a few rows per list and full grants.
pub async fn seeded_backend() -> InMemoryCrmBackend {
    let backend = InMemoryCrmBackend::new();

    let permission_ids: Vec<u32> = (1..).take(Capability::all().len()).collect();
    backend
        .set_page_grants(
            ["Lead", "Booking", "Project Status", "Plots"]
                .into_iter()
                .map(|page| PermissionGrant::new(page, permission_ids.iter().copied()))
                .collect(),
        )
        .await;
    backend
        .set_catalog(
            Capability::all()
                .iter()
                .zip(permission_ids.iter())
                .map(|(capability, id)| PermissionDefinition {
                    id: *id,
                    permission_name: capability.catalog_name().to_owned(),
                })
                .collect(),
        )
        .await;

    let projects = ["Green Acres", "Blue Hills", "Lake View"];
    backend
        .seed(
            EntityKind::Leads,
            (1..=18).map(|id| {
                json!({
                    "id": id,
                    "name": format!("Lead {id}"),
                    "phone": format!("98450{id:05}"),
                    "status": (["new", "contacted", "hot", "cold"][id % 4]),
                    "projectName": projects[id % projects.len()],
                    "createdAt": format!("2026-09-{:02}T09:30:00Z", id),
                })
            }),
        )
        .await;
    backend
        .seed(
            EntityKind::Bookings,
            (1..=8).map(|id| {
                json!({
                    "id": id,
                    "customerName": format!("Customer {id}"),
                    "plotId": 100 + id,
                    "bookingAmount": 50_000 * id,
                    "totalPlotAmount": 900_000,
                    "status": (["pending", "pending", "confirmed", "rejected"][id % 4]),
                    "projectName": projects[id % projects.len()],
                    "createdAt": format!("2026-09-{:02}T11:00:00Z", id * 2),
                })
            }),
        )
        .await;
    backend
        .seed(
            EntityKind::ProjectStatus,
            projects.iter().enumerate().map(|(index, name)| {
                json!({
                    "id": index + 1,
                    "projectName": name,
                    "status": (["planning", "ongoing", "completed"][index]),
                })
            }),
        )
        .await;
    backend
        .seed(
            EntityKind::Plots,
            (1..=12).map(|id| {
                json!({
                    "id": 100 + id,
                    "plotNumber": format!("P-{id:03}"),
                    "projectName": projects[id % projects.len()],
                    "status": if id % 3 == 0 { "booked" } else { "available" },
                })
            }),
        )
        .await;

    backend
}
