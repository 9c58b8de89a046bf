use std::sync::Arc;

use estatedesk_core::RecordId;
use estatedesk_domain::{
    CapabilityIds, EntityKind, PageGrants, PageSize, PermissionCatalog, PermissionGrant,
    PermissionSnapshot,
};
use serde_json::{Value, json};

use crate::crm_ports::Notice;
use crate::list_controller::ListController;
use crate::test_support::{
    FakeCrmBackend, FakeTokenStore, RecordingNotifier, ids, loaded_permissions,
};

use super::{BulkAction, BulkActionService, bulk_action_allowed};

const DELETE: u32 = 3;
const EXPORT: u32 = 4;
const BULK_ASSIGN: u32 = 6;

fn rows(count: i64) -> Vec<Value> {
    (1..=count)
        .map(|id| json!({"id": id, "name": format!("row-{id}"), "phone": format!("98450{id:05}")}))
        .collect()
}

struct Fixture {
    backend: Arc<FakeCrmBackend>,
    notifier: Arc<RecordingNotifier>,
    list: ListController,
    service: BulkActionService,
}

async fn fixture(entity: EntityKind, grants: Vec<PermissionGrant>) -> Fixture {
    let backend = Arc::new(FakeCrmBackend::with_rows(rows(5)));
    let notifier = Arc::new(RecordingNotifier::default());
    let tokens = Arc::new(FakeTokenStore(Some("token")));
    let list = ListController::new(
        entity,
        PageSize::new(5).unwrap_or_default(),
        backend.clone(),
        tokens.clone(),
        notifier.clone(),
    );
    let _ = list.refresh().await;

    let service = BulkActionService::new(
        loaded_permissions(grants).await,
        backend.clone(),
        tokens,
        notifier.clone(),
    );

    Fixture {
        backend,
        notifier,
        list,
        service,
    }
}

fn snapshot(page: &str, ids: &[u32]) -> PermissionSnapshot {
    PermissionSnapshot::new(
        PageGrants::new([PermissionGrant::new(page, ids.iter().copied())]),
        PermissionCatalog::default(),
        CapabilityIds::default(),
    )
}

#[test]
fn bulk_actions_need_a_selection() {
    let granted = snapshot("Lead", &[DELETE, BULK_ASSIGN]);
    assert!(!bulk_action_allowed(&granted, EntityKind::Leads, BulkAction::Delete, 0));
    assert!(!bulk_action_allowed(&granted, EntityKind::Leads, BulkAction::Assign, 0));
    assert!(bulk_action_allowed(&granted, EntityKind::Leads, BulkAction::Delete, 2));
    assert!(bulk_action_allowed(&granted, EntityKind::Leads, BulkAction::Assign, 2));
}

#[test]
fn delete_grant_unlocks_assign_only_on_bookings() {
    let bookings = snapshot("Booking", &[DELETE]);
    assert!(bulk_action_allowed(&bookings, EntityKind::Bookings, BulkAction::Assign, 1));

    let leads = snapshot("Lead", &[DELETE]);
    assert!(!bulk_action_allowed(&leads, EntityKind::Leads, BulkAction::Assign, 1));
}

#[tokio::test]
async fn bulk_delete_clears_selection_and_refetches() {
    let fixture = fixture(EntityKind::Leads, vec![PermissionGrant::new("Lead", [DELETE])]).await;
    fixture.list.toggle_selection(RecordId::Number(2)).await;
    fixture.list.toggle_selection(RecordId::Number(4)).await;

    let result = fixture.service.bulk_delete(&fixture.list).await;
    assert!(result.is_ok());
    assert_eq!(
        fixture.backend.mutation_calls().await,
        vec!["bulk_delete:leads:2,4".to_owned()]
    );

    let snapshot = fixture.list.snapshot().await;
    assert!(snapshot.selected_ids.is_empty());
    assert_eq!(
        snapshot.rows.iter().map(|row| row.id().clone()).collect::<Vec<_>>(),
        ids(&[1, 3, 5])
    );
    assert_eq!(fixture.backend.list_calls.lock().await.len(), 2);
    assert_eq!(
        fixture.notifier.take(),
        vec![Notice::Success("2 leads deleted successfully".to_owned())]
    );
}

#[tokio::test]
async fn refused_action_sends_no_request() {
    let fixture = fixture(EntityKind::Leads, vec![PermissionGrant::new("Lead", [1])]).await;
    fixture.list.select_all_visible().await;

    let result = fixture.service.bulk_delete(&fixture.list).await;
    assert!(result.is_err());
    assert!(fixture.backend.mutation_calls().await.is_empty());
    assert_eq!(fixture.list.selected_ids().await.len(), 5);
    assert!(matches!(fixture.notifier.take().as_slice(), [Notice::Error(_)]));
}

#[tokio::test]
async fn failed_bulk_assign_still_clears_and_refetches() {
    let fixture = fixture(
        EntityKind::Bookings,
        vec![PermissionGrant::new("Lead", [DELETE])],
    )
    .await;
    *fixture.backend.mutation_failure.lock().await =
        Some((500, "Assignee is inactive".to_owned()));
    fixture.list.toggle_selection(RecordId::Number(1)).await;

    let result = fixture
        .service
        .bulk_assign(&fixture.list, &RecordId::Number(42))
        .await;
    assert!(result.is_err());
    assert_eq!(
        fixture.backend.mutation_calls().await,
        vec!["bulk_assign:bookings:1:42".to_owned()]
    );
    assert!(fixture.list.selected_ids().await.is_empty());
    assert_eq!(fixture.backend.list_calls.lock().await.len(), 2);
    assert_eq!(
        fixture.notifier.take(),
        vec![Notice::Error("Assignee is inactive".to_owned())]
    );
}

#[tokio::test]
async fn available_actions_follow_selection_and_grants() {
    let fixture = fixture(
        EntityKind::Leads,
        vec![PermissionGrant::new("Lead", [DELETE, EXPORT])],
    )
    .await;
    assert_eq!(
        fixture.service.available_actions(&fixture.list).await,
        vec![BulkAction::Export]
    );

    fixture.list.toggle_selection(RecordId::Number(1)).await;
    assert_eq!(
        fixture.service.available_actions(&fixture.list).await,
        vec![BulkAction::Delete, BulkAction::Export]
    );
}

#[tokio::test]
async fn export_writes_selected_rows_as_csv() {
    let fixture = fixture(EntityKind::Leads, vec![PermissionGrant::new("Lead", [EXPORT])]).await;
    fixture.list.toggle_selection(RecordId::Number(3)).await;

    let mut buffer = Vec::new();
    let exported = fixture
        .service
        .export_csv(&fixture.list, &["id", "name", "missing"], &mut buffer)
        .await;

    assert!(matches!(exported, Ok(1)));
    assert_eq!(String::from_utf8_lossy(&buffer), "id,name,missing\n3,row-3,\n");
}

#[tokio::test]
async fn export_without_grant_is_refused() {
    let fixture = fixture(EntityKind::Plots, vec![PermissionGrant::new("Plots", [DELETE])]).await;

    let mut buffer = Vec::new();
    let exported = fixture
        .service
        .export_csv(&fixture.list, &["id"], &mut buffer)
        .await;
    assert!(exported.is_err());
    assert!(buffer.is_empty());
}

#[tokio::test]
async fn delete_one_refetches_list() {
    let fixture = fixture(EntityKind::Plots, vec![PermissionGrant::new("Plots", [DELETE])]).await;

    let result = fixture
        .service
        .delete_one(&fixture.list, &RecordId::Number(5))
        .await;
    assert!(result.is_ok());
    assert_eq!(fixture.list.snapshot().await.rows.len(), 4);
}
