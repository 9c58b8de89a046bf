//! Application services and ports of the EstateDesk list-management core.

#![forbid(unsafe_code)]

mod booking_workflow_service;
mod bulk_action_service;
mod crm_ports;
mod list_controller;
mod permission_session_service;

#[cfg(test)]
mod test_support;

pub use booking_workflow_service::BookingWorkflowService;
pub use bulk_action_service::{
    BulkAction, BulkActionService, bulk_action_allowed, write_rows_csv,
};
pub use crm_ports::{CrmBackend, Notice, Notifier, PermissionSource, TokenStore};
pub use list_controller::{FetchOutcome, ListController, ListSnapshot};
pub use permission_session_service::PermissionSessionService;
