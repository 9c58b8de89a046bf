mod export;

use std::sync::Arc;

use estatedesk_core::{AppError, AppResult, AuthToken, RecordId};
use estatedesk_domain::{Capability, EntityKind, PermissionSnapshot};
use tracing::{info, warn};

use crate::PermissionSessionService;
use crate::crm_ports::{CrmBackend, Notice, Notifier, TokenStore};
use crate::list_controller::{ListController, failure_notice};

pub use export::write_rows_csv;

/// Actions applied to the selected rows of a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BulkAction {
    /// Delete selected rows.
    Delete,
    /// Assign selected rows to a user.
    Assign,
    /// Export selected (or all loaded) rows.
    Export,
}

impl BulkAction {
    fn label(&self) -> &'static str {
        match self {
            Self::Delete => "delete",
            Self::Assign => "assign",
            Self::Export => "export",
        }
    }

    fn past_tense(&self) -> &'static str {
        match self {
            Self::Delete => "deleted",
            Self::Assign => "assigned",
            Self::Export => "exported",
        }
    }
}

/// Returns whether a bulk action may be offered for the current selection.
///
/// On the booking list a plain `delete` grant also unlocks bulk assign.
#[must_use]
pub fn bulk_action_allowed(
    snapshot: &PermissionSnapshot,
    entity: EntityKind,
    action: BulkAction,
    selected_count: usize,
) -> bool {
    let page = entity.page();
    match action {
        BulkAction::Delete => selected_count > 0 && snapshot.can(page, Capability::Delete),
        BulkAction::Assign => {
            selected_count > 0
                && (snapshot.can(page, Capability::BulkAssign)
                    || (entity == EntityKind::Bookings && snapshot.can(page, Capability::Delete)))
        }
        BulkAction::Export => snapshot.can(page, Capability::Export),
    }
}

/// Coordinates row and bulk actions of a list with permission checks.
///
/// Every mutating action ends with a cleared selection and a re-fetch; rows
/// are never patched locally.
#[derive(Clone)]
pub struct BulkActionService {
    permissions: PermissionSessionService,
    backend: Arc<dyn CrmBackend>,
    tokens: Arc<dyn TokenStore>,
    notifier: Arc<dyn Notifier>,
}

impl BulkActionService {
    /// Creates a bulk action service.
    #[must_use]
    pub fn new(
        permissions: PermissionSessionService,
        backend: Arc<dyn CrmBackend>,
        tokens: Arc<dyn TokenStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            permissions,
            backend,
            tokens,
            notifier,
        }
    }

    /// Lists the bulk actions currently offered for the list.
    pub async fn available_actions(&self, list: &ListController) -> Vec<BulkAction> {
        let snapshot = self.permissions.snapshot().await;
        let selected_count = list.selected_ids().await.len();

        [BulkAction::Delete, BulkAction::Assign, BulkAction::Export]
            .into_iter()
            .filter(|action| bulk_action_allowed(&snapshot, list.entity(), *action, selected_count))
            .collect()
    }

    /// Deletes the selected rows.
    pub async fn bulk_delete(&self, list: &ListController) -> AppResult<()> {
        let ids = self.authorize(list, BulkAction::Delete).await?;
        let token = self.require_token().await?;
        let result = self
            .backend
            .bulk_delete(&token, list.entity(), &ids)
            .await;

        self.finish(list, result, BulkAction::Delete, ids.len()).await
    }

    /// Assigns the selected rows to a user.
    pub async fn bulk_assign(
        &self,
        list: &ListController,
        assignee_id: &RecordId,
    ) -> AppResult<()> {
        let ids = self.authorize(list, BulkAction::Assign).await?;
        let token = self.require_token().await?;
        let result = self
            .backend
            .bulk_assign(&token, list.entity(), &ids, assignee_id)
            .await;

        self.finish(list, result, BulkAction::Assign, ids.len()).await
    }

    /// Deletes one row from its row action.
    pub async fn delete_one(&self, list: &ListController, id: &RecordId) -> AppResult<()> {
        if !self
            .permissions
            .can(list.entity().page(), Capability::Delete)
            .await
        {
            return Err(self.refuse(list.entity(), BulkAction::Delete));
        }

        let token = self.require_token().await?;
        let result = self.backend.delete_record(&token, list.entity(), id).await;
        self.finish(list, result, BulkAction::Delete, 1).await
    }

    /// Writes the selected rows, or every loaded row when nothing is selected, as CSV.
    ///
    /// Returns the number of exported rows. Export reads only the loaded page.
    pub async fn export_csv<W: std::io::Write>(
        &self,
        list: &ListController,
        columns: &[&str],
        writer: W,
    ) -> AppResult<usize> {
        let snapshot = self.permissions.snapshot().await;
        if !bulk_action_allowed(&snapshot, list.entity(), BulkAction::Export, 0) {
            return Err(self.refuse(list.entity(), BulkAction::Export));
        }

        let view = list.snapshot().await;
        let rows: Vec<_> = if view.selected_ids.is_empty() {
            view.rows
        } else {
            view.rows
                .into_iter()
                .filter(|row| view.selected_ids.contains(row.id()))
                .collect()
        };

        let exported = write_rows_csv(&rows, columns, writer)?;
        info!(entity = list.entity().as_str(), rows = exported, "rows exported");
        Ok(exported)
    }

    async fn authorize(
        &self,
        list: &ListController,
        action: BulkAction,
    ) -> AppResult<Vec<RecordId>> {
        let ids = list.selected_ids().await;
        if ids.is_empty() {
            self.notifier.notify(Notice::Error(format!(
                "Select at least one row to {}",
                action.label()
            )));
            return Err(AppError::Validation(format!(
                "bulk {} requires a selection",
                action.label()
            )));
        }

        let snapshot = self.permissions.snapshot().await;
        if !bulk_action_allowed(&snapshot, list.entity(), action, ids.len()) {
            return Err(self.refuse(list.entity(), action));
        }

        Ok(ids)
    }

    fn refuse(&self, entity: EntityKind, action: BulkAction) -> AppError {
        warn!(
            entity = entity.as_str(),
            action = action.label(),
            "action refused without permission"
        );
        self.notifier.notify(Notice::Error(format!(
            "You do not have permission to {} {}",
            action.label(),
            entity.plural_name().to_lowercase()
        )));
        AppError::Forbidden(format!(
            "missing '{}' permission on page '{}'",
            action.label(),
            entity.page().as_str()
        ))
    }

    async fn require_token(&self) -> AppResult<AuthToken> {
        match self.tokens.load_token().await? {
            Some(token) => Ok(token),
            None => {
                self.notifier.notify(Notice::SessionExpired);
                Err(AppError::Unauthorized("no session token".to_owned()))
            }
        }
    }

    async fn finish(
        &self,
        list: &ListController,
        result: AppResult<()>,
        action: BulkAction,
        count: usize,
    ) -> AppResult<()> {
        let entity = list.entity();
        match &result {
            Ok(()) => {
                info!(
                    entity = entity.as_str(),
                    action = action.label(),
                    count,
                    "bulk action completed"
                );
                self.notifier.notify(Notice::Success(format!(
                    "{count} {} {} successfully",
                    entity.plural_name().to_lowercase(),
                    action.past_tense()
                )));
            }
            Err(error) => {
                warn!(
                    entity = entity.as_str(),
                    action = action.label(),
                    error = %error,
                    "bulk action failed"
                );
                self.notifier.notify(failure_notice(
                    error,
                    format!(
                        "Failed to {} {}",
                        action.label(),
                        entity.plural_name().to_lowercase()
                    ),
                ));
            }
        }

        list.clear_selection().await;
        if let Err(error) = list.refresh().await {
            warn!(
                entity = entity.as_str(),
                error = %error,
                "re-fetch after bulk action failed"
            );
        }

        result
    }
}

#[cfg(test)]
mod tests;
