use std::sync::Arc;

use estatedesk_core::{AppError, AppResult, AuthToken, RecordId, SessionUser};
use estatedesk_domain::{
    Booking, BookingDraft, BookingTransition, Capability, EntityKind, PageName,
};
use tracing::{info, warn};

use crate::PermissionSessionService;
use crate::crm_ports::{CrmBackend, Notice, Notifier, TokenStore};
use crate::list_controller::{ListController, failure_notice};

/// Application service for booking approval and booking form submission.
///
/// Status changes are never applied locally: after a confirmed change the
/// booking list is re-fetched so decision fields come from the server.
#[derive(Clone)]
pub struct BookingWorkflowService {
    permissions: PermissionSessionService,
    backend: Arc<dyn CrmBackend>,
    tokens: Arc<dyn TokenStore>,
    notifier: Arc<dyn Notifier>,
}

impl BookingWorkflowService {
    /// Creates a booking workflow service.
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

    /// Approves or rejects a pending booking.
    ///
    /// Non-admins are refused before any request is sent, as are bookings
    /// the loaded list already shows as decided.
    pub async fn transition(
        &self,
        actor: &SessionUser,
        list: &ListController,
        booking_id: &RecordId,
        transition: BookingTransition,
    ) -> AppResult<()> {
        ensure_booking_list(list)?;

        if !actor.role().is_admin() {
            warn!(
                booking_id = %booking_id,
                role = actor.role().as_str(),
                "booking decision refused for non-admin"
            );
            self.notifier.notify(Notice::Error(format!(
                "Only admins can {} bookings",
                transition.path_segment()
            )));
            return Err(AppError::Forbidden(format!(
                "role '{}' cannot decide bookings",
                actor.role().as_str()
            )));
        }

        if let Some(record) = list.find_loaded(booking_id).await {
            let booking = Booking::from_record(&record)?;
            if let Err(error) = booking.status.apply(transition) {
                self.notifier.notify(Notice::Error(error.message().to_owned()));
                return Err(error);
            }
        }

        let token = self.require_token().await?;
        match self
            .backend
            .transition_booking(&token, booking_id, transition)
            .await
        {
            Ok(()) => {
                info!(
                    booking_id = %booking_id,
                    transition = transition.path_segment(),
                    actor = actor.display_name(),
                    "booking decided"
                );
                self.notifier.notify(Notice::Success(format!(
                    "Booking {} successfully",
                    transition.past_tense()
                )));
                if let Err(error) = list.refresh().await {
                    warn!(error = %error, "re-fetch after booking decision failed");
                }
                Ok(())
            }
            Err(error) => {
                warn!(
                    booking_id = %booking_id,
                    transition = transition.path_segment(),
                    error = %error,
                    "booking decision failed"
                );
                self.notifier.notify(failure_notice(
                    &error,
                    format!("Failed to {} booking", transition.path_segment()),
                ));
                Err(error)
            }
        }
    }

    /// Validates and saves the booking form, creating or editing a booking.
    ///
    /// Validation failures are returned per field without any request.
    /// Editing is refused once a booking is confirmed or rejected.
    pub async fn submit(
        &self,
        list: &ListController,
        existing: Option<&Booking>,
        draft: &BookingDraft,
    ) -> AppResult<()> {
        ensure_booking_list(list)?;

        let submission = draft.validate()?;

        if let Some(booking) = existing
            && booking.status.is_decided()
        {
            let error = AppError::Conflict(format!(
                "booking '{}' is {} and can no longer be edited",
                booking.id, booking.status
            ));
            self.notifier.notify(Notice::Error(error.message().to_owned()));
            return Err(error);
        }

        let capability = if existing.is_some() {
            Capability::Edit
        } else {
            Capability::Add
        };
        if !self.permissions.can(PageName::Booking, capability).await {
            self.notifier.notify(Notice::Error(format!(
                "You do not have permission to {} bookings",
                capability.catalog_name()
            )));
            return Err(AppError::Forbidden(format!(
                "missing '{}' permission on page 'Booking'",
                capability.catalog_name()
            )));
        }

        let token = self.require_token().await?;
        let booking_id = existing.map(|booking| &booking.id);
        match self
            .backend
            .save_booking(&token, booking_id, &submission)
            .await
        {
            Ok(()) => {
                self.notifier.notify(Notice::Success(
                    if existing.is_some() {
                        "Booking updated successfully"
                    } else {
                        "Booking created successfully"
                    }
                    .to_owned(),
                ));
                if let Err(error) = list.refresh().await {
                    warn!(error = %error, "re-fetch after booking save failed");
                }
                Ok(())
            }
            Err(error) => {
                self.notifier
                    .notify(failure_notice(&error, "Failed to save booking".to_owned()));
                Err(error)
            }
        }
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
}

fn ensure_booking_list(list: &ListController) -> AppResult<()> {
    if list.entity() != EntityKind::Bookings {
        return Err(AppError::Validation(format!(
            "booking workflow requires the bookings list, got '{}'",
            list.entity().as_str()
        )));
    }

    Ok(())
}
