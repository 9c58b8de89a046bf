use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use estatedesk_core::{AppError, AppResult, RecordId, UserRole};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ListRecord;

/// Booking lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BookingStatus {
    /// Awaiting an admin decision.
    Pending,
    /// Approved by an admin.
    Confirmed,
    /// Rejected by an admin.
    Rejected,
    /// Cancelled by a backend-side flow.
    Cancelled,
    /// Handed over to the client by a backend-side flow.
    MoveToClient,
    /// Converted into a customer by a backend-side flow.
    BecomeCustomer,
}

impl BookingStatus {
    /// Returns the stable transport value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
            Self::MoveToClient => "Move_To_Client",
            Self::BecomeCustomer => "Become_Customer",
        }
    }

    /// Returns whether approve/reject are no longer offered.
    #[must_use]
    pub fn is_decided(&self) -> bool {
        matches!(self, Self::Confirmed | Self::Rejected)
    }

    /// Returns the status after a confirmed transition.
    ///
    /// Only `Pending` accepts transitions; every other status is terminal for
    /// the approval workflow.
    pub fn apply(&self, transition: BookingTransition) -> AppResult<Self> {
        match self {
            Self::Pending => Ok(transition.target_status()),
            other => Err(AppError::Conflict(format!(
                "booking in status '{}' cannot be {}",
                other.as_str(),
                transition.past_tense()
            ))),
        }
    }
}

impl FromStr for BookingStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "rejected" => Ok(Self::Rejected),
            "cancelled" => Ok(Self::Cancelled),
            "move_to_client" => Ok(Self::MoveToClient),
            "become_customer" => Ok(Self::BecomeCustomer),
            _ => Err(AppError::Validation(format!(
                "unknown booking status '{value}'"
            ))),
        }
    }
}

impl Display for BookingStatus {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Admin decision on a pending booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingTransition {
    /// Confirm the booking.
    Approve,
    /// Reject the booking.
    Reject,
}

impl BookingTransition {
    /// Returns the URL segment of the transition endpoint.
    #[must_use]
    pub fn path_segment(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
        }
    }

    /// Returns the status reached on success.
    #[must_use]
    pub fn target_status(&self) -> BookingStatus {
        match self {
            Self::Approve => BookingStatus::Confirmed,
            Self::Reject => BookingStatus::Rejected,
        }
    }

    /// Returns the wording used in notices.
    #[must_use]
    pub fn past_tense(&self) -> &'static str {
        match self {
            Self::Approve => "approved",
            Self::Reject => "rejected",
        }
    }
}

impl FromStr for BookingTransition {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "approve" => Ok(Self::Approve),
            "reject" => Ok(Self::Reject),
            _ => Err(AppError::Validation(format!(
                "unknown booking transition '{value}'"
            ))),
        }
    }
}

/// Row action offered on a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingAction {
    /// Approve a pending booking.
    Approve,
    /// Reject a pending booking.
    Reject,
    /// Edit booking details.
    Edit,
    /// Generate the payment slip document.
    PaymentSlip,
    /// Generate the welcome letter document.
    WelcomeLetter,
}

/// Computes the row actions a viewer sees for a booking status.
///
/// Approve and reject always come as a pair, and only for admins on pending
/// bookings. Documents unlock on confirmation; edit disappears once decided.
#[must_use]
pub fn booking_actions(status: BookingStatus, role: &UserRole) -> Vec<BookingAction> {
    let mut actions = Vec::new();

    if status == BookingStatus::Pending && role.is_admin() {
        actions.push(BookingAction::Approve);
        actions.push(BookingAction::Reject);
    }

    if !status.is_decided() {
        actions.push(BookingAction::Edit);
    }

    if status == BookingStatus::Confirmed {
        actions.push(BookingAction::PaymentSlip);
        actions.push(BookingAction::WelcomeLetter);
    }

    actions
}

/// Typed view of a booking row.
#[derive(Debug, Clone, PartialEq)]
pub struct Booking {
    /// Booking id.
    pub id: RecordId,
    /// Lifecycle status.
    pub status: BookingStatus,
    /// Name of the admin who decided the booking.
    pub approved_by_name: Option<String>,
    /// When the booking was decided.
    pub approved_at: Option<DateTime<Utc>>,
    /// Amount paid at booking.
    pub booking_amount: f64,
    /// Total price of the plot.
    pub total_plot_amount: f64,
    /// Customer name.
    pub customer_name: Option<String>,
}

impl Booking {
    /// Reads a booking from a list row.
    pub fn from_record(record: &ListRecord) -> AppResult<Self> {
        let status = record
            .field("status")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                AppError::Validation(format!("booking '{}' has no status", record.id()))
            })?
            .parse::<BookingStatus>()?;

        Ok(Self {
            id: record.id().clone(),
            status,
            approved_by_name: text_field(record, "approvedByName"),
            approved_at: text_field(record, "approvedAt")
                .and_then(|value| DateTime::parse_from_rfc3339(value.as_str()).ok())
                .map(|value| value.with_timezone(&Utc)),
            booking_amount: amount_field(record, "bookingAmount"),
            total_plot_amount: amount_field(record, "totalPlotAmount"),
            customer_name: text_field(record, "customerName"),
        })
    }

    /// Returns the row actions for a viewer.
    #[must_use]
    pub fn actions_for(&self, role: &UserRole) -> Vec<BookingAction> {
        booking_actions(self.status, role)
    }
}

fn text_field(record: &ListRecord, key: &str) -> Option<String> {
    record
        .field(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
}

fn amount_field(record: &ListRecord, key: &str) -> f64 {
    match record.field(key) {
        Some(Value::Number(number)) => number.as_f64().unwrap_or_default(),
        Some(Value::String(text)) => text.trim().parse::<f64>().unwrap_or_default(),
        _ => 0.0,
    }
}

/// Per-field validation messages of a form.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FormErrors(BTreeMap<&'static str, String>);

impl FormErrors {
    /// Records a message for a field; the first message per field wins.
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_insert_with(|| message.into());
    }

    /// Returns the message for a field.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    /// Returns whether there are no errors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over field messages.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.0.iter().map(|(field, message)| (*field, message.as_str()))
    }
}

impl Display for FormErrors {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        let joined = self
            .0
            .iter()
            .map(|(field, message)| format!("{field}: {message}"))
            .collect::<Vec<_>>()
            .join("; ");
        formatter.write_str(joined.as_str())
    }
}

impl From<FormErrors> for AppError {
    fn from(value: FormErrors) -> Self {
        Self::Validation(value.to_string())
    }
}

/// Booking form input as entered.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingDraft {
    /// Customer name.
    pub customer_name: String,
    /// Customer phone number.
    pub customer_phone: String,
    /// Booked plot id.
    pub plot_id: Option<RecordId>,
    /// Amount paid at booking.
    pub booking_amount: f64,
    /// Total price of the plot.
    pub total_plot_amount: f64,
    /// Free-form remarks.
    pub remarks: Option<String>,
}

/// Validated booking payload sent to the backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingSubmission {
    /// Customer name.
    pub customer_name: String,
    /// Customer phone number, when given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_phone: Option<String>,
    /// Booked plot id.
    pub plot_id: RecordId,
    /// Amount paid at booking.
    pub booking_amount: f64,
    /// Total price of the plot.
    pub total_plot_amount: f64,
    /// Free-form remarks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
}

/// Message shown when the plot total is below the booking amount.
pub const TOTAL_BELOW_BOOKING_MESSAGE: &str = "Total amount must be >= booking amount";

impl BookingDraft {
    /// Validates the form before anything is sent.
    pub fn validate(&self) -> Result<BookingSubmission, FormErrors> {
        let mut errors = FormErrors::default();

        let customer_name = self.customer_name.trim();
        if customer_name.is_empty() {
            errors.add("customerName", "Customer name is required");
        }

        let customer_phone = self.customer_phone.trim();
        if !customer_phone.is_empty()
            && !customer_phone
                .chars()
                .all(|character| character.is_ascii_digit() || "+- ".contains(character))
        {
            errors.add("customerPhone", "Phone number may only contain digits");
        }

        if self.plot_id.is_none() {
            errors.add("plotId", "Plot is required");
        }

        if !self.booking_amount.is_finite() || self.booking_amount <= 0.0 {
            errors.add("bookingAmount", "Booking amount must be greater than zero");
        }

        if !self.total_plot_amount.is_finite() || self.total_plot_amount <= 0.0 {
            errors.add("totalPlotAmount", "Total amount must be greater than zero");
        } else if self.total_plot_amount < self.booking_amount {
            errors.add("totalPlotAmount", TOTAL_BELOW_BOOKING_MESSAGE);
        }

        match (&self.plot_id, errors.is_empty()) {
            (Some(plot_id), true) => Ok(BookingSubmission {
                customer_name: customer_name.to_owned(),
                customer_phone: (!customer_phone.is_empty()).then(|| customer_phone.to_owned()),
                plot_id: plot_id.clone(),
                booking_amount: self.booking_amount,
                total_plot_amount: self.total_plot_amount,
                remarks: self
                    .remarks
                    .as_deref()
                    .map(str::trim)
                    .filter(|value| !value.is_empty())
                    .map(str::to_owned),
            }),
            _ => Err(errors),
        }
    }
}

#[cfg(test)]
mod tests {
    use estatedesk_core::{RecordId, UserRole};
    use serde_json::json;

    use super::{
        Booking, BookingAction, BookingDraft, BookingStatus, BookingTransition,
        TOTAL_BELOW_BOOKING_MESSAGE, booking_actions,
    };
    use crate::ListRecord;

    const ALL_STATUSES: [BookingStatus; 6] = [
        BookingStatus::Pending,
        BookingStatus::Confirmed,
        BookingStatus::Rejected,
        BookingStatus::Cancelled,
        BookingStatus::MoveToClient,
        BookingStatus::BecomeCustomer,
    ];

    fn roles() -> Vec<UserRole> {
        vec![
            UserRole::Admin,
            UserRole::Named("Sales Executive".to_owned()),
            UserRole::Named("Manager".to_owned()),
        ]
    }

    fn draft(booking_amount: f64, total_plot_amount: f64) -> BookingDraft {
        BookingDraft {
            customer_name: "Asha Rao".to_owned(),
            customer_phone: "+91 98450 00000".to_owned(),
            plot_id: Some(RecordId::Number(12)),
            booking_amount,
            total_plot_amount,
            remarks: None,
        }
    }

    #[test]
    fn decision_buttons_only_for_admin_on_pending() {
        for status in ALL_STATUSES {
            for role in roles() {
                let actions = booking_actions(status, &role);
                let has_approve = actions.contains(&BookingAction::Approve);
                let has_reject = actions.contains(&BookingAction::Reject);
                let expected = status == BookingStatus::Pending && role.is_admin();

                assert_eq!(has_approve, expected, "{status} / {role:?}");
                assert_eq!(has_approve, has_reject, "buttons must come as a pair");
            }
        }
    }

    #[test]
    fn documents_only_when_confirmed_and_edit_only_when_undecided() {
        for status in ALL_STATUSES {
            let actions = booking_actions(status, &UserRole::Admin);
            assert_eq!(
                actions.contains(&BookingAction::PaymentSlip),
                status == BookingStatus::Confirmed
            );
            assert_eq!(
                actions.contains(&BookingAction::WelcomeLetter),
                status == BookingStatus::Confirmed
            );
            assert_eq!(actions.contains(&BookingAction::Edit), !status.is_decided());
        }
    }

    #[test]
    fn only_pending_accepts_transitions() {
        assert!(matches!(
            BookingStatus::Pending.apply(BookingTransition::Approve),
            Ok(BookingStatus::Confirmed)
        ));
        assert!(matches!(
            BookingStatus::Pending.apply(BookingTransition::Reject),
            Ok(BookingStatus::Rejected)
        ));
        for status in &ALL_STATUSES[1..] {
            assert!(status.apply(BookingTransition::Approve).is_err());
        }
    }

    #[test]
    fn status_parses_transport_values() {
        assert!(matches!(
            "pending".parse::<BookingStatus>(),
            Ok(BookingStatus::Pending)
        ));
        assert!(matches!(
            "Move_To_Client".parse::<BookingStatus>(),
            Ok(BookingStatus::MoveToClient)
        ));
        assert!("archived".parse::<BookingStatus>().is_err());
    }

    #[test]
    fn booking_reads_row_fields() {
        let record = ListRecord::from_value(json!({
            "id": 7,
            "status": "Confirmed",
            "approvedByName": "Admin One",
            "approvedAt": "2024-05-01T09:30:00Z",
            "bookingAmount": "150000",
            "totalPlotAmount": 900000
        }))
        .unwrap_or_else(|_| unreachable!());

        let booking = Booking::from_record(&record).unwrap_or_else(|_| unreachable!());
        assert_eq!(booking.status, BookingStatus::Confirmed);
        assert_eq!(booking.approved_by_name.as_deref(), Some("Admin One"));
        assert!(booking.approved_at.is_some());
        assert!((booking.booking_amount - 150_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn total_below_booking_amount_is_rejected() {
        let result = draft(150.0, 100.0).validate();
        let errors = result.err().unwrap_or_default();
        assert_eq!(errors.get("totalPlotAmount"), Some(TOTAL_BELOW_BOOKING_MESSAGE));
    }

    #[test]
    fn valid_draft_becomes_submission() {
        let submission = draft(100.0, 100.0).validate();
        assert!(matches!(submission, Ok(ref value) if value.customer_name == "Asha Rao"));
    }

    #[test]
    fn missing_fields_are_reported_per_field() {
        let errors = BookingDraft::default().validate().err().unwrap_or_default();
        assert!(errors.get("customerName").is_some());
        assert!(errors.get("plotId").is_some());
        assert!(errors.get("bookingAmount").is_some());
    }
}
