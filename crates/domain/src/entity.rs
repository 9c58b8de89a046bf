use estatedesk_core::{AppError, AppResult, RecordId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::PageName;

/// Entity lists served by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Sales leads.
    Leads,
    /// Plot bookings.
    Bookings,
    /// Project status rows.
    ProjectStatus,
    /// Plot inventory.
    Plots,
}

impl EntityKind {
    /// Returns the page whose grant gates this list.
    #[must_use]
    pub fn page(&self) -> PageName {
        match self {
            Self::Leads => PageName::Lead,
            Self::Bookings => PageName::Booking,
            Self::ProjectStatus => PageName::ProjectStatus,
            Self::Plots => PageName::Plots,
        }
    }

    /// Returns the API path prefix of the entity.
    #[must_use]
    pub fn api_path(&self) -> &'static str {
        match self {
            Self::Leads => "leads",
            Self::Bookings => "bookings/bookings",
            Self::ProjectStatus => "projects",
            Self::Plots => "plots",
        }
    }

    /// Returns the plural name used in list endpoints (`getAll{Plural}`).
    #[must_use]
    pub fn plural_name(&self) -> &'static str {
        match self {
            Self::Leads => "Leads",
            Self::Bookings => "Bookings",
            Self::ProjectStatus => "Projects",
            Self::Plots => "Plots",
        }
    }

    /// Returns the singular name used in delete endpoints (`delete{Singular}`).
    #[must_use]
    pub fn singular_name(&self) -> &'static str {
        match self {
            Self::Leads => "Lead",
            Self::Bookings => "Booking",
            Self::ProjectStatus => "Project",
            Self::Plots => "Plot",
        }
    }

    /// Returns a stable value for logs and CLI arguments.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Leads => "leads",
            Self::Bookings => "bookings",
            Self::ProjectStatus => "project_status",
            Self::Plots => "plots",
        }
    }
}

/// One row of an entity list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListRecord {
    id: RecordId,
    data: Value,
}

impl ListRecord {
    /// Creates a row from a JSON object carrying `id` or `_id`.
    pub fn from_value(data: Value) -> AppResult<Self> {
        let object = data.as_object().ok_or_else(|| {
            AppError::Validation("list rows must be JSON objects".to_owned())
        })?;

        let id = object
            .get("id")
            .or_else(|| object.get("_id"))
            .and_then(record_id_from_value)
            .ok_or_else(|| AppError::Validation("list row is missing an id".to_owned()))?;

        Ok(Self { id, data })
    }

    /// Returns the row identifier.
    #[must_use]
    pub fn id(&self) -> &RecordId {
        &self.id
    }

    /// Returns the row JSON object.
    #[must_use]
    pub fn data(&self) -> &Value {
        &self.data
    }

    /// Returns one field of the row.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }
}

fn record_id_from_value(value: &Value) -> Option<RecordId> {
    match value {
        Value::Number(number) => number.as_i64().map(RecordId::Number),
        Value::String(text) if !text.trim().is_empty() => Some(RecordId::from(text.as_str())),
        _ => None,
    }
}

/// Server pagination block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    /// Total rows matching the query.
    pub total: u64,
    /// Current page, starting at 1.
    pub page: u32,
    /// Page size.
    pub limit: u32,
    /// Number of pages.
    pub total_pages: u32,
}

/// One page of rows returned by a list endpoint.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordPage {
    /// Rows of the page.
    pub rows: Vec<ListRecord>,
    /// Pagination reported by the server.
    pub pagination: Pagination,
}

impl RecordPage {
    /// Returns the empty page shown after failures.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }
}
