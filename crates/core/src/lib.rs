//! Shared primitives for all Rust crates in EstateDesk.

#![forbid(unsafe_code)]

/// Authentication primitives shared across services.
pub mod auth;

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use auth::{AuthToken, SessionUser, UserRole};

/// Result type used across EstateDesk crates.
pub type AppResult<T> = Result<T, AppError>;

/// Row identifier as returned by the backend.
///
/// Some endpoints return numeric ids and others string ids, so both are kept
/// verbatim and compared by variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    /// Numeric identifier.
    Number(i64),
    /// String identifier.
    Text(String),
}

impl RecordId {
    /// Returns the identifier as a path segment.
    #[must_use]
    pub fn as_path_segment(&self) -> String {
        self.to_string()
    }
}

impl Display for RecordId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(value) => write!(formatter, "{value}"),
            Self::Text(value) => formatter.write_str(value),
        }
    }
}

impl From<i64> for RecordId {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        // Only canonical integers become numbers so "007" keeps its text form.
        match value.parse::<i64>() {
            Ok(number) if number.to_string() == value => Self::Number(number),
            _ => Self::Text(value.to_owned()),
        }
    }
}

/// Common application error categories.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid input or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// Requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Write operation conflicts with existing state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Session token is missing or expired.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// User is authenticated but blocked by authorization policy.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Internal unexpected error, including transport failures.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the raw message without the category prefix.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Validation(message)
            | Self::NotFound(message)
            | Self::Conflict(message)
            | Self::Unauthorized(message)
            | Self::Forbidden(message)
            | Self::Internal(message) => message.as_str(),
        }
    }

    /// Returns whether the error means the session is no longer valid.
    #[must_use]
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }
}

#[cfg(test)]
mod tests {
    use super::{AppError, RecordId};

    #[test]
    fn record_id_parses_numeric_strings() {
        assert_eq!(RecordId::from("42"), RecordId::Number(42));
        assert_eq!(RecordId::from("BK-7"), RecordId::Text("BK-7".to_owned()));
        assert_eq!(RecordId::from("007"), RecordId::Text("007".to_owned()));
    }

    #[test]
    fn record_id_deserializes_both_shapes() {
        let numeric: Result<RecordId, _> = serde_json::from_str("7");
        let text: Result<RecordId, _> = serde_json::from_str("\"abc\"");
        assert!(matches!(numeric, Ok(RecordId::Number(7))));
        assert!(matches!(text, Ok(RecordId::Text(ref value)) if value == "abc"));
    }

    #[test]
    fn error_message_strips_category() {
        let error = AppError::Forbidden("Only admins can approve".to_owned());
        assert_eq!(error.message(), "Only admins can approve");
        assert_eq!(error.to_string(), "forbidden: Only admins can approve");
    }
}
