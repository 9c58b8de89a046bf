use std::fmt::{Debug, Formatter};

use serde::{Deserialize, Serialize};

use crate::{AppError, AppResult};

/// Role of the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UserRole {
    /// Administrator; the only role allowed to decide bookings.
    Admin,
    /// Any other named role, e.g. a sales executive.
    Named(String),
}

impl UserRole {
    /// Parses a role name as stored by the backend.
    pub fn parse(value: &str) -> AppResult<Self> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(AppError::Validation("role name must not be empty".to_owned()));
        }

        if trimmed.eq_ignore_ascii_case("admin") {
            return Ok(Self::Admin);
        }

        Ok(Self::Named(trimmed.to_owned()))
    }

    /// Returns whether this is the administrator role.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }

    /// Returns the display name of the role.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Admin => "Admin",
            Self::Named(name) => name.as_str(),
        }
    }
}

/// Signed-in user as seen by the list views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    display_name: String,
    role_id: String,
    role: UserRole,
}

impl SessionUser {
    /// Creates a session user from the persisted login payload.
    #[must_use]
    pub fn new(display_name: impl Into<String>, role_id: impl Into<String>, role: UserRole) -> Self {
        Self {
            display_name: display_name.into(),
            role_id: role_id.into(),
            role,
        }
    }

    /// Returns the display name for the current user.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.display_name.as_str()
    }

    /// Returns the backend role identifier used to fetch grants.
    #[must_use]
    pub fn role_id(&self) -> &str {
        self.role_id.as_str()
    }

    /// Returns the user's role.
    #[must_use]
    pub fn role(&self) -> &UserRole {
        &self.role
    }
}

/// Bearer token read from persisted storage.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    /// Creates a token, returning `None` for blank values.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| Self(trimmed.to_owned()))
    }

    /// Returns the raw token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Debug for AuthToken {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str("AuthToken(..)")
    }
}
