/// Transient user notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// An action completed.
    Success(String),
    /// An action failed or was refused.
    Error(String),
    /// The session token is missing or expired.
    SessionExpired,
}

impl Notice {
    /// Returns the text shown to the user.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Success(message) | Self::Error(message) => message.as_str(),
            Self::SessionExpired => "Your session has expired. Please sign in again.",
        }
    }
}

/// Port for surfacing notices (toasts in the UI, log lines in the CLI).
pub trait Notifier: Send + Sync {
    /// Shows one notice.
    fn notify(&self, notice: Notice);
}
