use async_trait::async_trait;
use estatedesk_core::{AppResult, AuthToken};

/// Port for the persisted bearer token.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Loads the current token, or `None` when signed out.
    async fn load_token(&self) -> AppResult<Option<AuthToken>>;
}
