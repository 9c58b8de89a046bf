use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use estatedesk_application::TokenStore;
use estatedesk_core::{AppError, AppResult, AuthToken};
use serde_json::{Map, Value};
use tracing::debug;

/// Storage keys that have held the bearer token, highest priority first.
pub const LEGACY_TOKEN_KEYS: [&str; 4] = ["token", "authToken", "accessToken", "jwt"];

/// Token store backed by a persisted JSON key/value file.
#[derive(Debug, Clone)]
pub struct JsonFileTokenStore {
    path: PathBuf,
}

impl JsonFileTokenStore {
    /// Creates a store reading the given file.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn read_entries(&self) -> AppResult<Map<String, Value>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(Map::new()),
            Err(error) => {
                return Err(AppError::Internal(format!(
                    "failed to read token storage '{}': {error}",
                    self.path.display()
                )));
            }
        };

        if contents.trim().is_empty() {
            return Ok(Map::new());
        }

        match serde_json::from_str::<Value>(&contents) {
            Ok(Value::Object(entries)) => Ok(entries),
            Ok(_) => Err(AppError::Validation(format!(
                "token storage '{}' must hold a JSON object",
                self.path.display()
            ))),
            Err(error) => Err(AppError::Validation(format!(
                "token storage '{}' is not valid JSON: {error}",
                self.path.display()
            ))),
        }
    }

    async fn write_entries(&self, entries: Map<String, Value>) -> AppResult<()> {
        if let Some(parent) = self
            .path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
        {
            tokio::fs::create_dir_all(parent).await.map_err(|error| {
                AppError::Internal(format!(
                    "failed to create token storage directory '{}': {error}",
                    parent.display()
                ))
            })?;
        }

        let contents = serde_json::to_string_pretty(&Value::Object(entries)).map_err(|error| {
            AppError::Internal(format!("failed to encode token storage: {error}"))
        })?;
        tokio::fs::write(&self.path, contents).await.map_err(|error| {
            AppError::Internal(format!(
                "failed to write token storage '{}': {error}",
                self.path.display()
            ))
        })
    }

    /// Persists a token under the primary key, keeping other entries.
    pub async fn save_token(&self, token: &AuthToken) -> AppResult<()> {
        let mut entries = self.read_entries().await?;
        entries.insert(
            LEGACY_TOKEN_KEYS[0].to_owned(),
            Value::String(token.as_str().to_owned()),
        );

        self.write_entries(entries).await
    }

    /// Removes every token key, signing the user out.
    pub async fn clear_token(&self) -> AppResult<()> {
        let mut entries = self.read_entries().await?;
        let before = entries.len();
        for key in LEGACY_TOKEN_KEYS {
            entries.remove(key);
        }

        if entries.len() == before {
            return Ok(());
        }

        self.write_entries(entries).await
    }
}

/// Reads a stored value, unwrapping values that were stored JSON-encoded.
fn token_from_value(value: &Value) -> Option<AuthToken> {
    let raw = value.as_str()?;
    let unquoted = serde_json::from_str::<String>(raw).unwrap_or_else(|_| raw.to_owned());
    AuthToken::new(unquoted)
}

#[async_trait]
impl TokenStore for JsonFileTokenStore {
    async fn load_token(&self) -> AppResult<Option<AuthToken>> {
        let entries = self.read_entries().await?;
        let found = LEGACY_TOKEN_KEYS.iter().find_map(|key| {
            entries
                .get(*key)
                .and_then(token_from_value)
                .map(|token| (*key, token))
        });

        match found {
            Some((key, token)) => {
                debug!(key, "loaded bearer token from storage");
                Ok(Some(token))
            }
            None => Ok(None),
        }
    }
}
