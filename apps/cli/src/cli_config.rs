use std::env;
use std::path::PathBuf;

use estatedesk_core::{AppError, AppResult, SessionUser, UserRole};
use url::Url;

const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:5000/api";
const DEFAULT_STORAGE_PATH: &str = ".estatedesk/storage.json";
const DEFAULT_ROLE_NAME: &str = "Admin";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Clone)]
pub struct CliConfig {
    pub api_base_url: String,
    pub storage_path: PathBuf,
    pub role_id: String,
    pub role_name: String,
    pub display_name: String,
    pub http_timeout_secs: u64,
}

impl CliConfig {
    pub fn load() -> AppResult<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let api_base_url = lookup("ESTATEDESK_API_BASE_URL")
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_owned());
        let parsed = Url::parse(api_base_url.as_str()).map_err(|error| {
            AppError::Validation(format!(
                "invalid ESTATEDESK_API_BASE_URL value '{api_base_url}': {error}"
            ))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(AppError::Validation(format!(
                "ESTATEDESK_API_BASE_URL must use http or https, got '{}'",
                parsed.scheme()
            )));
        }

        let storage_path = lookup("ESTATEDESK_STORAGE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STORAGE_PATH));
        let role_id = lookup("ESTATEDESK_ROLE_ID").unwrap_or_default();
        let role_name =
            lookup("ESTATEDESK_ROLE_NAME").unwrap_or_else(|| DEFAULT_ROLE_NAME.to_owned());
        let display_name =
            lookup("ESTATEDESK_USER_NAME").unwrap_or_else(|| role_name.clone());
        let http_timeout_secs = match lookup("ESTATEDESK_HTTP_TIMEOUT_SECS") {
            Some(value) => value.parse::<u64>().map_err(|error| {
                AppError::Validation(format!(
                    "invalid ESTATEDESK_HTTP_TIMEOUT_SECS value '{value}': {error}"
                ))
            })?,
            None => DEFAULT_HTTP_TIMEOUT_SECS,
        };

        Ok(Self {
            api_base_url,
            storage_path,
            role_id,
            role_name,
            display_name,
            http_timeout_secs,
        })
    }

    pub fn session_user(&self) -> AppResult<SessionUser> {
        Ok(SessionUser::new(
            self.display_name.as_str(),
            self.role_id.as_str(),
            UserRole::parse(self.role_name.as_str())?,
        ))
    }
}
