//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod http_crm_backend;
mod in_memory_crm_backend;
mod json_file_token_store;
mod response_normalization;
mod tracing_notifier;

pub use http_crm_backend::HttpCrmBackend;
pub use in_memory_crm_backend::InMemoryCrmBackend;
pub use json_file_token_store::{JsonFileTokenStore, LEGACY_TOKEN_KEYS};
pub use tracing_notifier::TracingNotifier;
