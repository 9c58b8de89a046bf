use std::sync::Arc;
use std::time::Duration;

use estatedesk_application::{
    BookingWorkflowService, BulkActionService, CrmBackend, Notifier, PermissionSessionService,
    PermissionSource, TokenStore,
};
use estatedesk_core::{AppError, AppResult, SessionUser};
use estatedesk_domain::CapabilityIds;
use estatedesk_infrastructure::{HttpCrmBackend, JsonFileTokenStore, TracingNotifier};

use crate::cli_config::CliConfig;
use crate::demo;

/// Services wired for one CLI invocation.
pub struct CliServices {
    pub user: SessionUser,
    pub backend: Arc<dyn CrmBackend>,
    pub tokens: Arc<dyn TokenStore>,
    pub token_file: JsonFileTokenStore,
    pub notifier: Arc<dyn Notifier>,
    pub permissions: PermissionSessionService,
    pub bulk_actions: BulkActionService,
    pub bookings: BookingWorkflowService,
}

impl CliServices {
    pub fn connect(config: &CliConfig) -> AppResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()
            .map_err(|error| AppError::Internal(format!("failed to build HTTP client: {error}")))?;
        let backend = Arc::new(HttpCrmBackend::new(
            http_client,
            config.api_base_url.as_str(),
        ));
        let token_file = JsonFileTokenStore::new(config.storage_path.clone());

        Ok(Self::assemble(
            config.session_user()?,
            backend.clone(),
            backend,
            Arc::new(token_file.clone()),
            token_file,
        ))
    }

    pub async fn demo(config: &CliConfig) -> AppResult<Self> {
        let backend = Arc::new(demo::seeded_backend().await);

        Ok(Self::assemble(
            config.session_user()?,
            backend.clone(),
            backend,
            Arc::new(demo::DemoTokenStore),
            JsonFileTokenStore::new(config.storage_path.clone()),
        ))
    }

    fn assemble(
        user: SessionUser,
        backend: Arc<dyn CrmBackend>,
        permission_source: Arc<dyn PermissionSource>,
        tokens: Arc<dyn TokenStore>,
        token_file: JsonFileTokenStore,
    ) -> Self {
        let notifier: Arc<dyn Notifier> = Arc::new(TracingNotifier);
        let permissions = PermissionSessionService::new(
            permission_source,
            tokens.clone(),
            CapabilityIds::default(),
        );
        let bulk_actions = BulkActionService::new(
            permissions.clone(),
            backend.clone(),
            tokens.clone(),
            notifier.clone(),
        );
        let bookings = BookingWorkflowService::new(
            permissions.clone(),
            backend.clone(),
            tokens.clone(),
            notifier.clone(),
        );

        Self {
            user,
            backend,
            tokens,
            token_file,
            notifier,
            permissions,
            bulk_actions,
            bookings,
        }
    }
}
