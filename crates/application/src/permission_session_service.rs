use std::sync::Arc;

use estatedesk_core::{AppResult, SessionUser};
use estatedesk_domain::{
    Capability, CapabilityIds, PageGrants, PageName, PermissionCatalog, PermissionSnapshot,
};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::crm_ports::{PermissionSource, TokenStore};

/// Process-wide holder of the current role's grants and the permission catalog.
///
/// Clones share the same snapshot. List views only read it; it changes on
/// [`PermissionSessionService::load`] and [`PermissionSessionService::invalidate`].
#[derive(Clone)]
pub struct PermissionSessionService {
    source: Arc<dyn PermissionSource>,
    tokens: Arc<dyn TokenStore>,
    capability_ids: CapabilityIds,
    snapshot: Arc<RwLock<Arc<PermissionSnapshot>>>,
}

impl PermissionSessionService {
    /// Creates a service with an empty snapshot.
    #[must_use]
    pub fn new(
        source: Arc<dyn PermissionSource>,
        tokens: Arc<dyn TokenStore>,
        capability_ids: CapabilityIds,
    ) -> Self {
        Self {
            source,
            tokens,
            capability_ids,
            snapshot: Arc::new(RwLock::new(Arc::new(PermissionSnapshot::default()))),
        }
    }

    /// Fetches grants and catalog for the user's role and replaces the snapshot.
    ///
    /// Without a token the snapshot is emptied and nothing is fetched. A
    /// failed catalog fetch keeps the grants with an empty catalog.
    pub async fn load(&self, user: &SessionUser) -> AppResult<Arc<PermissionSnapshot>> {
        let Some(token) = self.tokens.load_token().await? else {
            warn!(role = %user.role().as_str(), "no session token, permissions cleared");
            return Ok(self.replace(PermissionSnapshot::default()).await);
        };

        let (grants, catalog) = tokio::join!(
            self.source.fetch_page_grants(&token, user.role_id()),
            self.source.fetch_permission_catalog(&token),
        );

        let grants = PageGrants::new(grants?);
        let catalog = match catalog {
            Ok(definitions) => PermissionCatalog::new(definitions),
            Err(error) => {
                warn!(error = %error, "permission catalog unavailable, using grants only");
                PermissionCatalog::default()
            }
        };

        info!(
            role = %user.role().as_str(),
            page_grants = grants.len(),
            catalog_entries = catalog.len(),
            "permissions loaded"
        );

        Ok(self
            .replace(PermissionSnapshot::new(
                grants,
                catalog,
                self.capability_ids.clone(),
            ))
            .await)
    }

    /// Drops the loaded permissions; every check denies until the next load.
    pub async fn invalidate(&self) {
        self.replace(PermissionSnapshot::default()).await;
    }

    /// Returns the current snapshot.
    pub async fn snapshot(&self) -> Arc<PermissionSnapshot> {
        self.snapshot.read().await.clone()
    }

    /// Returns whether the capability is granted on the page.
    pub async fn can(&self, page: PageName, capability: Capability) -> bool {
        self.snapshot.read().await.can(page, capability)
    }

    async fn replace(&self, snapshot: PermissionSnapshot) -> Arc<PermissionSnapshot> {
        let snapshot = Arc::new(snapshot);
        *self.snapshot.write().await = snapshot.clone();
        snapshot
    }
}
