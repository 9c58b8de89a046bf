use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use estatedesk_core::AppError;
use serde::{Deserialize, Serialize};

/// Capabilities checked against page grants and the permission catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Create records.
    Add,
    /// Edit records.
    Edit,
    /// Delete records, singly or in bulk.
    Delete,
    /// Export loaded rows.
    Export,
    /// Upload files for a record.
    Upload,
    /// Assign many records to one user.
    BulkAssign,
}

impl Capability {
    /// Returns the permission name used in the catalog.
    #[must_use]
    pub fn catalog_name(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Edit => "edit",
            Self::Delete => "delete",
            Self::Export => "export",
            Self::Upload => "upload",
            Self::BulkAssign => "bulk assign",
        }
    }

    /// Returns all known capabilities.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[Capability] = &[
            Capability::Add,
            Capability::Edit,
            Capability::Delete,
            Capability::Export,
            Capability::Upload,
            Capability::BulkAssign,
        ];

        ALL
    }
}

impl FromStr for Capability {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_lowercase();
        Self::all()
            .iter()
            .copied()
            .find(|capability| capability.catalog_name() == normalized)
            .ok_or_else(|| AppError::Validation(format!("unknown capability '{value}'")))
    }
}

/// Permission ids assigned to each capability by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityIds(BTreeMap<Capability, u32>);

impl CapabilityIds {
    /// Creates an id table from explicit pairs; unlisted capabilities keep the default id.
    #[must_use]
    pub fn with_overrides(overrides: impl IntoIterator<Item = (Capability, u32)>) -> Self {
        let mut table = Self::default();
        table.0.extend(overrides);
        table
    }

    /// Returns the permission id for a capability.
    #[must_use]
    pub fn id_for(&self, capability: Capability) -> u32 {
        self.0.get(&capability).copied().unwrap_or_default()
    }
}

impl Default for CapabilityIds {
    fn default() -> Self {
        Self(
            Capability::all()
                .iter()
                .copied()
                .zip(1_u32..)
                .collect::<BTreeMap<_, _>>(),
        )
    }
}

/// Pages that carry their own permission grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PageName {
    /// Lead list.
    Lead,
    /// Booking list.
    Booking,
    /// Project status list.
    ProjectStatus,
    /// Plot inventory list.
    Plots,
}

impl PageName {
    /// Returns the page name as stored in grants.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lead => "Lead",
            Self::Booking => "Booking",
            Self::ProjectStatus => "Project Status",
            Self::Plots => "Plots",
        }
    }
}

/// One entry of the cross-page grant fallback table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageFallback {
    /// Page whose grant may be missing.
    pub page: &'static str,
    /// Page whose grant is used instead.
    pub fallback_page: &'static str,
}

/// Legacy compatibility: booking screens historically shared the lead grant.
pub const PAGE_FALLBACKS: &[PageFallback] = &[PageFallback {
    page: "Booking",
    fallback_page: "Lead",
}];

/// Page-scoped permission grant of the current role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionGrant {
    /// Page the grant applies to.
    pub page_name: String,
    /// Granted permission ids.
    pub permission_ids: BTreeSet<u32>,
}

impl PermissionGrant {
    /// Creates a grant for one page.
    #[must_use]
    pub fn new(page_name: impl Into<String>, permission_ids: impl IntoIterator<Item = u32>) -> Self {
        Self {
            page_name: page_name.into(),
            permission_ids: permission_ids.into_iter().collect(),
        }
    }
}

/// Global permission definition, independent of role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionDefinition {
    /// Permission id.
    pub id: u32,
    /// Permission name, e.g. `bulk assign`.
    pub permission_name: String,
}

/// All grants of the current role keyed by lower-cased page name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageGrants(BTreeMap<String, PermissionGrant>);

impl PageGrants {
    /// Builds the grant map; a later grant for the same page replaces an earlier one.
    #[must_use]
    pub fn new(grants: impl IntoIterator<Item = PermissionGrant>) -> Self {
        Self(
            grants
                .into_iter()
                .map(|grant| (normalize_name(grant.page_name.as_str()), grant))
                .collect(),
        )
    }

    /// Finds the grant for a page, applying the fallback table.
    #[must_use]
    pub fn grant_for(&self, page: &str) -> Option<&PermissionGrant> {
        let key = normalize_name(page);
        if let Some(grant) = self.0.get(&key) {
            return Some(grant);
        }

        PAGE_FALLBACKS
            .iter()
            .find(|fallback| normalize_name(fallback.page) == key)
            .and_then(|fallback| self.0.get(&normalize_name(fallback.fallback_page)))
    }

    /// Returns whether no grants are loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of page grants.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// Global permission catalog keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionCatalog(BTreeMap<u32, PermissionDefinition>);

impl PermissionCatalog {
    /// Builds the catalog from fetched definitions.
    #[must_use]
    pub fn new(definitions: impl IntoIterator<Item = PermissionDefinition>) -> Self {
        Self(
            definitions
                .into_iter()
                .map(|definition| (definition.id, definition))
                .collect(),
        )
    }

    /// Finds a definition by id.
    #[must_use]
    pub fn find(&self, id: u32) -> Option<&PermissionDefinition> {
        self.0.get(&id)
    }

    /// Returns whether the catalog has no definitions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// Resolves one permission check for a page.
///
/// The grant must contain the id. The catalog entry for that id must then
/// carry the requested name; an empty catalog (not loaded yet, or offline)
/// accepts the grant alone, while a loaded catalog without the id denies.
#[must_use]
pub fn has_permission(
    permission_id: u32,
    permission_name: &str,
    page: &str,
    grants: &PageGrants,
    catalog: &PermissionCatalog,
) -> bool {
    let Some(grant) = grants.grant_for(page) else {
        return false;
    };

    if !grant.permission_ids.contains(&permission_id) {
        return false;
    }

    match catalog.find(permission_id) {
        Some(definition) => {
            normalize_name(definition.permission_name.as_str()) == normalize_name(permission_name)
        }
        None => catalog.is_empty(),
    }
}

/// Grants and catalog captured for one session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionSnapshot {
    grants: PageGrants,
    catalog: PermissionCatalog,
    capability_ids: CapabilityIds,
}

impl PermissionSnapshot {
    /// Creates a snapshot from normalized grants and catalog.
    #[must_use]
    pub fn new(grants: PageGrants, catalog: PermissionCatalog, capability_ids: CapabilityIds) -> Self {
        Self {
            grants,
            catalog,
            capability_ids,
        }
    }

    /// Returns whether the capability is granted on the page.
    #[must_use]
    pub fn can(&self, page: PageName, capability: Capability) -> bool {
        has_permission(
            self.capability_ids.id_for(capability),
            capability.catalog_name(),
            page.as_str(),
            &self.grants,
            &self.catalog,
        )
    }

    /// Returns the loaded grants.
    #[must_use]
    pub fn grants(&self) -> &PageGrants {
        &self.grants
    }

    /// Returns the loaded catalog.
    #[must_use]
    pub fn catalog(&self) -> &PermissionCatalog {
        &self.catalog
    }
}

fn normalize_name(value: &str) -> String {
    value.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::{
        Capability, CapabilityIds, PageGrants, PageName, PermissionCatalog, PermissionDefinition,
        PermissionGrant, PermissionSnapshot, has_permission,
    };

    fn catalog(entries: &[(u32, &str)]) -> PermissionCatalog {
        PermissionCatalog::new(entries.iter().map(|(id, name)| PermissionDefinition {
            id: *id,
            permission_name: (*name).to_owned(),
        }))
    }

    #[test]
    fn empty_catalog_accepts_granted_id() {
        let grants = PageGrants::new([PermissionGrant::new("Lead", [3])]);
        assert!(has_permission(3, "delete", "Lead", &grants, &PermissionCatalog::default()));
    }

    #[test]
    fn loaded_catalog_without_id_denies() {
        let grants = PageGrants::new([PermissionGrant::new("Lead", [3])]);
        let catalog = catalog(&[(1, "add")]);
        assert!(!has_permission(3, "delete", "Lead", &grants, &catalog));
    }

    #[test]
    fn name_comparison_trims_and_ignores_case() {
        let grants = PageGrants::new([PermissionGrant::new("lead", [6])]);
        let catalog = catalog(&[(6, "  Bulk Assign ")]);
        assert!(has_permission(6, "bulk assign", "LEAD", &grants, &catalog));
        assert!(!has_permission(6, "delete", "Lead", &grants, &catalog));
    }

    #[test]
    fn ungranted_id_is_denied_even_with_empty_catalog() {
        let grants = PageGrants::new([PermissionGrant::new("Lead", [1])]);
        assert!(!has_permission(3, "delete", "Lead", &grants, &PermissionCatalog::default()));
    }

    #[test]
    fn booking_page_falls_back_to_lead_grant() {
        let grants = PageGrants::new([PermissionGrant::new("Lead", [2])]);
        let catalog = catalog(&[(2, "edit")]);
        assert!(has_permission(2, "edit", "Booking", &grants, &catalog));
        assert!(!has_permission(2, "edit", "Plots", &grants, &catalog));
    }

    #[test]
    fn booking_grant_wins_over_fallback() {
        let grants = PageGrants::new([
            PermissionGrant::new("Lead", [2]),
            PermissionGrant::new("Booking", [1]),
        ]);
        assert!(!has_permission(2, "edit", "Booking", &grants, &PermissionCatalog::default()));
    }

    #[test]
    fn snapshot_uses_capability_id_table() {
        let grants = PageGrants::new([PermissionGrant::new("Plots", [40])]);
        let catalog = catalog(&[(40, "export")]);
        let ids = CapabilityIds::with_overrides([(Capability::Export, 40)]);
        let snapshot = PermissionSnapshot::new(grants, catalog, ids);

        assert!(snapshot.can(PageName::Plots, Capability::Export));
        assert!(!snapshot.can(PageName::Plots, Capability::Add));
    }

    #[test]
    fn capability_parses_catalog_names() {
        assert!(matches!(Capability::from_str(" Bulk Assign"), Ok(Capability::BulkAssign)));
        assert!(Capability::from_str("approve").is_err());
    }
}
