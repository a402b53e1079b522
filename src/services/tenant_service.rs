use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::database::models::{Tenant, TenantMembership};
use crate::database::store::{StoreError, TenantStore};

#[derive(Debug, thiserror::Error)]
pub enum TenantError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Tenant not found: {0}")]
    NotFound(Uuid),
    #[error("No tenant available; onboarding required")]
    NeedsOnboarding,
    #[error("Subdomain already exists: {0}")]
    SubdomainTaken(String),
    #[error("Invalid subdomain: {0}")]
    InvalidSubdomain(String),
    #[error("Invalid tenant name: {0}")]
    InvalidName(String),
}

/// Where the last-used tenant of each user is remembered between sessions
#[async_trait]
pub trait TenantPreferences: Send + Sync {
    async fn last_used(&self, user_id: Uuid) -> Option<Uuid>;
    async fn remember(&self, user_id: Uuid, tenant_id: Uuid);
}

/// Process-local preference table used by the HTTP service
#[derive(Default)]
pub struct InMemoryPreferences {
    last_used: RwLock<HashMap<Uuid, Uuid>>,
}

#[async_trait]
impl TenantPreferences for InMemoryPreferences {
    async fn last_used(&self, user_id: Uuid) -> Option<Uuid> {
        self.last_used.read().await.get(&user_id).copied()
    }

    async fn remember(&self, user_id: Uuid, tenant_id: Uuid) {
        self.last_used.write().await.insert(user_id, tenant_id);
    }
}

/// The tenants a user belongs to and the one their session is scoped to
#[derive(Debug, Clone)]
pub struct TenantContext {
    pub user_id: Uuid,
    pub current_tenant: Option<Tenant>,
    pub tenants: Vec<Tenant>,
    pub memberships: Vec<TenantMembership>,
}

/// Serializable view of a [`TenantContext`] with its derived flags
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantContextView {
    pub user_id: Uuid,
    pub current_tenant: Option<Tenant>,
    pub tenants: Vec<Tenant>,
    pub memberships: Vec<TenantMembership>,
    pub needs_onboarding: bool,
    pub can_access_careflow: bool,
    pub can_access_novumflow: bool,
}

impl TenantContext {
    pub fn needs_onboarding(&self) -> bool {
        self.tenants.is_empty()
    }

    /// Id of the current tenant, required by every tenant-scoped operation
    pub fn require_tenant(&self) -> Result<Uuid, TenantError> {
        self.current_tenant
            .as_ref()
            .map(|t| t.id)
            .ok_or(TenantError::NeedsOnboarding)
    }

    pub fn current_membership(&self) -> Option<&TenantMembership> {
        let tenant = self.current_tenant.as_ref()?;
        self.memberships.iter().find(|m| m.tenant_id == tenant.id)
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.current_membership()
            .is_some_and(|membership| membership.grants(permission))
    }

    /// Features are on unless the tenant disables them in its settings
    pub fn has_feature(&self, feature: &str) -> bool {
        match &self.current_tenant {
            Some(tenant) => !tenant.disabled_features().contains(&feature),
            None => true,
        }
    }

    pub fn can_access_careflow(&self) -> bool {
        self.current_tenant
            .as_ref()
            .and_then(|t| t.features.as_ref())
            .and_then(|f| f.careflow_enabled)
            .unwrap_or(false)
    }

    pub fn can_access_novumflow(&self) -> bool {
        self.current_tenant
            .as_ref()
            .and_then(|t| t.features.as_ref())
            .and_then(|f| f.novumflow_enabled)
            != Some(false)
    }

    pub fn into_view(self) -> TenantContextView {
        TenantContextView {
            needs_onboarding: self.needs_onboarding(),
            can_access_careflow: self.can_access_careflow(),
            can_access_novumflow: self.can_access_novumflow(),
            user_id: self.user_id,
            current_tenant: self.current_tenant,
            tenants: self.tenants,
            memberships: self.memberships,
        }
    }
}

/// Resolves and switches the tenant a user's session applies to
pub struct TenantService {
    store: Arc<dyn TenantStore>,
    preferences: Arc<dyn TenantPreferences>,
}

impl TenantService {
    pub fn new(store: Arc<dyn TenantStore>, preferences: Arc<dyn TenantPreferences>) -> Self {
        Self { store, preferences }
    }

    /// Build the session context for `user_id`. `requested` is the tenant
    /// named in the URL; it wins over the remembered choice, which wins over
    /// the oldest membership.
    pub async fn load(
        &self,
        user_id: Uuid,
        requested: Option<&str>,
    ) -> Result<TenantContext, TenantError> {
        debug!("Loading memberships for user {}", user_id);
        let memberships = self.store.active_memberships(user_id).await?;

        let tenants = if memberships.is_empty() {
            self.fallback_tenants(user_id).await
        } else {
            let ids: Vec<Uuid> = memberships.iter().map(|m| m.tenant_id).collect();
            let mut tenants = self.store.active_tenants(&ids).await?;
            // Keep membership order so "first available" means oldest membership
            tenants.sort_by_key(|t| ids.iter().position(|id| *id == t.id));
            tenants
        };

        let requested = requested.and_then(|raw| match Uuid::parse_str(raw.trim()) {
            Ok(id) => Some(id),
            Err(_) => {
                debug!("Ignoring malformed tenant parameter '{}'", raw);
                None
            }
        });
        let saved = self.preferences.last_used(user_id).await;

        let current = requested
            .and_then(|id| tenants.iter().find(|t| t.id == id))
            .or_else(|| saved.and_then(|id| tenants.iter().find(|t| t.id == id)))
            .or_else(|| tenants.first())
            .cloned();

        match &current {
            Some(tenant) => {
                debug!("Current tenant for {} is {} ({})", user_id, tenant.name, tenant.id);
                self.preferences.remember(user_id, tenant.id).await;
                self.apply_row_level_security(user_id, tenant.id).await;
            }
            None => info!("User {} has no tenants; onboarding required", user_id),
        }

        Ok(TenantContext {
            user_id,
            current_tenant: current,
            tenants,
            memberships,
        })
    }

    /// Move the session to another of the user's tenants. Nothing is patched
    /// in place: the returned context is rebuilt from the store.
    pub async fn switch_tenant(
        &self,
        context: &TenantContext,
        tenant_id: Uuid,
    ) -> Result<TenantContext, TenantError> {
        if !context.tenants.iter().any(|t| t.id == tenant_id) {
            error!("Tenant not found: {}", tenant_id);
            return Err(TenantError::NotFound(tenant_id));
        }

        self.preferences.remember(context.user_id, tenant_id).await;
        self.apply_row_level_security(context.user_id, tenant_id).await;

        self.load(context.user_id, None).await
    }

    pub async fn create_tenant(
        &self,
        owner_user_id: Uuid,
        name: &str,
        subdomain: &str,
    ) -> Result<Tenant, TenantError> {
        let name = validate_tenant_name(name)?;
        let subdomain = validate_subdomain(subdomain)?;

        if self.store.tenant_by_subdomain(&subdomain).await?.is_some() {
            return Err(TenantError::SubdomainTaken(subdomain));
        }

        match self.store.create_tenant(name, &subdomain, owner_user_id).await {
            Ok(tenant) => {
                info!("Tenant created: {} ({})", tenant.name, tenant.id);
                Ok(tenant)
            }
            Err(e) if e.is_timeout() => {
                warn!("create_tenant timed out; checking whether '{}' exists", subdomain);
                match self.store.tenant_by_subdomain(&subdomain).await {
                    Ok(Some(tenant)) => {
                        info!("Tenant '{}' was created despite the timeout", subdomain);
                        Ok(tenant)
                    }
                    Ok(None) => Err(e.into()),
                    Err(check) => {
                        error!("Failed to verify tenant creation: {}", check);
                        Err(e.into())
                    }
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn health_check(&self) -> Result<(), StoreError> {
        self.store.health_check().await
    }

    async fn fallback_tenants(&self, user_id: Uuid) -> Vec<Tenant> {
        debug!("No memberships for {}; asking get_my_tenants", user_id);
        match self.store.my_tenants(user_id).await {
            Ok(rows) => {
                if !rows.is_empty() {
                    info!("Found {} tenants via get_my_tenants for {}", rows.len(), user_id);
                }
                rows.into_iter().map(|row| row.into_tenant()).collect()
            }
            Err(e) => {
                warn!("get_my_tenants failed for {}: {}", user_id, e);
                vec![]
            }
        }
    }

    async fn apply_row_level_security(&self, user_id: Uuid, tenant_id: Uuid) {
        match self.store.set_current_tenant(user_id, tenant_id).await {
            Ok(()) => debug!("RLS context set to {}", tenant_id),
            Err(e) => error!("Error setting tenant context {}: {}", tenant_id, e),
        }
    }
}

fn validate_tenant_name(name: &str) -> Result<&str, TenantError> {
    let name = name.trim();
    let length = name.chars().count();
    if length < 2 {
        return Err(TenantError::InvalidName("Tenant name must be at least 2 characters".to_string()));
    }
    if length > 100 {
        return Err(TenantError::InvalidName("Tenant name must be less than 100 characters".to_string()));
    }
    Ok(name)
}

/// Subdomains become DNS labels: lowercase letters, digits and inner hyphens
fn validate_subdomain(subdomain: &str) -> Result<String, TenantError> {
    let subdomain = subdomain.trim().to_string();
    if subdomain.len() < 3 || subdomain.len() > 63 {
        return Err(TenantError::InvalidSubdomain("Subdomain must be 3 to 63 characters".to_string()));
    }
    if !subdomain
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(TenantError::InvalidSubdomain(
            "Subdomain can only contain lowercase letters, numbers, and hyphens".to_string(),
        ));
    }
    if subdomain.starts_with('-') || subdomain.ends_with('-') {
        return Err(TenantError::InvalidSubdomain("Subdomain cannot start or end with a hyphen".to_string()));
    }
    Ok(subdomain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::{Fault, Fixture, MemoryStore, RlsCall};

    const DEMO: &str = include_str!("../../fixtures/demo.yaml");

    const RINGWOOD: u128 = 0x0b0c3a52_6f0e_4c39_9b1f_5a2f1d1e9a01;
    const ASHDOWN: u128 = 0x0b0c3a52_6f0e_4c39_9b1f_5a2f1d1e9a02;
    const CLOSED: u128 = 0x0b0c3a52_6f0e_4c39_9b1f_5a2f1d1e9a03;
    const ADMIN_USER: u128 = 0x5f1a2b3c_0000_4000_8000_00000000a001;
    const RPC_USER: u128 = 0x5f1a2b3c_0000_4000_8000_00000000a002;

    fn id(n: u128) -> Uuid {
        Uuid::from_u128(n)
    }

    fn setup() -> (TenantService, Arc<MemoryStore>, Arc<InMemoryPreferences>) {
        let store = Arc::new(MemoryStore::new(Fixture::from_yaml(DEMO).unwrap()));
        let preferences = Arc::new(InMemoryPreferences::default());
        let service = TenantService::new(store.clone(), preferences.clone());
        (service, store, preferences)
    }

    #[tokio::test]
    async fn first_active_membership_becomes_current() {
        let (service, store, preferences) = setup();
        let ctx = service.load(id(ADMIN_USER), None).await.unwrap();

        let ids: Vec<Uuid> = ctx.tenants.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![id(RINGWOOD), id(ASHDOWN)]);
        assert!(!ids.contains(&id(CLOSED)));
        assert_eq!(ctx.require_tenant().unwrap(), id(RINGWOOD));
        assert_eq!(preferences.last_used(id(ADMIN_USER)).await, Some(id(RINGWOOD)));
        assert_eq!(
            store.rls_calls().await,
            vec![RlsCall { user_id: id(ADMIN_USER), tenant_id: id(RINGWOOD) }]
        );
    }

    #[tokio::test]
    async fn url_parameter_beats_saved_choice() {
        let (service, _, preferences) = setup();
        preferences.remember(id(ADMIN_USER), id(RINGWOOD)).await;

        let ashdown = id(ASHDOWN).to_string();
        let ctx = service.load(id(ADMIN_USER), Some(&ashdown)).await.unwrap();
        assert_eq!(ctx.require_tenant().unwrap(), id(ASHDOWN));
        assert_eq!(preferences.last_used(id(ADMIN_USER)).await, Some(id(ASHDOWN)));
    }

    #[tokio::test]
    async fn saved_choice_beats_first_membership() {
        let (service, _, preferences) = setup();
        preferences.remember(id(ADMIN_USER), id(ASHDOWN)).await;

        let ctx = service.load(id(ADMIN_USER), None).await.unwrap();
        assert_eq!(ctx.require_tenant().unwrap(), id(ASHDOWN));
    }

    #[tokio::test]
    async fn unknown_or_malformed_parameter_is_ignored() {
        let (service, _, _) = setup();
        let closed = id(CLOSED).to_string();
        let ctx = service.load(id(ADMIN_USER), Some(&closed)).await.unwrap();
        assert_eq!(ctx.require_tenant().unwrap(), id(RINGWOOD));

        let ctx = service.load(id(ADMIN_USER), Some("ringwood")).await.unwrap();
        assert_eq!(ctx.require_tenant().unwrap(), id(RINGWOOD));
    }

    #[tokio::test]
    async fn procedure_fallback_fills_defaults() {
        let (service, _, _) = setup();
        let ctx = service.load(id(RPC_USER), None).await.unwrap();
        let tenant = ctx.current_tenant.as_ref().unwrap();
        assert_eq!(tenant.id, id(ASHDOWN));
        assert_eq!(tenant.name, "Unknown Organization");
        assert!(ctx.memberships.is_empty());
    }

    #[tokio::test]
    async fn no_tenants_means_onboarding() {
        let (service, store, _) = setup();
        let ctx = service.load(Uuid::new_v4(), None).await.unwrap();
        assert!(ctx.needs_onboarding());
        assert!(matches!(ctx.require_tenant(), Err(TenantError::NeedsOnboarding)));
        assert!(store.rls_calls().await.is_empty());
    }

    #[tokio::test]
    async fn membership_failure_is_an_error() {
        let (service, store, _) = setup();
        store.inject_fault("user_tenant_memberships", Fault::Fail).await;
        let err = service.load(id(ADMIN_USER), None).await.unwrap_err();
        assert!(matches!(err, TenantError::Store(_)));
    }

    #[tokio::test]
    async fn rls_failure_does_not_abort_load() {
        let (service, store, _) = setup();
        store.inject_fault("set_current_tenant", Fault::Fail).await;
        let ctx = service.load(id(ADMIN_USER), None).await.unwrap();
        assert_eq!(ctx.require_tenant().unwrap(), id(RINGWOOD));
    }

    #[tokio::test]
    async fn switch_reloads_with_new_scope() {
        let (service, store, preferences) = setup();
        let ctx = service.load(id(ADMIN_USER), None).await.unwrap();

        let switched = service.switch_tenant(&ctx, id(ASHDOWN)).await.unwrap();
        assert_eq!(switched.require_tenant().unwrap(), id(ASHDOWN));
        assert_eq!(preferences.last_used(id(ADMIN_USER)).await, Some(id(ASHDOWN)));

        let calls = store.rls_calls().await;
        assert_eq!(calls.last().unwrap().tenant_id, id(ASHDOWN));
        // switch call plus the reload's own call
        assert_eq!(calls.len(), 3);
    }

    #[tokio::test]
    async fn switch_to_foreign_tenant_is_rejected() {
        let (service, store, _) = setup();
        let ctx = service.load(id(ADMIN_USER), None).await.unwrap();
        let before = store.rls_calls().await.len();

        let err = service.switch_tenant(&ctx, id(CLOSED)).await.unwrap_err();
        assert!(matches!(err, TenantError::NotFound(t) if t == id(CLOSED)));
        assert_eq!(store.rls_calls().await.len(), before);
    }

    #[tokio::test]
    async fn permissions_follow_membership_role() {
        let (service, _, _) = setup();
        let ctx = service.load(id(ADMIN_USER), None).await.unwrap();
        assert!(ctx.has_permission("manage_rota"));

        let ctx = service.switch_tenant(&ctx, id(ASHDOWN)).await.unwrap();
        assert!(ctx.has_permission("view_staff"));
        assert!(!ctx.has_permission("manage_rota"));

        let empty = service.load(Uuid::new_v4(), None).await.unwrap();
        assert!(!empty.has_permission("view_staff"));
    }

    #[tokio::test]
    async fn feature_switches() {
        let (service, _, _) = setup();
        let ringwood = service.load(id(ADMIN_USER), None).await.unwrap();
        assert!(ringwood.can_access_careflow());
        assert!(ringwood.can_access_novumflow());
        assert!(ringwood.has_feature("telehealth"));

        let ashdown = service.switch_tenant(&ringwood, id(ASHDOWN)).await.unwrap();
        assert!(!ashdown.can_access_careflow());
        assert!(ashdown.can_access_novumflow());
        assert!(!ashdown.has_feature("telehealth"));
        assert!(ashdown.has_feature("rostering"));

        let nobody = service.load(Uuid::new_v4(), None).await.unwrap();
        assert!(nobody.has_feature("telehealth"));
        assert!(!nobody.can_access_careflow());
        assert!(nobody.can_access_novumflow());
    }

    #[tokio::test]
    async fn create_tenant_validates_and_rejects_duplicates() {
        let (service, _, _) = setup();
        let owner = Uuid::new_v4();

        let err = service.create_tenant(owner, "Ringwood Two", "ringwood").await.unwrap_err();
        assert!(matches!(err, TenantError::SubdomainTaken(_)));

        let err = service.create_tenant(owner, "Bad", "Bad_Sub").await.unwrap_err();
        assert!(matches!(err, TenantError::InvalidSubdomain(_)));

        let err = service.create_tenant(owner, " ", "harbour").await.unwrap_err();
        assert!(matches!(err, TenantError::InvalidName(_)));

        let tenant = service.create_tenant(owner, "Harbour Homecare", "harbour").await.unwrap();
        assert_eq!(tenant.subdomain, "harbour");

        let ctx = service.load(owner, None).await.unwrap();
        assert_eq!(ctx.require_tenant().unwrap(), tenant.id);
    }

    #[tokio::test]
    async fn create_tenant_recovers_from_timeout() {
        let (service, store, _) = setup();
        store.inject_fault("create_tenant", Fault::TimeoutAfterApply).await;

        let tenant = service
            .create_tenant(Uuid::new_v4(), "Slow Start Care", "slow-start")
            .await
            .unwrap();
        assert_eq!(tenant.name, "Slow Start Care");
    }

    #[test]
    fn subdomain_rules() {
        assert!(validate_subdomain("care-42").is_ok());
        assert!(validate_subdomain("ab").is_err());
        assert!(validate_subdomain("-care").is_err());
        assert!(validate_subdomain("Care").is_err());
        assert!(validate_subdomain("care.home").is_err());
    }

    #[test]
    fn name_length_counts_characters() {
        assert_eq!(validate_tenant_name("  Ringwood  ").unwrap(), "Ringwood");
        assert!(matches!(validate_tenant_name("Ü"), Err(TenantError::InvalidName(_))));
        assert!(validate_tenant_name("ÜÖ").is_ok());
        assert!(validate_tenant_name(&"介".repeat(60)).is_ok());
        assert!(validate_tenant_name(&"介".repeat(100)).is_ok());
        assert!(validate_tenant_name(&"介".repeat(101)).is_err());
    }
}
