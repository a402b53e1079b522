use std::cmp::Reverse;
use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::database::models::{
    CareflowStaff, ComplianceRecord, Employee, MembershipRole, RpcTenant, SubscriptionStatus,
    SubscriptionTier, Tenant, TenantMembership,
};
use crate::database::store::{ComplianceStore, StoreError, TenantStore};

/// Seed data for [`MemoryStore`], loadable from YAML or JSON
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub tenants: Vec<Tenant>,
    #[serde(default)]
    pub memberships: Vec<TenantMembership>,
    #[serde(default)]
    pub employees: Vec<Employee>,
    #[serde(default)]
    pub careflow_staff: Vec<CareflowStaff>,
    #[serde(default)]
    pub compliance: Vec<ComplianceRecord>,
    /// Rows `get_my_tenants()` answers with, per user
    #[serde(default)]
    pub rpc_tenants: HashMap<Uuid, Vec<RpcTenant>>,
}

impl Fixture {
    pub fn from_yaml(text: &str) -> Result<Self, StoreError> {
        serde_yaml::from_str(text).map_err(|e| StoreError::QueryError(format!("invalid fixture: {}", e)))
    }

    /// Load a fixture file; `.json` files are parsed as JSON, anything else as YAML
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| StoreError::QueryError(format!("cannot read {}: {}", path.display(), e)))?;
        if path.extension().is_some_and(|ext| ext == "json") {
            Ok(serde_json::from_str(&text)?)
        } else {
            Self::from_yaml(&text)
        }
    }
}

/// How an injected fault behaves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Fail before touching state
    Fail,
    /// Apply the change, then report a timeout
    TimeoutAfterApply,
}

/// A remote procedure invocation observed by the memory store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RlsCall {
    pub user_id: Uuid,
    pub tenant_id: Uuid,
}

#[derive(Default)]
struct MemoryState {
    data: Fixture,
    faults: HashMap<&'static str, Fault>,
    rls_calls: Vec<RlsCall>,
}

/// In-process store used for development servers and tests. Filters mirror
/// the SQL issued by the Postgres store.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new(data: Fixture) -> Self {
        info!(
            "Memory store seeded: {} tenants, {} employees, {} compliance rows",
            data.tenants.len(),
            data.employees.len(),
            data.compliance.len()
        );
        Self {
            state: RwLock::new(MemoryState {
                data,
                ..Default::default()
            }),
        }
    }

    /// Make the named operation misbehave until cleared. Names match the
    /// table or procedure the operation touches, e.g. `"careflow_compliance"`.
    pub async fn inject_fault(&self, operation: &'static str, fault: Fault) {
        self.state.write().await.faults.insert(operation, fault);
    }

    pub async fn clear_faults(&self) {
        self.state.write().await.faults.clear();
    }

    /// Every `set_current_tenant` call seen so far, oldest first
    pub async fn rls_calls(&self) -> Vec<RlsCall> {
        self.state.read().await.rls_calls.clone()
    }

    fn check(state: &MemoryState, operation: &'static str) -> Result<Option<Fault>, StoreError> {
        match state.faults.get(operation) {
            Some(Fault::Fail) => Err(StoreError::QueryError(format!("{} unavailable", operation))),
            other => Ok(other.copied()),
        }
    }

    fn timeout(operation: &'static str) -> StoreError {
        StoreError::Timeout {
            operation,
            after: std::time::Duration::ZERO,
        }
    }
}

#[async_trait]
impl ComplianceStore for MemoryStore {
    async fn careflow_staff(
        &self,
        staff_id: Uuid,
        tenant_id: Uuid,
    ) -> Result<Option<CareflowStaff>, StoreError> {
        let state = self.state.read().await;
        Self::check(&state, "careflow_staff")?;
        Ok(state
            .data
            .careflow_staff
            .iter()
            .find(|s| s.id == staff_id && s.tenant_id == tenant_id)
            .cloned())
    }

    async fn compliance_record(
        &self,
        staff_id: Uuid,
        tenant_id: Uuid,
    ) -> Result<Option<ComplianceRecord>, StoreError> {
        let state = self.state.read().await;
        Self::check(&state, "careflow_compliance")?;
        // A staff member may have one row per synced record; the latest sync wins
        Ok(state
            .data
            .compliance
            .iter()
            .filter(|c| c.staff_id == staff_id && c.tenant_id == tenant_id)
            .max_by_key(|c| c.last_synced_at)
            .cloned())
    }

    async fn employee(
        &self,
        staff_id: Uuid,
        tenant_id: Uuid,
    ) -> Result<Option<Employee>, StoreError> {
        let state = self.state.read().await;
        Self::check(&state, "employees")?;
        Ok(state
            .data
            .employees
            .iter()
            .find(|e| e.id == staff_id && e.tenant_id == tenant_id)
            .cloned())
    }

    async fn active_employees(&self, tenant_id: Uuid) -> Result<Vec<Employee>, StoreError> {
        let state = self.state.read().await;
        Self::check(&state, "employees")?;
        let mut employees: Vec<Employee> = state
            .data
            .employees
            .iter()
            .filter(|e| e.tenant_id == tenant_id && e.is_active())
            .cloned()
            .collect();
        employees.sort_by(|a, b| {
            (a.last_name.as_deref(), a.first_name.as_deref())
                .cmp(&(b.last_name.as_deref(), b.first_name.as_deref()))
        });
        Ok(employees)
    }

    async fn compliance_records(
        &self,
        tenant_id: Uuid,
    ) -> Result<Vec<ComplianceRecord>, StoreError> {
        let state = self.state.read().await;
        Self::check(&state, "careflow_compliance")?;
        let mut records: Vec<ComplianceRecord> = state
            .data
            .compliance
            .iter()
            .filter(|c| c.tenant_id == tenant_id)
            .cloned()
            .collect();
        records.sort_by_key(|c| (c.staff_id, Reverse(c.last_synced_at)));
        Ok(records)
    }
}

#[async_trait]
impl TenantStore for MemoryStore {
    async fn active_memberships(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<TenantMembership>, StoreError> {
        let state = self.state.read().await;
        Self::check(&state, "user_tenant_memberships")?;
        let mut memberships: Vec<TenantMembership> = state
            .data
            .memberships
            .iter()
            .filter(|m| m.user_id == user_id && m.is_active)
            .cloned()
            .collect();
        memberships.sort_by_key(|m| m.joined_at);
        Ok(memberships)
    }

    async fn active_tenants(&self, ids: &[Uuid]) -> Result<Vec<Tenant>, StoreError> {
        let state = self.state.read().await;
        Self::check(&state, "tenants")?;
        Ok(state
            .data
            .tenants
            .iter()
            .filter(|t| t.is_active && ids.contains(&t.id))
            .cloned()
            .collect())
    }

    async fn my_tenants(&self, user_id: Uuid) -> Result<Vec<RpcTenant>, StoreError> {
        let state = self.state.read().await;
        Self::check(&state, "get_my_tenants")?;
        Ok(state.data.rpc_tenants.get(&user_id).cloned().unwrap_or_default())
    }

    async fn set_current_tenant(&self, user_id: Uuid, tenant_id: Uuid) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let fault = Self::check(&state, "set_current_tenant")?;
        state.rls_calls.push(RlsCall { user_id, tenant_id });
        match fault {
            Some(Fault::TimeoutAfterApply) => Err(Self::timeout("set_current_tenant")),
            _ => Ok(()),
        }
    }

    async fn tenant_by_subdomain(&self, subdomain: &str) -> Result<Option<Tenant>, StoreError> {
        let state = self.state.read().await;
        Self::check(&state, "tenants")?;
        Ok(state
            .data
            .tenants
            .iter()
            .find(|t| t.subdomain == subdomain)
            .cloned())
    }

    async fn create_tenant(
        &self,
        name: &str,
        subdomain: &str,
        owner_user_id: Uuid,
    ) -> Result<Tenant, StoreError> {
        let mut state = self.state.write().await;
        let fault = Self::check(&state, "create_tenant")?;

        if state.data.tenants.iter().any(|t| t.subdomain == subdomain) {
            return Err(StoreError::QueryError(format!(
                "duplicate key value violates unique constraint \"tenants_subdomain_key\" ({})",
                subdomain
            )));
        }

        let now = Utc::now();
        let tenant = Tenant {
            id: Uuid::new_v4(),
            name: name.to_string(),
            subdomain: subdomain.to_string(),
            slug: Some(subdomain.to_string()),
            logo_url: None,
            settings: Some(json!({})),
            features: None,
            subscription_tier: SubscriptionTier::Trial,
            subscription_status: Some(SubscriptionStatus::Trial),
            is_active: true,
            created_at: now,
        };
        state.data.tenants.push(tenant.clone());
        state.data.memberships.push(TenantMembership {
            id: Uuid::new_v4(),
            user_id: owner_user_id,
            tenant_id: tenant.id,
            role: MembershipRole::Owner,
            permissions: Some(vec![]),
            is_active: true,
            joined_at: now,
        });

        match fault {
            Some(Fault::TimeoutAfterApply) => Err(Self::timeout("create_tenant")),
            _ => Ok(tenant),
        }
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        let state = self.state.read().await;
        Self::check(&state, "health_check").map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEMO: &str = include_str!("../../fixtures/demo.yaml");

    fn tenant_id() -> Uuid {
        Uuid::parse_str("0b0c3a52-6f0e-4c39-9b1f-5a2f1d1e9a01").unwrap()
    }

    #[tokio::test]
    async fn demo_fixture_parses_and_filters_active_employees() {
        let store = MemoryStore::new(Fixture::from_yaml(DEMO).unwrap());
        let employees = store.active_employees(tenant_id()).await.unwrap();
        assert!(!employees.is_empty());
        assert!(employees.iter().all(|e| e.is_active() && e.tenant_id == tenant_id()));
    }

    #[tokio::test]
    async fn memberships_come_back_oldest_first() {
        let store = MemoryStore::new(Fixture::from_yaml(DEMO).unwrap());
        let user = Uuid::parse_str("5f1a2b3c-0000-4000-8000-00000000a001").unwrap();
        let memberships = store.active_memberships(user).await.unwrap();
        assert!(memberships.len() >= 2);
        assert!(memberships.windows(2).all(|w| w[0].joined_at <= w[1].joined_at));
    }

    #[tokio::test]
    async fn injected_failure_is_reported_until_cleared() {
        let store = MemoryStore::new(Fixture::from_yaml(DEMO).unwrap());
        store.inject_fault("employees", Fault::Fail).await;
        assert!(store.active_employees(tenant_id()).await.is_err());
        store.clear_faults().await;
        assert!(store.active_employees(tenant_id()).await.is_ok());
    }

    #[tokio::test]
    async fn create_tenant_adds_owner_membership() {
        let store = MemoryStore::default();
        let owner = Uuid::new_v4();
        let tenant = store.create_tenant("Harbour Homecare", "harbour", owner).await.unwrap();
        let memberships = store.active_memberships(owner).await.unwrap();
        assert_eq!(memberships.len(), 1);
        assert_eq!(memberships[0].tenant_id, tenant.id);
        assert_eq!(memberships[0].role, MembershipRole::Owner);
        assert!(store.create_tenant("Again", "harbour", owner).await.is_err());
    }
}
