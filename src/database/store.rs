use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::database::models::{
    CareflowStaff, ComplianceRecord, Employee, RpcTenant, Tenant, TenantMembership,
};

/// Errors raised by a backing store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("Row decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl StoreError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, StoreError::Timeout { .. })
    }
}

/// Bound a backend call by `limit`, mapping expiry to [`StoreError::Timeout`]
pub async fn with_timeout<T, E, F>(
    operation: &'static str,
    limit: Duration,
    fut: F,
) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, E>>,
    E: Into<StoreError>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result.map_err(Into::into),
        Err(_) => Err(StoreError::Timeout {
            operation,
            after: limit,
        }),
    }
}

/// Read access to staff and compliance tables, always scoped by tenant
#[async_trait]
pub trait ComplianceStore: Send + Sync {
    async fn careflow_staff(
        &self,
        staff_id: Uuid,
        tenant_id: Uuid,
    ) -> Result<Option<CareflowStaff>, StoreError>;

    async fn compliance_record(
        &self,
        staff_id: Uuid,
        tenant_id: Uuid,
    ) -> Result<Option<ComplianceRecord>, StoreError>;

    async fn employee(
        &self,
        staff_id: Uuid,
        tenant_id: Uuid,
    ) -> Result<Option<Employee>, StoreError>;

    /// Employees of the tenant whose status is `active`
    async fn active_employees(&self, tenant_id: Uuid) -> Result<Vec<Employee>, StoreError>;

    async fn compliance_records(&self, tenant_id: Uuid)
        -> Result<Vec<ComplianceRecord>, StoreError>;
}

/// Tenant registry, memberships, and the row-level-security procedures
#[async_trait]
pub trait TenantStore: Send + Sync {
    /// Active memberships of a user, oldest first
    async fn active_memberships(&self, user_id: Uuid)
        -> Result<Vec<TenantMembership>, StoreError>;

    /// Active tenants among `ids`, in no particular order
    async fn active_tenants(&self, ids: &[Uuid]) -> Result<Vec<Tenant>, StoreError>;

    /// `get_my_tenants()` evaluated as `user_id`
    async fn my_tenants(&self, user_id: Uuid) -> Result<Vec<RpcTenant>, StoreError>;

    /// `set_current_tenant(p_tenant_id)` evaluated as `user_id`
    async fn set_current_tenant(&self, user_id: Uuid, tenant_id: Uuid) -> Result<(), StoreError>;

    async fn tenant_by_subdomain(&self, subdomain: &str) -> Result<Option<Tenant>, StoreError>;

    /// `create_tenant(p_name, p_subdomain, p_owner_user_id)`
    async fn create_tenant(
        &self,
        name: &str,
        subdomain: &str,
        owner_user_id: Uuid,
    ) -> Result<Tenant, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn with_timeout_reports_operation() {
        let slow = async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok::<_, StoreError>(())
        };
        let err = with_timeout("employees", Duration::from_millis(10), slow)
            .await
            .unwrap_err();
        assert!(err.is_timeout());
        assert!(err.to_string().starts_with("employees timed out"));
    }

    #[tokio::test]
    async fn with_timeout_passes_results_through() {
        let fast = async { Ok::<_, StoreError>(7) };
        let value = with_timeout("noop", Duration::from_secs(1), fast).await.unwrap();
        assert_eq!(value, 7);
    }
}
