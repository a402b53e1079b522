use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use sqlx::{postgres::PgRow, Execute, PgPool, Postgres, Row, Transaction};
use tracing::debug;
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::database::manager::DatabaseManager;
use crate::database::models::{
    CareflowStaff, ComplianceRecord, Employee, RpcTenant, Tenant, TenantMembership,
};
use crate::database::store::{with_timeout, ComplianceStore, StoreError, TenantStore};

// Rows are fetched through row_to_json so nullable and loosely typed columns
// (numeric percentages, text vs uuid foreign ids) decode through serde.
const CAREFLOW_STAFF_BY_ID: &str = r#"
    SELECT row_to_json(t) AS row FROM (
        SELECT id, tenant_id, novumflow_employee_id::text AS novumflow_employee_id
        FROM careflow_staff
        WHERE id = $1 AND tenant_id = $2
        LIMIT 1
    ) t
"#;

const COMPLIANCE_BY_STAFF: &str = r#"
    SELECT row_to_json(t) AS row FROM (
        SELECT * FROM careflow_compliance
        WHERE staff_id = $1 AND tenant_id = $2
        ORDER BY last_synced_at DESC NULLS LAST
        LIMIT 1
    ) t
"#;

const COMPLIANCE_BY_TENANT: &str = r#"
    SELECT row_to_json(t) AS row FROM (
        SELECT * FROM careflow_compliance
        WHERE tenant_id = $1
        ORDER BY staff_id, last_synced_at DESC NULLS LAST
    ) t
"#;

const EMPLOYEE_BY_ID: &str = r#"
    SELECT row_to_json(t) AS row FROM (
        SELECT id, tenant_id, first_name, last_name, status, rtw_status
        FROM employees
        WHERE id = $1 AND tenant_id = $2
        LIMIT 1
    ) t
"#;

const ACTIVE_EMPLOYEES: &str = r#"
    SELECT row_to_json(t) AS row FROM (
        SELECT id, tenant_id, first_name, last_name, status, rtw_status
        FROM employees
        WHERE tenant_id = $1 AND status = 'active'
        ORDER BY last_name, first_name
    ) t
"#;

const ACTIVE_MEMBERSHIPS: &str = r#"
    SELECT row_to_json(t) AS row FROM (
        SELECT * FROM user_tenant_memberships
        WHERE user_id = $1 AND is_active = true
        ORDER BY joined_at ASC
    ) t
"#;

const ACTIVE_TENANTS: &str = r#"
    SELECT row_to_json(t) AS row FROM (
        SELECT * FROM tenants WHERE id = ANY($1) AND is_active = true
    ) t
"#;

const TENANT_BY_SUBDOMAIN: &str = r#"
    SELECT row_to_json(t) AS row FROM (
        SELECT * FROM tenants WHERE subdomain = $1 LIMIT 1
    ) t
"#;

/// Store backed by the shared Postgres database, querying as the service role
/// and impersonating the caller (via request claims) for security-definer
/// procedures.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    query_timeout: Duration,
    rpc_timeout: Duration,
    log_queries: bool,
}

fn decode<T: DeserializeOwned>(row: &PgRow) -> Result<T, StoreError> {
    let value: Value = row.try_get("row")?;
    Ok(serde_json::from_value(value)?)
}

fn decode_all<T: DeserializeOwned>(rows: &[PgRow]) -> Result<Vec<T>, StoreError> {
    rows.iter().map(decode).collect()
}

impl PgStore {
    pub fn new(pool: PgPool, config: &DatabaseConfig) -> Self {
        Self {
            pool,
            query_timeout: config.query_timeout(),
            rpc_timeout: config.rpc_timeout(),
            log_queries: config.enable_query_logging,
        }
    }

    /// Connect using `DATABASE_URL` through the shared [`DatabaseManager`] pool
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let pool = DatabaseManager::main_pool(config).await?;
        Ok(Self::new(pool, config))
    }

    /// Open a transaction carrying the caller's JWT claims, the way the
    /// REST gateway does before invoking a procedure.
    async fn begin_as(&self, user_id: Uuid) -> Result<Transaction<'static, Postgres>, StoreError> {
        let mut tx = self.pool.begin().await?;
        let claims = json!({ "sub": user_id, "role": "authenticated" }).to_string();
        sqlx::query("SELECT set_config('request.jwt.claims', $1, true)")
            .bind(claims)
            .execute(&mut *tx)
            .await?;
        Ok(tx)
    }

    async fn fetch_optional<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        query: sqlx::query::Query<'_, Postgres, sqlx::postgres::PgArguments>,
    ) -> Result<Option<T>, StoreError> {
        if self.log_queries {
            debug!("query {}: {}", operation, query.sql());
        }
        let row = with_timeout(operation, self.query_timeout, query.fetch_optional(&self.pool)).await?;
        row.as_ref().map(decode).transpose()
    }

    async fn fetch_all<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        query: sqlx::query::Query<'_, Postgres, sqlx::postgres::PgArguments>,
    ) -> Result<Vec<T>, StoreError> {
        if self.log_queries {
            debug!("query {}: {}", operation, query.sql());
        }
        let rows = with_timeout(operation, self.query_timeout, query.fetch_all(&self.pool)).await?;
        decode_all(&rows)
    }
}

#[async_trait]
impl ComplianceStore for PgStore {
    async fn careflow_staff(
        &self,
        staff_id: Uuid,
        tenant_id: Uuid,
    ) -> Result<Option<CareflowStaff>, StoreError> {
        let query = sqlx::query(CAREFLOW_STAFF_BY_ID).bind(staff_id).bind(tenant_id);
        self.fetch_optional("careflow_staff", query).await
    }

    async fn compliance_record(
        &self,
        staff_id: Uuid,
        tenant_id: Uuid,
    ) -> Result<Option<ComplianceRecord>, StoreError> {
        let query = sqlx::query(COMPLIANCE_BY_STAFF).bind(staff_id).bind(tenant_id);
        self.fetch_optional("careflow_compliance", query).await
    }

    async fn employee(
        &self,
        staff_id: Uuid,
        tenant_id: Uuid,
    ) -> Result<Option<Employee>, StoreError> {
        let query = sqlx::query(EMPLOYEE_BY_ID).bind(staff_id).bind(tenant_id);
        self.fetch_optional("employees", query).await
    }

    async fn active_employees(&self, tenant_id: Uuid) -> Result<Vec<Employee>, StoreError> {
        let query = sqlx::query(ACTIVE_EMPLOYEES).bind(tenant_id);
        self.fetch_all("employees", query).await
    }

    async fn compliance_records(
        &self,
        tenant_id: Uuid,
    ) -> Result<Vec<ComplianceRecord>, StoreError> {
        let query = sqlx::query(COMPLIANCE_BY_TENANT).bind(tenant_id);
        self.fetch_all("careflow_compliance", query).await
    }
}

#[async_trait]
impl TenantStore for PgStore {
    async fn active_memberships(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<TenantMembership>, StoreError> {
        let query = sqlx::query(ACTIVE_MEMBERSHIPS).bind(user_id);
        self.fetch_all("user_tenant_memberships", query).await
    }

    async fn active_tenants(&self, ids: &[Uuid]) -> Result<Vec<Tenant>, StoreError> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let query = sqlx::query(ACTIVE_TENANTS).bind(ids.to_vec());
        self.fetch_all("tenants", query).await
    }

    async fn my_tenants(&self, user_id: Uuid) -> Result<Vec<RpcTenant>, StoreError> {
        with_timeout("get_my_tenants", self.rpc_timeout, async {
            let mut tx = self.begin_as(user_id).await?;
            let rows = sqlx::query("SELECT row_to_json(t) AS row FROM get_my_tenants() t")
                .fetch_all(&mut *tx)
                .await?;
            tx.commit().await?;
            decode_all(&rows)
        })
        .await
    }

    async fn set_current_tenant(&self, user_id: Uuid, tenant_id: Uuid) -> Result<(), StoreError> {
        with_timeout("set_current_tenant", self.rpc_timeout, async {
            let mut tx = self.begin_as(user_id).await?;
            sqlx::query("SELECT set_current_tenant(p_tenant_id => $1)")
                .bind(tenant_id)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;
            debug!("set_current_tenant({}) as {}", tenant_id, user_id);
            Ok::<_, StoreError>(())
        })
        .await
    }

    async fn tenant_by_subdomain(&self, subdomain: &str) -> Result<Option<Tenant>, StoreError> {
        let query = sqlx::query(TENANT_BY_SUBDOMAIN).bind(subdomain.to_string());
        self.fetch_optional("tenants", query).await
    }

    async fn create_tenant(
        &self,
        name: &str,
        subdomain: &str,
        owner_user_id: Uuid,
    ) -> Result<Tenant, StoreError> {
        with_timeout("create_tenant", self.rpc_timeout, async {
            let mut tx = self.begin_as(owner_user_id).await?;
            // The procedure's return shape has varied between schema versions,
            // so the created row is re-read by subdomain afterwards.
            sqlx::query(
                "SELECT to_jsonb(create_tenant(p_name => $1, p_subdomain => $2, p_owner_user_id => $3))",
            )
            .bind(name.to_string())
            .bind(subdomain.to_string())
            .bind(owner_user_id)
            .execute(&mut *tx)
            .await?;
            tx.commit().await?;
            Ok::<_, StoreError>(())
        })
        .await?;

        self.tenant_by_subdomain(subdomain)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("tenant '{}' after create_tenant", subdomain)))
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        with_timeout("health_check", self.query_timeout, sqlx::query("SELECT 1").execute(&self.pool))
            .await
            .map(|_| ())
    }
}
