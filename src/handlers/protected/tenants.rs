use axum::extract::{Extension, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::app::AppState;
use crate::database::models::Tenant;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::{TenantContext, TenantContextView};

#[derive(Debug, Deserialize)]
pub struct CreateTenantRequest {
    pub name: String,
    pub subdomain: String,
}

#[derive(Debug, Deserialize)]
pub struct SwitchTenantRequest {
    pub tenant_id: Uuid,
}

/// GET /api/tenants - The caller's tenant context
pub async fn tenants_get(Extension(context): Extension<TenantContext>) -> ApiResult<TenantContextView> {
    Ok(ApiResponse::success(context.into_view()))
}

/// POST /api/tenants - Create a tenant owned by the caller
pub async fn tenants_post(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<CreateTenantRequest>,
) -> ApiResult<Tenant> {
    let tenant = state
        .tenants
        .create_tenant(auth_user.user_id, &body.name, &body.subdomain)
        .await?;
    Ok(ApiResponse::created(tenant))
}

/// POST /api/tenants/switch - Make another tenant current and reload
pub async fn tenants_switch(
    State(state): State<AppState>,
    Extension(context): Extension<TenantContext>,
    Json(body): Json<SwitchTenantRequest>,
) -> ApiResult<TenantContextView> {
    let reloaded = state.tenants.switch_tenant(&context, body.tenant_id).await?;
    Ok(ApiResponse::success(reloaded.into_view()))
}
