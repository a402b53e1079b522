use std::collections::BTreeMap;

use axum::extract::{Extension, Path, State};
use serde::Serialize;
use uuid::Uuid;

use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult, CurrentTenant};
use crate::services::compliance_service::{ComplianceStatus, FleetSummary, ShiftEligibility};
use crate::types::ComplianceBand;

/// Single-staff response: the status plus its dashboard band
#[derive(Debug, Serialize)]
pub struct StaffCompliance {
    #[serde(flatten)]
    pub status: ComplianceStatus,
    pub band: ComplianceBand,
}

/// GET /api/compliance/staff - Every active staff member keyed by id
pub async fn staff_list(
    State(state): State<AppState>,
    Extension(CurrentTenant(tenant_id)): Extension<CurrentTenant>,
) -> ApiResult<BTreeMap<Uuid, ComplianceStatus>> {
    let statuses = state.compliance.check_all_staff_compliance(tenant_id).await;
    Ok(ApiResponse::success(statuses))
}

/// GET /api/compliance/summary - Fleet counts and the attention list
pub async fn summary(
    State(state): State<AppState>,
    Extension(CurrentTenant(tenant_id)): Extension<CurrentTenant>,
) -> ApiResult<FleetSummary> {
    Ok(ApiResponse::success(state.compliance.fleet_summary(tenant_id).await))
}

/// GET /api/compliance/staff/:id
pub async fn staff_get(
    State(state): State<AppState>,
    Extension(CurrentTenant(tenant_id)): Extension<CurrentTenant>,
    Path(staff_id): Path<Uuid>,
) -> ApiResult<StaffCompliance> {
    let status = state.compliance.check_staff_compliance(staff_id, tenant_id).await;
    let band = status.band();
    Ok(ApiResponse::success(StaffCompliance { status, band }))
}

/// GET /api/compliance/staff/:id/shift-eligibility
pub async fn shift_eligibility(
    State(state): State<AppState>,
    Extension(CurrentTenant(tenant_id)): Extension<CurrentTenant>,
    Path(staff_id): Path<Uuid>,
) -> ApiResult<ShiftEligibility> {
    let eligibility = state.compliance.can_assign_to_shift(staff_id, tenant_id).await;
    if !eligibility.allowed {
        tracing::info!("Shift assignment blocked for {} in {}", staff_id, tenant_id);
    }
    Ok(ApiResponse::success(eligibility))
}
