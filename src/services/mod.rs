pub mod compliance_service;
pub mod tenant_service;

pub use compliance_service::{ComplianceService, ComplianceStatus, FleetSummary, ShiftEligibility};
pub use tenant_service::{
    InMemoryPreferences, TenantContext, TenantContextView, TenantError, TenantPreferences, TenantService,
};
