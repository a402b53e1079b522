pub mod membership;
pub mod staff;
pub mod tenant;

pub use membership::{MembershipRole, TenantMembership};
pub use staff::{CareflowStaff, ComplianceRecord, Employee};
pub use tenant::{RpcTenant, SubscriptionStatus, SubscriptionTier, Tenant, TenantFeatures};
