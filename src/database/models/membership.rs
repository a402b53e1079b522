use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Row of the `user_tenant_memberships` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenantMembership {
    pub id: Uuid,
    pub user_id: Uuid,
    pub tenant_id: Uuid,
    pub role: MembershipRole,
    #[serde(default)]
    pub permissions: Option<Vec<String>>,
    pub is_active: bool,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MembershipRole {
    Owner,
    Admin,
    Manager,
    Member,
    /// Roles this service does not know; they grant nothing implicitly
    #[serde(other)]
    Unknown,
}

impl MembershipRole {
    /// Owners and admins hold every permission implicitly
    pub fn is_privileged(self) -> bool {
        matches!(self, MembershipRole::Owner | MembershipRole::Admin)
    }
}

impl TenantMembership {
    pub fn grants(&self, permission: &str) -> bool {
        self.role.is_privileged()
            || self
                .permissions
                .as_deref()
                .unwrap_or_default()
                .iter()
                .any(|p| p == permission)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unrecognised_role_loads_without_privileges() {
        let membership: TenantMembership = serde_json::from_value(json!({
            "id": "2f1d0c7e-5b1a-4c55-9d7e-000000000001",
            "user_id": "2f1d0c7e-5b1a-4c55-9d7e-000000000002",
            "tenant_id": "2f1d0c7e-5b1a-4c55-9d7e-000000000003",
            "role": "carer",
            "permissions": ["view_rota"],
            "is_active": true,
            "joined_at": "2024-03-01T09:00:00Z"
        }))
        .unwrap();
        assert_eq!(membership.role, MembershipRole::Unknown);
        assert!(membership.grants("view_rota"));
        assert!(!membership.grants("manage_staff"));
    }
}
