use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Row of the HR `employees` table (only the columns compliance needs)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub id: Uuid,
    pub tenant_id: Uuid,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub rtw_status: Option<String>,
}

impl Employee {
    pub fn is_active(&self) -> bool {
        self.status.as_deref() == Some("active")
    }

    /// The HR side marks a checked right-to-work as "verified"
    pub fn rtw_verified(&self) -> bool {
        self.rtw_status.as_deref() == Some("verified")
    }

    pub fn display_name(&self) -> String {
        let parts: Vec<&str> = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .collect();
        parts.join(" ")
    }
}

/// Row of the `careflow_staff` table, the care-side mirror of an employee
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CareflowStaff {
    pub id: Uuid,
    pub tenant_id: Uuid,
    #[serde(default)]
    pub novumflow_employee_id: Option<String>,
}

impl CareflowStaff {
    pub fn synced_from_novumflow(&self) -> bool {
        self.novumflow_employee_id
            .as_deref()
            .is_some_and(|id| !id.is_empty())
    }
}

/// Row of the `careflow_compliance` summary table. Every column is nullable
/// upstream; defaults are applied when the row is turned into a status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceRecord {
    pub staff_id: Uuid,
    pub tenant_id: Uuid,
    #[serde(default)]
    pub is_compliant: Option<bool>,
    #[serde(default)]
    pub compliance_percentage: Option<f64>,
    #[serde(default)]
    pub missing_documents: Option<Vec<String>>,
    #[serde(default)]
    pub expired_documents: Option<Vec<String>>,
    #[serde(default)]
    pub rtw_status: Option<String>,
    #[serde(default)]
    pub dbs_status: Option<String>,
    #[serde(default)]
    pub training_status: Option<String>,
    #[serde(default)]
    pub last_synced_at: Option<DateTime<Utc>>,
}
