use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::database::models::{CareflowStaff, ComplianceRecord, Employee};
use crate::database::store::ComplianceStore;
use crate::types::{ComplianceBand, DocumentStatus, TrainingStatus};

/// Missing-document label used when only the HR record is available
pub const RIGHT_TO_WORK: &str = "Right to Work";
/// Missing-document label used when no record exists anywhere
pub const UNKNOWN_NOT_SYNCED: &str = "Unknown - Not synced";
/// Percentage reported for a verified right-to-work with no compliance row
pub const BASIC_VERIFIED_PERCENTAGE: u8 = 50;
/// How many non-compliant staff the fleet summary lists
pub const ATTENTION_LIST_LEN: usize = 5;

/// Compliance of one staff member, derived on every request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceStatus {
    pub staff_id: Uuid,
    pub is_compliant: bool,
    pub compliance_percentage: u8,
    pub missing_documents: Vec<String>,
    pub expired_documents: Vec<String>,
    #[serde(rename = "rtw_status")]
    pub rtw_status: DocumentStatus,
    #[serde(rename = "dbs_status")]
    pub dbs_status: DocumentStatus,
    #[serde(rename = "training_status")]
    pub training_status: TrainingStatus,
    #[serde(rename = "syncedFromNovumFlow")]
    pub synced_from_novumflow: bool,
    pub last_synced_at: Option<DateTime<Utc>>,
}

/// Outcome of a shift assignment check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftEligibility {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

fn stored_percentage(value: Option<f64>) -> u8 {
    value
        .filter(|p| p.is_finite())
        .map(|p| p.round().clamp(0.0, 100.0) as u8)
        .unwrap_or(0)
}

impl ComplianceStatus {
    /// Pass a synced compliance row through, defaulting null columns
    pub fn from_record(staff_id: Uuid, record: &ComplianceRecord, synced: bool) -> Self {
        Self {
            staff_id,
            is_compliant: record.is_compliant.unwrap_or(false),
            compliance_percentage: stored_percentage(record.compliance_percentage),
            missing_documents: record.missing_documents.clone().unwrap_or_default(),
            expired_documents: record.expired_documents.clone().unwrap_or_default(),
            rtw_status: DocumentStatus::parse_or_missing(record.rtw_status.as_deref()),
            dbs_status: DocumentStatus::parse_or_missing(record.dbs_status.as_deref()),
            training_status: TrainingStatus::parse_or_incomplete(record.training_status.as_deref()),
            synced_from_novumflow: synced,
            last_synced_at: record.last_synced_at,
        }
    }

    /// Coarse status from the HR employee row alone
    pub fn from_employee(employee: &Employee) -> Self {
        let rtw_valid = employee.rtw_verified();
        Self {
            staff_id: employee.id,
            is_compliant: rtw_valid,
            compliance_percentage: if rtw_valid { BASIC_VERIFIED_PERCENTAGE } else { 0 },
            missing_documents: if rtw_valid {
                vec![]
            } else {
                vec![RIGHT_TO_WORK.to_string()]
            },
            expired_documents: vec![],
            rtw_status: if rtw_valid {
                DocumentStatus::Valid
            } else {
                DocumentStatus::Missing
            },
            dbs_status: DocumentStatus::Pending,
            training_status: TrainingStatus::Incomplete,
            synced_from_novumflow: false,
            last_synced_at: None,
        }
    }

    pub fn unknown(staff_id: Uuid) -> Self {
        Self {
            staff_id,
            is_compliant: false,
            compliance_percentage: 0,
            missing_documents: vec![UNKNOWN_NOT_SYNCED.to_string()],
            expired_documents: vec![],
            rtw_status: DocumentStatus::Pending,
            dbs_status: DocumentStatus::Pending,
            training_status: TrainingStatus::Incomplete,
            synced_from_novumflow: false,
            last_synced_at: None,
        }
    }

    pub fn band(&self) -> ComplianceBand {
        match self.compliance_percentage {
            p if self.is_compliant && p >= 90 => ComplianceBand::Green,
            p if p >= 70 => ComplianceBand::Yellow,
            p if p >= 50 => ComplianceBand::Orange,
            _ => ComplianceBand::Red,
        }
    }

    /// Whether this staff member may be put on a shift. An unverified
    /// right-to-work blocks even when the summary row says compliant.
    pub fn shift_eligibility(&self) -> ShiftEligibility {
        if self.is_compliant && self.rtw_status.is_valid() {
            return ShiftEligibility {
                allowed: true,
                reason: None,
            };
        }

        let mut issues: Vec<String> = Vec::new();
        if !self.rtw_status.is_valid() {
            issues.push("Right to Work not verified".to_string());
        }
        if !self.dbs_status.is_valid() {
            issues.push("DBS check not valid".to_string());
        }
        if !self.missing_documents.is_empty() {
            issues.push(format!("Missing: {}", self.missing_documents.join(", ")));
        }
        if !self.expired_documents.is_empty() {
            issues.push(format!("Expired: {}", self.expired_documents.join(", ")));
        }
        if issues.is_empty() {
            issues.push("Compliance record marked non-compliant".to_string());
        }

        ShiftEligibility {
            allowed: false,
            reason: Some(format!("Compliance Block: {}", issues.join("; "))),
        }
    }
}

/// A staff member listed for follow-up on the dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffAttention {
    pub staff_id: Uuid,
    pub name: String,
    pub compliance_percentage: u8,
    pub missing_documents: Vec<String>,
    pub expired_documents: Vec<String>,
}

/// Tenant-wide compliance counts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleetSummary {
    pub total_staff: usize,
    /// Compliant and at least 90%
    pub compliant: usize,
    /// Everything else at 50% or more
    pub partial: usize,
    pub non_compliant: usize,
    pub overall_compliance_rate: u8,
    /// Lowest-scoring non-compliant staff, worst first
    pub attention: Vec<StaffAttention>,
}

impl FleetSummary {
    pub fn from_fleet(fleet: &[(Employee, ComplianceStatus)]) -> Self {
        let mut compliant = 0;
        let mut partial = 0;
        let mut non_compliant = 0;

        for (_, status) in fleet {
            if status.is_compliant && status.compliance_percentage >= 90 {
                compliant += 1;
            } else if status.compliance_percentage >= 50 {
                partial += 1;
            } else {
                non_compliant += 1;
            }
        }

        let total_staff = fleet.len();
        let overall_compliance_rate = if total_staff > 0 {
            ((compliant as f64 / total_staff as f64) * 100.0).round() as u8
        } else {
            0
        };

        let mut attention: Vec<StaffAttention> = fleet
            .iter()
            .filter(|(_, status)| !status.is_compliant)
            .map(|(employee, status)| StaffAttention {
                staff_id: employee.id,
                name: employee.display_name(),
                compliance_percentage: status.compliance_percentage,
                missing_documents: status.missing_documents.clone(),
                expired_documents: status.expired_documents.clone(),
            })
            .collect();
        attention.sort_by_key(|a| a.compliance_percentage);
        attention.truncate(ATTENTION_LIST_LEN);

        Self {
            total_staff,
            compliant,
            partial,
            non_compliant,
            overall_compliance_rate,
            attention,
        }
    }
}

/// Derives staff compliance for a tenant. Backend failures never escape:
/// each one is logged and the lookup degrades to the next fallback.
pub struct ComplianceService {
    store: Arc<dyn ComplianceStore>,
}

impl ComplianceService {
    pub fn new(store: Arc<dyn ComplianceStore>) -> Self {
        Self { store }
    }

    /// Compliance of one staff member: synced summary row, then the HR
    /// employee row, then the unknown status.
    pub async fn check_staff_compliance(&self, staff_id: Uuid, tenant_id: Uuid) -> ComplianceStatus {
        let (staff, record) = futures::join!(
            self.store.careflow_staff(staff_id, tenant_id),
            self.store.compliance_record(staff_id, tenant_id)
        );

        let staff = staff.unwrap_or_else(|e| {
            error!("Error checking staff {}: {}", staff_id, e);
            None
        });
        let record = record.unwrap_or_else(|e| {
            error!("Error checking compliance for {}: {}", staff_id, e);
            None
        });

        if let Some(record) = record {
            let synced = staff.as_ref().is_some_and(CareflowStaff::synced_from_novumflow);
            return ComplianceStatus::from_record(staff_id, &record, synced);
        }

        match self.store.employee(staff_id, tenant_id).await {
            Ok(Some(employee)) => ComplianceStatus::from_employee(&employee),
            Ok(None) => {
                debug!("No compliance or employee record for {} in {}", staff_id, tenant_id);
                ComplianceStatus::unknown(staff_id)
            }
            Err(e) => {
                warn!("Employee lookup failed for {}: {}", staff_id, e);
                ComplianceStatus::unknown(staff_id)
            }
        }
    }

    /// Compliance of every active employee of the tenant, keyed by staff id
    pub async fn check_all_staff_compliance(&self, tenant_id: Uuid) -> BTreeMap<Uuid, ComplianceStatus> {
        self.fleet(tenant_id)
            .await
            .into_iter()
            .map(|(employee, status)| (employee.id, status))
            .collect()
    }

    pub async fn can_assign_to_shift(&self, staff_id: Uuid, tenant_id: Uuid) -> ShiftEligibility {
        let status = self.check_staff_compliance(staff_id, tenant_id).await;
        let eligibility = status.shift_eligibility();
        if !eligibility.allowed {
            debug!("Shift assignment blocked for {}: {:?}", staff_id, eligibility.reason);
        }
        eligibility
    }

    pub async fn fleet_summary(&self, tenant_id: Uuid) -> FleetSummary {
        FleetSummary::from_fleet(&self.fleet(tenant_id).await)
    }

    /// Active employees joined in memory with the tenant's compliance rows
    async fn fleet(&self, tenant_id: Uuid) -> Vec<(Employee, ComplianceStatus)> {
        let (employees, records) = futures::join!(
            self.store.active_employees(tenant_id),
            self.store.compliance_records(tenant_id)
        );

        let employees = match employees {
            Ok(employees) => employees,
            Err(e) => {
                error!("Error fetching employees for {}: {}", tenant_id, e);
                return vec![];
            }
        };
        let records = records.unwrap_or_else(|e| {
            error!("Error fetching compliance for {}: {}", tenant_id, e);
            vec![]
        });

        // Records arrive newest first per staff member; keep the first seen
        let mut by_staff: HashMap<Uuid, &ComplianceRecord> = HashMap::new();
        for record in &records {
            by_staff.entry(record.staff_id).or_insert(record);
        }

        let mut seen = HashSet::new();
        employees
            .into_iter()
            .filter(|employee| seen.insert(employee.id))
            .map(|employee| {
                let status = match by_staff.get(&employee.id) {
                    Some(record) => ComplianceStatus::from_record(employee.id, record, true),
                    None => ComplianceStatus::from_employee(&employee),
                };
                (employee, status)
            })
            .collect()
    }
}
