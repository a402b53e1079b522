/// Shared types used across the codebase

use serde::{Deserialize, Serialize};

/// Verification state of a right-to-work or DBS check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Valid,
    Expired,
    Missing,
    Pending,
}

impl DocumentStatus {
    /// Parse a stored status; absent or unrecognised values count as missing
    pub fn parse_or_missing(value: Option<&str>) -> Self {
        match value {
            Some("valid") => DocumentStatus::Valid,
            Some("expired") => DocumentStatus::Expired,
            Some("pending") => DocumentStatus::Pending,
            _ => DocumentStatus::Missing,
        }
    }

    pub fn is_valid(self) -> bool {
        self == DocumentStatus::Valid
    }
}

/// Mandatory training state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrainingStatus {
    Valid,
    Expired,
    Incomplete,
}

impl TrainingStatus {
    /// Parse a stored status; absent or unrecognised values count as incomplete
    pub fn parse_or_incomplete(value: Option<&str>) -> Self {
        match value {
            Some("valid") => TrainingStatus::Valid,
            Some("expired") => TrainingStatus::Expired,
            _ => TrainingStatus::Incomplete,
        }
    }
}

/// Dashboard colour band for a compliance percentage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComplianceBand {
    Green,
    Yellow,
    Orange,
    Red,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_document_status_is_missing() {
        assert_eq!(DocumentStatus::parse_or_missing(Some("valid")), DocumentStatus::Valid);
        assert_eq!(DocumentStatus::parse_or_missing(Some("verified")), DocumentStatus::Missing);
        assert_eq!(DocumentStatus::parse_or_missing(None), DocumentStatus::Missing);
    }

    #[test]
    fn unknown_training_status_is_incomplete() {
        assert_eq!(TrainingStatus::parse_or_incomplete(Some("expired")), TrainingStatus::Expired);
        assert_eq!(TrainingStatus::parse_or_incomplete(Some("n/a")), TrainingStatus::Incomplete);
    }
}
