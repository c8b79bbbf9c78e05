use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Processing state of a submitted record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordStatus {
    Pending,
    Success,
    Failed,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Pending => "PENDING",
            RecordStatus::Success => "SUCCESS",
            RecordStatus::Failed => "FAILED",
        }
    }

    pub fn parse_status(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(RecordStatus::Pending),
            "SUCCESS" => Some(RecordStatus::Success),
            "FAILED" => Some(RecordStatus::Failed),
            _ => None,
        }
    }

    /// Records in these states are picked up by the next dispatch cycle.
    pub fn is_eligible(&self) -> bool {
        matches!(self, RecordStatus::Pending | RecordStatus::Failed)
    }
}

/// A form submission as stored in the `records` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Record {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone_number: String,
    pub link: Option<String>,
    pub dob: Option<NaiveDate>,
    pub status: RecordStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated input for a new record. Status and timestamps are assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecord {
    pub name: String,
    pub email: String,
    pub phone_number: String,
    pub link: Option<String>,
    pub dob: Option<NaiveDate>,
}

/// Outcome reported by the processing API for one submitted record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// Anything other than `SUCCESS`; the raw value is kept for logging.
    Failed(String),
}

impl Outcome {
    pub fn from_wire(status: &str) -> Self {
        if status == "SUCCESS" {
            Outcome::Success
        } else {
            Outcome::Failed(status.to_string())
        }
    }

    pub fn target_status(&self) -> RecordStatus {
        match self {
            Outcome::Success => RecordStatus::Success,
            Outcome::Failed(_) => RecordStatus::Failed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub record_id: i64,
    pub outcome: Outcome,
}

/// Public result of one dispatch cycle.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CycleReport {
    pub processed: usize,
    pub success: usize,
    pub failed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_text() {
        for s in [
            RecordStatus::Pending,
            RecordStatus::Success,
            RecordStatus::Failed,
        ] {
            assert_eq!(RecordStatus::parse_status(s.as_str()), Some(s));
        }
        assert_eq!(RecordStatus::parse_status("pending"), None);
    }

    #[test]
    fn only_success_is_ineligible() {
        assert!(RecordStatus::Pending.is_eligible());
        assert!(RecordStatus::Failed.is_eligible());
        assert!(!RecordStatus::Success.is_eligible());
    }

    #[test]
    fn non_success_outcomes_fail() {
        assert_eq!(Outcome::from_wire("SUCCESS"), Outcome::Success);
        assert_eq!(
            Outcome::from_wire("TIMEOUT").target_status(),
            RecordStatus::Failed
        );
        assert_eq!(
            Outcome::from_wire("success").target_status(),
            RecordStatus::Failed
        );
    }
}
