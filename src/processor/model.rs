use serde::{Deserialize, Serialize};

use crate::model::{Outcome, Record, Verdict};

/// One record as the processing API expects it.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct WireRecord {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(rename = "phoneNumber")]
    pub phone_number: String,
    /// Empty string when absent.
    pub link: String,
    /// `DD/MM/YYYY`, or empty string when absent.
    pub dob: String,
}

impl From<&Record> for WireRecord {
    fn from(record: &Record) -> Self {
        WireRecord {
            id: record.id,
            name: record.name.clone(),
            email: record.email.clone(),
            phone_number: record.phone_number.clone(),
            link: record.link.clone().unwrap_or_default(),
            dob: record
                .dob
                .map(|d| d.format("%d/%m/%Y").to_string())
                .unwrap_or_default(),
        }
    }
}

/// Per-record verdict as returned on the wire. Both fields are required.
#[derive(Deserialize, Debug)]
pub struct WireVerdict {
    pub id: i64,
    pub status: String,
}

impl From<WireVerdict> for Verdict {
    fn from(wire: WireVerdict) -> Self {
        Verdict {
            record_id: wire.id,
            outcome: Outcome::from_wire(&wire.status),
        }
    }
}
