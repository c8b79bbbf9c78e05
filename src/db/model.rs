//! Row models returned by repository queries.
//!
//! Keep these structs focused on the columns as stored. Conversion into the
//! domain `Record` validates the status text.

use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;

use crate::model::{Record, RecordStatus};

/// One row of the `records` table.
#[derive(Debug, Clone, FromRow)]
pub struct RecordRow {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone_number: String,
    pub link: Option<String>,
    pub dob: Option<NaiveDate>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<RecordRow> for Record {
    type Error = anyhow::Error;

    fn try_from(row: RecordRow) -> Result<Self> {
        let status = RecordStatus::parse_status(&row.status)
            .ok_or_else(|| anyhow!("record {} has unknown status {}", row.id, row.status))?;
        Ok(Record {
            id: row.id,
            name: row.name,
            email: row.email,
            phone_number: row.phone_number,
            link: row.link.filter(|l| !l.trim().is_empty()),
            dob: row.dob,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Number of records per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct StatusCounts {
    pub pending: i64,
    pub success: i64,
    pub failed: i64,
}
