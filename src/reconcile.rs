use crate::db::{self, Pool};
use crate::model::{RecordStatus, Verdict};
use anyhow::Result;
use tracing::{error, info, instrument, warn};

/// Tally of one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileCounts {
    pub success: usize,
    pub failed: usize,
    pub unknown: usize,
}

/// Write each verdict back onto its record. Ids missing from the store are
/// counted and skipped; store errors abort the pass.
#[instrument(skip_all, fields(verdicts = verdicts.len()))]
pub async fn apply(pool: &Pool, verdicts: &[Verdict]) -> Result<ReconcileCounts> {
    let mut counts = ReconcileCounts::default();
    for verdict in verdicts {
        let status = verdict.outcome.target_status();
        if !db::set_record_status(pool, verdict.record_id, status).await? {
            error!(record_id = verdict.record_id, "Record not found in database");
            counts.unknown += 1;
            continue;
        }
        match status {
            RecordStatus::Success => {
                info!(record_id = verdict.record_id, "Record marked as SUCCESS");
                counts.success += 1;
            }
            _ => {
                warn!(
                    record_id = verdict.record_id,
                    outcome = ?verdict.outcome,
                    "Record marked as FAILED"
                );
                counts.failed += 1;
            }
        }
    }
    Ok(counts)
}
