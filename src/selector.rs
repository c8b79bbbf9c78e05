use crate::db::{self, Pool};
use crate::model::Record;
use anyhow::Result;
use tracing::{debug, instrument};

/// Default number of records sent per cycle.
pub const DEFAULT_BATCH_SIZE: u32 = 10;

/// Oldest-first batch of at most `limit` records still awaiting a `SUCCESS`
/// verdict. An empty batch is not an error. Read-only.
#[instrument(skip_all, fields(limit = limit))]
pub async fn select(pool: &Pool, limit: u32) -> Result<Vec<Record>> {
    let batch = db::select_eligible(pool, limit).await?;
    debug!(selected = batch.len(), "batch selected");
    Ok(batch)
}
