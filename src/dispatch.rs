//! Batch dispatch task: select a batch, submit it, reconcile the verdicts.
//!
//! One cycle walks `Idle -> Selecting -> Submitting -> Reconciling -> Idle`.
//! Transport failures leave every record untouched and are retried as whole
//! cycles according to the [`RetryPolicy`]; anything else ends the cycle.
//! Status writes are per record, so a crash mid-reconciliation leaves the
//! remaining records eligible for the next cycle.

use std::fmt;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::db::{self, Pool};
use crate::model::CycleReport;
use crate::processor::{ProcessingService, TransportError};
use crate::reconcile;
use crate::retry::{RetryDecision, RetryPolicy};
use crate::selector::{self, DEFAULT_BATCH_SIZE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    Idle,
    Selecting,
    Submitting,
    Reconciling,
}

impl fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CyclePhase::Idle => "idle",
            CyclePhase::Selecting => "selecting",
            CyclePhase::Submitting => "submitting",
            CyclePhase::Reconciling => "reconciling",
        };
        f.write_str(s)
    }
}

/// Failure of a single cycle attempt.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("cycle failed while {phase}: {source:#}")]
    Fatal {
        phase: CyclePhase,
        source: anyhow::Error,
    },
}

/// Failure of a dispatch run after the retry policy has been applied.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("another dispatch cycle holds the lease")]
    Busy,
    #[error("processing API unavailable after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: TransportError,
    },
    #[error("cycle failed while {phase}: {source:#}")]
    Fatal {
        phase: CyclePhase,
        source: anyhow::Error,
    },
}

/// Everything the dispatch task needs besides the store and the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchSettings {
    pub batch_size: u32,
    pub retry: RetryPolicy,
    /// Lifetime of the advisory lease taken for one run.
    pub lease: Duration,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            retry: RetryPolicy::default(),
            lease: Duration::from_secs(600),
        }
    }
}

fn fatal(phase: CyclePhase) -> impl FnOnce(anyhow::Error) -> CycleError {
    move |source| CycleError::Fatal { phase, source }
}

/// Run one cycle without retries.
#[instrument(skip_all, fields(batch_size = batch_size))]
pub async fn run_cycle(
    pool: &Pool,
    processor: &dyn ProcessingService,
    batch_size: u32,
) -> Result<CycleReport, CycleError> {
    info!("Starting batch processing cycle");

    debug!(phase = %CyclePhase::Selecting);
    let batch = selector::select(pool, batch_size)
        .await
        .map_err(fatal(CyclePhase::Selecting))?;
    if batch.is_empty() {
        info!("No records to process");
        return Ok(CycleReport::default());
    }
    info!(records = batch.len(), "Found records to process");

    debug!(phase = %CyclePhase::Submitting);
    let verdicts = processor.submit(&batch).await?;
    if verdicts.len() != batch.len() {
        warn!(
            submitted = batch.len(),
            verdicts = verdicts.len(),
            "verdict count differs from batch size; unreconciled records stay eligible"
        );
    }

    debug!(phase = %CyclePhase::Reconciling);
    let counts = reconcile::apply(pool, &verdicts)
        .await
        .map_err(fatal(CyclePhase::Reconciling))?;
    if counts.unknown > 0 {
        warn!(unknown = counts.unknown, "verdicts referenced unknown records");
    }

    let report = CycleReport {
        processed: verdicts.len(),
        success: counts.success,
        failed: counts.failed,
    };
    debug!(phase = %CyclePhase::Idle);
    info!(
        processed = report.processed,
        success = report.success,
        failed = report.failed,
        "Batch processing cycle finished"
    );
    Ok(report)
}

/// Run cycles until one completes or the retry policy gives up.
pub async fn run_with_retry(
    pool: &Pool,
    processor: &dyn ProcessingService,
    settings: &DispatchSettings,
) -> Result<CycleReport, DispatchError> {
    let mut retries = 0u32;
    loop {
        let err = match run_cycle(pool, processor, settings.batch_size).await {
            Ok(report) => return Ok(report),
            Err(err) => err,
        };
        match settings.retry.decide(retries, &err) {
            RetryDecision::RetryAfter(delay) => {
                retries += 1;
                warn!(
                    error = %err,
                    retry = retries,
                    max_retries = settings.retry.max_retries(),
                    delay_secs = delay.as_secs(),
                    "External API request failed; retrying cycle"
                );
                tokio::time::sleep(delay).await;
            }
            RetryDecision::GiveUp => {
                error!(error = %err, retries, "Batch processing cycle failed");
                return Err(match err {
                    CycleError::Transport(last) => DispatchError::Exhausted {
                        attempts: retries + 1,
                        last,
                    },
                    CycleError::Fatal { phase, source } => DispatchError::Fatal { phase, source },
                });
            }
        }
    }
}

/// Entry point for the scheduler: take the advisory lease, run with retries,
/// release the lease. Returns [`DispatchError::Busy`] when another run holds it.
#[instrument(skip_all)]
pub async fn dispatch(
    pool: &Pool,
    processor: &dyn ProcessingService,
    settings: &DispatchSettings,
) -> Result<CycleReport, DispatchError> {
    let holder = Uuid::new_v4().to_string();
    let acquired = db::try_acquire_lease(pool, &holder, settings.lease)
        .await
        .map_err(|source| DispatchError::Fatal {
            phase: CyclePhase::Idle,
            source,
        })?;
    if !acquired {
        warn!("dispatch lease held elsewhere; skipping cycle");
        return Err(DispatchError::Busy);
    }

    let result = run_with_retry(pool, processor, settings).await;

    if let Err(err) = db::release_lease(pool, &holder).await {
        warn!(?err, "failed to release dispatch lease");
    }
    result
}
