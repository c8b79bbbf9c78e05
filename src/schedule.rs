use chrono::{DateTime, Duration as ChronoDuration, Timelike, Utc};
use std::time::Duration;
use tracing::{error, info, warn};

use crate::db::Pool;
use crate::dispatch::{self, DispatchError, DispatchSettings};
use crate::processor::ProcessingService;

/// Cron-style `0 */N * * *` trigger in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    every_hours: u32,
}

impl Schedule {
    /// `hours` is clamped to 1..=24.
    pub fn every_hours(hours: u32) -> Self {
        Self {
            every_hours: hours.clamp(1, 24),
        }
    }

    /// First top-of-hour strictly after `now` whose hour is divisible by the period.
    pub fn next_tick_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let top_of_hour = now
            .with_minute(0)
            .and_then(|t| t.with_second(0))
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or(now);
        let mut tick = top_of_hour + ChronoDuration::hours(1);
        while tick.hour() % self.every_hours != 0 {
            tick += ChronoDuration::hours(1);
        }
        tick
    }
}

/// Run one guarded dispatch per tick, forever. Runs are sequential, so two
/// cycles of this process never overlap.
pub async fn run_forever(
    pool: &Pool,
    processor: &dyn ProcessingService,
    schedule: Schedule,
    settings: DispatchSettings,
) {
    loop {
        let now = Utc::now();
        let next = schedule.next_tick_after(now);
        info!(next_run = %next, "next batch processing cycle scheduled");
        tokio::time::sleep((next - now).to_std().unwrap_or(Duration::ZERO)).await;

        match dispatch::dispatch(pool, processor, &settings).await {
            Ok(report) => info!(
                processed = report.processed,
                success = report.success,
                failed = report.failed,
                "scheduled cycle completed"
            ),
            Err(DispatchError::Busy) => warn!("scheduled cycle skipped; another run is active"),
            Err(err) => error!(error = %err, "scheduled cycle failed; waiting for next tick"),
        }
    }
}
