use super::model::{RecordRow, StatusCounts};
use crate::model::{NewRecord, Record, RecordStatus};
use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::SqlitePool;
use std::time::Duration;
use tracing::{debug, instrument};

pub type Pool = SqlitePool;

const RECORD_COLUMNS: &str =
    "id, name, email, phone_number, link, dob, status, created_at, updated_at";

pub async fn init_pool(database_url: &str) -> Result<Pool> {
    let normalized = prepare_sqlite_url(database_url);
    let pool = SqlitePool::connect(&normalized)
        .await
        .with_context(|| format!("failed to open database {}", normalized))?;
    // Enable WAL and stricter durability.
    sqlx::query("PRAGMA journal_mode=WAL;")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous=FULL;")
        .execute(&pool)
        .await?;
    Ok(pool)
}

/// If using a file-backed SQLite URL, expand a leading `~/`, ensure the parent
/// directory exists and ask SQLite to create the file. Leaves in-memory URLs untouched.
fn prepare_sqlite_url(url: &str) -> String {
    if !url.starts_with("sqlite:") || url.starts_with("sqlite::memory") {
        return url.to_string();
    }

    let rest = &url["sqlite:".len()..];
    let path_with_query = rest.strip_prefix("//").unwrap_or(rest);
    let (path_part, query_part) = match path_with_query.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (path_with_query, None),
    };
    if path_part.is_empty() {
        return url.to_string();
    }

    let expanded_path = match (path_part.strip_prefix("~/"), std::env::var("HOME")) {
        (Some(rest), Ok(home)) => format!("{}/{}", home.trim_end_matches('/'), rest),
        _ => path_part.to_string(),
    };

    if let Some(parent) = std::path::Path::new(&expanded_path).parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }

    let query = match query_part {
        Some(q) if q.contains("mode=") => q.to_string(),
        Some(q) => format!("{}&mode=rwc", q),
        None => "mode=rwc".to_string(),
    };
    format!("sqlite://{}?{}", expanded_path, query)
}

pub async fn run_migrations(pool: &Pool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Insert a validated record with status `PENDING`.
#[instrument(skip_all)]
pub async fn insert_record(pool: &Pool, new: &NewRecord) -> Result<Record> {
    let now = Utc::now();
    let row: RecordRow = sqlx::query_as(&format!(
        "INSERT INTO records (name, email, phone_number, link, dob, status, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?) RETURNING {}",
        RECORD_COLUMNS
    ))
    .bind(&new.name)
    .bind(&new.email)
    .bind(&new.phone_number)
    .bind(new.link.as_deref())
    .bind(new.dob)
    .bind(RecordStatus::Pending.as_str())
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await
    .context("failed to insert record")?;
    let record = Record::try_from(row)?;
    debug!(id = record.id, "record inserted");
    Ok(record)
}

#[instrument(skip_all)]
pub async fn get_record(pool: &Pool, id: i64) -> Result<Option<Record>> {
    let row: Option<RecordRow> = sqlx::query_as(&format!(
        "SELECT {} FROM records WHERE id = ?",
        RECORD_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    row.map(Record::try_from).transpose()
}

/// Oldest-first records that still need processing (`PENDING` or `FAILED`), at most `limit`.
#[instrument(skip_all)]
pub async fn select_eligible(pool: &Pool, limit: u32) -> Result<Vec<Record>> {
    let rows: Vec<RecordRow> = sqlx::query_as(&format!(
        "SELECT {} FROM records WHERE status IN (?, ?) ORDER BY created_at ASC, id ASC LIMIT ?",
        RECORD_COLUMNS
    ))
    .bind(RecordStatus::Pending.as_str())
    .bind(RecordStatus::Failed.as_str())
    .bind(i64::from(limit))
    .fetch_all(pool)
    .await
    .context("failed to select eligible records")?;
    rows.into_iter().map(Record::try_from).collect()
}

/// Single-row status write. Returns `false` when no record has this id.
#[instrument(skip_all)]
pub async fn set_record_status(pool: &Pool, id: i64, status: RecordStatus) -> Result<bool> {
    let res = sqlx::query("UPDATE records SET status = ?, updated_at = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await
        .with_context(|| format!("failed to update status of record {}", id))?;
    Ok(res.rows_affected() > 0)
}

/// Records in `status`, newest first.
#[instrument(skip_all)]
pub async fn list_by_status(pool: &Pool, status: RecordStatus) -> Result<Vec<Record>> {
    let rows: Vec<RecordRow> = sqlx::query_as(&format!(
        "SELECT {} FROM records WHERE status = ? ORDER BY created_at DESC, id DESC",
        RECORD_COLUMNS
    ))
    .bind(status.as_str())
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(Record::try_from).collect()
}

#[instrument(skip_all)]
pub async fn count_by_status(pool: &Pool) -> Result<StatusCounts> {
    let rows: Vec<(String, i64)> =
        sqlx::query_as("SELECT status, COUNT(*) FROM records GROUP BY status")
            .fetch_all(pool)
            .await?;
    let mut counts = StatusCounts::default();
    for (status, n) in rows {
        match RecordStatus::parse_status(&status) {
            Some(RecordStatus::Pending) => counts.pending = n,
            Some(RecordStatus::Success) => counts.success = n,
            Some(RecordStatus::Failed) => counts.failed = n,
            None => {}
        }
    }
    Ok(counts)
}

/// Take the advisory dispatch lease for `ttl`. Succeeds when the lease is free,
/// expired, or already held by `holder`.
#[instrument(skip_all)]
pub async fn try_acquire_lease(pool: &Pool, holder: &str, ttl: Duration) -> Result<bool> {
    let now = Utc::now().timestamp_millis();
    let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
    let res = sqlx::query(
        "UPDATE dispatch_lease SET holder = ?, expires_at_ms = ? \
         WHERE id = 1 AND (holder IS NULL OR holder = ? OR expires_at_ms <= ?)",
    )
    .bind(holder)
    .bind(now.saturating_add(ttl_ms))
    .bind(holder)
    .bind(now)
    .execute(pool)
    .await
    .context("failed to acquire dispatch lease")?;
    Ok(res.rows_affected() > 0)
}

#[instrument(skip_all)]
pub async fn release_lease(pool: &Pool, holder: &str) -> Result<()> {
    sqlx::query("UPDATE dispatch_lease SET holder = NULL, expires_at_ms = 0 WHERE id = 1 AND holder = ?")
        .bind(holder)
        .execute(pool)
        .await
        .context("failed to release dispatch lease")?;
    Ok(())
}
