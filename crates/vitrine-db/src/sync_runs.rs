use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;
use vitrine_core::{SyncProgress, SyncRun, SyncState};

use crate::DbError;

const SYNC_RUN_COLUMNS: &str = "id, public_id, vendor_id, state, total_items, processed_items, \
     error_count, created_count, updated_count, skipped_count, error_message, started_at, \
     completed_at, created_at";

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SyncRunRow {
    pub id: i64,
    pub public_id: Uuid,
    pub vendor_id: i64,
    pub state: String,
    pub total_items: i32,
    pub processed_items: i32,
    pub error_count: i32,
    pub created_count: i32,
    pub updated_count: i32,
    pub skipped_count: i32,
    pub error_message: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<SyncRunRow> for SyncRun {
    type Error = DbError;

    fn try_from(row: SyncRunRow) -> Result<Self, Self::Error> {
        let state = row.state.parse::<SyncState>().map_err(DbError::CorruptRow)?;
        Ok(SyncRun {
            id: row.id,
            public_id: row.public_id,
            vendor_id: row.vendor_id,
            state,
            total_items: row.total_items,
            processed_items: row.processed_items,
            error_count: row.error_count,
            created_count: row.created_count,
            updated_count: row.updated_count,
            skipped_count: row.skipped_count,
            error_message: row.error_message,
            started_at: row.started_at,
            completed_at: row.completed_at,
            created_at: row.created_at,
        })
    }
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// Create a `pending` run for `vendor_id`.
///
/// # Errors
///
/// Returns [`DbError::SyncRunActive`] when the vendor already has a pending
/// or in-progress run, or [`DbError::Sqlx`] on other failures.
pub async fn create_sync_run(pool: &PgPool, vendor_id: i64) -> Result<SyncRun, DbError> {
    let result = sqlx::query_as::<_, SyncRunRow>(&format!(
        "INSERT INTO sync_runs (public_id, vendor_id, state) \
         VALUES ($1, $2, 'pending') \
         RETURNING {SYNC_RUN_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(vendor_id)
    .fetch_one(pool)
    .await;

    match result {
        Ok(row) => SyncRun::try_from(row),
        Err(e) => {
            let err = DbError::from(e);
            if err.is_unique_violation() {
                Err(DbError::SyncRunActive { vendor_id })
            } else {
                Err(err)
            }
        }
    }
}

/// Move a run from `pending` to `in_progress`.
///
/// # Errors
///
/// Returns [`DbError::InvalidSyncRunTransition`] if the run is not pending.
pub async fn start_sync_run(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE sync_runs SET state = 'in_progress', started_at = NOW() \
         WHERE id = $1 AND state = 'pending'",
    )
    .bind(id)
    .execute(pool)
    .await?;

    guard(result.rows_affected(), id, SyncState::Pending, SyncState::InProgress)
}

/// Persist intermediate counters of an in-progress run.
///
/// # Errors
///
/// Returns [`DbError::InvalidSyncRunTransition`] if the run is not in progress.
pub async fn record_sync_progress(
    pool: &PgPool,
    id: i64,
    progress: &SyncProgress,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE sync_runs SET \
             total_items = $2, processed_items = $3, created_count = $4, \
             updated_count = $5, skipped_count = $6, error_count = $7 \
         WHERE id = $1 AND state = 'in_progress'",
    )
    .bind(id)
    .bind(progress.total_items)
    .bind(progress.processed_items)
    .bind(progress.created)
    .bind(progress.updated)
    .bind(progress.skipped)
    .bind(progress.errors)
    .execute(pool)
    .await?;

    guard(result.rows_affected(), id, SyncState::InProgress, SyncState::InProgress)
}

/// Mark an in-progress run `completed` with its final counters.
///
/// # Errors
///
/// Returns [`DbError::InvalidSyncRunTransition`] if the run is not in progress.
pub async fn complete_sync_run(
    pool: &PgPool,
    id: i64,
    progress: &SyncProgress,
) -> Result<(), DbError> {
    finish(pool, id, SyncState::Completed, progress, None).await
}

/// Mark a pending or in-progress run `failed`, keeping whatever counters it
/// reached.
///
/// # Errors
///
/// Returns [`DbError::InvalidSyncRunTransition`] if the run is already
/// terminal.
pub async fn fail_sync_run(
    pool: &PgPool,
    id: i64,
    progress: &SyncProgress,
    error_message: &str,
) -> Result<(), DbError> {
    finish(pool, id, SyncState::Failed, progress, Some(error_message)).await
}

async fn finish(
    pool: &PgPool,
    id: i64,
    target: SyncState,
    progress: &SyncProgress,
    error_message: Option<&str>,
) -> Result<(), DbError> {
    // Only failure may skip `in_progress`.
    let from_pending = target == SyncState::Failed;
    let result = sqlx::query(
        "UPDATE sync_runs SET \
             state = $2, completed_at = NOW(), error_message = $3, \
             total_items = $4, processed_items = $5, created_count = $6, \
             updated_count = $7, skipped_count = $8, error_count = $9 \
         WHERE id = $1 AND (state = 'in_progress' OR ($10 AND state = 'pending'))",
    )
    .bind(id)
    .bind(target.as_str())
    .bind(error_message)
    .bind(progress.total_items)
    .bind(progress.processed_items)
    .bind(progress.created)
    .bind(progress.updated)
    .bind(progress.skipped)
    .bind(progress.errors)
    .bind(from_pending)
    .execute(pool)
    .await?;

    guard(result.rows_affected(), id, SyncState::InProgress, target)
}

/// Fail every pending or in-progress run that started (or, if never
/// started, was created) before `cutoff`. Returns the number of runs failed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn fail_stale_sync_runs(
    pool: &PgPool,
    cutoff: DateTime<Utc>,
    error_message: &str,
) -> Result<u64, DbError> {
    let result = sqlx::query(
        "UPDATE sync_runs SET state = 'failed', completed_at = NOW(), error_message = $2 \
         WHERE state IN ('pending', 'in_progress') \
           AND COALESCE(started_at, created_at) < $1",
    )
    .bind(cutoff)
    .bind(error_message)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

fn guard(rows: u64, id: i64, expected: SyncState, target: SyncState) -> Result<(), DbError> {
    if rows == 0 {
        return Err(DbError::InvalidSyncRunTransition {
            id,
            expected,
            target,
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// # Errors
///
/// Returns [`DbError::NotFound`] if no run has `id`.
pub async fn get_sync_run(pool: &PgPool, id: i64) -> Result<SyncRun, DbError> {
    let row = sqlx::query_as::<_, SyncRunRow>(&format!(
        "SELECT {SYNC_RUN_COLUMNS} FROM sync_runs WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;
    SyncRun::try_from(row)
}

/// # Errors
///
/// Returns [`DbError::NotFound`] if no run has `public_id`.
pub async fn get_sync_run_by_public_id(pool: &PgPool, public_id: Uuid) -> Result<SyncRun, DbError> {
    let row = sqlx::query_as::<_, SyncRunRow>(&format!(
        "SELECT {SYNC_RUN_COLUMNS} FROM sync_runs WHERE public_id = $1"
    ))
    .bind(public_id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;
    SyncRun::try_from(row)
}

/// Most recent runs first, optionally restricted to one vendor.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn list_sync_runs(
    pool: &PgPool,
    vendor_id: Option<i64>,
    limit: i64,
) -> Result<Vec<SyncRun>, DbError> {
    let rows = sqlx::query_as::<_, SyncRunRow>(&format!(
        "SELECT {SYNC_RUN_COLUMNS} FROM sync_runs \
         WHERE ($1::bigint IS NULL OR vendor_id = $1) \
         ORDER BY created_at DESC, id DESC \
         LIMIT $2"
    ))
    .bind(vendor_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(SyncRun::try_from).collect()
}
