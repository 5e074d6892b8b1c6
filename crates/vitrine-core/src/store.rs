//! Storage seams consumed by the synchronization pipeline.
//!
//! `vitrine-db` implements these against Postgres; `vitrine-sync` ships an
//! in-memory implementation for tests and dry runs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::catalog::{CatalogFields, CatalogRecord, NewCatalogRecord};
use crate::sync::{SyncProgress, SyncRun, SyncState};
use crate::vendors::Vendor;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("sync run {id} cannot move to {target}: expected state {expected}")]
    InvalidTransition {
        id: i64,
        expected: SyncState,
        target: SyncState,
    },

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Persistent product catalog, partitioned by vendor.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Looks up the record for `(vendor_id, external_id)`.
    async fn find_by_external_id(
        &self,
        vendor_id: i64,
        external_id: &str,
    ) -> Result<Option<CatalogRecord>, StoreError>;

    async fn create(&self, record: NewCatalogRecord) -> Result<CatalogRecord, StoreError>;

    async fn update(&self, id: i64, fields: CatalogFields) -> Result<CatalogRecord, StoreError>;

    async fn set_vendor_last_synced(
        &self,
        vendor_id: i64,
        synced_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;
}

/// Vendor lookup and sync-run bookkeeping.
#[async_trait]
pub trait SyncRunStore: Send + Sync {
    async fn get_vendor(&self, vendor_id: i64) -> Result<Vendor, StoreError>;

    /// Creates a run in `Pending`. Fails with [`StoreError::Conflict`] when the
    /// vendor already has a non-terminal run.
    async fn create_sync_run(&self, vendor_id: i64) -> Result<SyncRun, StoreError>;

    async fn start_sync_run(&self, run_id: i64) -> Result<(), StoreError>;

    async fn record_sync_progress(
        &self,
        run_id: i64,
        progress: &SyncProgress,
    ) -> Result<(), StoreError>;

    async fn complete_sync_run(
        &self,
        run_id: i64,
        progress: &SyncProgress,
    ) -> Result<(), StoreError>;

    /// Fails a pending or in-progress run.
    async fn fail_sync_run(
        &self,
        run_id: i64,
        progress: &SyncProgress,
        error_message: &str,
    ) -> Result<(), StoreError>;

    /// Fails every non-terminal run started (or created, if never started)
    /// before `cutoff`, returning how many were failed.
    async fn fail_stale_sync_runs(
        &self,
        cutoff: DateTime<Utc>,
        error_message: &str,
    ) -> Result<u64, StoreError>;
}
