//! [`CatalogStore`] and [`SyncRunStore`] backed by Postgres.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use vitrine_core::{
    CatalogFields, CatalogRecord, CatalogStore, NewCatalogRecord, StoreError, SyncProgress,
    SyncRun, SyncRunStore, Vendor,
};

use crate::{catalog, sync_runs, vendors, DbError};

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn find_by_external_id(
        &self,
        vendor_id: i64,
        external_id: &str,
    ) -> Result<Option<CatalogRecord>, StoreError> {
        Ok(catalog::find_catalog_product(&self.pool, vendor_id, external_id).await?)
    }

    async fn create(&self, record: NewCatalogRecord) -> Result<CatalogRecord, StoreError> {
        Ok(catalog::create_catalog_product(&self.pool, &record).await?)
    }

    async fn update(&self, id: i64, fields: CatalogFields) -> Result<CatalogRecord, StoreError> {
        Ok(catalog::update_catalog_product(&self.pool, id, &fields).await?)
    }

    async fn set_vendor_last_synced(
        &self,
        vendor_id: i64,
        synced_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        Ok(vendors::set_vendor_last_synced(&self.pool, vendor_id, synced_at).await?)
    }
}

#[async_trait]
impl SyncRunStore for PgStore {
    async fn get_vendor(&self, vendor_id: i64) -> Result<Vendor, StoreError> {
        vendors::get_vendor(&self.pool, vendor_id)
            .await
            .map_err(|e| match e {
                DbError::NotFound => StoreError::NotFound(format!("vendor {vendor_id}")),
                other => other.into(),
            })
    }

    async fn create_sync_run(&self, vendor_id: i64) -> Result<SyncRun, StoreError> {
        Ok(sync_runs::create_sync_run(&self.pool, vendor_id).await?)
    }

    async fn start_sync_run(&self, run_id: i64) -> Result<(), StoreError> {
        Ok(sync_runs::start_sync_run(&self.pool, run_id).await?)
    }

    async fn record_sync_progress(
        &self,
        run_id: i64,
        progress: &SyncProgress,
    ) -> Result<(), StoreError> {
        Ok(sync_runs::record_sync_progress(&self.pool, run_id, progress).await?)
    }

    async fn complete_sync_run(
        &self,
        run_id: i64,
        progress: &SyncProgress,
    ) -> Result<(), StoreError> {
        Ok(sync_runs::complete_sync_run(&self.pool, run_id, progress).await?)
    }

    async fn fail_sync_run(
        &self,
        run_id: i64,
        progress: &SyncProgress,
        error_message: &str,
    ) -> Result<(), StoreError> {
        Ok(sync_runs::fail_sync_run(&self.pool, run_id, progress, error_message).await?)
    }

    async fn fail_stale_sync_runs(
        &self,
        cutoff: DateTime<Utc>,
        error_message: &str,
    ) -> Result<u64, StoreError> {
        Ok(sync_runs::fail_stale_sync_runs(&self.pool, cutoff, error_message).await?)
    }
}
