//! Admission control for vendor runs.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{TimeDelta, Utc};
use futures::future::join_all;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use vitrine_core::{StoreError, SyncRunSummary};
use vitrine_scraper::BrowserProvider;

use crate::error::SyncError;
use crate::pipeline::{run_vendor_sync, PipelineConfig};
use crate::SyncStore;

const STALE_RUN_MESSAGE: &str = "abandoned: no progress before the stale-run cutoff";

/// Starts vendor runs, at most one per vendor and at most
/// `max_concurrent_vendors` at once. Callers beyond the limit wait for a slot.
pub struct SyncCoordinator {
    store: Arc<dyn SyncStore>,
    browser: Arc<dyn BrowserProvider>,
    config: PipelineConfig,
    permits: Semaphore,
    running: Mutex<HashSet<i64>>,
    shutdown: CancellationToken,
}

/// Holds a vendor's slot in the in-progress set until dropped.
struct RunningClaim<'a> {
    running: &'a Mutex<HashSet<i64>>,
    vendor_id: i64,
}

impl Drop for RunningClaim<'_> {
    fn drop(&mut self) {
        self.running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.vendor_id);
    }
}

impl SyncCoordinator {
    #[must_use]
    pub fn new(
        store: Arc<dyn SyncStore>,
        browser: Arc<dyn BrowserProvider>,
        config: PipelineConfig,
        max_concurrent_vendors: usize,
    ) -> Self {
        Self {
            store,
            browser,
            config,
            permits: Semaphore::new(max_concurrent_vendors.max(1)),
            running: Mutex::new(HashSet::new()),
            shutdown: CancellationToken::new(),
        }
    }

    fn claim(&self, vendor_id: i64) -> Result<RunningClaim<'_>, SyncError> {
        let mut running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        if !running.insert(vendor_id) {
            return Err(SyncError::AlreadyRunning { vendor_id });
        }
        Ok(RunningClaim {
            running: &self.running,
            vendor_id,
        })
    }

    #[must_use]
    pub fn is_running(&self, vendor_id: i64) -> bool {
        self.running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&vendor_id)
    }

    /// Runs the pipeline for one vendor and returns its summary.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::AlreadyRunning`] when the vendor is already being
    /// synchronized, [`SyncError::VendorNotFound`] for an unknown id, and
    /// [`SyncError::ShuttingDown`] once [`shutdown`](Self::shutdown) was called.
    pub async fn start_sync(&self, vendor_id: i64) -> Result<SyncRunSummary, SyncError> {
        let _claim = self.claim(vendor_id)?;

        let vendor = self.store.get_vendor(vendor_id).await.map_err(|e| match e {
            StoreError::NotFound(_) => SyncError::VendorNotFound(vendor_id),
            other => SyncError::Store(other),
        })?;

        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| SyncError::ShuttingDown)?;
        if self.shutdown.is_cancelled() {
            return Err(SyncError::ShuttingDown);
        }

        let cancel = self.shutdown.child_token();
        run_vendor_sync(
            self.store.as_ref(),
            self.browser.as_ref(),
            &vendor,
            &self.config,
            &cancel,
        )
        .await
    }

    /// Runs every vendor in `vendor_ids`, bounded by the concurrency limit.
    /// Results come back in input order.
    pub async fn sync_many(
        &self,
        vendor_ids: &[i64],
    ) -> Vec<(i64, Result<SyncRunSummary, SyncError>)> {
        join_all(
            vendor_ids
                .iter()
                .map(|&id| async move { (id, self.start_sync(id).await) }),
        )
        .await
    }

    /// Fails runs left pending or in progress for longer than
    /// `sync.stale_after`, such as runs orphaned by a crashed process, so
    /// their vendors can be synchronized again. Returns how many were failed.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Store`] when the store cannot be updated.
    pub async fn recover_stale_runs(&self) -> Result<u64, SyncError> {
        let Some(cutoff) = TimeDelta::from_std(self.config.sync.stale_after)
            .ok()
            .and_then(|age| Utc::now().checked_sub_signed(age))
        else {
            return Ok(0);
        };
        let failed = self
            .store
            .fail_stale_sync_runs(cutoff, STALE_RUN_MESSAGE)
            .await?;
        if failed > 0 {
            tracing::warn!(failed, %cutoff, "failed stale sync runs");
        }
        Ok(failed)
    }

    /// Cancels in-flight runs and rejects new ones.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
        self.permits.close();
    }
}
