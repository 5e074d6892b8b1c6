//! In-memory [`CatalogStore`] and [`SyncRunStore`] for tests and dry runs.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;
use vitrine_core::{
    CatalogFields, CatalogRecord, CatalogStore, NewCatalogRecord, Platform, StoreError,
    SyncProgress, SyncRun, SyncRunStore, SyncState, Vendor,
};

#[derive(Debug, Default)]
struct Inner {
    vendors: BTreeMap<i64, Vendor>,
    records: BTreeMap<i64, CatalogRecord>,
    runs: BTreeMap<i64, SyncRun>,
    failing_writes: HashSet<String>,
    failing_starts: bool,
    next_id: i64,
}

impl Inner {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn run_mut(&mut self, run_id: i64) -> Result<&mut SyncRun, StoreError> {
        self.runs
            .get_mut(&run_id)
            .ok_or_else(|| StoreError::NotFound(format!("sync run {run_id}")))
    }

    fn transition(&mut self, run_id: i64, target: SyncState) -> Result<&mut SyncRun, StoreError> {
        let run = self.run_mut(run_id)?;
        if !run.state.can_transition_to(target) {
            let expected = if target == SyncState::InProgress {
                SyncState::Pending
            } else {
                SyncState::InProgress
            };
            return Err(StoreError::InvalidTransition {
                id: run_id,
                expected,
                target,
            });
        }
        run.state = target;
        Ok(run)
    }

    fn check_write(&self, external_id: &str) -> Result<(), StoreError> {
        if self.failing_writes.contains(external_id) {
            return Err(StoreError::Backend(format!(
                "injected write failure for {external_id}"
            )));
        }
        Ok(())
    }
}

/// Catalog, vendors and runs held in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

fn apply_counts(run: &mut SyncRun, progress: &SyncProgress) {
    run.total_items = progress.total_items;
    run.processed_items = progress.processed_items;
    run.created_count = progress.created;
    run.updated_count = progress.updated;
    run.skipped_count = progress.skipped;
    run.error_count = progress.errors;
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers an active vendor and returns it.
    pub fn add_vendor(&self, name: &str, site_url: &str, platform_hint: Option<Platform>) -> Vendor {
        let mut inner = self.lock();
        let id = inner.next_id();
        let vendor = Vendor {
            id,
            public_id: Uuid::new_v4(),
            name: name.to_string(),
            slug: vitrine_core::products::slugify(name),
            site_url: site_url.to_string(),
            platform_hint,
            is_active: true,
            last_synced_at: None,
        };
        inner.vendors.insert(id, vendor.clone());
        vendor
    }

    /// Inserts a copy of an existing vendor, keeping its id.
    pub fn insert_vendor(&self, vendor: Vendor) {
        let mut inner = self.lock();
        inner.next_id = inner.next_id.max(vendor.id);
        inner.vendors.insert(vendor.id, vendor);
    }

    /// Makes every create or update of `external_id` fail with a backend error.
    pub fn fail_writes_for(&self, external_id: &str) {
        self.lock().failing_writes.insert(external_id.to_string());
    }

    /// Makes every run start fail with a backend error.
    pub fn fail_run_starts(&self) {
        self.lock().failing_starts = true;
    }

    #[must_use]
    pub fn vendor(&self, vendor_id: i64) -> Option<Vendor> {
        self.lock().vendors.get(&vendor_id).cloned()
    }

    /// Catalog records of one vendor, in insertion order.
    #[must_use]
    pub fn records(&self, vendor_id: i64) -> Vec<CatalogRecord> {
        self.lock()
            .records
            .values()
            .filter(|r| r.vendor_id == vendor_id)
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn run(&self, run_id: i64) -> Option<SyncRun> {
        self.lock().runs.get(&run_id).cloned()
    }

    /// Every run, oldest first.
    #[must_use]
    pub fn runs(&self) -> Vec<SyncRun> {
        self.lock().runs.values().cloned().collect()
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn find_by_external_id(
        &self,
        vendor_id: i64,
        external_id: &str,
    ) -> Result<Option<CatalogRecord>, StoreError> {
        Ok(self
            .lock()
            .records
            .values()
            .find(|r| r.vendor_id == vendor_id && r.external_id == external_id)
            .cloned())
    }

    async fn create(&self, record: NewCatalogRecord) -> Result<CatalogRecord, StoreError> {
        let mut inner = self.lock();
        inner.check_write(&record.external_id)?;
        let duplicate = inner
            .records
            .values()
            .any(|r| r.vendor_id == record.vendor_id && r.external_id == record.external_id);
        if duplicate {
            return Err(StoreError::Conflict(format!(
                "product {} already exists for vendor {}",
                record.external_id, record.vendor_id
            )));
        }

        let id = inner.next_id();
        let now = Utc::now();
        let created = CatalogRecord {
            id,
            vendor_id: record.vendor_id,
            external_id: record.external_id,
            fields: record.fields,
            created_at: now,
            updated_at: now,
        };
        inner.records.insert(id, created.clone());
        Ok(created)
    }

    async fn update(&self, id: i64, fields: CatalogFields) -> Result<CatalogRecord, StoreError> {
        let mut inner = self.lock();
        let external_id = inner
            .records
            .get(&id)
            .map(|r| r.external_id.clone())
            .ok_or_else(|| StoreError::NotFound(format!("catalog product {id}")))?;
        inner.check_write(&external_id)?;

        let record = inner
            .records
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("catalog product {id}")))?;
        record.apply_update(fields);
        Ok(record.clone())
    }

    async fn set_vendor_last_synced(
        &self,
        vendor_id: i64,
        synced_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let vendor = inner
            .vendors
            .get_mut(&vendor_id)
            .ok_or_else(|| StoreError::NotFound(format!("vendor {vendor_id}")))?;
        vendor.last_synced_at = Some(synced_at);
        Ok(())
    }
}

#[async_trait]
impl SyncRunStore for MemoryStore {
    async fn get_vendor(&self, vendor_id: i64) -> Result<Vendor, StoreError> {
        self.vendor(vendor_id)
            .ok_or_else(|| StoreError::NotFound(format!("vendor {vendor_id}")))
    }

    async fn create_sync_run(&self, vendor_id: i64) -> Result<SyncRun, StoreError> {
        let mut inner = self.lock();
        if !inner.vendors.contains_key(&vendor_id) {
            return Err(StoreError::NotFound(format!("vendor {vendor_id}")));
        }
        let active = inner
            .runs
            .values()
            .any(|r| r.vendor_id == vendor_id && !r.state.is_terminal());
        if active {
            return Err(StoreError::Conflict(format!(
                "vendor {vendor_id} already has an active sync run"
            )));
        }

        let id = inner.next_id();
        let run = SyncRun {
            id,
            public_id: Uuid::new_v4(),
            vendor_id,
            state: SyncState::Pending,
            total_items: 0,
            processed_items: 0,
            error_count: 0,
            created_count: 0,
            updated_count: 0,
            skipped_count: 0,
            error_message: None,
            started_at: None,
            completed_at: None,
            created_at: Utc::now(),
        };
        inner.runs.insert(id, run.clone());
        Ok(run)
    }

    async fn start_sync_run(&self, run_id: i64) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if inner.failing_starts {
            return Err(StoreError::Backend(format!("simulated start failure for run {run_id}")));
        }
        let run = inner.transition(run_id, SyncState::InProgress)?;
        run.started_at = Some(Utc::now());
        Ok(())
    }

    async fn record_sync_progress(
        &self,
        run_id: i64,
        progress: &SyncProgress,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let run = inner.run_mut(run_id)?;
        if run.state != SyncState::InProgress {
            return Err(StoreError::InvalidTransition {
                id: run_id,
                expected: SyncState::InProgress,
                target: SyncState::InProgress,
            });
        }
        apply_counts(run, progress);
        Ok(())
    }

    async fn complete_sync_run(
        &self,
        run_id: i64,
        progress: &SyncProgress,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let run = inner.transition(run_id, SyncState::Completed)?;
        apply_counts(run, progress);
        run.completed_at = Some(Utc::now());
        Ok(())
    }

    async fn fail_sync_run(
        &self,
        run_id: i64,
        progress: &SyncProgress,
        error_message: &str,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let run = inner.transition(run_id, SyncState::Failed)?;
        apply_counts(run, progress);
        run.error_message = Some(error_message.to_string());
        run.completed_at = Some(Utc::now());
        Ok(())
    }

    async fn fail_stale_sync_runs(
        &self,
        cutoff: DateTime<Utc>,
        error_message: &str,
    ) -> Result<u64, StoreError> {
        let mut inner = self.lock();
        let now = Utc::now();
        let mut failed = 0;
        for run in inner.runs.values_mut() {
            if run.state.is_terminal() || run.started_at.unwrap_or(run.created_at) >= cutoff {
                continue;
            }
            run.state = SyncState::Failed;
            run.error_message = Some(error_message.to_string());
            run.completed_at = Some(now);
            failed += 1;
        }
        Ok(failed)
    }
}
