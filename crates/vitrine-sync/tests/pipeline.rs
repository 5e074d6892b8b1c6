//! End-to-end vendor runs against fixture pages and the in-memory store.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use vitrine_core::{
    CatalogFields, CatalogRecord, CatalogStore, IncompletePolicy, NewCatalogRecord, StoreError,
    SyncProgress, SyncRun, SyncRunStore, SyncState, Vendor,
};
use vitrine_scraper::browser::{FixtureBrowser, FixturePage};
use vitrine_scraper::{BrowserProvider, PageSession, SessionError, SessionOptions};
use vitrine_sync::{run_vendor_sync, MemoryStore, PipelineConfig, SyncCoordinator, SyncError};

const SHOP_URL: &str = "https://lune.example/boutique";

const LISTING: &str = r#"<html><head><title>Boutique</title></head><body>
  <div class="product-card" data-product-id="101">
    <a href="/p/bol-gres"><img src="/img/bol.jpg" alt="Bol grès"></a>
    <h3>Bol grès</h3><span class="price">12,00 €</span>
  </div>
  <div class="product-card" data-product-id="102">
    <a href="/p/tasse-emaillee"><img src="/img/tasse.jpg" alt="Tasse émaillée"></a>
    <h3>Tasse émaillée</h3><span class="price">8,50 €</span>
  </div>
  <div class="product-card" data-product-id="103">
    <a href="/p/plat-ovale"><img src="/img/plat.jpg" alt="Plat ovale"></a>
    <h3>Plat ovale</h3><span class="price">34,00 €</span>
  </div>
</body></html>"#;

const EMPTY_PAGE: &str = "<html><body><p>Boutique fermée pour inventaire.</p></body></html>";

fn config() -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.enrich.max_enrichment = 0;
    config
}

fn listing_browser() -> FixtureBrowser {
    FixtureBrowser::new([(SHOP_URL, FixturePage::html(LISTING))])
}

fn setup() -> (MemoryStore, Vendor) {
    let store = MemoryStore::new();
    let vendor = store.add_vendor("Maison Lune", SHOP_URL, None);
    (store, vendor)
}

fn record(store: &MemoryStore, vendor: &Vendor, external_id: &str) -> CatalogRecord {
    store
        .records(vendor.id)
        .into_iter()
        .find(|r| r.external_id == external_id)
        .unwrap_or_else(|| panic!("no record {external_id}"))
}

fn only_run(store: &MemoryStore) -> SyncRun {
    let runs = store.runs();
    assert_eq!(runs.len(), 1, "expected exactly one run");
    runs.into_iter().next().unwrap()
}

// ---------------------------------------------------------------------------
// Completed runs
// ---------------------------------------------------------------------------

#[tokio::test]
async fn first_run_creates_every_product() {
    let (store, vendor) = setup();
    let browser = listing_browser();
    let log = browser.log();

    let summary = run_vendor_sync(&store, &browser, &vendor, &config(), &CancellationToken::new())
        .await
        .unwrap();

    assert!(summary.success);
    assert_eq!(summary.total_products, 3);
    assert_eq!(summary.created, 3);
    assert_eq!(summary.updated, 0);
    assert_eq!(summary.errors, 0);

    let mut ids: Vec<String> = store
        .records(vendor.id)
        .into_iter()
        .map(|r| r.external_id)
        .collect();
    ids.sort();
    assert_eq!(ids, vec!["101", "102", "103"]);
    let bol = record(&store, &vendor, "101");
    assert_eq!(bol.fields.price, "12.00".parse().unwrap());
    assert_eq!(
        bol.fields.product_url.as_deref(),
        Some("https://lune.example/p/bol-gres")
    );

    let run = only_run(&store);
    assert_eq!(run.state, SyncState::Completed);
    assert_eq!(run.created_count, 3);
    assert!(store.vendor(vendor.id).unwrap().last_synced_at.is_some());
    assert_eq!(log.opened(), 1);
    assert_eq!(log.closed(), 1);
}

#[tokio::test]
async fn second_run_updates_in_place() {
    let (store, vendor) = setup();
    let browser = listing_browser();
    let cancel = CancellationToken::new();

    run_vendor_sync(&store, &browser, &vendor, &config(), &cancel)
        .await
        .unwrap();
    let summary = run_vendor_sync(&store, &browser, &vendor, &config(), &cancel)
        .await
        .unwrap();

    assert!(summary.success);
    assert_eq!(summary.created, 0);
    assert_eq!(summary.updated, 3);
    assert_eq!(store.records(vendor.id).len(), 3);
    assert_eq!(store.runs().len(), 2);
}

#[tokio::test]
async fn store_failure_on_one_product_still_completes() {
    let (store, vendor) = setup();
    store.fail_writes_for("102");

    let summary = run_vendor_sync(
        &store,
        &listing_browser(),
        &vendor,
        &config(),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert!(summary.success);
    assert_eq!(summary.created, 2);
    assert_eq!(summary.errors, 1);
    let run = only_run(&store);
    assert_eq!(run.state, SyncState::Completed);
    assert_eq!(run.error_count, 1);
    assert_eq!(run.processed_items, 3);
    assert!(store.vendor(vendor.id).unwrap().last_synced_at.is_some());
}

#[tokio::test]
async fn all_skipped_does_not_advance_last_synced() {
    let (store, vendor) = setup();
    let mut config = config();
    config.sync.incomplete_policy = IncompletePolicy::Discard;

    let summary = run_vendor_sync(
        &store,
        &listing_browser(),
        &vendor,
        &config,
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert!(summary.success);
    assert_eq!(summary.skipped, 3);
    assert_eq!(summary.created, 0);
    assert_eq!(only_run(&store).state, SyncState::Completed);
    assert!(store.vendor(vendor.id).unwrap().last_synced_at.is_none());
}

#[tokio::test]
async fn enrichment_fills_descriptions_before_scoring() {
    let (store, vendor) = setup();
    let detail = r#"<html><body>
        <h1>Bol grès</h1><span class="price">12,00 €</span>
        <div class="product-description">Bol tourné à la main en grès chamotté, émail mat, passe au lave-vaisselle.</div>
    </body></html>"#;
    let browser = FixtureBrowser::new([
        (SHOP_URL, FixturePage::html(LISTING)),
        ("https://lune.example/p/bol-gres", FixturePage::html(detail)),
    ]);
    let mut config = PipelineConfig::default();
    config.enrich.max_enrichment = 1;

    run_vendor_sync(&store, &browser, &vendor, &config, &CancellationToken::new())
        .await
        .unwrap();

    let bol = record(&store, &vendor, "101");
    let tasse = record(&store, &vendor, "102");
    assert!(bol
        .fields
        .description
        .as_deref()
        .unwrap()
        .starts_with("Bol tourné"));
    assert!(tasse.fields.description.is_none());
    assert!(bol.fields.quality_score > tasse.fields.quality_score);
}

// ---------------------------------------------------------------------------
// Failed runs
// ---------------------------------------------------------------------------

#[tokio::test]
async fn zero_products_fails_the_run() {
    let (store, vendor) = setup();
    let browser = FixtureBrowser::new([(SHOP_URL, FixturePage::html(EMPTY_PAGE))]);
    let log = browser.log();

    let summary = run_vendor_sync(&store, &browser, &vendor, &config(), &CancellationToken::new())
        .await
        .unwrap();

    assert!(!summary.success);
    assert_eq!(summary.message.as_deref(), Some("no products found"));
    let run = only_run(&store);
    assert_eq!(run.state, SyncState::Failed);
    assert!(run.completed_at.is_some());
    assert!(store.vendor(vendor.id).unwrap().last_synced_at.is_none());
    assert_eq!(log.closed(), 1);
}

#[tokio::test]
async fn launch_failure_fails_the_run() {
    let (store, vendor) = setup();
    let browser = FixtureBrowser::failing_launch();

    let summary = run_vendor_sync(&store, &browser, &vendor, &config(), &CancellationToken::new())
        .await
        .unwrap();

    assert!(!summary.success);
    assert!(summary.message.unwrap().contains("session launch failed"));
    assert_eq!(only_run(&store).state, SyncState::Failed);
    assert_eq!(browser.log().opened(), 0);
}

#[tokio::test]
async fn start_failure_fails_the_run_and_frees_the_vendor() {
    let (store, vendor) = setup();
    store.fail_run_starts();
    let browser = listing_browser();

    let err = run_vendor_sync(&store, &browser, &vendor, &config(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::Store(StoreError::Backend(_))));

    let run = only_run(&store);
    assert_eq!(run.state, SyncState::Failed);
    assert!(run.started_at.is_none());
    assert!(run.error_message.unwrap().starts_with("run start failed"));
    assert_eq!(browser.log().opened(), 0);
    // A later attempt is not blocked by the failed run.
    assert!(store.create_sync_run(vendor.id).await.is_ok());
}

#[tokio::test]
async fn unreachable_listing_fails_and_closes_the_session() {
    let (store, vendor) = setup();
    let browser = FixtureBrowser::new([("https://elsewhere.example/", FixturePage::html(LISTING))]);
    let log = browser.log();

    let summary = run_vendor_sync(&store, &browser, &vendor, &config(), &CancellationToken::new())
        .await
        .unwrap();

    assert!(!summary.success);
    assert!(summary.message.unwrap().starts_with("extraction failed"));
    assert_eq!(only_run(&store).state, SyncState::Failed);
    assert_eq!(log.closed(), 1);
}

#[tokio::test]
async fn cancelled_before_sync_writes_nothing() {
    let (store, vendor) = setup();
    let browser = listing_browser();
    let log = browser.log();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let summary = run_vendor_sync(&store, &browser, &vendor, &config(), &cancel)
        .await
        .unwrap();

    assert!(!summary.success);
    assert_eq!(summary.message.as_deref(), Some("sync cancelled"));
    assert!(store.records(vendor.id).is_empty());
    assert_eq!(only_run(&store).state, SyncState::Failed);
    assert!(store.vendor(vendor.id).unwrap().last_synced_at.is_none());
    assert_eq!(log.closed(), 1);
}

/// Cancels `cancel` after the first product is created.
struct CancelAfterFirstCreate {
    inner: MemoryStore,
    cancel: CancellationToken,
}

#[async_trait]
impl CatalogStore for CancelAfterFirstCreate {
    async fn find_by_external_id(
        &self,
        vendor_id: i64,
        external_id: &str,
    ) -> Result<Option<CatalogRecord>, StoreError> {
        self.inner.find_by_external_id(vendor_id, external_id).await
    }

    async fn create(&self, record: NewCatalogRecord) -> Result<CatalogRecord, StoreError> {
        let created = self.inner.create(record).await;
        self.cancel.cancel();
        created
    }

    async fn update(&self, id: i64, fields: CatalogFields) -> Result<CatalogRecord, StoreError> {
        self.inner.update(id, fields).await
    }

    async fn set_vendor_last_synced(
        &self,
        vendor_id: i64,
        synced_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.inner.set_vendor_last_synced(vendor_id, synced_at).await
    }
}

#[async_trait]
impl SyncRunStore for CancelAfterFirstCreate {
    async fn get_vendor(&self, vendor_id: i64) -> Result<Vendor, StoreError> {
        self.inner.get_vendor(vendor_id).await
    }

    async fn create_sync_run(&self, vendor_id: i64) -> Result<SyncRun, StoreError> {
        self.inner.create_sync_run(vendor_id).await
    }

    async fn start_sync_run(&self, run_id: i64) -> Result<(), StoreError> {
        self.inner.start_sync_run(run_id).await
    }

    async fn record_sync_progress(
        &self,
        run_id: i64,
        progress: &SyncProgress,
    ) -> Result<(), StoreError> {
        self.inner.record_sync_progress(run_id, progress).await
    }

    async fn complete_sync_run(
        &self,
        run_id: i64,
        progress: &SyncProgress,
    ) -> Result<(), StoreError> {
        self.inner.complete_sync_run(run_id, progress).await
    }

    async fn fail_sync_run(
        &self,
        run_id: i64,
        progress: &SyncProgress,
        error_message: &str,
    ) -> Result<(), StoreError> {
        self.inner.fail_sync_run(run_id, progress, error_message).await
    }

    async fn fail_stale_sync_runs(
        &self,
        cutoff: DateTime<Utc>,
        error_message: &str,
    ) -> Result<u64, StoreError> {
        self.inner.fail_stale_sync_runs(cutoff, error_message).await
    }
}

#[tokio::test]
async fn cancellation_mid_batch_keeps_applied_products() {
    let cancel = CancellationToken::new();
    let store = CancelAfterFirstCreate {
        inner: MemoryStore::new(),
        cancel: cancel.clone(),
    };
    let vendor = store.inner.add_vendor("Maison Lune", SHOP_URL, None);
    let mut config = config();
    config.sync.concurrency = 1;
    config.sync.chunk_size = 1;

    let summary = run_vendor_sync(&store, &listing_browser(), &vendor, &config, &cancel)
        .await
        .unwrap();

    assert!(!summary.success);
    assert_eq!(summary.created, 1);
    assert_eq!(store.inner.records(vendor.id).len(), 1);
    let run = only_run(&store.inner);
    assert_eq!(run.state, SyncState::Failed);
    assert_eq!(run.processed_items, 1);
    assert_eq!(run.total_items, 3);
    assert!(store.inner.vendor(vendor.id).unwrap().last_synced_at.is_none());
}

#[tokio::test]
async fn active_run_in_store_rejects_a_new_one() {
    let (store, vendor) = setup();
    store.create_sync_run(vendor.id).await.unwrap();

    let err = run_vendor_sync(
        &store,
        &listing_browser(),
        &vendor,
        &config(),
        &CancellationToken::new(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, SyncError::AlreadyRunning { vendor_id } if vendor_id == vendor.id));
}

// ---------------------------------------------------------------------------
// Coordinator
// ---------------------------------------------------------------------------

/// Holds every `open` until the test releases permits on `gate`.
struct GatedBrowser {
    inner: FixtureBrowser,
    gate: Arc<Semaphore>,
    entered: Arc<AtomicUsize>,
}

#[async_trait]
impl BrowserProvider for GatedBrowser {
    async fn open(&self, options: &SessionOptions) -> Result<Box<dyn PageSession>, SessionError> {
        self.entered.fetch_add(1, Ordering::SeqCst);
        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|e| SessionError::Launch(e.to_string()))?;
        permit.forget();
        self.inner.open(options).await
    }
}

fn gated() -> (GatedBrowser, Arc<Semaphore>, Arc<AtomicUsize>) {
    let gate = Arc::new(Semaphore::new(0));
    let entered = Arc::new(AtomicUsize::new(0));
    let browser = GatedBrowser {
        inner: FixtureBrowser::new([
            (SHOP_URL, FixturePage::html(LISTING)),
            ("https://brume.example/", FixturePage::html(LISTING)),
        ]),
        gate: Arc::clone(&gate),
        entered: Arc::clone(&entered),
    };
    (browser, gate, entered)
}

#[tokio::test]
async fn coordinator_rejects_overlapping_runs_for_one_vendor() {
    let store = Arc::new(MemoryStore::new());
    let vendor = store.add_vendor("Maison Lune", SHOP_URL, None);
    let (browser, gate, _) = gated();
    let coordinator = SyncCoordinator::new(store.clone(), Arc::new(browser), config(), 2);

    let first = coordinator.start_sync(vendor.id);
    let second = async {
        tokio::task::yield_now().await;
        let result = coordinator.start_sync(vendor.id).await;
        gate.add_permits(1);
        result
    };
    let (first, second) = tokio::join!(first, second);

    assert!(first.unwrap().success);
    assert!(matches!(second, Err(SyncError::AlreadyRunning { .. })));
    assert_eq!(store.runs().len(), 1);
    assert!(!coordinator.is_running(vendor.id));
}

#[tokio::test]
async fn coordinator_queues_vendors_beyond_the_limit() {
    let store = Arc::new(MemoryStore::new());
    let lune = store.add_vendor("Maison Lune", SHOP_URL, None);
    let brume = store.add_vendor("Atelier Brume", "https://brume.example/", None);
    let (browser, gate, entered) = gated();
    let coordinator = SyncCoordinator::new(store.clone(), Arc::new(browser), config(), 1);

    let ids = [lune.id, brume.id];
    let runs = coordinator.sync_many(&ids);
    let observer = async {
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
        // Only one vendor holds a slot; the other waits for it.
        let entered_while_blocked = entered.load(Ordering::SeqCst);
        gate.add_permits(2);
        entered_while_blocked
    };
    let (results, entered_while_blocked) = tokio::join!(runs, observer);

    assert_eq!(entered_while_blocked, 1);
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].0, lune.id);
    assert!(results.iter().all(|(_, r)| r.as_ref().unwrap().success));
    assert_eq!(entered.load(Ordering::SeqCst), 2);
}
