//! One vendor run end to end: session, classification, extraction,
//! deduplication, enrichment, scoring, and catalog synchronization.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use vitrine_core::{
    AppConfig, ExtractedProduct, Platform, SiteProfile, StoreError, SyncProgress, SyncRunSummary,
    Vendor,
};
use vitrine_scraper::{
    capture_page, classify, dedup_products, enrich_products, extract_products, BrowserProvider,
    CaptureOptions, EnrichOptions, ExtractOptions, PageKindWeights, PageSession, SessionOptions,
};

use crate::error::{CollectError, SyncError};
use crate::synchronizer::{sync_products, ScoredProduct, SyncOptions};
use crate::SyncStore;

/// Confidence recorded for a platform taken from vendor configuration.
const HINT_CONFIDENCE: f32 = 1.0;

#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub session: SessionOptions,
    pub extract: ExtractOptions,
    pub enrich: EnrichOptions,
    pub sync: SyncOptions,
}

impl PipelineConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            session: SessionOptions {
                user_agent: config.scraper_user_agent.clone(),
                navigation_timeout: Duration::from_secs(config.scraper_request_timeout_secs),
                max_retries: config.scraper_max_retries,
                backoff_base_secs: config.scraper_retry_backoff_base_secs,
            },
            extract: ExtractOptions {
                max_dom_candidates: config.max_dom_candidates,
                page_kind: PageKindWeights {
                    threshold: config.single_page_threshold,
                    ..PageKindWeights::default()
                },
                ..ExtractOptions::default()
            },
            enrich: EnrichOptions {
                max_enrichment: config.max_enrichment,
                timeout: Duration::from_secs(config.enrichment_timeout_secs),
                ..EnrichOptions::default()
            },
            sync: SyncOptions {
                concurrency: config.sync_concurrency,
                incomplete_policy: config.incomplete_policy,
                stale_after: Duration::from_secs(config.sync_stale_after_mins.saturating_mul(60)),
                ..SyncOptions::default()
            },
        }
    }
}

/// What one page yielded.
#[derive(Debug, Clone)]
pub struct Collected {
    pub profile: SiteProfile,
    pub products: Vec<ExtractedProduct>,
    /// Products that received detail-page data.
    pub enriched: usize,
}

/// Loads `url` in `session` and returns its deduplicated, optionally
/// enriched products. Does not close the session.
///
/// # Errors
///
/// Returns [`CollectError::Capture`] when the page cannot be loaded at all,
/// or [`CollectError::Extract`] when the loaded URL is unusable.
pub async fn collect_products(
    session: &mut dyn PageSession,
    url: &str,
    platform_hint: Option<Platform>,
    config: &PipelineConfig,
    enrich: bool,
    label: &str,
    cancel: &CancellationToken,
) -> Result<Collected, CollectError> {
    let capture = CaptureOptions::listing(config.session.navigation_timeout);
    let snapshot = capture_page(session, url, &capture)
        .await
        .map_err(|source| CollectError::Capture {
            url: url.to_string(),
            source,
        })?;

    let profile = match platform_hint {
        Some(platform) => SiteProfile::new(platform, HINT_CONFIDENCE),
        None => classify(&snapshot),
    };
    tracing::info!(
        vendor = label,
        platform = %profile.platform,
        confidence = profile.confidence,
        "classified storefront"
    );

    let extracted = extract_products(&snapshot, &profile, &config.extract)?;
    let mut products = dedup_products(extracted);

    let enriched = if enrich && !products.is_empty() {
        enrich_products(
            session,
            &mut products,
            &profile,
            &config.extract,
            &config.enrich,
            label,
            cancel,
        )
        .await
    } else {
        0
    };

    Ok(Collected {
        profile,
        products,
        enriched,
    })
}

async fn fail_run(
    store: &dyn SyncStore,
    run_id: i64,
    vendor_id: i64,
    progress: &SyncProgress,
    message: String,
) -> SyncRunSummary {
    if let Err(mark_err) = store.fail_sync_run(run_id, progress, &message).await {
        tracing::error!(run_id, error = %mark_err, "failed to mark sync run as failed");
    }
    tracing::warn!(vendor_id, run_id, reason = %message, "sync run failed");
    SyncRunSummary::failed(Some(run_id), vendor_id, progress, message)
}

/// Runs the full pipeline for `vendor` and records it as a sync run.
///
/// Run-level failures (session launch, unloadable listing, zero products,
/// cancellation) mark the run `failed` and come back as a summary with
/// `success: false`. The page session is closed on every path once opened.
/// `last_synced_at` advances only on completion with at least one product
/// created or updated.
///
/// # Errors
///
/// Returns [`SyncError::AlreadyRunning`] when the vendor has an active run,
/// or [`SyncError::Store`] when the run itself cannot be recorded. A run that
/// was created but could not start is marked `failed` before returning.
pub async fn run_vendor_sync(
    store: &dyn SyncStore,
    browser: &dyn BrowserProvider,
    vendor: &Vendor,
    config: &PipelineConfig,
    cancel: &CancellationToken,
) -> Result<SyncRunSummary, SyncError> {
    let vendor_id = vendor.id;
    let run = store
        .create_sync_run(vendor_id)
        .await
        .map_err(|e| match e {
            StoreError::Conflict(_) => SyncError::AlreadyRunning { vendor_id },
            other => SyncError::Store(other),
        })?;
    if let Err(e) = store.start_sync_run(run.id).await {
        fail_run(
            store,
            run.id,
            vendor_id,
            &SyncProgress::default(),
            format!("run start failed: {e}"),
        )
        .await;
        return Err(e.into());
    }
    tracing::info!(vendor_id, run_id = run.id, slug = %vendor.slug, "sync run started");

    let mut session = match browser.open(&config.session).await {
        Ok(session) => session,
        Err(e) => {
            let message = format!("session launch failed: {e}");
            return Ok(fail_run(store, run.id, vendor_id, &SyncProgress::default(), message).await);
        }
    };

    let collected = collect_products(
        session.as_mut(),
        &vendor.site_url,
        vendor.platform_hint,
        config,
        true,
        &vendor.slug,
        cancel,
    )
    .await;
    if let Err(e) = session.close().await {
        tracing::warn!(vendor_id, error = %e, "failed to close page session");
    }

    let products = match collected {
        Ok(collected) => collected.products,
        Err(e) => {
            let message = format!("extraction failed: {e}");
            return Ok(fail_run(store, run.id, vendor_id, &SyncProgress::default(), message).await);
        }
    };

    if products.is_empty() {
        let message = "no products found".to_string();
        return Ok(fail_run(store, run.id, vendor_id, &SyncProgress::default(), message).await);
    }
    if cancel.is_cancelled() {
        let progress = SyncProgress::new(products.len());
        return Ok(fail_run(store, run.id, vendor_id, &progress, "sync cancelled".to_string()).await);
    }

    let scored: Vec<ScoredProduct> = products.into_iter().map(ScoredProduct::score).collect();
    let batch = sync_products(store, run.id, vendor_id, scored, &config.sync, cancel).await;
    if batch.cancelled {
        return Ok(fail_run(store, run.id, vendor_id, &batch.progress, "sync cancelled".to_string()).await);
    }

    if let Err(e) = store.complete_sync_run(run.id, &batch.progress).await {
        fail_run(store, run.id, vendor_id, &batch.progress, e.to_string()).await;
        return Err(e.into());
    }

    let summary = SyncRunSummary::completed(run.id, vendor_id, &batch.progress);
    if batch.progress.applied() >= 1 {
        if let Err(e) = store.set_vendor_last_synced(vendor_id, summary.synced_at).await {
            tracing::warn!(vendor_id, error = %e, "failed to record last sync time");
        }
    }
    tracing::info!(
        vendor_id,
        run_id = run.id,
        created = summary.created,
        updated = summary.updated,
        errors = summary.errors,
        "sync run completed"
    );
    Ok(summary)
}
