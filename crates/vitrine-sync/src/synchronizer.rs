//! Reconciles an extracted batch against the catalog store.

use std::time::Duration;

use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use vitrine_core::{
    CatalogFields, ExtractedProduct, IncompletePolicy, NewCatalogRecord, SyncProgress,
};
use vitrine_scraper::{score_product, QualityReport};

use crate::SyncStore;

#[derive(Debug, Clone, Copy)]
pub struct SyncOptions {
    /// Product writes in flight at once.
    pub concurrency: usize,
    /// Products per progress checkpoint.
    pub chunk_size: usize,
    pub incomplete_policy: IncompletePolicy,
    /// Age after which a pending or in-progress run is presumed orphaned.
    pub stale_after: Duration,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            concurrency: 4,
            chunk_size: 25,
            incomplete_policy: IncompletePolicy::Warn,
            stale_after: Duration::from_secs(120 * 60),
        }
    }
}

/// A product paired with its quality report.
#[derive(Debug, Clone)]
pub struct ScoredProduct {
    pub product: ExtractedProduct,
    pub report: QualityReport,
}

impl ScoredProduct {
    /// Scores `product`, writing the score onto it.
    #[must_use]
    pub fn score(mut product: ExtractedProduct) -> Self {
        let report = score_product(&mut product);
        Self { product, report }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductOutcome {
    Created,
    Updated,
    Skipped,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchResult {
    pub progress: SyncProgress,
    /// Cancellation stopped the batch before every product was processed.
    pub cancelled: bool,
}

fn tally(progress: &mut SyncProgress, outcome: ProductOutcome) {
    progress.processed_items += 1;
    match outcome {
        ProductOutcome::Created => progress.created += 1,
        ProductOutcome::Updated => progress.updated += 1,
        ProductOutcome::Skipped => progress.skipped += 1,
        ProductOutcome::Error => progress.errors += 1,
    }
}

/// Writes one product: update when `(vendor_id, external_id)` exists,
/// create otherwise. Store failures are logged and reported as
/// [`ProductOutcome::Error`].
pub async fn sync_product(
    store: &dyn SyncStore,
    vendor_id: i64,
    scored: ScoredProduct,
    policy: IncompletePolicy,
) -> ProductOutcome {
    let ScoredProduct { product, report } = scored;
    let external_id = product.external_id.as_str();

    if !report.is_complete {
        match policy {
            IncompletePolicy::Discard => {
                tracing::debug!(
                    vendor_id,
                    external_id,
                    score = report.score,
                    "skipping incomplete product"
                );
                return ProductOutcome::Skipped;
            }
            IncompletePolicy::Warn => {
                tracing::warn!(
                    vendor_id,
                    external_id,
                    score = report.score,
                    missing = ?report.missing,
                    "persisting incomplete product"
                );
            }
            IncompletePolicy::Persist => {}
        }
    }

    let fields = CatalogFields::from_product(&product, report.is_complete);
    let result = match store.find_by_external_id(vendor_id, external_id).await {
        Ok(Some(existing)) => store
            .update(existing.id, fields)
            .await
            .map(|_| ProductOutcome::Updated),
        Ok(None) => store
            .create(NewCatalogRecord {
                vendor_id,
                external_id: product.external_id.clone(),
                fields,
            })
            .await
            .map(|_| ProductOutcome::Created),
        Err(e) => Err(e),
    };

    result.unwrap_or_else(|e| {
        tracing::error!(vendor_id, external_id, error = %e, "failed to write product");
        ProductOutcome::Error
    })
}

/// Writes `products` with bounded concurrency, persisting progress on the
/// run after every chunk.
///
/// Cancellation is checked before each product; products not yet started
/// when it fires are left unprocessed and the result is marked cancelled.
/// A failing product never aborts the batch.
pub async fn sync_products(
    store: &dyn SyncStore,
    run_id: i64,
    vendor_id: i64,
    products: Vec<ScoredProduct>,
    options: &SyncOptions,
    cancel: &CancellationToken,
) -> BatchResult {
    let mut progress = SyncProgress::new(products.len());
    let mut cancelled = false;
    let mut remaining = products.into_iter();

    loop {
        let chunk: Vec<ScoredProduct> = remaining.by_ref().take(options.chunk_size.max(1)).collect();
        if chunk.is_empty() {
            break;
        }

        let outcomes: Vec<Option<ProductOutcome>> = stream::iter(chunk)
            .map(|scored| async move {
                if cancel.is_cancelled() {
                    return None;
                }
                Some(sync_product(store, vendor_id, scored, options.incomplete_policy).await)
            })
            .buffer_unordered(options.concurrency.max(1))
            .collect()
            .await;

        for outcome in outcomes {
            match outcome {
                Some(outcome) => tally(&mut progress, outcome),
                None => cancelled = true,
            }
        }

        if let Err(e) = store.record_sync_progress(run_id, &progress).await {
            tracing::warn!(run_id, error = %e, "failed to record sync progress");
        }

        if cancelled || cancel.is_cancelled() {
            cancelled = progress.processed_items < progress.total_items;
            break;
        }
    }

    tracing::info!(
        vendor_id,
        run_id,
        total = progress.total_items,
        created = progress.created,
        updated = progress.updated,
        skipped = progress.skipped,
        errors = progress.errors,
        cancelled,
        "synchronized batch"
    );
    BatchResult {
        progress,
        cancelled,
    }
}

#[cfg(test)]
#[path = "synchronizer_test.rs"]
mod tests;
