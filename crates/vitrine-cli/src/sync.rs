//! Catalog sync commands.
//!
//! Per-vendor failures are reported and counted rather than propagated so
//! one broken storefront does not stop the others.

use std::sync::Arc;

use vitrine_core::{SyncRunSummary, Vendor};
use vitrine_scraper::browser::HttpBrowser;
use vitrine_sync::{MemoryStore, PipelineConfig, SyncCoordinator, SyncError, SyncStore};

/// Resolve which vendors a `sync` invocation covers.
async fn load_vendors_for_sync(
    pool: &sqlx::PgPool,
    slug: Option<&str>,
    all: bool,
) -> anyhow::Result<Vec<Vendor>> {
    match slug {
        Some(slug) => {
            let vendor = vitrine_db::get_vendor_by_slug(pool, slug)
                .await
                .map_err(|e| match e {
                    vitrine_db::DbError::NotFound => anyhow::anyhow!("vendor '{slug}' not found"),
                    other => other.into(),
                })?;
            if !vendor.is_active {
                tracing::warn!(vendor = %vendor.slug, "vendor is inactive; syncing on request");
            }
            Ok(vec![vendor])
        }
        None if all => Ok(vitrine_db::list_active_vendors(pool).await?),
        None => anyhow::bail!("pass --vendor SLUG or --all"),
    }
}

fn build_coordinator(
    store: Arc<dyn SyncStore>,
    config: &vitrine_core::AppConfig,
) -> Arc<SyncCoordinator> {
    Arc::new(SyncCoordinator::new(
        store,
        Arc::new(HttpBrowser::new()),
        PipelineConfig::from_app_config(config),
        config.max_concurrent_vendors,
    ))
}

/// Cancel in-flight runs on Ctrl-C. Runs already applied stay applied; the
/// interrupted ones are recorded as failed.
fn cancel_on_ctrl_c(coordinator: &Arc<SyncCoordinator>) -> tokio::task::JoinHandle<()> {
    let coordinator = Arc::clone(coordinator);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling sync runs");
            coordinator.shutdown();
        }
    })
}

async fn sync_vendors(
    coordinator: &Arc<SyncCoordinator>,
    vendors: &[Vendor],
) -> Vec<(String, Result<SyncRunSummary, SyncError>)> {
    let ids: Vec<i64> = vendors.iter().map(|v| v.id).collect();
    let watcher = cancel_on_ctrl_c(coordinator);
    let results = coordinator.sync_many(&ids).await;
    watcher.abort();

    results
        .into_iter()
        .zip(vendors)
        .map(|((_, result), vendor)| (vendor.slug.clone(), result))
        .collect()
}

pub(crate) fn format_summary(slug: &str, result: &Result<SyncRunSummary, SyncError>) -> String {
    match result {
        Ok(summary) if summary.success => format!(
            "{slug}: ok, {} product(s), {} created, {} updated, {} skipped, {} error(s)",
            summary.total_products,
            summary.created,
            summary.updated,
            summary.skipped,
            summary.errors
        ),
        Ok(summary) => format!(
            "{slug}: failed, {}",
            summary.message.as_deref().unwrap_or("no reason recorded")
        ),
        Err(e) => format!("{slug}: not run, {e}"),
    }
}

fn report(results: &[(String, Result<SyncRunSummary, SyncError>)]) -> anyhow::Result<()> {
    let mut failed = 0usize;
    for (slug, result) in results {
        if !matches!(result, Ok(summary) if summary.success) {
            failed += 1;
        }
        println!("{}", format_summary(slug, result));
    }
    if failed > 0 {
        anyhow::bail!("{failed} of {} vendor sync(s) failed", results.len());
    }
    Ok(())
}

pub(crate) async fn run_sync(
    pool: &sqlx::PgPool,
    config: &vitrine_core::AppConfig,
    slug: Option<&str>,
    all: bool,
) -> anyhow::Result<()> {
    let vendors = load_vendors_for_sync(pool, slug, all).await?;
    if vendors.is_empty() {
        println!("no active vendors to sync");
        return Ok(());
    }
    tracing::info!(vendors = vendors.len(), "starting catalog sync");

    let store: Arc<dyn SyncStore> = Arc::new(vitrine_db::PgStore::new(pool.clone()));
    let coordinator = build_coordinator(store, config);
    let recovered = coordinator.recover_stale_runs().await?;
    if recovered > 0 {
        println!("marked {recovered} stale sync run(s) as failed");
    }
    let results = sync_vendors(&coordinator, &vendors).await;
    report(&results)
}

/// Sync vendors from the vendors file into a throwaway in-memory catalog.
pub(crate) async fn run_sync_dry(
    config: &vitrine_core::AppConfig,
    slug: Option<&str>,
) -> anyhow::Result<()> {
    let file = vitrine_core::load_vendors(&config.vendors_path)?;
    let selected: Vec<_> = file
        .vendors
        .iter()
        .filter(|v| match slug {
            Some(slug) => v.slug() == slug,
            None => v.active,
        })
        .collect();
    if let (Some(slug), true) = (slug, selected.is_empty()) {
        anyhow::bail!("vendor '{slug}' not found in {}", config.vendors_path.display());
    }

    let memory = Arc::new(MemoryStore::new());
    let vendors: Vec<Vendor> = selected
        .iter()
        .map(|v| memory.add_vendor(&v.name, &v.site_url, v.platform))
        .collect();
    println!("[dry-run] syncing {} vendor(s) into memory", vendors.len());

    let store: Arc<dyn SyncStore> = memory.clone();
    let coordinator = build_coordinator(store, config);
    let results = sync_vendors(&coordinator, &vendors).await;

    for vendor in &vendors {
        for record in memory.records(vendor.id) {
            println!(
                "[dry-run] {}: {} {} {}",
                vendor.slug,
                record.external_id,
                record.fields.price,
                record.fields.name
            );
        }
    }
    report(&results)
}
