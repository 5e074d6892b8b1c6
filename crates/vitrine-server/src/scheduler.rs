//! Background job scheduler.
//!
//! Registers the recurring catalog sync when `VITRINE_SYNC_CRON` is set.

use std::sync::Arc;

use sqlx::PgPool;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};
use vitrine_sync::SyncCoordinator;

/// Builds and starts the background job scheduler.
///
/// The returned handle must be kept alive for the lifetime of the process;
/// dropping it shuts down all jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised, the
/// cron expression is invalid, or the scheduler fails to start.
pub async fn build_scheduler(
    pool: PgPool,
    coordinator: Arc<SyncCoordinator>,
    sync_cron: Option<&str>,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    match sync_cron {
        Some(schedule) => {
            register_sync_job(&scheduler, schedule, pool, coordinator).await?;
            tracing::info!(schedule, "scheduler: recurring catalog sync registered");
        }
        None => tracing::info!("scheduler: VITRINE_SYNC_CRON not set; no recurring sync"),
    }

    scheduler.start().await?;
    Ok(scheduler)
}

async fn register_sync_job(
    scheduler: &JobScheduler,
    schedule: &str,
    pool: PgPool,
    coordinator: Arc<SyncCoordinator>,
) -> Result<(), JobSchedulerError> {
    let pool = Arc::new(pool);

    let job = Job::new_async(schedule, move |_uuid, _lock| {
        let pool = Arc::clone(&pool);
        let coordinator = Arc::clone(&coordinator);

        Box::pin(async move {
            tracing::info!("scheduler: starting catalog sync");
            run_sync_job(&pool, &coordinator).await;
            tracing::info!("scheduler: catalog sync complete");
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}

/// Syncs every active vendor. Vendors still running from a previous tick
/// are skipped by the coordinator; stale runs are failed first.
async fn run_sync_job(pool: &PgPool, coordinator: &SyncCoordinator) {
    if let Err(e) = coordinator.recover_stale_runs().await {
        tracing::warn!(error = %e, "scheduler: stale sync run recovery failed");
    }
    let vendors = match vitrine_db::list_active_vendors(pool).await {
        Ok(v) => v,
        Err(e) => {
            tracing::error!(error = %e, "scheduler: failed to load active vendors");
            return;
        }
    };

    if vendors.is_empty() {
        tracing::info!("scheduler: no active vendors; skipping");
        return;
    }

    let ids: Vec<i64> = vendors.iter().map(|v| v.id).collect();
    let mut succeeded = 0usize;
    for (vendor_id, result) in coordinator.sync_many(&ids).await {
        match result {
            Ok(summary) if summary.success => succeeded += 1,
            Ok(summary) => tracing::warn!(
                vendor_id,
                message = summary.message.as_deref().unwrap_or(""),
                "scheduler: vendor sync failed"
            ),
            Err(e) => tracing::warn!(vendor_id, error = %e, "scheduler: vendor sync not run"),
        }
    }
    tracing::info!(
        vendors = ids.len(),
        succeeded,
        "scheduler: catalog sync results"
    );
}
