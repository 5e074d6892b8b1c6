mod api;
mod middleware;
mod scheduler;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;
use vitrine_scraper::browser::HttpBrowser;
use vitrine_sync::{PipelineConfig, SyncCoordinator, SyncStore};

use crate::api::{build_app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(vitrine_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = vitrine_db::PoolConfig::from_app_config(&config);
    let pool = vitrine_db::connect_pool(&config.database_url, pool_config).await?;
    vitrine_db::run_migrations(&pool).await?;

    let store: Arc<dyn SyncStore> = Arc::new(vitrine_db::PgStore::new(pool.clone()));
    let coordinator = Arc::new(SyncCoordinator::new(
        store,
        Arc::new(HttpBrowser::new()),
        PipelineConfig::from_app_config(&config),
        config.max_concurrent_vendors,
    ));
    // Runs orphaned by a previous crash would otherwise block their vendors.
    if let Err(e) = coordinator.recover_stale_runs().await {
        tracing::warn!(error = %e, "stale sync run recovery failed");
    }

    let _scheduler = scheduler::build_scheduler(
        pool.clone(),
        Arc::clone(&coordinator),
        config.sync_cron.as_deref(),
    )
    .await?;

    let app = build_app(AppState {
        pool,
        coordinator: Arc::clone(&coordinator),
    });

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, env = %config.env, "vitrine-server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(coordinator))
        .await?;
    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM and cancels in-flight sync runs so they
/// are recorded as failed before the process exits.
async fn shutdown_signal(coordinator: Arc<SyncCoordinator>) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
    coordinator.shutdown();
}
