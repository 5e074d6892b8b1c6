mod db;
mod extract;
mod runs;
mod sync;
mod vendors;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use vitrine_core::Platform;
use vitrine_scraper::PageMode;

use crate::db::DbCommands;
use crate::vendors::VendorsCommands;

#[derive(Debug, Parser)]
#[command(name = "vitrine-cli")]
#[command(about = "Storefront catalog extraction and sync")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Manage configured vendors
    Vendors {
        #[command(subcommand)]
        command: VendorsCommands,
    },
    /// Synchronize vendor catalogs
    Sync {
        /// Vendor to synchronize (by slug)
        #[arg(long, conflicts_with = "all")]
        vendor: Option<String>,
        /// Synchronize every active vendor
        #[arg(long)]
        all: bool,
        /// Run against the vendors file and an in-memory catalog; nothing is persisted
        #[arg(long)]
        dry_run: bool,
    },
    /// Extract products from a single URL and print them as JSON
    Extract {
        url: String,
        /// Visit detail pages to fill missing descriptions and sizes
        #[arg(long)]
        enrich: bool,
        /// Skip classification and use this platform
        #[arg(long)]
        platform: Option<Platform>,
        /// Page mode: auto, single, or listing
        #[arg(long, default_value = "auto")]
        mode: PageMode,
    },
    /// Detect the storefront platform of a URL
    Classify { url: String },
    /// Show recent sync runs
    Runs {
        /// Maximum number of runs to show
        #[arg(long, default_value = "20")]
        limit: i64,
        /// Filter by vendor slug
        #[arg(long)]
        vendor: Option<String>,
    },
}

fn init_tracing(fallback: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn connect(config: &vitrine_core::AppConfig) -> anyhow::Result<sqlx::PgPool> {
    let pool = vitrine_db::connect_pool(
        &config.database_url,
        vitrine_db::PoolConfig::from_app_config(config),
    )
    .await?;
    Ok(pool)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("vitrine-cli: no command given, see --help");
        return Ok(());
    };

    // Extraction commands work without a database; everything else needs
    // the full configuration.
    match command {
        Commands::Extract {
            url,
            enrich,
            platform,
            mode,
        } => {
            let config = optional_config();
            extract::run_extract(config.as_ref(), &url, enrich, platform, mode).await
        }
        Commands::Classify { url } => {
            let config = optional_config();
            extract::run_classify(config.as_ref(), &url).await
        }
        Commands::Db { command } => {
            let config = required_config()?;
            let pool = connect(&config).await?;
            db::run_db(&pool, command).await
        }
        Commands::Vendors { command } => {
            let config = required_config()?;
            let pool = connect(&config).await?;
            vendors::run_vendors(&pool, &config, command).await
        }
        Commands::Sync {
            vendor,
            all,
            dry_run,
        } => {
            let config = required_config()?;
            if dry_run {
                return sync::run_sync_dry(&config, vendor.as_deref()).await;
            }
            let pool = connect(&config).await?;
            sync::run_sync(&pool, &config, vendor.as_deref(), all).await
        }
        Commands::Runs { limit, vendor } => {
            let config = required_config()?;
            let pool = connect(&config).await?;
            runs::run_list_runs(&pool, limit, vendor.as_deref()).await
        }
    }
}

fn optional_config() -> Option<vitrine_core::AppConfig> {
    let config = vitrine_core::load_app_config_from_env().ok();
    init_tracing(config.as_ref().map_or("info", |c| c.log_level.as_str()));
    config
}

fn required_config() -> anyhow::Result<vitrine_core::AppConfig> {
    let config = vitrine_core::load_app_config_from_env()?;
    init_tracing(&config.log_level);
    Ok(config)
}
