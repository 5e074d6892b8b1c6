//! Vendor registry commands.

use chrono::{DateTime, Utc};
use clap::Subcommand;
use vitrine_core::Vendor;

#[derive(Debug, Subcommand)]
pub enum VendorsCommands {
    /// Load the vendors file into the database
    Seed,
    /// List vendors known to the database
    List {
        /// Include inactive vendors
        #[arg(long)]
        all: bool,
    },
}

pub(crate) async fn run_vendors(
    pool: &sqlx::PgPool,
    config: &vitrine_core::AppConfig,
    command: VendorsCommands,
) -> anyhow::Result<()> {
    match command {
        VendorsCommands::Seed => run_seed(pool, config).await,
        VendorsCommands::List { all } => run_list(pool, all).await,
    }
}

async fn run_seed(pool: &sqlx::PgPool, config: &vitrine_core::AppConfig) -> anyhow::Result<()> {
    let file = vitrine_core::load_vendors(&config.vendors_path)?;
    let seeded = vitrine_db::seed_vendors(pool, &file.vendors).await?;
    tracing::info!(
        path = %config.vendors_path.display(),
        seeded,
        "vendors seeded"
    );
    println!("seeded {seeded} vendor(s)");
    Ok(())
}

async fn run_list(pool: &sqlx::PgPool, include_inactive: bool) -> anyhow::Result<()> {
    let vendors = if include_inactive {
        vitrine_db::list_vendors(pool).await?
    } else {
        vitrine_db::list_active_vendors(pool).await?
    };

    if vendors.is_empty() {
        println!("no vendors found; run `vitrine-cli vendors seed` first");
        return Ok(());
    }

    println!(
        "{:<24} {:<12} {:<8} {:<17} URL",
        "SLUG", "PLATFORM", "ACTIVE", "LAST SYNCED"
    );
    for vendor in &vendors {
        println!("{}", format_vendor_row(vendor));
    }
    Ok(())
}

pub(crate) fn fmt_timestamp(at: Option<DateTime<Utc>>) -> String {
    at.map_or_else(|| "never".to_string(), |t| t.format("%Y-%m-%d %H:%M").to_string())
}

pub(crate) fn format_vendor_row(vendor: &Vendor) -> String {
    let platform = vendor
        .platform_hint
        .map_or("auto", vitrine_core::Platform::as_str);
    format!(
        "{:<24} {:<12} {:<8} {:<17} {}",
        vendor.slug,
        platform,
        if vendor.is_active { "yes" } else { "no" },
        fmt_timestamp(vendor.last_synced_at),
        vendor.site_url
    )
}
