//! Single-URL commands. Nothing here touches the database.

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use vitrine_core::{AppConfig, ExtractedProduct, Platform, SiteProfile};
use vitrine_scraper::browser::HttpBrowser;
use vitrine_scraper::{
    capture_page, classify, BrowserProvider, CaptureOptions, PageMode, PageSession, QualityReport,
};
use vitrine_sync::{collect_products, PipelineConfig, ScoredProduct};

#[derive(Debug, Serialize)]
pub(crate) struct ExtractReport {
    pub url: String,
    pub profile: SiteProfile,
    pub enriched: usize,
    pub products: Vec<ReportedProduct>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ReportedProduct {
    #[serde(flatten)]
    pub product: ExtractedProduct,
    pub quality: QualityReport,
}

impl From<ScoredProduct> for ReportedProduct {
    fn from(scored: ScoredProduct) -> Self {
        Self {
            product: scored.product,
            quality: scored.report,
        }
    }
}

fn pipeline_config(config: Option<&AppConfig>) -> PipelineConfig {
    config.map_or_else(PipelineConfig::default, PipelineConfig::from_app_config)
}

async fn close_session(session: &mut dyn PageSession, url: &str) {
    if let Err(e) = session.close().await {
        tracing::warn!(url, error = %e, "failed to close session");
    }
}

/// Extract, deduplicate, optionally enrich, and score the products on `url`,
/// then print them as JSON.
///
/// # Errors
///
/// Returns an error if the session cannot be opened or the page cannot be
/// loaded.
pub(crate) async fn run_extract(
    config: Option<&AppConfig>,
    url: &str,
    enrich: bool,
    platform: Option<Platform>,
    mode: PageMode,
) -> anyhow::Result<()> {
    let mut pipeline = pipeline_config(config);
    pipeline.extract.mode = mode;

    let mut session = HttpBrowser::new().open(&pipeline.session).await?;
    let cancel = CancellationToken::new();
    let collected = collect_products(
        session.as_mut(),
        url,
        platform,
        &pipeline,
        enrich,
        url,
        &cancel,
    )
    .await;
    close_session(session.as_mut(), url).await;
    let collected = collected?;

    let report = ExtractReport {
        url: url.to_string(),
        profile: collected.profile,
        enriched: collected.enriched,
        products: collected
            .products
            .into_iter()
            .map(|p| ScoredProduct::score(p).into())
            .collect(),
    };
    tracing::info!(url, products = report.products.len(), "extraction finished");
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Load `url` and print the detected platform.
///
/// # Errors
///
/// Returns an error if the session cannot be opened or the page cannot be
/// loaded.
pub(crate) async fn run_classify(config: Option<&AppConfig>, url: &str) -> anyhow::Result<()> {
    let pipeline = pipeline_config(config);
    let mut session = HttpBrowser::new().open(&pipeline.session).await?;
    let capture = CaptureOptions::listing(pipeline.session.navigation_timeout);
    let snapshot = capture_page(session.as_mut(), url, &capture).await;
    close_session(session.as_mut(), url).await;

    let profile = classify(&snapshot?);
    println!("{}", serde_json::to_string_pretty(&profile)?);
    Ok(())
}
