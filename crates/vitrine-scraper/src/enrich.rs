//! Secondary pass that visits product detail pages to fill gaps left by
//! listing extraction.

use std::time::Duration;

use rust_decimal::Decimal;
use tokio_util::sync::CancellationToken;
use vitrine_core::{derive_variants, ExtractedProduct, ProductVariant, SiteProfile};

use crate::browser::PageSession;
use crate::error::ScraperError;
use crate::extract::{extract_products, ExtractOptions};
use crate::snapshot::{capture_page, CaptureOptions};

#[derive(Debug, Clone)]
pub struct EnrichOptions {
    /// Detail pages visited per run at most.
    pub max_enrichment: usize,
    /// Navigation timeout for detail pages.
    pub timeout: Duration,
    /// Descriptions shorter than this (in chars) count as missing.
    pub min_description_len: usize,
}

impl Default for EnrichOptions {
    fn default() -> Self {
        Self {
            max_enrichment: 5,
            timeout: Duration::from_secs(15),
            min_description_len: 80,
        }
    }
}

fn needs_enrichment(product: &ExtractedProduct, options: &EnrichOptions) -> bool {
    if product.product_url.is_none() {
        return false;
    }
    let thin_description = product
        .description
        .as_deref()
        .is_none_or(|d| d.trim().chars().count() < options.min_description_len);
    thin_description || product.sizes.is_empty()
}

/// Visits the detail page of up to `max_enrichment` qualifying products, in
/// order, and merges what the page adds.
///
/// A product qualifies when it has a `product_url` and either a short or
/// missing description or no sizes. Per-product failures are logged and
/// leave the product untouched. Cancellation is checked before each visit.
///
/// Returns the number of products that received detail data.
pub async fn enrich_products(
    session: &mut dyn PageSession,
    products: &mut [ExtractedProduct],
    profile: &SiteProfile,
    extract: &ExtractOptions,
    options: &EnrichOptions,
    vendor: &str,
    cancel: &CancellationToken,
) -> usize {
    let detail_options = extract.single_product();
    let capture = CaptureOptions::detail(options.timeout);
    let mut enriched = 0usize;

    for product in products
        .iter_mut()
        .filter(|p| needs_enrichment(p, options))
        .take(options.max_enrichment)
    {
        if cancel.is_cancelled() {
            tracing::info!(vendor, "enrichment cancelled");
            break;
        }
        let Some(url) = product.product_url.clone() else {
            continue;
        };

        match fetch_detail(session, &url, profile, &detail_options, &capture).await {
            Ok(Some(detail)) => {
                merge_detail(product, detail);
                enriched += 1;
            }
            Ok(None) => {
                tracing::debug!(vendor, external_id = %product.external_id, url, "detail page had no product");
            }
            Err(e) => {
                tracing::warn!(
                    vendor,
                    external_id = %product.external_id,
                    reason = %e,
                    "enrichment failed, keeping listing data"
                );
            }
        }
    }

    if enriched > 0 {
        tracing::info!(vendor, enriched, "enriched products from detail pages");
    }
    enriched
}

async fn fetch_detail(
    session: &mut dyn PageSession,
    url: &str,
    profile: &SiteProfile,
    options: &ExtractOptions,
    capture: &CaptureOptions,
) -> Result<Option<ExtractedProduct>, ScraperError> {
    let snapshot = capture_page(session, url, capture)
        .await
        .map_err(|e| ScraperError::Enrichment {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
    let mut products = extract_products(&snapshot, profile, options)?;
    Ok((!products.is_empty()).then(|| products.swap_remove(0)))
}

fn fill<T>(target: &mut Option<T>, source: Option<T>) {
    if target.is_none() {
        *target = source;
    }
}

fn fill_text(target: &mut Option<String>, source: Option<String>) {
    if target.as_deref().is_none_or(|t| t.trim().is_empty()) && source.is_some() {
        *target = source;
    }
}

fn fill_vec<T>(target: &mut Vec<T>, source: Vec<T>) {
    if target.is_empty() {
        *target = source;
    }
}

/// Merges a detail-page product into its listing counterpart.
///
/// A detail value is used only where the listing value is absent or empty;
/// populated listing fields are never replaced. Identity (`external_id`,
/// `name`, `price`) always stays with the listing. Variants are re-derived
/// when the listing had none or when the merge filled an option axis.
pub fn merge_detail(listing: &mut ExtractedProduct, detail: ExtractedProduct) {
    let had_variants = !listing.variants.is_empty();
    let axes_before = (listing.colors.len(), listing.sizes.len());
    let detail_price = detail.price;

    fill_text(&mut listing.currency, detail.currency);
    fill_text(&mut listing.description, detail.description);
    fill_text(&mut listing.image_url, detail.image_url);
    fill_vec(&mut listing.image_urls, detail.image_urls);
    fill_text(&mut listing.product_url, detail.product_url);
    fill_text(&mut listing.sku, detail.sku);
    fill_text(&mut listing.brand, detail.brand);
    fill_text(&mut listing.category, detail.category);
    fill_vec(&mut listing.colors, detail.colors);
    fill_vec(&mut listing.sizes, detail.sizes);
    fill(&mut listing.available, detail.available);
    fill_text(&mut listing.weight, detail.weight);
    fill_text(&mut listing.dimensions, detail.dimensions);
    if listing.attributes.is_empty() {
        listing.attributes = detail.attributes;
    }

    let axes_filled = axes_before != (listing.colors.len(), listing.sizes.len());
    if had_variants && !axes_filled {
        return;
    }

    // Listing variants come first so their SKUs and prices win. Entries that
    // only echo a page's base price carry no information and are dropped.
    let listing_price = listing.price;
    let listing_known: Vec<ProductVariant> = std::mem::take(&mut listing.variants)
        .into_iter()
        .flat_map(|v| spread_over_axes(v, &listing.colors, &listing.sizes))
        .map(|v| without_echoed_price(v, listing_price))
        .filter(|v| v.price.is_some() || v.sku.is_some() || v.image_url.is_some())
        .collect();
    let known: Vec<ProductVariant> = listing_known
        .into_iter()
        .chain(
            detail
                .variants
                .into_iter()
                .map(|v| without_echoed_price(v, detail_price)),
        )
        .collect();
    listing.variants = derive_variants(
        &listing.external_id,
        &listing.colors,
        &listing.sizes,
        listing.price,
        &known,
    );
}

fn without_echoed_price(mut variant: ProductVariant, base_price: Decimal) -> ProductVariant {
    if variant.price == Some(base_price) {
        variant.price = None;
    }
    variant
}

/// Copies a single-axis variant onto every value of the axis it lacks.
fn spread_over_axes(
    variant: ProductVariant,
    colors: &[String],
    sizes: &[String],
) -> Vec<ProductVariant> {
    match (&variant.color, &variant.size) {
        (Some(_), None) if !sizes.is_empty() => sizes
            .iter()
            .map(|s| ProductVariant {
                size: Some(s.clone()),
                ..variant.clone()
            })
            .collect(),
        (None, Some(_)) if !colors.is_empty() => colors
            .iter()
            .map(|c| ProductVariant {
                color: Some(c.clone()),
                ..variant.clone()
            })
            .collect(),
        _ => vec![variant],
    }
}

#[cfg(test)]
#[path = "enrich_test.rs"]
mod tests;
