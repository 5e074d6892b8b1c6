//! Storefront platform detection.
//!
//! Classification is deterministic and side-effect free: URL heuristics
//! first, then in-page signatures checked in [`Platform::SIGNATURE_ORDER`],
//! then the generic fallback.

use reqwest::Url;
use vitrine_core::{Platform, SiteProfile};

use crate::snapshot::PageSnapshot;

const MYSHOPIFY_CONFIDENCE: f32 = 0.95;
const URL_PATH_CONFIDENCE: f32 = 0.7;
const GLOBAL_CONFIDENCE: f32 = 0.9;
const MARKER_BASE: f32 = 0.5;
const MARKER_STEP: f32 = 0.1;
const MARKER_CAP: f32 = 0.85;

/// Globals the classifier reads from a snapshot.
pub(crate) const CLASSIFIER_GLOBALS: &[&str] = &[
    "Shopify",
    "wc_add_to_cart_params",
    "woocommerce_params",
    "Magento",
    "require",
    "prestashop",
];

struct Signature {
    platform: Platform,
    globals: &'static [&'static str],
    markers: &'static [&'static str],
}

const SIGNATURES: [Signature; 4] = [
    Signature {
        platform: Platform::Shopify,
        globals: &["Shopify"],
        markers: &[
            "cdn.shopify.com",
            "shopify-section",
            "shopify.theme",
            "shopify-payment-button",
            "myshopify.com",
        ],
    },
    Signature {
        platform: Platform::WooCommerce,
        globals: &["wc_add_to_cart_params", "woocommerce_params"],
        markers: &[
            "wp-content/plugins/woocommerce",
            "woocommerce-loop-product",
            "wc-block-",
            "add_to_cart_button",
        ],
    },
    Signature {
        platform: Platform::Magento,
        globals: &["Magento"],
        markers: &[
            "text/x-magento-init",
            "data-mage-init",
            "mage/cookies",
            "magento_",
        ],
    },
    Signature {
        platform: Platform::PrestaShop,
        globals: &["prestashop"],
        markers: &[
            "var prestashop =",
            "/modules/ps_",
            "prestashop",
            "id_product",
        ],
    },
];

/// Classifies a storefront from its URL alone.
///
/// Returns `None` when the URL carries no platform pattern.
#[must_use]
pub fn classify_url(url: &str) -> Option<SiteProfile> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str().unwrap_or_default().to_ascii_lowercase();
    let path = parsed.path().to_ascii_lowercase();
    let query = parsed.query().unwrap_or_default().to_ascii_lowercase();

    if host.ends_with(".myshopify.com") {
        return Some(SiteProfile::new(Platform::Shopify, MYSHOPIFY_CONFIDENCE));
    }
    let platform = if path.contains("/collections/") || path.contains("/products/") {
        Platform::Shopify
    } else if path.contains("/catalog/product/view/") || path.contains("/catalogsearch/") {
        // Checked before WooCommerce: Magento paths also contain `/product/`.
        Platform::Magento
    } else if path.contains("/product-category/")
        || path.contains("/product/")
        || query.contains("post_type=product")
    {
        Platform::WooCommerce
    } else if query.contains("id_product=") || query.contains("controller=product") {
        Platform::PrestaShop
    } else {
        return None;
    };
    Some(SiteProfile::new(platform, URL_PATH_CONFIDENCE))
}

/// Classifies a loaded page. The caller must have confirmed the page loaded.
#[must_use]
pub fn classify(snapshot: &PageSnapshot) -> SiteProfile {
    if let Some(profile) = classify_url(&snapshot.url) {
        return profile;
    }

    let html = snapshot.html.to_ascii_lowercase();
    let matches: Vec<SiteProfile> = SIGNATURES
        .iter()
        .filter_map(|signature| signature_confidence(signature, snapshot, &html))
        .collect();

    match matches.as_slice() {
        [] => SiteProfile::generic(),
        [only] => *only,
        [first, rest @ ..] => {
            let others: Vec<&str> = rest.iter().map(|p| p.platform.as_str()).collect();
            tracing::warn!(
                url = %snapshot.url,
                chosen = %first.platform,
                also_matched = ?others,
                "classification ambiguous, using first platform in signature order"
            );
            *first
        }
    }
}

fn signature_confidence(
    signature: &Signature,
    snapshot: &PageSnapshot,
    lowered_html: &str,
) -> Option<SiteProfile> {
    let has_global = signature
        .globals
        .iter()
        .any(|expression| snapshot.global(expression).is_some())
        || (signature.platform == Platform::Magento
            && snapshot.global("require").is_some()
            && lowered_html.contains("x-magento-init"));
    if has_global {
        return Some(SiteProfile::new(signature.platform, GLOBAL_CONFIDENCE));
    }

    let hits = signature
        .markers
        .iter()
        .filter(|marker| lowered_html.contains(*marker))
        .count();
    if hits == 0 {
        return None;
    }
    #[allow(clippy::cast_precision_loss)]
    let confidence = (MARKER_BASE + MARKER_STEP * hits as f32).min(MARKER_CAP);
    Some(SiteProfile::new(signature.platform, confidence))
}

#[cfg(test)]
#[path = "classify_test.rs"]
mod tests;
