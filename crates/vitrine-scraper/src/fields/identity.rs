//! External id resolution and URL canonicalization.

use reqwest::Url;
use rust_decimal::Decimal;
use scraper::ElementRef;
use sha2::{Digest, Sha256};

use super::attr;

const ID_ATTRIBUTES: &[&str] = &[
    "data-product-id",
    "data-product_id",
    "data-id-product",
    "data-product-sku",
    "data-item-id",
    "data-pid",
];

/// Query parameters that never identify a product.
const TRACKING_PARAMS: &[&str] = &[
    "variant", "gclid", "fbclid", "srsltid", "_pos", "_sid", "_ss", "ref", "mc_cid", "mc_eid",
];

const HASH_LEN: usize = 16;

/// Picks the external id for a product.
///
/// Priority: platform id, then a `data-product-id`-style attribute, then the
/// SKU, then a hash of the canonical product URL, then a hash of
/// `name|price`. Hashes are the first 16 hex chars of SHA-256.
#[must_use]
pub fn resolve_external_id(
    platform_id: Option<&str>,
    attribute_id: Option<&str>,
    sku: Option<&str>,
    product_url: Option<&str>,
    name: &str,
    price: Decimal,
) -> String {
    let non_blank = |v: Option<&str>| v.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);

    non_blank(platform_id)
        .or_else(|| non_blank(attribute_id))
        .or_else(|| non_blank(sku))
        .or_else(|| non_blank(product_url).map(|url| short_hash(&canonical_url(&url))))
        .unwrap_or_else(|| short_hash(&format!("{}|{}", name.trim(), price.normalize())))
}

/// Reads a product id from the container or its first descendant carrying one.
#[must_use]
pub fn id_from_attributes(scope: ElementRef<'_>) -> Option<String> {
    std::iter::once(scope)
        .chain(scope.descendants().filter_map(ElementRef::wrap))
        .find_map(|el| ID_ATTRIBUTES.iter().find_map(|name| attr(el, name)))
        .map(str::to_string)
}

/// Canonical form of a product URL used for identity and deduplication.
///
/// Scheme and host are lowercased, the fragment and tracking parameters
/// (`utm_*`, `variant`, `gclid`, ...) are removed, and a trailing slash is
/// dropped. Unparseable input is trimmed and lowercased.
#[must_use]
pub fn canonical_url(raw: &str) -> String {
    let Ok(mut url) = Url::parse(raw.trim()) else {
        return raw.trim().trim_end_matches('/').to_lowercase();
    };
    url.set_fragment(None);

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| {
            let key = key.to_ascii_lowercase();
            !key.starts_with("utm_") && !TRACKING_PARAMS.contains(&key.as_str())
        })
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept);
    }

    let path = url.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        url.set_path(path.trim_end_matches('/'));
    }

    let mut canonical = url.to_string();
    if url.path() == "/" && url.query().is_none() {
        canonical = canonical.trim_end_matches('/').to_string();
    }
    canonical
}

fn short_hash(input: &str) -> String {
    let digest = format!("{:x}", Sha256::digest(input.as_bytes()));
    digest[..HASH_LEN].to_string()
}
