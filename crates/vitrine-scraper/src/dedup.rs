//! Batch deduplication of extracted products.

use std::collections::HashSet;

use rust_decimal::Decimal;
use vitrine_core::ExtractedProduct;

use crate::fields::canonical_url;

#[derive(Debug, PartialEq, Eq, Hash)]
enum DedupKey {
    Url(String),
    NamePrice(String, Decimal),
}

fn dedup_key(product: &ExtractedProduct) -> DedupKey {
    match product.product_url.as_deref().filter(|u| !u.trim().is_empty()) {
        Some(url) => DedupKey::Url(canonical_url(url)),
        None => DedupKey::NamePrice(product.name.trim().to_lowercase(), product.price.normalize()),
    }
}

/// Drops duplicates, keeping the first occurrence of each product.
///
/// Products are keyed by canonical product URL, or by `(name, price)` when
/// they have no URL. A second pass drops any later product whose
/// `external_id` was already taken, so ids are unique in the returned batch.
#[must_use]
pub fn dedup_products(products: Vec<ExtractedProduct>) -> Vec<ExtractedProduct> {
    let before = products.len();
    let mut seen_keys = HashSet::new();
    let mut seen_ids: HashSet<String> = HashSet::new();

    let kept: Vec<ExtractedProduct> = products
        .into_iter()
        .filter(|p| seen_keys.insert(dedup_key(p)))
        .filter(|p| {
            let fresh = seen_ids.insert(p.external_id.clone());
            if !fresh {
                tracing::warn!(
                    external_id = %p.external_id,
                    name = %p.name,
                    "dropping product with duplicate external id"
                );
            }
            fresh
        })
        .collect();

    if kept.len() < before {
        tracing::debug!(before, after = kept.len(), "deduplicated products");
    }
    kept
}
