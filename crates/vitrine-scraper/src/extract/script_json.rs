//! Tier B: products described in `ld+json` and `application/json` scripts.

use std::sync::LazyLock;

use scraper::Selector;
use serde_json::Value;
use vitrine_core::ExtractedProduct;

use super::json_product::{from_schema, from_state, is_schema_product, is_state_product};
use super::PageContext;
use crate::json_walk::find_objects;

static LD_JSON: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("script[type=\"application/ld+json\"]").expect("valid ld+json selector")
});
static APP_JSON: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("script[type=\"application/json\"]").expect("valid json script selector")
});

/// Parses every script block independently; malformed blocks are skipped.
pub(crate) fn extract(ctx: &PageContext<'_>) -> Vec<ExtractedProduct> {
    let mut products = Vec::new();

    for script in ctx.document.select(&LD_JSON) {
        let Some(value) = parse_block(&script.text().collect::<String>(), "ld+json") else {
            continue;
        };
        for map in find_objects(&value, ctx.options.walk, is_schema_product) {
            products.extend(from_schema(map, ctx));
        }
    }

    for script in ctx.document.select(&APP_JSON) {
        let Some(value) = parse_block(&script.text().collect::<String>(), "application/json") else {
            continue;
        };
        let found = find_objects(&value, ctx.options.walk, |map| {
            is_schema_product(map) || is_state_product(map)
        });
        for map in found {
            let product = if is_schema_product(map) {
                from_schema(map, ctx)
            } else {
                from_state(map, ctx)
            };
            products.extend(product);
        }
    }

    products
}

fn parse_block(raw: &str, kind: &str) -> Option<Value> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!(kind, error = %e, "skipping malformed script block");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::with_test_context;

    #[test]
    fn graph_containers_and_malformed_blocks() {
        let html = r#"<html><head>
            <script type="application/ld+json">{ not json </script>
            <script type="application/ld+json">{"@context": "https://schema.org", "@graph": [
                {"@type": "BreadcrumbList", "itemListElement": []},
                {"@type": "Product", "name": "Bougie Figue", "sku": "BF-1",
                 "offers": {"price": "24.00"}}
            ]}</script>
        </head></html>"#;
        let products = with_test_context("https://a.fr/", html, extract);
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].external_id, "BF-1");
    }

    #[test]
    fn item_list_yields_each_product() {
        let html = r#"<script type="application/ld+json">{"@type": "ItemList", "itemListElement": [
            {"@type": "ListItem", "position": 1, "item": {"@type": "Product", "name": "A", "offers": {"price": 5}}},
            {"@type": "ListItem", "position": 2, "item": {"@type": "Product", "name": "B", "offers": {"price": 6}}}
        ]}</script>"#;
        let names: Vec<String> = with_test_context("https://a.fr/", html, extract)
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[test]
    fn application_json_state_objects() {
        let html = r#"<script id="__NEXT_DATA__" type="application/json">
            {"props": {"pageProps": {"products": [{"id": "x1", "title": "Plaid", "price": 65}]}}}
        </script>"#;
        let products = with_test_context("https://a.fr/", html, extract);
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].external_id, "x1");
    }
}
