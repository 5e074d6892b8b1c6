//! Shopify: theme product JSON and `ShopifyAnalytics.meta.product`.
//!
//! Prices in both sources are integer cents.

use std::sync::LazyLock;

use rust_decimal::Decimal;
use scraper::Selector;
use serde_json::{Map, Value};
use vitrine_core::{ExtractedProduct, Platform, ProductVariant};

use super::json_product::image_values;
use super::{assign_external_id, json_string, strip_html, PageContext, PlatformStrategy};
use crate::fields::{self, axis_of, compile, Axis};

const META_GLOBALS: &[&str] = &["ShopifyAnalytics.meta.product", "meta.product"];

static PRODUCT_JSON: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    compile(&[
        "script[data-product-json]",
        "script[id^=\"ProductJson\"]",
        "script[type=\"application/json\"][data-product]",
        "product-info script[type=\"application/json\"]",
    ])
});
static CONTAINERS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    compile(&[
        ".card-wrapper",
        ".product-card",
        ".grid-product",
        ".product-grid-item",
        ".grid__item .card",
    ])
});

pub(crate) struct ShopifyStrategy;

impl PlatformStrategy for ShopifyStrategy {
    fn platform(&self) -> Platform {
        Platform::Shopify
    }

    fn global_expressions(&self) -> &'static [&'static str] {
        META_GLOBALS
    }

    fn is_single_product_page(&self, ctx: &PageContext<'_>) -> bool {
        ctx.snapshot.url.contains("/products/")
            || META_GLOBALS.iter().any(|p| ctx.global(p).is_some_and(Value::is_object))
    }

    fn structured_data(&self, ctx: &PageContext<'_>) -> Vec<ExtractedProduct> {
        let from_scripts: Vec<ExtractedProduct> = PRODUCT_JSON
            .iter()
            .flat_map(|s| ctx.document.select(s))
            .filter_map(|script| {
                let raw = script.text().collect::<String>();
                match serde_json::from_str::<Value>(raw.trim()) {
                    Ok(value) => Some(value),
                    Err(e) => {
                        tracing::debug!(error = %e, "skipping malformed Shopify product JSON");
                        None
                    }
                }
            })
            .filter_map(|value| {
                // Some themes wrap the product: `{"product": {...}}`.
                let product = value.get("product").cloned().unwrap_or(value);
                product.as_object().and_then(|map| from_product_json(map, ctx))
            })
            .collect();
        if !from_scripts.is_empty() {
            return dedup_by_id(from_scripts);
        }

        META_GLOBALS
            .iter()
            .find_map(|expression| ctx.global(expression).and_then(Value::as_object))
            .and_then(|meta| from_analytics_meta(meta, ctx))
            .into_iter()
            .collect()
    }

    fn container_selectors(&self) -> &'static [Selector] {
        &CONTAINERS
    }
}

/// Themes often embed the same product JSON twice.
fn dedup_by_id(products: Vec<ExtractedProduct>) -> Vec<ExtractedProduct> {
    let mut seen: Vec<String> = Vec::new();
    products
        .into_iter()
        .filter(|p| {
            if seen.contains(&p.external_id) {
                false
            } else {
                seen.push(p.external_id.clone());
                true
            }
        })
        .collect()
}

/// Integer cents, or a decimal string such as `"49.00"`.
fn shopify_price(value: Option<&Value>) -> Option<Decimal> {
    let price = match value? {
        Value::Number(n) => n
            .as_i64()
            .map(|cents| Decimal::new(cents, 2))
            .or_else(|| n.as_f64().and_then(|f| Decimal::try_from(f / 100.0).ok())),
        Value::String(s) if s.chars().all(|c| c.is_ascii_digit()) => {
            s.parse::<i64>().ok().map(|cents| Decimal::new(cents, 2))
        }
        Value::String(s) => fields::parse_price(s),
        _ => None,
    };
    price.filter(|p| *p > Decimal::ZERO)
}

/// Option names in position order: strings or `{ name, values }` objects.
fn option_names(map: &Map<String, Value>) -> Vec<String> {
    map.get("options")
        .and_then(Value::as_array)
        .map(|options| {
            options
                .iter()
                .map(|o| match o {
                    Value::Object(obj) => json_string(obj.get("name")).unwrap_or_default(),
                    other => json_string(Some(other)).unwrap_or_default(),
                })
                .collect()
        })
        .unwrap_or_default()
}

fn from_product_json(map: &Map<String, Value>, ctx: &PageContext<'_>) -> Option<ExtractedProduct> {
    let name = json_string(map.get("title"))
        .or_else(|| json_string(map.get("name")))
        .and_then(|n| fields::clean_name(&n))?;
    let variants = map
        .get("variants")
        .and_then(Value::as_array)
        .map(|v| v.iter().filter_map(Value::as_object).collect::<Vec<_>>())
        .unwrap_or_default();

    let price = shopify_price(map.get("price"))
        .or_else(|| shopify_price(map.get("price_min")))
        .or_else(|| variants.iter().filter_map(|v| shopify_price(v.get("price"))).min())
        .unwrap_or(Decimal::ZERO);

    let mut product = ExtractedProduct::new(String::new(), name, price);
    product.description = json_string(map.get("description")).and_then(|d| strip_html(&d));
    product.brand = json_string(map.get("vendor"));
    product.category = json_string(map.get("type"));
    product.available = map.get("available").and_then(Value::as_bool);
    product.product_url = json_string(map.get("url"))
        .or_else(|| json_string(map.get("handle")).map(|h| format!("/products/{h}")))
        .and_then(|u| ctx.resolve_link(&u));
    for image in image_values(map.get("images"), ctx)
        .into_iter()
        .chain(image_values(map.get("featured_image"), ctx))
    {
        product.add_image(&image);
    }
    if let Some(sku) = variants
        .first()
        .and_then(|v| json_string(v.get("sku")))
        .and_then(|s| fields::clean_sku(&s))
    {
        product.sku = Some(sku);
    }

    let axes: Vec<Option<Axis>> = option_names(map).iter().map(|n| axis_of(n)).collect();
    for variant in &variants {
        let mut color = None;
        let mut size = None;
        for (idx, axis) in axes.iter().enumerate() {
            let value = json_string(variant.get(&format!("option{}", idx + 1)));
            match (axis, value) {
                (Some(Axis::Color), Some(v)) => color = Some(v),
                (Some(Axis::Size), Some(v)) => size = Some(v),
                _ => {}
            }
        }
        if let Some(c) = &color {
            product.add_color(c);
        }
        if let Some(s) = &size {
            product.add_size(s);
        }
        let image_url = variant
            .get("featured_image")
            .and_then(|img| image_values(Some(img), ctx).into_iter().next());
        product.variants.push(ProductVariant {
            id: json_string(variant.get("id")).unwrap_or_default(),
            color,
            size,
            price: shopify_price(variant.get("price")),
            image_url,
            sku: json_string(variant.get("sku")).and_then(|s| fields::clean_sku(&s)),
        });
    }

    let platform_id = json_string(map.get("id"));
    assign_external_id(&mut product, platform_id.as_deref(), None);
    Some(product)
}

/// `ShopifyAnalytics.meta.product` carries ids and variant prices but no
/// title, so the name comes from the variant label or the page heading.
fn from_analytics_meta(meta: &Map<String, Value>, ctx: &PageContext<'_>) -> Option<ExtractedProduct> {
    let variants = meta
        .get("variants")
        .and_then(Value::as_array)
        .map(|v| v.iter().filter_map(Value::as_object).collect::<Vec<_>>())
        .unwrap_or_default();

    let name = variants
        .first()
        .and_then(|v| json_string(v.get("name")))
        .map(|n| n.split(" - ").next().unwrap_or_default().to_string())
        .and_then(|n| fields::clean_name(&n))
        .or_else(|| fields::extract_name(ctx.root()))?;
    let price = variants
        .iter()
        .filter_map(|v| shopify_price(v.get("price")))
        .min()
        .or_else(|| fields::extract_price(ctx.root()))
        .unwrap_or(Decimal::ZERO);

    let mut product = ExtractedProduct::new(String::new(), name, price);
    product.brand = json_string(meta.get("vendor"));
    product.category = json_string(meta.get("type"));
    product.sku = variants
        .first()
        .and_then(|v| json_string(v.get("sku")))
        .and_then(|s| fields::clean_sku(&s));
    product.product_url = Some(ctx.snapshot.url.clone());
    product.description = fields::extract_description(ctx.root());
    for image in fields::extract_images(ctx.root(), &ctx.base) {
        product.add_image(&image);
    }
    for color in fields::extract_colors(ctx.root()) {
        product.add_color(&color);
    }
    for size in fields::extract_sizes(ctx.root()) {
        product.add_size(&size);
    }

    let platform_id = json_string(meta.get("id"));
    assign_external_id(&mut product, platform_id.as_deref(), None);
    Some(product)
}

#[cfg(test)]
#[path = "shopify_test.rs"]
mod tests;
