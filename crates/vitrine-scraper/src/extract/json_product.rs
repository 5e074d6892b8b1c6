//! Product objects embedded as JSON: schema.org `Product` / `ProductGroup`
//! and loosely shaped front-end state objects.

use rust_decimal::Decimal;
use serde_json::{Map, Value};
use vitrine_core::{ExtractedProduct, ProductVariant};

use super::{assign_external_id, json_decimal, json_string, strip_html, PageContext};
use crate::fields::{self, taxonomy::availability_from_text};

type Object = Map<String, Value>;

const STATE_PRICE_KEYS: &[&str] = &[
    "price",
    "salePrice",
    "sale_price",
    "finalPrice",
    "final_price",
    "currentPrice",
    "priceValue",
];
const STATE_CENTS_KEYS: &[&str] = &["price_cents", "priceCents", "priceInCents"];
const STATE_ID_KEYS: &[&str] = &["id", "productId", "product_id", "itemId", "uuid"];
const STATE_IMAGE_KEYS: &[&str] = &[
    "image",
    "images",
    "imageUrl",
    "image_url",
    "thumbnail",
    "featuredImage",
    "featured_image",
    "media",
];

// ---------------------------------------------------------------------------
// schema.org
// ---------------------------------------------------------------------------

fn type_names(map: &Object) -> Vec<&str> {
    match map.get("@type") {
        Some(Value::String(t)) => vec![t.as_str()],
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    }
}

fn has_type(map: &Object, wanted: &str) -> bool {
    type_names(map).iter().any(|t| {
        t.rsplit(['/', ':', '#'])
            .next()
            .is_some_and(|last| last.eq_ignore_ascii_case(wanted))
    })
}

/// `@type` of `Product`, `IndividualProduct` or `ProductGroup`.
pub(crate) fn is_schema_product(map: &Object) -> bool {
    has_type(map, "Product") || has_type(map, "IndividualProduct") || has_type(map, "ProductGroup")
}

/// Builds a product from a schema.org `Product` or `ProductGroup`.
pub(crate) fn from_schema(map: &Object, ctx: &PageContext<'_>) -> Option<ExtractedProduct> {
    let name = json_string(map.get("name")).and_then(|n| fields::clean_name(&n))?;

    let variants: Vec<&Object> = map.get("hasVariant").map(as_objects).unwrap_or_default();
    let offers = map.get("offers").map(as_objects).unwrap_or_default();
    let variant_offers: Vec<&Object> = variants
        .iter()
        .filter_map(|v| v.get("offers"))
        .flat_map(as_objects)
        .collect();

    let price = offers
        .iter()
        .filter_map(|o| offer_price(o))
        .min()
        .or_else(|| variant_offers.iter().filter_map(|o| offer_price(o)).min())
        .unwrap_or(Decimal::ZERO);

    let mut product = ExtractedProduct::new(String::new(), name, price);
    product.currency = offers
        .iter()
        .chain(&variant_offers)
        .find_map(|o| json_string(o.get("priceCurrency")))
        .map(|c| c.to_ascii_uppercase());
    product.description = json_string(map.get("description")).and_then(|d| strip_html(&d));
    product.product_url = json_string(map.get("url")).and_then(|u| ctx.resolve_link(&u));
    product.sku = json_string(map.get("sku")).and_then(|s| fields::clean_sku(&s));
    product.brand = name_of(map.get("brand"));
    product.category = json_string(map.get("category"))
        .and_then(|c| fields::clean_breadcrumb(&c, Some(&product.name)));
    product.available = offers
        .iter()
        .find_map(|o| json_string(o.get("availability")))
        .and_then(|a| availability_from_text(&a));
    product.weight = quantity(map.get("weight"));
    product.dimensions = dimensions(map);
    for image in image_values(map.get("image"), ctx) {
        product.add_image(&image);
    }
    for prop in map.get("additionalProperty").map(as_objects).unwrap_or_default() {
        if let (Some(k), Some(v)) = (json_string(prop.get("name")), json_string(prop.get("value"))) {
            product.attributes.entry(k).or_insert(v);
        }
    }
    if let Some(color) = json_string(map.get("color")) {
        product.add_color(&color);
    }
    if let Some(size) = name_of(map.get("size")) {
        product.add_size(&size);
    }

    for variant in &variants {
        let color = json_string(variant.get("color"));
        let size = name_of(variant.get("size"));
        if let Some(c) = &color {
            product.add_color(c);
        }
        if let Some(s) = &size {
            product.add_size(s);
        }
        let sku = json_string(variant.get("sku")).and_then(|s| fields::clean_sku(&s));
        product.variants.push(ProductVariant {
            id: sku.clone().unwrap_or_default(),
            color,
            size,
            price: variant
                .get("offers")
                .map(as_objects)
                .unwrap_or_default()
                .iter()
                .filter_map(|o| offer_price(o))
                .min(),
            image_url: image_values(variant.get("image"), ctx).into_iter().next(),
            sku,
        });
    }
    if product.available.is_none() {
        let states: Vec<bool> = variant_offers
            .iter()
            .filter_map(|o| json_string(o.get("availability")))
            .filter_map(|a| availability_from_text(&a))
            .collect();
        if !states.is_empty() {
            product.available = Some(states.contains(&true));
        }
    }

    let platform_id = json_string(map.get("productGroupID")).or_else(|| json_string(map.get("productID")));
    assign_external_id(&mut product, platform_id.as_deref(), None);
    Some(product)
}

fn offer_price(offer: &Object) -> Option<Decimal> {
    json_decimal(offer.get("price"))
        .or_else(|| json_decimal(offer.get("lowPrice")))
        .or_else(|| {
            offer
                .get("priceSpecification")
                .map(as_objects)
                .unwrap_or_default()
                .iter()
                .find_map(|spec| json_decimal(spec.get("price")))
        })
}

fn quantity(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Object(q) => {
            let amount = json_string(q.get("value"))?;
            let unit = json_string(q.get("unitText")).or_else(|| json_string(q.get("unitCode")));
            Some(match unit {
                Some(unit) => format!("{amount} {unit}"),
                None => amount,
            })
        }
        other => json_string(Some(other)),
    }
}

fn dimensions(map: &Object) -> Option<String> {
    let parts: Vec<String> = ["width", "height", "depth"]
        .iter()
        .filter_map(|k| quantity(map.get(*k)))
        .collect();
    (!parts.is_empty()).then(|| parts.join(" x "))
}

// ---------------------------------------------------------------------------
// Front-end state objects
// ---------------------------------------------------------------------------

/// A named object carrying a price: `{ name|title, price|salePrice|... }`.
pub(crate) fn is_state_product(map: &Object) -> bool {
    let named = ["name", "title"]
        .iter()
        .any(|k| map.get(*k).is_some_and(Value::is_string));
    let priced = STATE_PRICE_KEYS
        .iter()
        .chain(STATE_CENTS_KEYS)
        .chain(&["prices", "pricing", "offers"])
        .any(|k| map.contains_key(*k));
    named && priced
}

pub(crate) fn from_state(map: &Object, ctx: &PageContext<'_>) -> Option<ExtractedProduct> {
    let raw_name = json_string(map.get("name")).or_else(|| json_string(map.get("title")))?;
    let name = fields::clean_name(&raw_name)?;
    let price = state_price(map).unwrap_or(Decimal::ZERO);

    let mut product = ExtractedProduct::new(String::new(), name, price);
    product.currency = ["currency", "currencyCode", "priceCurrency"]
        .iter()
        .find_map(|k| json_string(map.get(*k)))
        .map(|c| c.to_ascii_uppercase());
    product.description = ["description", "shortDescription", "short_description"]
        .iter()
        .find_map(|k| json_string(map.get(*k)))
        .and_then(|d| strip_html(&d));
    product.product_url = ["url", "href", "link", "permalink", "productUrl"]
        .iter()
        .find_map(|k| json_string(map.get(*k)))
        .and_then(|u| ctx.resolve_link(&u));
    product.sku = json_string(map.get("sku")).and_then(|s| fields::clean_sku(&s));
    product.brand = name_of(map.get("brand")).or_else(|| name_of(map.get("vendor")));
    product.category = name_of(map.get("category")).or_else(|| name_of(map.get("categoryName")));
    product.available = ["available", "inStock", "in_stock", "isAvailable"]
        .iter()
        .find_map(|k| map.get(*k).and_then(Value::as_bool));
    for key in STATE_IMAGE_KEYS {
        for image in image_values(map.get(*key), ctx) {
            product.add_image(&image);
        }
    }
    for color in string_list(map.get("colors")) {
        product.add_color(&color);
    }
    for size in string_list(map.get("sizes")) {
        product.add_size(&size);
    }

    let platform_id = STATE_ID_KEYS.iter().find_map(|k| json_string(map.get(*k)));
    assign_external_id(&mut product, platform_id.as_deref(), None);
    Some(product)
}

fn state_price(map: &Object) -> Option<Decimal> {
    for key in STATE_CENTS_KEYS {
        if let Some(cents) = map.get(*key).and_then(Value::as_i64).filter(|c| *c > 0) {
            return Some(Decimal::new(cents, 2));
        }
    }
    for key in STATE_PRICE_KEYS.iter().chain(&["prices", "pricing"]) {
        let found = match map.get(*key) {
            Some(Value::Object(inner)) => ["amount", "value", "current", "price", "final", "raw"]
                .iter()
                .find_map(|k| json_decimal(inner.get(*k))),
            other => json_decimal(other),
        };
        if found.is_some() {
            return found;
        }
    }
    map.get("offers")
        .map(as_objects)
        .unwrap_or_default()
        .iter()
        .find_map(|o| offer_price(o))
}

// ---------------------------------------------------------------------------
// Shared value shapes
// ---------------------------------------------------------------------------

/// A single object or an array of objects.
pub(crate) fn as_objects(value: &Value) -> Vec<&Object> {
    match value {
        Value::Object(map) => vec![map],
        Value::Array(items) => items.iter().filter_map(Value::as_object).collect(),
        _ => Vec::new(),
    }
}

/// A plain string or an object's `name`.
pub(crate) fn name_of(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Object(map) => json_string(map.get("name")),
        Value::Array(items) => items.iter().find_map(|v| name_of(Some(v))),
        other => json_string(Some(other)),
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| json_string(Some(v)).or_else(|| name_of(Some(v))))
            .collect(),
        Some(Value::String(s)) => s.split(',').map(str::trim).map(str::to_string).collect(),
        _ => Vec::new(),
    }
}

/// Image URLs from a string, an object (`url`, `src`, `contentUrl`), or an
/// array of either, resolved against the page.
pub(crate) fn image_values(value: Option<&Value>, ctx: &PageContext<'_>) -> Vec<String> {
    let Some(value) = value else {
        return Vec::new();
    };
    let raw: Vec<String> = match value {
        Value::String(s) => vec![s.clone()],
        Value::Object(map) => image_from_object(map).into_iter().collect(),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Object(map) => image_from_object(map),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };
    raw.iter().filter_map(|r| ctx.resolve_image(r)).collect()
}

fn image_from_object(map: &Object) -> Option<String> {
    ["url", "src", "contentUrl", "full", "large", "original"]
        .iter()
        .find_map(|k| match map.get(*k) {
            Some(Value::Object(nested)) => image_from_object(nested),
            other => json_string(other),
        })
}

#[cfg(test)]
#[path = "json_product_test.rs"]
mod tests;
