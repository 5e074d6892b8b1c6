//! Magento 2: configurable-product `jsonConfig` / `spConfig` in
//! `text/x-magento-init` blocks.

use std::sync::LazyLock;

use rust_decimal::Decimal;
use scraper::Selector;
use serde_json::{Map, Value};
use vitrine_core::{ExtractedProduct, Platform, ProductVariant};

use super::{assign_external_id, json_decimal, json_string, PageContext, PlatformStrategy};
use crate::fields::{self, axis_of, compile, Axis};
use crate::json_walk::find_key;

static MAGENTO_INIT: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("script[type=\"text/x-magento-init\"]").expect("valid magento init selector")
});
static SINGLE_MARKERS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    compile(&[
        "body.catalog-product-view",
        "#product_addtocart_form",
        "#product-addtocart-button",
    ])
});
static CONTAINERS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    compile(&[
        "li.product-item",
        ".products-grid .product-item",
        ".product-item-info",
    ])
});

pub(crate) struct MagentoStrategy;

impl PlatformStrategy for MagentoStrategy {
    fn platform(&self) -> Platform {
        Platform::Magento
    }

    fn is_single_product_page(&self, ctx: &PageContext<'_>) -> bool {
        SINGLE_MARKERS
            .iter()
            .any(|s| ctx.document.select(s).next().is_some())
    }

    fn structured_data(&self, ctx: &PageContext<'_>) -> Vec<ExtractedProduct> {
        for script in ctx.document.select(&MAGENTO_INIT) {
            let raw = script.text().collect::<String>();
            let value = match serde_json::from_str::<Value>(raw.trim()) {
                Ok(value) => value,
                Err(e) => {
                    tracing::debug!(error = %e, "skipping malformed x-magento-init block");
                    continue;
                }
            };
            let config = find_key(&value, "jsonConfig", ctx.options.walk)
                .or_else(|| find_key(&value, "spConfig", ctx.options.walk))
                .and_then(Value::as_object);
            if let Some(product) = config.and_then(|c| from_json_config(c, ctx)) {
                return vec![product];
            }
        }
        Vec::new()
    }

    fn container_selectors(&self) -> &'static [Selector] {
        &CONTAINERS
    }
}

struct AxisOption {
    axis: Axis,
    label: String,
    products: Vec<String>,
}

fn from_json_config(config: &Map<String, Value>, ctx: &PageContext<'_>) -> Option<ExtractedProduct> {
    let root = ctx.root();
    let name = fields::extract_name(root)?;

    let options = axis_options(config);
    let child_ids: Vec<String> = {
        let mut ids: Vec<String> = Vec::new();
        for option in &options {
            for id in &option.products {
                if !ids.contains(id) {
                    ids.push(id.clone());
                }
            }
        }
        ids
    };

    let child_price = |id: &str| {
        config
            .get("optionPrices")
            .and_then(|p| p.get(id))
            .and_then(|p| p.get("finalPrice"))
            .and_then(|p| json_decimal(p.get("amount")))
    };
    let price = config
        .get("prices")
        .and_then(|p| p.get("finalPrice"))
        .and_then(|p| json_decimal(p.get("amount")))
        .or_else(|| child_ids.iter().filter_map(|id| child_price(id)).min())
        .or_else(|| fields::extract_price(root))
        .unwrap_or(Decimal::ZERO);

    let mut product = ExtractedProduct::new(String::new(), name, price);
    product.product_url = Some(ctx.snapshot.url.clone());
    product.description = fields::extract_description(root);
    product.sku = fields::extract_sku(root);
    product.brand = fields::extract_brand(root);
    product.category = fields::extract_category(root, Some(&product.name));
    product.available = fields::extract_availability(root);
    let table = fields::extract_attributes(root);
    product.weight = table.weight;
    product.dimensions = table.dimensions;
    product.attributes = table.attributes;
    for image in fields::extract_images(root, &ctx.base) {
        product.add_image(&image);
    }

    for option in &options {
        match option.axis {
            Axis::Color => product.add_color(&option.label),
            Axis::Size => product.add_size(&option.label),
        }
    }

    for child in &child_ids {
        let label_for = |axis: Axis| {
            options
                .iter()
                .find(|o| o.axis == axis && o.products.contains(child))
                .map(|o| o.label.clone())
        };
        let image_url = config
            .get("images")
            .and_then(|i| i.get(child.as_str()))
            .and_then(Value::as_array)
            .and_then(|imgs| {
                imgs.iter()
                    .find(|img| img.get("isMain").and_then(Value::as_bool).unwrap_or(false))
                    .or_else(|| imgs.first())
            })
            .and_then(|img| json_string(img.get("full")).or_else(|| json_string(img.get("img"))))
            .and_then(|u| ctx.resolve_image(&u));
        product.variants.push(ProductVariant {
            id: child.clone(),
            color: label_for(Axis::Color),
            size: label_for(Axis::Size),
            price: child_price(child),
            image_url,
            sku: None,
        });
    }

    let platform_id = json_string(config.get("productId"));
    assign_external_id(&mut product, platform_id.as_deref(), None);
    Some(product)
}

/// Options of every color/size attribute, in attribute then option order.
fn axis_options(config: &Map<String, Value>) -> Vec<AxisOption> {
    let Some(Value::Object(attributes)) = config.get("attributes") else {
        return Vec::new();
    };
    let mut ordered: Vec<&Map<String, Value>> = attributes.values().filter_map(Value::as_object).collect();
    ordered.sort_by_key(|a| a.get("position").and_then(json_position).unwrap_or(i64::MAX));

    let mut out = Vec::new();
    for attribute in ordered {
        let axis = json_string(attribute.get("code"))
            .and_then(|c| axis_of(&c))
            .or_else(|| json_string(attribute.get("label")).and_then(|l| axis_of(&l)));
        let Some(axis) = axis else {
            continue;
        };
        for option in attribute
            .get("options")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
        {
            let Some(label) = json_string(option.get("label")) else {
                continue;
            };
            let products = option
                .get("products")
                .and_then(Value::as_array)
                .map(|ids| ids.iter().filter_map(|id| json_string(Some(id))).collect())
                .unwrap_or_default();
            out.push(AxisOption { axis, label, products });
        }
    }
    out
}

fn json_position(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| value.as_str().and_then(|s| s.parse().ok()))
}

#[cfg(test)]
mod tests {
    use vitrine_core::SiteProfile;

    use super::*;
    use crate::extract::{extract_products, ExtractOptions};
    use crate::snapshot::PageSnapshot;

    const PAGE: &str = r#"<html><body class="catalog-product-view">
      <h1 class="page-title"><span class="base">Veste Fjell</span></h1>
      <div class="product attribute sku"><div class="value">VF-01</div></div>
      <script type="text/x-magento-init">
      {"[data-role=swatch-options]": {"Magento_Swatches/js/swatch-renderer": {"jsonConfig": {
        "productId": "1501",
        "attributes": {
          "93": {"id": "93", "code": "color", "label": "Color", "position": "0", "options": [
            {"id": "50", "label": "Noir", "products": ["1502", "1503"]},
            {"id": "51", "label": "Olive", "products": ["1504"]}]},
          "144": {"id": "144", "code": "size", "label": "Size", "position": "1", "options": [
            {"id": "166", "label": "M", "products": ["1502", "1504"]},
            {"id": "167", "label": "L", "products": ["1503"]}]}
        },
        "prices": {"finalPrice": {"amount": 189}},
        "optionPrices": {"1502": {"finalPrice": {"amount": 189}}, "1503": {"finalPrice": {"amount": 199}},
                         "1504": {"finalPrice": {"amount": 179}}},
        "images": {"1504": [{"full": "/media/veste-olive.jpg", "isMain": true}]}
      }}}}
      </script></body></html>"#;

    #[test]
    fn json_config_maps_children_to_axes() {
        let snapshot = PageSnapshot::from_html("https://nordvik.example/veste-fjell.html", PAGE);
        let profile = SiteProfile::new(Platform::Magento, 0.9);
        let products = extract_products(&snapshot, &profile, &ExtractOptions::default()).unwrap();

        assert_eq!(products.len(), 1);
        let veste = &products[0];
        assert_eq!(veste.external_id, "1501");
        assert_eq!(veste.name, "Veste Fjell");
        assert_eq!(veste.sku.as_deref(), Some("VF-01"));
        assert_eq!(veste.colors, vec!["Noir", "Olive"]);
        assert_eq!(veste.sizes, vec!["M", "L"]);
        // Cross product of the axes; prices come from matching children.
        assert_eq!(veste.variants.len(), 4);
        let olive_m = veste
            .variants
            .iter()
            .find(|v| v.color.as_deref() == Some("Olive") && v.size.as_deref() == Some("M"))
            .unwrap();
        assert_eq!(olive_m.price, Some(Decimal::from(179)));
        assert_eq!(olive_m.image_url.as_deref(), Some("https://nordvik.example/media/veste-olive.jpg"));
    }
}
