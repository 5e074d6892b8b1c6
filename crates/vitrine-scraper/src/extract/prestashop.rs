//! PrestaShop 1.7+: the product details JSON in a `data-product` attribute.

use std::sync::LazyLock;

use rust_decimal::Decimal;
use scraper::Selector;
use serde_json::{Map, Value};
use vitrine_core::{ExtractedProduct, Platform};

use super::json_product::image_values;
use super::{assign_external_id, json_decimal, json_string, strip_html, PageContext, PlatformStrategy};
use crate::fields::{self, attr, axis_of, compile, taxonomy::availability_from_text, Axis};

static DATA_PRODUCT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("[data-product]").expect("valid data-product selector"));
static SINGLE_MARKERS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    compile(&[
        "body#product",
        "#add-to-cart-or-refresh",
        "#product-details[data-product]",
    ])
});
static CONTAINERS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    compile(&[
        "article.product-miniature",
        ".product-miniature",
        ".ajax_block_product",
    ])
});

pub(crate) struct PrestaShopStrategy;

impl PlatformStrategy for PrestaShopStrategy {
    fn platform(&self) -> Platform {
        Platform::PrestaShop
    }

    fn is_single_product_page(&self, ctx: &PageContext<'_>) -> bool {
        SINGLE_MARKERS
            .iter()
            .any(|s| ctx.document.select(s).next().is_some())
    }

    fn structured_data(&self, ctx: &PageContext<'_>) -> Vec<ExtractedProduct> {
        ctx.document
            .select(&DATA_PRODUCT)
            .filter_map(|el| {
                let raw = attr(el, "data-product")?;
                match serde_json::from_str::<Value>(raw) {
                    Ok(Value::Object(map)) => from_product_details(&map, ctx),
                    Ok(_) => None,
                    Err(e) => {
                        tracing::debug!(error = %e, "malformed data-product attribute");
                        None
                    }
                }
            })
            .take(1)
            .collect()
    }

    fn container_selectors(&self) -> &'static [Selector] {
        &CONTAINERS
    }
}

fn from_product_details(map: &Map<String, Value>, ctx: &PageContext<'_>) -> Option<ExtractedProduct> {
    let root = ctx.root();
    let name = json_string(map.get("name"))
        .and_then(|n| fields::clean_name(&n))
        .or_else(|| fields::extract_name(root))?;
    let price = json_decimal(map.get("price_amount"))
        .or_else(|| json_decimal(map.get("price")))
        .or_else(|| fields::extract_price(root))
        .unwrap_or(Decimal::ZERO);

    let mut product = ExtractedProduct::new(String::new(), name, price);
    product.description = json_string(map.get("description_short"))
        .or_else(|| json_string(map.get("description")))
        .and_then(|d| strip_html(&d))
        .or_else(|| fields::extract_description(root));
    product.sku = json_string(map.get("reference")).and_then(|s| fields::clean_sku(&s));
    product.brand = json_string(map.get("manufacturer_name"));
    product.category = json_string(map.get("category_name"))
        .or_else(|| fields::extract_category(root, Some(&product.name)));
    product.product_url = json_string(map.get("link"))
        .or_else(|| json_string(map.get("url")))
        .and_then(|u| ctx.resolve_link(&u))
        .or_else(|| Some(ctx.snapshot.url.clone()));
    product.available = json_string(map.get("availability"))
        .and_then(|a| availability_from_text(&a))
        .or_else(|| map.get("quantity").and_then(Value::as_i64).map(|q| q > 0));
    product.weight = json_string(map.get("weight")).filter(|w| w.trim_start_matches(['0', '.']) != "");
    product.currency = fields::detect_currency(&json_string(map.get("price")).unwrap_or_default());

    let cover = map
        .get("cover")
        .and_then(|c| c.get("large").or_else(|| c.get("medium")))
        .map(|c| image_values(Some(c), ctx))
        .unwrap_or_default();
    let gallery: Vec<String> = map
        .get("images")
        .and_then(Value::as_array)
        .map(|imgs| {
            imgs.iter()
                .filter_map(|img| img.get("large").or_else(|| img.get("bySize")))
                .flat_map(|img| image_values(Some(img), ctx))
                .collect()
        })
        .unwrap_or_default();
    for image in cover.into_iter().chain(gallery) {
        product.add_image(&image);
    }

    if let Some(Value::Object(attributes)) = map.get("attributes") {
        for group in attributes.values().filter_map(Value::as_object) {
            let axis = json_string(group.get("group")).and_then(|g| axis_of(&g));
            let Some(value) = json_string(group.get("name")) else {
                continue;
            };
            match axis {
                Some(Axis::Color) => product.add_color(&value),
                Some(Axis::Size) => product.add_size(&value),
                None => {
                    if let Some(group_name) = json_string(group.get("group")) {
                        product.attributes.entry(group_name).or_insert(value);
                    }
                }
            }
        }
    }
    for color in fields::extract_colors(root) {
        product.add_color(&color);
    }
    for size in fields::extract_sizes(root) {
        product.add_size(&size);
    }

    let platform_id = json_string(map.get("id_product")).or_else(|| json_string(map.get("id")));
    assign_external_id(&mut product, platform_id.as_deref(), None);
    Some(product)
}

#[cfg(test)]
mod tests {
    use vitrine_core::SiteProfile;

    use super::*;
    use crate::extract::{extract_products, ExtractOptions};
    use crate::snapshot::PageSnapshot;

    #[test]
    fn data_product_attribute_is_tier_a() {
        let html = r#"<html><body id="product">
          <div id="product-details" data-product='{"id_product": "7", "name": "Doudou Lapin",
            "price_amount": 32.5, "price": "32,50 €", "reference": "DL-07", "category_name": "Jouets",
            "manufacturer_name": "Les Petits Pois", "link": "https://lespetitspois.example/jouets/7-doudou-lapin.html",
            "quantity": 3, "cover": {"large": {"url": "https://lespetitspois.example/12-large/doudou.jpg"}},
            "attributes": {"1": {"group": "Taille", "name": "Unique"}}}'></div>
          <div class="product-variants">
            <div class="product-variants-item"><span class="control-label">Couleur</span>
              <input type="radio" value="Gris" title="Gris"><input type="radio" value="Rose" title="Rose">
            </div>
          </div>
        </body></html>"#;
        let snapshot = PageSnapshot::from_html("https://lespetitspois.example/jouets/7-doudou-lapin.html", html);
        let profile = SiteProfile::new(Platform::PrestaShop, 0.9);
        let products = extract_products(&snapshot, &profile, &ExtractOptions::default()).unwrap();

        assert_eq!(products.len(), 1);
        let doudou = &products[0];
        assert_eq!(doudou.external_id, "7");
        assert_eq!(doudou.price, "32.5".parse::<Decimal>().unwrap());
        assert_eq!(doudou.currency.as_deref(), Some("EUR"));
        assert_eq!(doudou.sku.as_deref(), Some("DL-07"));
        assert_eq!(doudou.category.as_deref(), Some("Jouets"));
        assert_eq!(doudou.available, Some(true));
        assert_eq!(doudou.sizes, vec!["Unique"]);
        assert_eq!(doudou.colors, vec!["Gris", "Rose"]);
        assert_eq!(doudou.variants.len(), 2);
        assert_eq!(
            doudou.image_url.as_deref(),
            Some("https://lespetitspois.example/12-large/doudou.jpg")
        );
    }
}
