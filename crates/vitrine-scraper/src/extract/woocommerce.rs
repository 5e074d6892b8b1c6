//! WooCommerce: variable-product forms carrying `data-product_variations`.

use std::sync::LazyLock;

use rust_decimal::Decimal;
use scraper::{ElementRef, Selector};
use serde_json::{Map, Value};
use vitrine_core::{ExtractedProduct, Platform, ProductVariant};

use super::json_product::image_values;
use super::{assign_external_id, json_decimal, json_string, PageContext, PlatformStrategy};
use crate::fields::{self, attr, axis_of, compile, element_text, Axis};

static VARIATIONS_FORM: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("form.variations_form[data-product_variations]")
        .expect("valid variations form selector")
});
static SINGLE_MARKERS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    compile(&[
        "body.single-product",
        "form.cart .single_add_to_cart_button",
        "form.variations_form",
        "div.product.type-product .product_title",
    ])
});
static CONTAINERS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    compile(&[
        "ul.products li.product",
        ".products .product",
        ".wc-block-grid__product",
        ".wc-block-product",
    ])
});
static SELECT_OPTIONS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("select option").expect("valid option selector"));

pub(crate) struct WooCommerceStrategy;

impl PlatformStrategy for WooCommerceStrategy {
    fn platform(&self) -> Platform {
        Platform::WooCommerce
    }

    fn is_single_product_page(&self, ctx: &PageContext<'_>) -> bool {
        SINGLE_MARKERS
            .iter()
            .any(|s| ctx.document.select(s).next().is_some())
    }

    fn structured_data(&self, ctx: &PageContext<'_>) -> Vec<ExtractedProduct> {
        ctx.document
            .select(&VARIATIONS_FORM)
            .filter_map(|form| from_variations_form(form, ctx))
            .take(1)
            .collect()
    }

    fn container_selectors(&self) -> &'static [Selector] {
        &CONTAINERS
    }
}

fn from_variations_form(form: ElementRef<'_>, ctx: &PageContext<'_>) -> Option<ExtractedProduct> {
    let raw = attr(form, "data-product_variations")?;
    // Large catalogs publish `false` and load variations over AJAX.
    let variations: Vec<Value> = match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(items)) => items,
        Ok(_) => return None,
        Err(e) => {
            tracing::debug!(error = %e, "malformed data-product_variations");
            return None;
        }
    };

    let root = ctx.root();
    let name = fields::extract_name(root)?;
    let price = variations
        .iter()
        .filter_map(|v| json_decimal(v.get("display_price")))
        .min()
        .or_else(|| fields::extract_price(root))
        .unwrap_or(Decimal::ZERO);

    let mut product = ExtractedProduct::new(String::new(), name, price);
    product.product_url = attr(form, "action")
        .and_then(|a| ctx.resolve_link(a))
        .or_else(|| Some(ctx.snapshot.url.clone()));
    product.description = fields::extract_description(root);
    product.sku = fields::extract_sku(root);
    product.brand = fields::extract_brand(root);
    product.category = fields::extract_category(root, Some(&product.name));
    let table = fields::extract_attributes(root);
    product.weight = table.weight;
    product.dimensions = table.dimensions;
    product.attributes = table.attributes;
    for image in fields::extract_images(root, &ctx.base) {
        product.add_image(&image);
    }

    let mut any_in_stock = false;
    for variation in variations.iter().filter_map(Value::as_object) {
        let (color, size) = variation_axes(variation, form);
        if let Some(c) = &color {
            product.add_color(c);
        }
        if let Some(s) = &size {
            product.add_size(s);
        }
        any_in_stock |= variation.get("is_in_stock").and_then(Value::as_bool).unwrap_or(false);
        product.variants.push(ProductVariant {
            id: json_string(variation.get("variation_id")).unwrap_or_default(),
            color,
            size,
            price: json_decimal(variation.get("display_price")),
            image_url: image_values(variation.get("image"), ctx).into_iter().next(),
            sku: json_string(variation.get("sku")).and_then(|s| fields::clean_sku(&s)),
        });
    }
    product.available = Some(any_in_stock).filter(|_| !variations.is_empty());

    let platform_id = attr(form, "data-product_id").map(str::to_string);
    assign_external_id(&mut product, platform_id.as_deref(), None);
    Some(product)
}

/// Maps `attribute_pa_couleur: "rouge"` to display labels using the form's
/// `<select>` options when available.
fn variation_axes(variation: &Map<String, Value>, form: ElementRef<'_>) -> (Option<String>, Option<String>) {
    let mut color = None;
    let mut size = None;
    let Some(Value::Object(attributes)) = variation.get("attributes") else {
        return (color, size);
    };
    for (key, value) in attributes {
        let Some(slug) = json_string(Some(value)) else {
            continue;
        };
        let label = option_label(form, key, &slug).unwrap_or(slug);
        match axis_of(key) {
            Some(Axis::Color) => color = Some(label),
            Some(Axis::Size) => size = Some(label),
            None => {}
        }
    }
    (color, size)
}

fn option_label(form: ElementRef<'_>, select_name: &str, slug: &str) -> Option<String> {
    form.select(&SELECT_OPTIONS)
        .filter(|option| {
            option
                .parent()
                .and_then(ElementRef::wrap)
                .and_then(|select| select.value().attr("name"))
                == Some(select_name)
        })
        .find(|option| option.value().attr("value") == Some(slug))
        .map(element_text)
        .filter(|text| !text.is_empty())
}
