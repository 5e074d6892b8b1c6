//! Tier C: DOM heuristics over product containers.

use std::sync::LazyLock;

use scraper::{ElementRef, Selector};
use vitrine_core::ExtractedProduct;

use super::{assign_external_id, PageContext};
use crate::fields::{self, attr, compile, element_text, first_matching};

static GENERIC_CONTAINERS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    compile(&[
        "[itemtype*=\"schema.org/Product\"]",
        ".product-card",
        ".product-item",
        ".product-tile",
        ".product-miniature",
        "li.product",
        "article.product",
        ".product",
        "[data-product-id]",
    ])
});
static PRODUCT_LINK: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    compile(&[
        "a[itemprop=\"url\"]",
        "a.product-item-link",
        "a.woocommerce-LoopProduct-link",
        "a.full-unstyled-link",
        ".product-title a",
        ".product-name a",
        "h2 a",
        "h3 a",
        "a[href]",
    ])
});
static CANONICAL: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    compile(&["link[rel=\"canonical\"]", "meta[property=\"og:url\"]"])
});
static OG_IMAGE: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    compile(&["meta[property=\"og:image\"]", "meta[name=\"twitter:image\"]"])
});
static MAIN_PRODUCT: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    compile(&[
        "[itemtype*=\"schema.org/Product\"]",
        "form.cart",
        "form[action*=\"/cart/add\"]",
        "#product_addtocart_form",
        "#add-to-cart-or-refresh",
        ".product-single",
        "#product",
    ])
});
static PRICE_TEXT: LazyLock<Vec<Selector>> =
    LazyLock::new(|| compile(&["[itemprop=\"priceCurrency\"]", "[class*=\"price\"]"]));

/// Extracts products from listing containers, or the whole document as one
/// product in single-product mode.
pub(crate) fn extract(ctx: &PageContext<'_>, platform_containers: &[Selector]) -> Vec<ExtractedProduct> {
    if ctx.single {
        return single_product(ctx).into_iter().collect();
    }

    let root = ctx.root();
    let containers = {
        let from_platform = first_matching(root, platform_containers);
        if from_platform.is_empty() {
            first_matching(root, &GENERIC_CONTAINERS)
        } else {
            from_platform
        }
    };
    let page_category = fields::extract_category(root, None);

    containers
        .into_iter()
        .take(ctx.options.max_dom_candidates)
        .filter_map(|container| {
            let mut product = from_container(container, ctx)?;
            if product.category.is_none() {
                product.category.clone_from(&page_category);
            }
            Some(product)
        })
        .collect()
}

fn from_container(container: ElementRef<'_>, ctx: &PageContext<'_>) -> Option<ExtractedProduct> {
    let name = fields::extract_name(container)?;
    let price = fields::extract_price(container)?;

    let mut product = ExtractedProduct::new(String::new(), name, price);
    product.currency = currency_in(container);
    product.product_url = PRODUCT_LINK
        .iter()
        .flat_map(|s| container.select(s))
        .chain(std::iter::once(container).filter(|c| c.value().name() == "a"))
        .find_map(|a| attr(a, "href").and_then(|href| ctx.resolve_link(href)));
    for image in fields::extract_images(container, &ctx.base) {
        product.add_image(&image);
    }
    product.sku = fields::extract_sku(container);
    product.brand = fields::extract_brand(container);
    product.category = fields::extract_category(container, Some(&product.name));
    product.available = fields::extract_availability(container);
    for color in fields::extract_colors(container) {
        product.add_color(&color);
    }
    for size in fields::extract_sizes(container) {
        product.add_size(&size);
    }

    let attribute_id = fields::id_from_attributes(container);
    assign_external_id(&mut product, None, attribute_id.as_deref());
    Some(product)
}

fn single_product(ctx: &PageContext<'_>) -> Option<ExtractedProduct> {
    let root = ctx.root();
    let name = fields::extract_name(root)?;
    let price = fields::extract_price(root)?;

    let mut product = ExtractedProduct::new(String::new(), name, price);
    product.currency = currency_in(root);
    product.product_url = CANONICAL
        .iter()
        .flat_map(|s| root.select(s))
        .find_map(|el| attr(el, "href").or_else(|| attr(el, "content")))
        .and_then(|u| ctx.resolve_link(u))
        .or_else(|| Some(ctx.snapshot.url.clone()));

    let og_images = OG_IMAGE
        .iter()
        .flat_map(|s| root.select(s))
        .filter_map(|el| attr(el, "content").and_then(|u| ctx.resolve_image(u)));
    for image in og_images.chain(fields::extract_images(root, &ctx.base)) {
        product.add_image(&image);
    }

    product.description = fields::extract_description(root);
    product.sku = fields::extract_sku(root);
    product.brand = fields::extract_brand(root);
    product.category = fields::extract_category(root, Some(&product.name));
    product.available = fields::extract_availability(root);
    let table = fields::extract_attributes(root);
    product.weight = table.weight;
    product.dimensions = table.dimensions;
    product.attributes = table.attributes;
    for color in fields::extract_colors(root) {
        product.add_color(&color);
    }
    for size in fields::extract_sizes(root) {
        product.add_size(&size);
    }

    let attribute_id = MAIN_PRODUCT
        .iter()
        .flat_map(|s| root.select(s))
        .find_map(fields::id_from_attributes);
    assign_external_id(&mut product, None, attribute_id.as_deref());
    Some(product)
}

fn currency_in(scope: ElementRef<'_>) -> Option<String> {
    PRICE_TEXT
        .iter()
        .flat_map(|s| scope.select(s))
        .find_map(|el| {
            attr(el, "content")
                .and_then(fields::detect_currency)
                .or_else(|| fields::detect_currency(&element_text(el)))
        })
}
