//! Single-product versus listing detection for pages without platform markers.

use std::sync::LazyLock;

use scraper::{Html, Selector};

use crate::fields::compile;

/// Signal weights for the page-kind score. A page scoring at or above
/// `threshold` is treated as a single product page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageKindWeights {
    pub add_to_cart: i32,
    pub single_h1: i32,
    pub variant_selector: i32,
    pub gallery: i32,
    pub product_url: i32,
    /// Applied when at least `many_cards_min` product cards are present.
    pub many_cards: i32,
    pub many_cards_min: usize,
    pub threshold: i32,
}

impl Default for PageKindWeights {
    fn default() -> Self {
        Self {
            add_to_cart: 3,
            single_h1: 2,
            variant_selector: 2,
            gallery: 2,
            product_url: 1,
            many_cards: -3,
            many_cards_min: 4,
            threshold: 5,
        }
    }
}

static ADD_TO_CART: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    compile(&[
        "form[action*=\"/cart/add\"]",
        "button[name=\"add\"]",
        "[name=\"add-to-cart\"]",
        ".single_add_to_cart_button",
        "#product-addtocart-button",
        "button.add-to-cart",
        "[data-button-action=\"add-to-cart\"]",
        "[data-add-to-cart]",
    ])
});
static VARIANT_SELECTOR: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    compile(&[
        "variant-selects",
        "variant-radios",
        "select[name^=\"attribute_\"]",
        ".swatch-attribute",
        ".product-variants",
        "table.variations",
        "select[name^=\"options[\"]",
        "select[name*=\"group[\"]",
    ])
});
static GALLERY: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    compile(&[
        ".product-gallery",
        ".woocommerce-product-gallery",
        ".product__media-list",
        ".product-images",
        ".product-cover",
        "[data-gallery-role=\"gallery\"]",
        ".fotorama",
    ])
});
static CARDS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    compile(&[
        ".product-card",
        ".card-wrapper",
        "li.product",
        ".product-item",
        ".product-miniature",
        ".product-tile",
        "[itemtype*=\"schema.org/Product\"]",
    ])
});
static H1: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1").expect("valid h1 selector"));

const PRODUCT_URL_MARKERS: &[&str] = &[
    "/product/",
    "/products/",
    "/p/",
    "/catalog/product/view",
    "id_product=",
    "controller=product",
];

fn any_match(document: &Html, selectors: &[Selector]) -> bool {
    selectors.iter().any(|s| document.select(s).next().is_some())
}

/// Scores `document` with `weights`. Higher means more product-page-like.
#[must_use]
pub fn score(document: &Html, url: &str, weights: &PageKindWeights) -> i32 {
    let mut total = 0;
    if any_match(document, &ADD_TO_CART) {
        total += weights.add_to_cart;
    }
    if document.select(&H1).count() == 1 {
        total += weights.single_h1;
    }
    if any_match(document, &VARIANT_SELECTOR) {
        total += weights.variant_selector;
    }
    if any_match(document, &GALLERY) {
        total += weights.gallery;
    }
    let lower_url = url.to_ascii_lowercase();
    if PRODUCT_URL_MARKERS.iter().any(|m| lower_url.contains(m)) {
        total += weights.product_url;
    }
    let cards = CARDS
        .iter()
        .map(|s| document.select(s).count())
        .max()
        .unwrap_or(0);
    if cards >= weights.many_cards_min {
        total += weights.many_cards;
    }
    total
}

#[must_use]
pub fn is_single_product(document: &Html, url: &str, weights: &PageKindWeights) -> bool {
    score(document, url, weights) >= weights.threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRODUCT_PAGE: &str = r#"<html><body>
        <h1>Théière fonte</h1>
        <div class="product-gallery"><img src="/a.jpg"></div>
        <form action="/cart/add"><button name="add">Ajouter</button></form>
    </body></html>"#;

    #[test]
    fn product_page_reaches_threshold() {
        let doc = Html::parse_document(PRODUCT_PAGE);
        let weights = PageKindWeights::default();
        assert_eq!(score(&doc, "https://a.fr/theiere", &weights), 7);
        assert!(is_single_product(&doc, "https://a.fr/theiere", &weights));
    }

    #[test]
    fn listing_with_many_cards_is_penalised() {
        let cards: String = (0..6)
            .map(|i| format!(r#"<div class="product-card"><h3>P{i}</h3><button class="add-to-cart">+</button></div>"#))
            .collect();
        let doc = Html::parse_document(&format!("<html><body><h1>Boutique</h1>{cards}</body></html>"));
        let weights = PageKindWeights::default();
        assert_eq!(score(&doc, "https://a.fr/boutique", &weights), 2);
        assert!(!is_single_product(&doc, "https://a.fr/boutique", &weights));
    }

    #[test]
    fn threshold_is_configurable() {
        let doc = Html::parse_document(PRODUCT_PAGE);
        let strict = PageKindWeights {
            threshold: 8,
            ..PageKindWeights::default()
        };
        assert!(!is_single_product(&doc, "https://a.fr/theiere", &strict));
    }
}
