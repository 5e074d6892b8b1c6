//! Category, SKU, brand, description, specification tables and availability.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Selector};

use super::{attr, collapse_whitespace, compile, element_text, truncate_chars};

const MAX_DESCRIPTION_CHARS: usize = 5_000;
const MAX_SPEC_ROWS: usize = 50;

static BREADCRUMB_SELECTORS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    compile(&[
        "[itemtype*=\"BreadcrumbList\"]",
        "nav.breadcrumb",
        "nav.breadcrumbs",
        ".breadcrumb",
        ".breadcrumbs",
        ".woocommerce-breadcrumb",
        "[aria-label=\"breadcrumb\"]",
        "[aria-label=\"Breadcrumb\"]",
        "[aria-label=\"Fil d'Ariane\"]",
    ])
});
static CRUMB_ITEMS: LazyLock<Vec<Selector>> =
    LazyLock::new(|| compile(&["[itemprop=\"itemListElement\"]", "li", "a"]));
static CATEGORY_SELECTORS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    compile(&[
        "[itemprop=\"category\"]",
        ".posted_in a",
        ".product-category",
        "[data-product-category]",
    ])
});
static SKU_SELECTORS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    compile(&[
        "[itemprop=\"sku\"]",
        ".sku",
        ".product-sku",
        ".product-reference span",
        ".product-reference",
        "[data-sku]",
        ".product.attribute.sku .value",
    ])
});
static BRAND_SELECTORS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    compile(&[
        "[itemprop=\"brand\"] [itemprop=\"name\"]",
        "[itemprop=\"brand\"]",
        ".product-brand",
        ".product__vendor",
        ".product-vendor",
        ".brand",
        "[data-brand]",
    ])
});
static DESCRIPTION_SELECTORS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    compile(&[
        "[itemprop=\"description\"]",
        ".woocommerce-product-details__short-description",
        "#tab-description",
        ".product__description",
        ".product-description",
        ".product.attribute.description .value",
        ".product-single__description",
        ".description",
        "meta[name=\"description\"]",
        "meta[property=\"og:description\"]",
    ])
});
static SPEC_ROWS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    compile(&[
        ".woocommerce-product-attributes tr",
        "table.shop_attributes tr",
        "#product-attribute-specs-table tr",
        ".additional-attributes tr",
        ".product-features dl",
        ".data-sheet",
    ])
});
static ROW_LABEL: LazyLock<Vec<Selector>> = LazyLock::new(|| compile(&["th", "dt", ".name"]));
static ROW_VALUE: LazyLock<Vec<Selector>> = LazyLock::new(|| compile(&["td", "dd", ".value"]));
static AVAILABILITY_SELECTORS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    compile(&[
        "[itemprop=\"availability\"]",
        ".stock",
        ".availability",
        ".product-availability",
        "#product-availability",
        "[data-availability]",
    ])
});

static SKU_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(?:(?:sku|r[ée]f[ée]rence|r[ée]f|art\.?-?nr|artikelnummer|item\s*no)(?:[\s:#.]+|$)|item\s*#\s*)",
    )
    .expect("valid sku label regex")
});

const HOME_CRUMBS: &[&str] = &["home", "accueil", "startseite", "inicio", "home page", "start"];

const OUT_OF_STOCK: &[&str] = &[
    "outofstock",
    "out of stock",
    "sold out",
    "rupture",
    "épuisé",
    "epuise",
    "indisponible",
    "ausverkauft",
    "nicht verfügbar",
    "agotado",
    "esaurito",
    "discontinued",
    "unavailable",
];
const IN_STOCK: &[&str] = &[
    "instock",
    "in stock",
    "en stock",
    "disponible",
    "auf lager",
    "verfügbar",
    "available",
    "limitedavailability",
    "preorder",
];

/// Weight, dimensions and remaining rows of a product specification table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpecTable {
    pub weight: Option<String>,
    pub dimensions: Option<String>,
    pub attributes: BTreeMap<String, String>,
}

impl SpecTable {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.weight.is_none() && self.dimensions.is_none() && self.attributes.is_empty()
    }
}

/// Category from the page breadcrumb, falling back to explicit category markup.
#[must_use]
pub fn extract_category(scope: ElementRef<'_>, product_name: Option<&str>) -> Option<String> {
    for selector in BREADCRUMB_SELECTORS.iter() {
        let Some(trail) = scope.select(selector).next() else {
            continue;
        };
        let crumbs: Vec<String> = CRUMB_ITEMS
            .iter()
            .map(|item| {
                trail
                    .select(item)
                    .map(element_text)
                    .filter(|t| !t.is_empty())
                    .collect::<Vec<_>>()
            })
            .find(|items| !items.is_empty())
            .unwrap_or_else(|| vec![element_text(trail)]);
        if let Some(category) = clean_breadcrumb(&crumbs.join(" / "), product_name) {
            return Some(category);
        }
    }
    CATEGORY_SELECTORS.iter().find_map(|selector| {
        scope.select(selector).find_map(|el| {
            let raw = attr(el, "content")
                .or_else(|| attr(el, "data-product-category"))
                .map_or_else(|| element_text(el), str::to_string);
            clean_breadcrumb(&raw, product_name)
        })
    })
}

/// Picks the most specific crumb of a breadcrumb trail.
///
/// Crumbs are split on `/ > » › |`; "Home"-like entries are dropped and the
/// last crumb that is not the product name wins.
#[must_use]
pub fn clean_breadcrumb(trail: &str, product_name: Option<&str>) -> Option<String> {
    let name = product_name.map(|n| collapse_whitespace(n).to_lowercase());
    trail
        .split(['/', '>', '»', '›', '|'])
        .map(collapse_whitespace)
        .filter(|crumb| !crumb.is_empty())
        .filter(|crumb| !HOME_CRUMBS.contains(&crumb.to_lowercase().as_str()))
        .filter(|crumb| name.as_deref() != Some(crumb.to_lowercase().as_str()))
        .last()
}

/// SKU from microdata or SKU-labelled markup.
#[must_use]
pub fn extract_sku(scope: ElementRef<'_>) -> Option<String> {
    SKU_SELECTORS.iter().find_map(|selector| {
        scope.select(selector).find_map(|el| {
            let raw = attr(el, "content")
                .or_else(|| attr(el, "data-sku"))
                .map_or_else(|| element_text(el), str::to_string);
            clean_sku(&raw)
        })
    })
}

/// Strips a label prefix (`SKU:`, `Réf.`, `Art.-Nr.`) and keeps ASCII
/// alphanumerics, `-` and `_`.
#[must_use]
pub fn clean_sku(raw: &str) -> Option<String> {
    let unlabelled = SKU_LABEL_RE.replace(raw, "");
    let sku: String = unlabelled
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
        .collect();
    let sku = sku.trim_matches(['-', '_']).to_string();
    (!sku.is_empty() && !sku.eq_ignore_ascii_case("na")).then_some(sku)
}

#[must_use]
pub fn extract_brand(scope: ElementRef<'_>) -> Option<String> {
    BRAND_SELECTORS.iter().find_map(|selector| {
        scope.select(selector).find_map(|el| {
            let raw = attr(el, "content")
                .or_else(|| attr(el, "data-brand"))
                .map_or_else(|| element_text(el), str::to_string);
            let brand = truncate_chars(&collapse_whitespace(&raw), 80);
            (!brand.is_empty()).then_some(brand)
        })
    })
}

#[must_use]
pub fn extract_description(scope: ElementRef<'_>) -> Option<String> {
    DESCRIPTION_SELECTORS.iter().find_map(|selector| {
        scope.select(selector).find_map(|el| {
            let raw = attr(el, "content").map_or_else(|| element_text(el), str::to_string);
            let description = truncate_chars(&collapse_whitespace(&raw), MAX_DESCRIPTION_CHARS);
            (!description.is_empty()).then_some(description)
        })
    })
}

/// Reads WooCommerce, Magento and PrestaShop specification tables.
///
/// Rows labelled as weight or dimensions are lifted out; everything else
/// lands in `attributes` keyed by the row label.
#[must_use]
pub fn extract_attributes(scope: ElementRef<'_>) -> SpecTable {
    let mut table = SpecTable::default();
    for selector in SPEC_ROWS.iter() {
        for row in scope.select(selector).take(MAX_SPEC_ROWS) {
            let labels: Vec<String> = ROW_LABEL
                .iter()
                .flat_map(|s| row.select(s))
                .map(element_text)
                .collect();
            let values: Vec<String> = ROW_VALUE
                .iter()
                .flat_map(|s| row.select(s))
                .map(element_text)
                .collect();
            for (label, value) in labels.into_iter().zip(values) {
                table.insert(label, value);
            }
        }
        if !table.is_empty() {
            break;
        }
    }
    table
}

impl SpecTable {
    fn insert(&mut self, label: String, value: String) {
        let label = label.trim_end_matches(':').trim().to_string();
        if label.is_empty() || value.is_empty() {
            return;
        }
        let lower = label.to_lowercase();
        if ["weight", "poids", "gewicht", "peso"].iter().any(|k| lower.contains(k)) {
            self.weight.get_or_insert(value);
        } else if ["dimension", "taille du produit", "abmessung", "größe (l"]
            .iter()
            .any(|k| lower.contains(k))
        {
            self.dimensions.get_or_insert(value);
        } else {
            self.attributes.entry(label).or_insert(value);
        }
    }
}

/// Stock status from availability markup. `None` when the page says nothing.
#[must_use]
pub fn extract_availability(scope: ElementRef<'_>) -> Option<bool> {
    AVAILABILITY_SELECTORS.iter().find_map(|selector| {
        scope.select(selector).find_map(|el| {
            let raw = attr(el, "href")
                .or_else(|| attr(el, "content"))
                .or_else(|| attr(el, "data-availability"))
                .map_or_else(|| element_text(el), str::to_string);
            availability_from_text(&raw)
        })
    })
}

pub(crate) fn availability_from_text(raw: &str) -> Option<bool> {
    let lower = raw.to_lowercase();
    if OUT_OF_STOCK.iter().any(|k| lower.contains(k)) {
        Some(false)
    } else if IN_STOCK.iter().any(|k| lower.contains(k)) {
        Some(true)
    } else {
        None
    }
}

#[cfg(test)]
#[path = "taxonomy_test.rs"]
mod tests;
