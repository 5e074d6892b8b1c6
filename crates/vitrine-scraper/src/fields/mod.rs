//! Shared field heuristics used by every extraction tier.
//!
//! All functions are pure: they take the element to search and, where URLs
//! are involved, the page URL to resolve against.

pub mod identity;
pub mod images;
pub mod name;
pub mod price;
pub mod taxonomy;
pub mod variants;

use scraper::{ElementRef, Selector};

pub use identity::{canonical_url, id_from_attributes, resolve_external_id};
pub use images::{extract_images, resolve_image, resolve_link};
pub use name::{clean_name, extract_name};
pub use price::{detect_currency, extract_price, find_price_in_text, parse_price};
pub use taxonomy::{
    clean_breadcrumb, clean_sku, extract_attributes, extract_availability, extract_brand,
    extract_category, extract_description, extract_sku, SpecTable,
};
pub use variants::{axis_of, extract_colors, extract_sizes, Axis};

/// Compiles a candidate list, dropping selectors that fail to parse.
pub(crate) fn compile(candidates: &[&str]) -> Vec<Selector> {
    candidates
        .iter()
        .filter_map(|raw| match Selector::parse(raw) {
            Ok(selector) => Some(selector),
            Err(e) => {
                tracing::warn!(selector = raw, error = %e, "invalid candidate selector");
                None
            }
        })
        .collect()
}

/// Returns every match of the first selector that matches anything in `scope`.
pub(crate) fn first_matching<'a>(
    scope: ElementRef<'a>,
    selectors: &[Selector],
) -> Vec<ElementRef<'a>> {
    for selector in selectors {
        let matches: Vec<ElementRef<'a>> = scope.select(selector).collect();
        if !matches.is_empty() {
            return matches;
        }
    }
    Vec::new()
}

/// Element text with whitespace runs collapsed to single spaces.
pub(crate) fn element_text(el: ElementRef<'_>) -> String {
    collapse_whitespace(&el.text().collect::<String>())
}

pub(crate) fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Trimmed, non-empty attribute value.
pub(crate) fn attr<'a>(el: ElementRef<'a>, name: &str) -> Option<&'a str> {
    el.value()
        .attr(name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Truncates to at most `max` characters on a char boundary.
pub(crate) fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect::<String>().trim_end().to_string()
}
