use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Selector};

use super::{attr, collapse_whitespace, compile, element_text, truncate_chars};

const MAX_NAME_CHARS: usize = 120;

static NAME_SELECTORS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    compile(&[
        "[itemprop=\"name\"]",
        "h1.product_title",
        "h1.product-title",
        "h1.page-title",
        ".product__title",
        ".product-title",
        ".product-name",
        ".product-item-name",
        ".woocommerce-loop-product__title",
        ".card__heading",
        ".product-card__title",
        "h1",
        "h2",
        "h3",
    ])
});

static IMG_SELECTOR: LazyLock<Vec<Selector>> = LazyLock::new(|| compile(&["img[alt]"]));

static EMBEDDED_PRICE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:€|\$|£|EUR|USD|GBP|CHF)\s*\d[\d\s.,]*|\d[\d\s.,]*\s*(?:€|\$|£|EUR|USD|GBP|CHF)")
        .expect("valid embedded price regex")
});

/// Finds a product name inside `scope`: candidate selectors, then an image
/// `alt`, then the first line of text. The result is passed through
/// [`clean_name`].
#[must_use]
pub fn extract_name(scope: ElementRef<'_>) -> Option<String> {
    let from_selectors = NAME_SELECTORS.iter().find_map(|selector| {
        scope.select(selector).find_map(|el| {
            let text = element_text(el);
            let raw = if text.is_empty() {
                attr(el, "title").or_else(|| attr(el, "content"))?.to_string()
            } else {
                text
            };
            clean_name(&raw)
        })
    });
    if from_selectors.is_some() {
        return from_selectors;
    }

    let from_alt = IMG_SELECTOR
        .iter()
        .flat_map(|selector| scope.select(selector))
        .find_map(|img| attr(img, "alt").and_then(clean_name));
    if from_alt.is_some() {
        return from_alt;
    }

    scope
        .text()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .and_then(|line| clean_name(&truncate_chars(line, MAX_NAME_CHARS)))
}

/// Removes embedded prices, long reference codes, and leading or trailing
/// punctuation. Returns `None` when nothing readable remains.
#[must_use]
pub fn clean_name(raw: &str) -> Option<String> {
    let without_price = EMBEDDED_PRICE_RE.replace_all(raw, " ");
    let kept: Vec<&str> = without_price
        .split_whitespace()
        .filter(|token| !is_reference_code(token))
        .collect();
    let joined = collapse_whitespace(&kept.join(" "));
    let trimmed = joined
        .trim_matches(|c: char| c.is_whitespace() || is_edge_punctuation(c))
        .to_string();
    let cleaned = truncate_chars(&trimmed, MAX_NAME_CHARS);
    (cleaned.chars().any(char::is_alphanumeric)).then_some(cleaned)
}

/// Reference codes: six or more characters of uppercase letters, digits,
/// `-` or `_`, containing at least one digit.
fn is_reference_code(token: &str) -> bool {
    let core = token.trim_matches(|c: char| !c.is_alphanumeric());
    core.chars().count() >= 6
        && core.chars().any(|c| c.is_ascii_digit())
        && core
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-' || c == '_')
}

fn is_edge_punctuation(c: char) -> bool {
    matches!(
        c,
        '-' | '–' | '—' | '|' | ':' | ';' | ',' | '.' | '/' | '\\' | '·' | '•' | '*' | '#'
    )
}
