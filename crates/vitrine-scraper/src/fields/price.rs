//! Price discovery and locale-aware decimal parsing.

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;
use scraper::{ElementRef, Selector};

use super::{attr, compile, element_text};

/// A number with optional grouping (space, NBSP, narrow NBSP, apostrophe,
/// dot or comma before exactly three digits) and an optional trailing
/// `[.,]digits` group. The trailing group is matched whole so that
/// [`normalize_number`] sees every digit; it decides whether the group is
/// decimal or grouping.
const NUMBER: &str = r"\d{1,3}(?:[ \u{00A0}\u{202F}'.,]\d{3})+(?:[.,]\d+)?|\d+(?:[.,]\d+)?";
const CURRENCY: &str = r"€|\$|£|¥|EUR|USD|GBP|CHF|CAD|AUD|SEK|DKK|NOK|PLN|zł|kr";

static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(NUMBER).expect("valid number regex"));

static CURRENCY_ADJACENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)(?:(?:{CURRENCY})\s*({NUMBER}))|(?:({NUMBER})\s*(?:{CURRENCY}))"
    ))
    .expect("valid currency-adjacent regex")
});

static PRICE_SELECTORS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    compile(&[
        "[itemprop=\"price\"]",
        "[data-price-type=\"finalPrice\"]",
        "[data-price-amount]",
        ".price ins .woocommerce-Price-amount",
        ".price ins",
        ".woocommerce-Price-amount",
        ".price-item--sale",
        ".price-item--regular",
        ".current-price",
        ".product-price",
        ".price__current",
        ".special-price .price",
        ".price",
        "[class*=\"price\"]",
    ])
});

/// Parses a displayed price into a decimal.
///
/// The rightmost `,` or `.` is the decimal separator only when followed by
/// one or two digits; every other separator is grouping. Returns `None` for
/// empty input, no digits, or a non-positive amount.
#[must_use]
pub fn parse_price(text: &str) -> Option<Decimal> {
    let raw = NUMBER_RE.find(text)?.as_str();
    normalize_number(raw)
}

fn normalize_number(raw: &str) -> Option<Decimal> {
    let compact: String = raw
        .chars()
        .filter(|c| !matches!(c, ' ' | '\u{00A0}' | '\u{202F}' | '\''))
        .collect();

    let decimal_at = compact.rfind([',', '.']).filter(|&idx| {
        let tail = &compact[idx + 1..];
        (1..=2).contains(&tail.len()) && tail.chars().all(|c| c.is_ascii_digit())
    });

    let mut normalized = String::with_capacity(compact.len());
    for (idx, c) in compact.char_indices() {
        match c {
            ',' | '.' if Some(idx) == decimal_at => normalized.push('.'),
            ',' | '.' => {}
            other => normalized.push(other),
        }
    }

    let value = Decimal::from_str(&normalized).ok()?;
    (value > Decimal::ZERO).then_some(value)
}

/// Scans free text for a number written next to a currency marker.
#[must_use]
pub fn find_price_in_text(text: &str) -> Option<Decimal> {
    CURRENCY_ADJACENT_RE.captures_iter(text).find_map(|cap| {
        cap.get(1)
            .or_else(|| cap.get(2))
            .and_then(|m| normalize_number(m.as_str()))
    })
}

/// Maps a currency symbol or code found in `text` to an ISO 4217 code.
#[must_use]
pub fn detect_currency(text: &str) -> Option<String> {
    let upper = text.to_uppercase();
    let code = if text.contains('€') || upper.contains("EUR") {
        "EUR"
    } else if text.contains('£') || upper.contains("GBP") {
        "GBP"
    } else if upper.contains("CHF") {
        "CHF"
    } else if upper.contains("CAD") || upper.contains("CA$") {
        "CAD"
    } else if upper.contains("AUD") || upper.contains("A$") {
        "AUD"
    } else if upper.contains("USD") || text.contains('$') {
        "USD"
    } else if text.contains('¥') {
        "JPY"
    } else {
        return None;
    };
    Some(code.to_string())
}

/// Finds the price inside `scope`.
///
/// Candidate selectors are tried in order; for each match the `content` or
/// `data-price-amount` attribute is preferred over the element text. When no
/// candidate yields a positive price, the container text is scanned for a
/// currency-adjacent number.
#[must_use]
pub fn extract_price(scope: ElementRef<'_>) -> Option<Decimal> {
    for selector in PRICE_SELECTORS.iter() {
        for el in scope.select(selector) {
            let candidate = attr(el, "content")
                .or_else(|| attr(el, "data-price-amount"))
                .map(parse_price)
                .unwrap_or_else(|| parse_price(&element_text(el)));
            if candidate.is_some() {
                return candidate;
            }
        }
    }
    find_price_in_text(&element_text(scope))
}

#[cfg(test)]
#[path = "price_test.rs"]
mod tests;
