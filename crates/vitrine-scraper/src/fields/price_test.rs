use scraper::Html;

use super::*;

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

// ---------------------------------------------------------------------------
// parse_price
// ---------------------------------------------------------------------------

#[test]
fn comma_decimal_with_trailing_euro() {
    assert_eq!(parse_price("12,99 €"), Some(dec("12.99")));
}

#[test]
fn dot_decimal_with_leading_euro() {
    assert_eq!(parse_price("€12.99"), Some(dec("12.99")));
}

#[test]
fn empty_is_absent_not_zero() {
    assert_eq!(parse_price(""), None);
    assert_eq!(parse_price("   "), None);
    assert_eq!(parse_price("Prix sur demande"), None);
}

#[test]
fn zero_is_absent() {
    assert_eq!(parse_price("0,00 €"), None);
}

#[test]
fn space_grouped_thousands_with_comma_decimal() {
    assert_eq!(parse_price("1 234,56 €"), Some(dec("1234.56")));
}

#[test]
fn nbsp_grouped_thousands() {
    assert_eq!(parse_price("1\u{00A0}234,56\u{00A0}€"), Some(dec("1234.56")));
}

#[test]
fn dot_grouped_thousands_with_comma_decimal() {
    assert_eq!(parse_price("1.234,56"), Some(dec("1234.56")));
}

#[test]
fn comma_grouped_thousands_with_dot_decimal() {
    assert_eq!(parse_price("$1,234.56"), Some(dec("1234.56")));
}

#[test]
fn three_trailing_digits_are_grouping() {
    assert_eq!(parse_price("1,234"), Some(dec("1234")));
    assert_eq!(parse_price("2.500 kr"), Some(dec("2500")));
}

#[test]
fn three_digit_tail_is_never_cut_to_two() {
    assert_eq!(parse_price("1234.567"), Some(dec("1234567")));
    assert_eq!(parse_price("1.234,567 €"), Some(dec("1234567")));
    assert_eq!(find_price_in_text("Prix : 1234.567 €"), Some(dec("1234567")));
}

#[test]
fn single_decimal_digit() {
    assert_eq!(parse_price("CHF 9.5"), Some(dec("9.5")));
}

#[test]
fn swiss_apostrophe_grouping() {
    assert_eq!(parse_price("CHF 1'299.00"), Some(dec("1299.00")));
}

// ---------------------------------------------------------------------------
// find_price_in_text / detect_currency
// ---------------------------------------------------------------------------

#[test]
fn currency_adjacent_scan_skips_unrelated_numbers() {
    let text = "Pack de 3 chaussettes - 14,90 € TTC";
    assert_eq!(find_price_in_text(text), Some(dec("14.90")));
}

#[test]
fn currency_adjacent_scan_supports_codes() {
    assert_eq!(find_price_in_text("Only EUR 29.00 today"), Some(dec("29.00")));
    assert_eq!(find_price_in_text("no currency 29.00"), None);
}

#[test]
fn detects_common_currencies() {
    assert_eq!(detect_currency("12,99 €").as_deref(), Some("EUR"));
    assert_eq!(detect_currency("£5").as_deref(), Some("GBP"));
    assert_eq!(detect_currency("$5").as_deref(), Some("USD"));
    assert_eq!(detect_currency("5").as_deref(), None);
}

// ---------------------------------------------------------------------------
// extract_price
// ---------------------------------------------------------------------------

#[test]
fn prefers_itemprop_content_attribute() {
    let html = Html::parse_fragment(
        r#"<div><span itemprop="price" content="39.00">39,00 € au lieu de 49,00 €</span></div>"#,
    );
    assert_eq!(extract_price(html.root_element()), Some(dec("39.00")));
}

#[test]
fn woo_sale_price_wins_over_regular() {
    let html = Html::parse_fragment(
        r#"<li class="product"><span class="price"><del><span class="woocommerce-Price-amount">49,00 €</span></del>
           <ins><span class="woocommerce-Price-amount">35,00 €</span></ins></span></li>"#,
    );
    assert_eq!(extract_price(html.root_element()), Some(dec("35.00")));
}

#[test]
fn falls_back_to_text_scan() {
    let html = Html::parse_fragment(r"<div><p>Bol en grès</p><p>Seulement 18€</p></div>");
    assert_eq!(extract_price(html.root_element()), Some(dec("18")));
}

#[test]
fn no_price_anywhere_is_none() {
    let html = Html::parse_fragment(r"<div><p>Bientôt disponible</p></div>");
    assert_eq!(extract_price(html.root_element()), None);
}
