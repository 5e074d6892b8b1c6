use std::collections::BTreeMap;

use rust_decimal::Decimal;
use vitrine_core::ProductVariant;

use super::*;
use crate::browser::{BrowserProvider, FixtureBrowser, FixturePage, SessionOptions};

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn listing(id: &str, url: Option<&str>) -> ExtractedProduct {
    let mut p = ExtractedProduct::new(id, "Robe", dec("89"));
    p.product_url = url.map(str::to_string);
    p
}

const DETAIL_PAGE: &str = r#"<html><body>
  <h1>Robe Lin détaillée</h1>
  <span class="price">99,00 €</span>
  <div class="product-description">Robe ample en lin lavé, coupe droite, longueur midi, deux poches passepoilées.</div>
  <div class="brand">Maison Lune</div>
  <select name="taille"><option value="">Choisir une taille</option><option>S</option><option>M</option></select>
</body></html>"#;

// ---------------------------------------------------------------------------
// merge_detail
// ---------------------------------------------------------------------------

fn populated() -> ExtractedProduct {
    let mut p = ExtractedProduct::new("l1", "Listing", dec("10"));
    p.currency = Some("EUR".into());
    p.description = Some("listing description".into());
    p.image_url = Some("https://a.fr/l.jpg".into());
    p.image_urls = vec!["https://a.fr/l.jpg".into()];
    p.product_url = Some("https://a.fr/p/l".into());
    p.sku = Some("L-1".into());
    p.brand = Some("Listing Brand".into());
    p.category = Some("Listing Cat".into());
    p.colors = vec!["Rouge".into()];
    p.sizes = vec!["S".into()];
    p.variants = vec![ProductVariant {
        id: "l1:rouge:s".into(),
        color: Some("Rouge".into()),
        size: Some("S".into()),
        price: Some(dec("10")),
        image_url: None,
        sku: None,
    }];
    p.available = Some(true);
    p.weight = Some("1 kg".into());
    p.dimensions = Some("10 x 10".into());
    p.attributes = BTreeMap::from([("Matière".to_string(), "Lin".to_string())]);
    p
}

fn other_detail() -> ExtractedProduct {
    let mut d = ExtractedProduct::new("d9", "Detail", dec("99"));
    d.currency = Some("CHF".into());
    d.description = Some("detail description".into());
    d.image_url = Some("https://a.fr/d.jpg".into());
    d.image_urls = vec!["https://a.fr/d.jpg".into(), "https://a.fr/d2.jpg".into()];
    d.product_url = Some("https://a.fr/p/d".into());
    d.sku = Some("D-9".into());
    d.brand = Some("Detail Brand".into());
    d.category = Some("Detail Cat".into());
    d.colors = vec!["Bleu".into(), "Vert".into()];
    d.sizes = vec!["M".into(), "L".into()];
    d.available = Some(false);
    d.weight = Some("2 kg".into());
    d.dimensions = Some("20 x 20".into());
    d.attributes = BTreeMap::from([("Coupe".to_string(), "Droite".to_string())]);
    d
}

#[test]
fn merge_never_replaces_populated_fields() {
    let original = populated();
    let mut merged = original.clone();
    merge_detail(&mut merged, other_detail());
    assert_eq!(merged, original);
}

#[test]
fn merge_fills_each_empty_field() {
    let mut merged = ExtractedProduct::new("l1", "Listing", dec("10"));
    merge_detail(&mut merged, other_detail());

    assert_eq!(merged.external_id, "l1");
    assert_eq!(merged.name, "Listing");
    assert_eq!(merged.price, dec("10"));
    assert_eq!(merged.currency.as_deref(), Some("CHF"));
    assert_eq!(merged.description.as_deref(), Some("detail description"));
    assert_eq!(merged.image_urls.len(), 2);
    assert_eq!(merged.brand.as_deref(), Some("Detail Brand"));
    assert_eq!(merged.available, Some(false));
    assert_eq!(merged.attributes.get("Coupe").map(String::as_str), Some("Droite"));
    // Re-derived against the listing's id and price.
    assert_eq!(merged.variants.len(), 4);
    assert_eq!(merged.variants[0].id, "l1:bleu:m");
    assert!(merged.variants.iter().all(|v| v.price == Some(dec("10"))));
}

#[test]
fn sizes_from_detail_expand_color_only_variants() {
    let mut merged = ExtractedProduct::new("l1", "Robe", dec("10"));
    merged.colors = vec!["Rouge".into(), "Bleu".into()];
    merged.variants = vec![
        ProductVariant {
            id: "l1:rouge".into(),
            color: Some("Rouge".into()),
            size: None,
            price: Some(dec("10")),
            image_url: None,
            sku: Some("R-1".into()),
        },
        ProductVariant {
            id: "l1:bleu".into(),
            color: Some("Bleu".into()),
            size: None,
            price: Some(dec("12")),
            image_url: None,
            sku: Some("B-1".into()),
        },
    ];
    let mut detail = ExtractedProduct::new("d9", "Robe", dec("99"));
    detail.sizes = vec!["S".into(), "M".into()];
    detail.variants = vec![ProductVariant {
        id: "d9:m".into(),
        color: None,
        size: Some("M".into()),
        price: Some(dec("99")),
        image_url: None,
        sku: None,
    }];

    merge_detail(&mut merged, detail);

    assert_eq!(merged.colors, vec!["Rouge", "Bleu"]);
    assert_eq!(merged.sizes, vec!["S", "M"]);
    let pairs: Vec<(&str, &str, Option<Decimal>, Option<&str>)> = merged
        .variants
        .iter()
        .map(|v| {
            (
                v.color.as_deref().unwrap_or_default(),
                v.size.as_deref().unwrap_or_default(),
                v.price,
                v.sku.as_deref(),
            )
        })
        .collect();
    assert_eq!(
        pairs,
        vec![
            ("Rouge", "S", Some(dec("10")), Some("R-1")),
            ("Rouge", "M", Some(dec("10")), Some("R-1")),
            ("Bleu", "S", Some(dec("12")), Some("B-1")),
            ("Bleu", "M", Some(dec("12")), Some("B-1")),
        ]
    );
    assert_eq!(merged.variants[3].id, "l1:bleu:m");
}

#[test]
fn blank_listing_text_counts_as_empty() {
    let mut merged = ExtractedProduct::new("l1", "Listing", dec("10"));
    merged.description = Some("   ".into());
    merge_detail(&mut merged, other_detail());
    assert_eq!(merged.description.as_deref(), Some("detail description"));
}

// ---------------------------------------------------------------------------
// enrich_products
// ---------------------------------------------------------------------------

async fn open(browser: &FixtureBrowser) -> Box<dyn PageSession> {
    browser.open(&SessionOptions::default()).await.unwrap()
}

#[tokio::test]
async fn detail_page_fills_description_and_sizes() {
    let browser = FixtureBrowser::new([("https://shop.example/p/robe", FixturePage::html(DETAIL_PAGE))]);
    let mut session = open(&browser).await;
    let mut products = vec![listing("a", Some("https://shop.example/p/robe"))];
    products[0].brand = Some("Atelier".into());

    let enriched = enrich_products(
        session.as_mut(),
        &mut products,
        &SiteProfile::generic(),
        &ExtractOptions::default(),
        &EnrichOptions::default(),
        "maison-lune",
        &CancellationToken::new(),
    )
    .await;

    assert_eq!(enriched, 1);
    let robe = &products[0];
    assert_eq!(robe.name, "Robe");
    assert_eq!(robe.price, dec("89"));
    assert_eq!(robe.brand.as_deref(), Some("Atelier"));
    assert!(robe.description.as_deref().unwrap().starts_with("Robe ample en lin"));
    assert_eq!(robe.sizes, vec!["S", "M"]);
    let ids: Vec<&str> = robe.variants.iter().map(|v| v.id.as_str()).collect();
    assert_eq!(ids, vec!["a:s", "a:m"]);
    assert!(robe.variants.iter().all(|v| v.price == Some(dec("89"))));
}

#[tokio::test]
async fn failures_and_non_qualifying_products_are_left_alone() {
    let browser = FixtureBrowser::new([
        ("https://shop.example/p/lent", FixturePage::timing_out()),
        ("https://shop.example/p/robe", FixturePage::html(DETAIL_PAGE)),
    ]);
    let log = browser.log();
    let mut session = open(&browser).await;

    let mut complete = listing("done", Some("https://shop.example/p/done"));
    complete.description = Some("d".repeat(100));
    complete.sizes = vec!["Unique".into()];
    let mut products = vec![
        listing("no-url", None),
        complete.clone(),
        listing("missing", Some("https://shop.example/p/missing")),
        listing("slow", Some("https://shop.example/p/lent")),
        listing("robe", Some("https://shop.example/p/robe")),
    ];
    let before = products.clone();

    let enriched = enrich_products(
        session.as_mut(),
        &mut products,
        &SiteProfile::generic(),
        &ExtractOptions::default(),
        &EnrichOptions::default(),
        "maison-lune",
        &CancellationToken::new(),
    )
    .await;

    assert_eq!(enriched, 1);
    assert_eq!(products[..4], before[..4]);
    assert_eq!(products[4].sizes, vec!["S", "M"]);
    assert_eq!(
        log.navigations(),
        vec![
            "https://shop.example/p/missing",
            "https://shop.example/p/lent",
            "https://shop.example/p/robe",
        ]
    );
}

#[tokio::test]
async fn visits_are_capped() {
    let browser = FixtureBrowser::new([("https://shop.example/p/robe", FixturePage::html(DETAIL_PAGE))]);
    let log = browser.log();
    let mut session = open(&browser).await;
    let mut products = vec![
        listing("a", Some("https://shop.example/p/robe")),
        listing("b", Some("https://shop.example/p/robe?b")),
    ];
    let options = EnrichOptions {
        max_enrichment: 1,
        ..EnrichOptions::default()
    };

    enrich_products(
        session.as_mut(),
        &mut products,
        &SiteProfile::generic(),
        &ExtractOptions::default(),
        &options,
        "maison-lune",
        &CancellationToken::new(),
    )
    .await;

    assert_eq!(log.navigations().len(), 1);
    assert!(products[1].sizes.is_empty());
}

#[tokio::test]
async fn cancelled_token_skips_all_visits() {
    let browser = FixtureBrowser::new([("https://shop.example/p/robe", FixturePage::html(DETAIL_PAGE))]);
    let log = browser.log();
    let mut session = open(&browser).await;
    let mut products = vec![listing("a", Some("https://shop.example/p/robe"))];
    let cancel = CancellationToken::new();
    cancel.cancel();

    let enriched = enrich_products(
        session.as_mut(),
        &mut products,
        &SiteProfile::generic(),
        &ExtractOptions::default(),
        &EnrichOptions::default(),
        "maison-lune",
        &cancel,
    )
    .await;

    assert_eq!(enriched, 0);
    assert!(log.navigations().is_empty());
}
