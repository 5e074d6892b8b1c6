use super::*;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-4
}

// ---------------------------------------------------------------------------
// URL heuristics
// ---------------------------------------------------------------------------

#[test]
fn myshopify_host_is_high_confidence() {
    let profile = classify_url("https://maison-lune.myshopify.com/").unwrap();
    assert_eq!(profile.platform, Platform::Shopify);
    assert!(approx(profile.confidence, 0.95));
}

#[test]
fn path_patterns_map_to_platforms() {
    let cases = [
        ("https://a.fr/collections/robes", Platform::Shopify),
        ("https://a.fr/products/robe-lin", Platform::Shopify),
        ("https://a.fr/product-category/cuisine/", Platform::WooCommerce),
        ("https://a.fr/?post_type=product", Platform::WooCommerce),
        ("https://a.fr/catalog/product/view/id/12", Platform::Magento),
        ("https://a.fr/catalogsearch/result/?q=tente", Platform::Magento),
        ("https://a.fr/index.php?id_product=7&controller=product", Platform::PrestaShop),
    ];
    for (url, expected) in cases {
        let profile = classify_url(url).unwrap_or_else(|| panic!("no profile for {url}"));
        assert_eq!(profile.platform, expected, "{url}");
        assert!(approx(profile.confidence, 0.7), "{url}");
    }
}

#[test]
fn plain_urls_are_unclassified() {
    assert!(classify_url("https://atelier-brume.fr/boutique").is_none());
    assert!(classify_url("not a url").is_none());
}

// ---------------------------------------------------------------------------
// In-page signatures
// ---------------------------------------------------------------------------

#[test]
fn url_match_short_circuits_page_signals() {
    let snapshot = PageSnapshot::from_html(
        "https://a.fr/products/robe",
        r#"<script>var prestashop = {"shop": {}};</script>"#,
    );
    assert_eq!(classify(&snapshot).platform, Platform::Shopify);
}

#[test]
fn known_global_gives_point_nine() {
    let snapshot = PageSnapshot::from_html(
        "https://atelier-brume.fr/boutique",
        r#"<html><head><script>var wc_add_to_cart_params = {"ajax_url": "/wp-admin/admin-ajax.php"};</script></head></html>"#,
    );
    let profile = classify(&snapshot);
    assert_eq!(profile.platform, Platform::WooCommerce);
    assert!(approx(profile.confidence, 0.9));
}

#[test]
fn html_markers_scale_and_cap() {
    let one = PageSnapshot::from_html(
        "https://nordvik.example/",
        r#"<script type="text/x-magento-init">{}</script>"#,
    );
    let profile = classify(&one);
    assert_eq!(profile.platform, Platform::Magento);
    assert!(approx(profile.confidence, 0.6));

    let many = PageSnapshot::from_html(
        "https://nordvik.example/",
        r#"<div data-mage-init='{}'></div>
           <script type="text/x-magento-init">{}</script>
           <script src="/static/mage/cookies.js"></script>
           <div class="Magento_Theme"></div>"#,
    );
    assert!(approx(classify(&many).confidence, 0.85));
}

#[test]
fn ambiguous_pages_take_first_in_signature_order() {
    let snapshot = PageSnapshot::from_html(
        "https://mixed.example/",
        r#"<link href="https://cdn.shopify.com/s/x.css">
           <script src="/wp-content/plugins/woocommerce/assets/js/frontend.js"></script>
           <script>var prestashop = {};</script>"#,
    );
    assert_eq!(classify(&snapshot).platform, Platform::Shopify);
}

#[test]
fn no_signal_is_generic_zero() {
    let snapshot = PageSnapshot::from_html("https://plain.example/", "<html><body><h1>Hi</h1></body></html>");
    assert_eq!(classify(&snapshot), SiteProfile::generic());
}
