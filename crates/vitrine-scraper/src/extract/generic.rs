//! Storefronts without a recognised platform: front-end state globals, then
//! the shared script and DOM tiers.

use vitrine_core::{ExtractedProduct, Platform};

use super::json_product::{from_schema, from_state, is_schema_product, is_state_product};
use super::{page_kind, PageContext, PlatformStrategy};
use crate::json_walk::find_objects;

const STATE_GLOBALS: &[&str] = &["__INITIAL_STATE__", "__PRELOADED_STATE__", "__NUXT__"];

pub(crate) struct GenericStrategy;

impl PlatformStrategy for GenericStrategy {
    fn platform(&self) -> Platform {
        Platform::Generic
    }

    fn global_expressions(&self) -> &'static [&'static str] {
        STATE_GLOBALS
    }

    fn is_single_product_page(&self, ctx: &PageContext<'_>) -> bool {
        page_kind::is_single_product(ctx.document, &ctx.snapshot.url, &ctx.options.page_kind)
    }

    fn structured_data(&self, ctx: &PageContext<'_>) -> Vec<ExtractedProduct> {
        let mut products = Vec::new();
        for global in STATE_GLOBALS {
            let Some(state) = ctx.global(global) else {
                continue;
            };
            for map in find_objects(state, ctx.options.walk, |m| {
                is_schema_product(m) || is_state_product(m)
            }) {
                let product = if is_schema_product(map) {
                    from_schema(map, ctx)
                } else {
                    from_state(map, ctx)
                };
                products.extend(product);
            }
            if !products.is_empty() {
                break;
            }
        }
        products
    }
}

#[cfg(test)]
mod tests {
    use vitrine_core::SiteProfile;

    use super::*;
    use crate::extract::{extract_products, ExtractOptions, PageMode};
    use crate::snapshot::PageSnapshot;

    #[test]
    fn initial_state_products_are_tier_a() {
        let html = r#"<html><head><script>
            window.__INITIAL_STATE__ = {"catalog": {"items": [
                {"id": "a1", "name": "Carnet A5", "price": 14.5, "url": "/p/carnet-a5"},
                {"id": "a2", "name": "Stylo plume", "price": {"amount": 39}, "url": "/p/stylo"},
                {"id": "a3", "name": "Gomme", "price": 0}
            ]}};
        </script></head><body><div class="product-card"><h3>Ignored</h3><span class="price">1 €</span></div></body></html>"#;
        let snapshot = PageSnapshot::from_html("https://papeterie.example/", html);
        let products =
            extract_products(&snapshot, &SiteProfile::generic(), &ExtractOptions::default()).unwrap();

        let ids: Vec<&str> = products.iter().map(|p| p.external_id.as_str()).collect();
        assert_eq!(ids, vec!["a1", "a2"]);
        assert_eq!(products[0].product_url.as_deref(), Some("https://papeterie.example/p/carnet-a5"));
    }

    #[test]
    fn single_product_page_uses_whole_document() {
        let html = r#"<html><head>
            <meta property="og:image" content="/img/theiere-og.jpg">
            <link rel="canonical" href="https://the.example/theiere">
        </head><body>
            <h1>Théière fonte</h1>
            <div class="product-gallery"><img src="/img/theiere-1.jpg"></div>
            <span class="price">54,90 €</span>
            <form action="/cart/add"><button name="add">Ajouter</button></form>
            <div class="description">Fonte émaillée, 0,8 L.</div>
        </body></html>"#;
        let snapshot = PageSnapshot::from_html("https://the.example/theiere?utm_source=x", html);
        let products =
            extract_products(&snapshot, &SiteProfile::generic(), &ExtractOptions::default()).unwrap();

        assert_eq!(products.len(), 1);
        let theiere = &products[0];
        assert_eq!(theiere.name, "Théière fonte");
        assert_eq!(theiere.product_url.as_deref(), Some("https://the.example/theiere"));
        assert_eq!(theiere.image_url.as_deref(), Some("https://the.example/img/theiere-og.jpg"));
        assert_eq!(theiere.image_urls.len(), 2);
        assert_eq!(theiere.description.as_deref(), Some("Fonte émaillée, 0,8 L."));
        assert_eq!(theiere.currency.as_deref(), Some("EUR"));
    }

    #[test]
    fn forced_listing_mode_reads_cards() {
        let html = r#"<html><body><h1>Théière fonte</h1>
            <div class="product-gallery"></div>
            <form action="/cart/add"><button name="add">Ajouter</button></form>
            <div class="product-card"><h3>Tasse</h3><span class="price">9 €</span></div>
        </body></html>"#;
        let snapshot = PageSnapshot::from_html("https://the.example/theiere", html);
        let options = ExtractOptions {
            mode: PageMode::Listing,
            ..ExtractOptions::default()
        };
        let products = extract_products(&snapshot, &SiteProfile::generic(), &options).unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].name, "Tasse");
    }
}
