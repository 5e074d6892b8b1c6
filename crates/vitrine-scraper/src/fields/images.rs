use std::sync::LazyLock;

use reqwest::Url;
use scraper::{ElementRef, Selector};

use super::{attr, compile};

/// Lazy-loading attributes, checked before `src`.
const IMAGE_ATTRS: &[&str] = &[
    "data-src",
    "data-lazy-src",
    "data-original",
    "data-srcset",
    "srcset",
    "src",
];

const PLACEHOLDER_MARKERS: &[&str] = &[
    "placeholder",
    "blank.gif",
    "spacer",
    "loading",
    "lazy-load",
    "1x1",
    "no-image",
    "noimage",
];

static IMAGE_SELECTORS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    compile(&[
        "[itemprop=\"image\"]",
        ".product-gallery img",
        ".product__media img",
        ".woocommerce-product-gallery img",
        ".product-image-photo",
        ".product-cover img",
        "img",
    ])
});

/// Collects product image URLs from `scope`, resolved against `base`.
///
/// Each image contributes its first usable lazy-load attribute. Placeholders
/// are dropped and duplicates removed, keeping first-seen order.
#[must_use]
pub fn extract_images(scope: ElementRef<'_>, base: &Url) -> Vec<String> {
    let mut urls: Vec<String> = Vec::new();
    for selector in IMAGE_SELECTORS.iter() {
        for el in scope.select(selector) {
            let Some(url) = image_source(el, base) else {
                continue;
            };
            if !urls.contains(&url) {
                urls.push(url);
            }
        }
        // The generic `img` fallback only runs when nothing targeted matched.
        if !urls.is_empty() {
            break;
        }
    }
    urls
}

fn image_source(el: ElementRef<'_>, base: &Url) -> Option<String> {
    // `<meta itemprop="image" content="...">` and `<link itemprop="image" href>`
    let direct = attr(el, "content").or_else(|| attr(el, "href"));
    direct
        .into_iter()
        .chain(IMAGE_ATTRS.iter().filter_map(|name| attr(el, name)))
        .find_map(|raw| {
            let candidate = first_srcset_candidate(raw);
            resolve_image(candidate, base)
        })
}

fn first_srcset_candidate(raw: &str) -> &str {
    raw.split(',')
        .next()
        .and_then(|entry| entry.split_whitespace().next())
        .unwrap_or(raw)
}

/// Resolves an image reference against `base`.
///
/// Fills the Shopify `{width}` template and rejects known placeholder
/// images on top of [`resolve_link`].
#[must_use]
pub fn resolve_image(raw: &str, base: &Url) -> Option<String> {
    let templated = raw.trim().replace("{width}", "1024");
    let lower = templated.to_ascii_lowercase();
    if PLACEHOLDER_MARKERS.iter().any(|marker| lower.contains(marker)) {
        return None;
    }
    resolve_link(&templated, base)
}

/// Resolves an href against `base`.
///
/// Handles protocol-relative URLs and rejects `data:` and `javascript:`
/// references. Only `http` and `https` results are returned.
#[must_use]
pub fn resolve_link(raw: &str, base: &Url) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.starts_with("data:") || trimmed.starts_with("javascript:") {
        return None;
    }

    let resolved = if let Some(rest) = trimmed.strip_prefix("//") {
        Url::parse(&format!("{}://{rest}", base.scheme())).ok()?
    } else {
        base.join(trimmed).ok()?
    };
    matches!(resolved.scheme(), "http" | "https").then(|| resolved.to_string())
}

#[cfg(test)]
mod tests {
    use scraper::Html;

    use super::*;

    fn base() -> Url {
        Url::parse("https://shop.example.fr/collections/robes").unwrap()
    }

    #[test]
    fn resolves_relative_and_protocol_relative() {
        assert_eq!(
            resolve_link("/img/a.jpg", &base()).as_deref(),
            Some("https://shop.example.fr/img/a.jpg")
        );
        assert_eq!(
            resolve_link("//cdn.example.com/b.jpg", &base()).as_deref(),
            Some("https://cdn.example.com/b.jpg")
        );
    }

    #[test]
    fn fills_shopify_width_template() {
        assert_eq!(
            resolve_image("//cdn.shopify.com/s/files/robe_{width}x.jpg", &base()).as_deref(),
            Some("https://cdn.shopify.com/s/files/robe_1024x.jpg")
        );
    }

    #[test]
    fn rejects_placeholders_and_data_uris() {
        assert!(resolve_image("/assets/placeholder.png", &base()).is_none());
        assert!(resolve_image("/assets/blank.gif", &base()).is_none());
        assert!(resolve_image("data:image/gif;base64,R0lGOD", &base()).is_none());
        assert!(resolve_image("", &base()).is_none());
    }

    #[test]
    fn links_keep_handles_that_look_like_placeholders() {
        for href in [
            "/products/bonnet-cotes-1x1",
            "/products/headset-spacer",
            "/products/loading-dock-bag",
            "/products/no-image-tee",
        ] {
            assert_eq!(
                resolve_link(href, &base()),
                Some(format!("https://shop.example.fr{href}")),
                "href {href}"
            );
        }
        assert!(resolve_link("javascript:void(0)", &base()).is_none());
        assert!(resolve_link("  ", &base()).is_none());
    }

    #[test]
    fn lazy_attribute_wins_over_placeholder_src() {
        let html = Html::parse_fragment(
            r#"<div><img src="/assets/lazy-load.gif" data-src="/img/real.jpg"></div>"#,
        );
        assert_eq!(
            extract_images(html.root_element(), &base()),
            vec!["https://shop.example.fr/img/real.jpg".to_string()]
        );
    }

    #[test]
    fn srcset_takes_first_candidate_and_dedups() {
        let html = Html::parse_fragment(
            r#"<div>
                 <img srcset="/img/a-400.jpg 400w, /img/a-800.jpg 800w">
                 <img src="/img/a-400.jpg">
                 <img src="/img/b.jpg">
               </div>"#,
        );
        assert_eq!(
            extract_images(html.root_element(), &base()),
            vec![
                "https://shop.example.fr/img/a-400.jpg".to_string(),
                "https://shop.example.fr/img/b.jpg".to_string(),
            ]
        );
    }
}
