use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A product reconstructed from a vendor's storefront.
///
/// Values of this type only leave extraction once they pass
/// [`ExtractedProduct::passes_hard_gate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedProduct {
    /// Identifier stable on the vendor's own site; the upsert key together
    /// with the vendor id.
    pub external_id: String,
    pub name: String,
    pub price: Decimal,
    /// ISO 4217 code when the page exposes one (e.g. `"EUR"`).
    pub currency: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub image_urls: Vec<String>,
    /// Detail-page URL, preferred deduplication key.
    pub product_url: Option<String>,
    pub sku: Option<String>,
    pub brand: Option<String>,
    pub category: Option<String>,
    /// Ordered set of distinct color names.
    pub colors: Vec<String>,
    /// Ordered set of distinct size labels.
    pub sizes: Vec<String>,
    pub variants: Vec<ProductVariant>,
    pub available: Option<bool>,
    pub weight: Option<String>,
    pub dimensions: Option<String>,
    /// Free-form specification table (e.g. `"Matière" -> "Coton"`).
    pub attributes: BTreeMap<String, String>,
    /// Completeness score, 0-100. Advisory until the quality scorer runs.
    pub quality_score: u8,
}

impl ExtractedProduct {
    /// Creates a product with only the required fields set.
    #[must_use]
    pub fn new(external_id: impl Into<String>, name: impl Into<String>, price: Decimal) -> Self {
        Self {
            external_id: external_id.into(),
            name: name.into(),
            price,
            currency: None,
            description: None,
            image_url: None,
            image_urls: Vec::new(),
            product_url: None,
            sku: None,
            brand: None,
            category: None,
            colors: Vec::new(),
            sizes: Vec::new(),
            variants: Vec::new(),
            available: None,
            weight: None,
            dimensions: None,
            attributes: BTreeMap::new(),
            quality_score: 0,
        }
    }

    /// `true` when the product has a non-blank name and a strictly positive price.
    #[must_use]
    pub fn passes_hard_gate(&self) -> bool {
        !self.name.trim().is_empty() && self.price > Decimal::ZERO
    }

    /// Adds a color if it is non-blank and not already present (case-insensitive).
    pub fn add_color(&mut self, color: &str) {
        push_distinct(&mut self.colors, color);
    }

    /// Adds a size if it is non-blank and not already present (case-insensitive).
    pub fn add_size(&mut self, size: &str) {
        push_distinct(&mut self.sizes, size);
    }

    /// Adds an image URL unless the exact URL is already present. The first
    /// image added also becomes `image_url` when that field is empty.
    pub fn add_image(&mut self, url: &str) {
        if url.is_empty() || self.image_urls.iter().any(|u| u == url) {
            return;
        }
        if self.image_url.is_none() {
            self.image_url = Some(url.to_string());
        }
        self.image_urls.push(url.to_string());
    }

    /// Rebuilds `variants` from the current color and size axes.
    ///
    /// Platform-native variants already on the product are used as a lookup
    /// for per-variant SKU, image, and price overrides.
    pub fn rederive_variants(&mut self) {
        let known = std::mem::take(&mut self.variants);
        self.variants = derive_variants(
            &self.external_id,
            &self.colors,
            &self.sizes,
            self.price,
            &known,
        );
    }
}

/// A purchasable combination of a product's option axes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductVariant {
    pub id: String,
    pub color: Option<String>,
    pub size: Option<String>,
    pub price: Option<Decimal>,
    pub image_url: Option<String>,
    pub sku: Option<String>,
}

/// Derives the variant list for a product from its option axes.
///
/// - both axes populated: the full color x size cross product
/// - one axis populated: one variant per value on that axis
/// - neither: empty
///
/// Every derived variant carries `base_price` unless a platform variant in
/// `known` with the same option pair supplies its own price.
#[must_use]
pub fn derive_variants(
    external_id: &str,
    colors: &[String],
    sizes: &[String],
    base_price: Decimal,
    known: &[ProductVariant],
) -> Vec<ProductVariant> {
    let pairs: Vec<(Option<&String>, Option<&String>)> = match (colors.is_empty(), sizes.is_empty())
    {
        (false, false) => colors
            .iter()
            .flat_map(|c| sizes.iter().map(move |s| (Some(c), Some(s))))
            .collect(),
        (false, true) => colors.iter().map(|c| (Some(c), None)).collect(),
        (true, false) => sizes.iter().map(|s| (None, Some(s))).collect(),
        (true, true) => Vec::new(),
    };

    pairs
        .into_iter()
        .map(|(color, size)| {
            let matched = known.iter().find(|v| {
                eq_opt(v.color.as_deref(), color.map(String::as_str))
                    && eq_opt(v.size.as_deref(), size.map(String::as_str))
            });
            ProductVariant {
                id: variant_id(external_id, color.map(String::as_str), size.map(String::as_str)),
                color: color.cloned(),
                size: size.cloned(),
                price: Some(
                    matched
                        .and_then(|v| v.price)
                        .filter(|p| *p > Decimal::ZERO)
                        .unwrap_or(base_price),
                ),
                image_url: matched.and_then(|v| v.image_url.clone()),
                sku: matched.and_then(|v| v.sku.clone()),
            }
        })
        .collect()
}

fn variant_id(external_id: &str, color: Option<&str>, size: Option<&str>) -> String {
    let mut id = external_id.to_string();
    for part in [color, size].into_iter().flatten() {
        id.push(':');
        id.push_str(&slugify(part));
    }
    id
}

fn eq_opt(a: Option<&str>, b: Option<&str>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
        (None, None) => true,
        _ => false,
    }
}

fn push_distinct(values: &mut Vec<String>, candidate: &str) {
    let trimmed = candidate.trim();
    if trimmed.is_empty() {
        return;
    }
    if values.iter().any(|v| v.eq_ignore_ascii_case(trimmed)) {
        return;
    }
    values.push(trimmed.to_string());
}

/// Lowercases and collapses everything but ASCII alphanumerics into single dashes.
#[must_use]
pub fn slugify(value: &str) -> String {
    value
        .to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn hard_gate_rejects_blank_name() {
        let p = ExtractedProduct::new("1", "   ", dec("10"));
        assert!(!p.passes_hard_gate());
    }

    #[test]
    fn hard_gate_rejects_zero_and_negative_price() {
        assert!(!ExtractedProduct::new("1", "Tee", Decimal::ZERO).passes_hard_gate());
        assert!(!ExtractedProduct::new("1", "Tee", dec("-1")).passes_hard_gate());
        assert!(ExtractedProduct::new("1", "Tee", dec("0.01")).passes_hard_gate());
    }

    #[test]
    fn cross_product_when_both_axes_present() {
        let variants = derive_variants(
            "p1",
            &strings(&["Rouge", "Bleu"]),
            &strings(&["S", "M"]),
            dec("19.90"),
            &[],
        );
        assert_eq!(variants.len(), 4);
        let pairs: Vec<_> = variants
            .iter()
            .map(|v| (v.color.clone().unwrap(), v.size.clone().unwrap()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("Rouge".to_string(), "S".to_string()),
                ("Rouge".to_string(), "M".to_string()),
                ("Bleu".to_string(), "S".to_string()),
                ("Bleu".to_string(), "M".to_string()),
            ]
        );
        assert!(variants.iter().all(|v| v.price == Some(dec("19.90"))));
        assert_eq!(variants[0].id, "p1:rouge:s");
    }

    #[test]
    fn single_axis_variants() {
        let variants = derive_variants("p1", &[], &strings(&["S", "M", "L"]), dec("5"), &[]);
        assert_eq!(variants.len(), 3);
        assert!(variants.iter().all(|v| v.color.is_none()));
        assert_eq!(variants[2].id, "p1:l");
    }

    #[test]
    fn no_axes_means_no_variants() {
        assert!(derive_variants("p1", &[], &[], dec("5"), &[]).is_empty());
    }

    #[test]
    fn known_variant_overrides_are_carried_over() {
        let known = vec![ProductVariant {
            id: "native-1".to_string(),
            color: Some("rouge".to_string()),
            size: Some("S".to_string()),
            price: Some(dec("21.00")),
            image_url: Some("https://cdn.example.com/red.jpg".to_string()),
            sku: Some("TEE-R-S".to_string()),
        }];
        let variants = derive_variants(
            "p1",
            &strings(&["Rouge"]),
            &strings(&["S", "M"]),
            dec("19.90"),
            &known,
        );
        assert_eq!(variants[0].sku.as_deref(), Some("TEE-R-S"));
        assert_eq!(variants[0].price, Some(dec("21.00")));
        assert_eq!(variants[1].sku, None);
        assert_eq!(variants[1].price, Some(dec("19.90")));
    }

    #[test]
    fn add_color_keeps_order_and_distinctness() {
        let mut p = ExtractedProduct::new("1", "Tee", dec("10"));
        p.add_color("Rouge");
        p.add_color(" rouge ");
        p.add_color("");
        p.add_color("Bleu");
        assert_eq!(p.colors, strings(&["Rouge", "Bleu"]));
    }

    #[test]
    fn add_image_sets_primary_and_dedups_exact_urls() {
        let mut p = ExtractedProduct::new("1", "Tee", dec("10"));
        p.add_image("https://a.example/1.jpg");
        p.add_image("https://a.example/2.jpg");
        p.add_image("https://a.example/1.jpg");
        assert_eq!(p.image_url.as_deref(), Some("https://a.example/1.jpg"));
        assert_eq!(p.image_urls.len(), 2);
    }

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("Bleu Marine / XL"), "bleu-marine-xl");
    }
}
