//! Completeness scoring for extracted products.

use rust_decimal::Decimal;
use serde::Serialize;
use vitrine_core::ExtractedProduct;

/// Scores at or above this are considered complete.
pub const COMPLETE_THRESHOLD: u8 = 70;

const MIN_DESCRIPTION_CHARS: usize = 50;

/// Outcome of scoring one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QualityReport {
    pub score: u8,
    pub is_complete: bool,
    /// Checklist items that earned no points.
    pub missing: Vec<&'static str>,
}

fn present(value: Option<&String>) -> bool {
    value.is_some_and(|v| !v.trim().is_empty())
}

/// Scores `product` against the weighted checklist and stores the score on it.
pub fn score_product(product: &mut ExtractedProduct) -> QualityReport {
    let checks: [(&'static str, u8, bool); 8] = [
        ("name", 20, !product.name.trim().is_empty()),
        ("price", 20, product.price > Decimal::ZERO),
        (
            "description",
            15,
            product
                .description
                .as_deref()
                .is_some_and(|d| d.trim().chars().count() >= MIN_DESCRIPTION_CHARS),
        ),
        (
            "image",
            15,
            present(product.image_url.as_ref()) || !product.image_urls.is_empty(),
        ),
        ("sizes", 10, !product.sizes.is_empty()),
        ("category", 8, present(product.category.as_ref())),
        ("sku", 6, present(product.sku.as_ref())),
        ("brand", 6, present(product.brand.as_ref())),
    ];

    let mut score = 0u8;
    let mut missing = Vec::new();
    for (field, weight, ok) in checks {
        if ok {
            score += weight;
        } else {
            missing.push(field);
        }
    }

    product.quality_score = score;
    QualityReport {
        score,
        is_complete: score >= COMPLETE_THRESHOLD,
        missing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare() -> ExtractedProduct {
        ExtractedProduct::new("1", "Robe Lin", "89".parse().unwrap())
    }

    fn full() -> ExtractedProduct {
        let mut p = bare();
        p.description = Some("Robe ample en lin lavé, coupe droite, longueur midi, poches.".into());
        p.image_url = Some("https://a.fr/robe.jpg".into());
        p.sizes = vec!["S".into(), "M".into()];
        p.category = Some("Robes".into());
        p.sku = Some("RL-01".into());
        p.brand = Some("Maison Lune".into());
        p
    }

    #[test]
    fn full_product_scores_100() {
        let mut p = full();
        let report = score_product(&mut p);
        assert_eq!(report.score, 100);
        assert!(report.is_complete);
        assert!(report.missing.is_empty());
        assert_eq!(p.quality_score, 100);
    }

    #[test]
    fn bare_product_is_incomplete() {
        let mut p = bare();
        let report = score_product(&mut p);
        assert_eq!(report.score, 40);
        assert!(!report.is_complete);
        assert_eq!(
            report.missing,
            vec!["description", "image", "sizes", "category", "sku", "brand"]
        );
    }

    #[test]
    fn short_description_earns_nothing() {
        let mut p = bare();
        p.description = Some("Lin.".into());
        assert_eq!(score_product(&mut p).score, 40);
    }

    #[test]
    fn threshold_is_inclusive() {
        // 20 + 20 + 15 + 15 = 70
        let mut p = bare();
        p.description = Some("x".repeat(50));
        p.image_urls = vec!["https://a.fr/1.jpg".into()];
        let report = score_product(&mut p);
        assert_eq!(report.score, 70);
        assert!(report.is_complete);
    }

    #[test]
    fn adding_a_field_never_lowers_the_score() {
        type Fill = fn(&mut ExtractedProduct);
        let fills: [Fill; 6] = [
            |p| p.description = Some("d".repeat(60)),
            |p| p.image_url = Some("https://a.fr/i.jpg".into()),
            |p| p.sizes = vec!["L".into()],
            |p| p.category = Some("Robes".into()),
            |p| p.sku = Some("RL".into()),
            |p| p.brand = Some("Lune".into()),
        ];
        // Every subset of the optional fields, compared with each superset
        // that adds one more field.
        for mask in 0u32..(1 << fills.len()) {
            let mut base = bare();
            for (i, fill) in fills.iter().enumerate() {
                if mask & (1 << i) != 0 {
                    fill(&mut base);
                }
            }
            let base_score = score_product(&mut base.clone()).score;
            for (i, fill) in fills.iter().enumerate() {
                let mut more = base.clone();
                fill(&mut more);
                let more_score = score_product(&mut more).score;
                assert!(more_score >= base_score, "mask {mask:b} field {i}");
            }
        }
    }
}
