use std::path::Path;

use super::*;

fn vendor(name: &str, site_url: &str) -> VendorConfig {
    VendorConfig {
        name: name.to_string(),
        site_url: site_url.to_string(),
        platform: None,
        active: true,
        notes: None,
    }
}

#[test]
fn slug_simple_name() {
    assert_eq!(vendor("Maison Lune", "https://a.example").slug(), "maison-lune");
}

#[test]
fn slug_strips_punctuation_and_accents() {
    assert_eq!(vendor("L'Atelier Ébène", "https://a.example").slug(), "latelier-bne");
}

#[test]
fn validate_rejects_empty_name() {
    let file = VendorsFile {
        vendors: vec![vendor("  ", "https://a.example")],
    };
    let err = validate_vendors(&file).unwrap_err();
    assert!(err.to_string().contains("non-empty"));
}

#[test]
fn validate_rejects_non_http_url() {
    let file = VendorsFile {
        vendors: vec![vendor("Maison Lune", "ftp://a.example")],
    };
    let err = validate_vendors(&file).unwrap_err();
    assert!(err.to_string().contains("invalid site_url"));
}

#[test]
fn validate_rejects_duplicate_name() {
    let file = VendorsFile {
        vendors: vec![
            vendor("Maison Lune", "https://a.example"),
            vendor("maison lune", "https://b.example"),
        ],
    };
    let err = validate_vendors(&file).unwrap_err();
    assert!(err.to_string().contains("duplicate vendor name"));
}

#[test]
fn validate_rejects_duplicate_slug() {
    let file = VendorsFile {
        vendors: vec![
            vendor("Maison Lune", "https://a.example"),
            vendor("Maison--Lune", "https://b.example"),
        ],
    };
    let err = validate_vendors(&file).unwrap_err();
    assert!(err.to_string().contains("duplicate vendor"));
}

#[test]
fn yaml_defaults_active_and_parses_platform() {
    let yaml = "vendors:\n  - name: Maison Lune\n    site_url: https://maisonlune.example/collections/all\n    platform: shopify\n";
    let file: VendorsFile = serde_yaml::from_str(yaml).unwrap();
    assert!(file.vendors[0].active);
    assert_eq!(file.vendors[0].platform, Some(Platform::Shopify));
}

#[test]
fn load_vendors_from_real_file() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("config")
        .join("vendors.yaml");
    let result = load_vendors(&path);
    assert!(result.is_ok(), "failed to load vendors.yaml: {result:?}");
    assert!(!result.unwrap().vendors.is_empty());
}
