use serde::{Deserialize, Serialize};

/// Commerce platform a storefront runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Shopify,
    WooCommerce,
    Magento,
    PrestaShop,
    Generic,
}

impl Platform {
    /// Platforms with in-page signatures, in the order the classifier checks them.
    pub const SIGNATURE_ORDER: [Platform; 4] = [
        Platform::Shopify,
        Platform::WooCommerce,
        Platform::Magento,
        Platform::PrestaShop,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Shopify => "shopify",
            Platform::WooCommerce => "woocommerce",
            Platform::Magento => "magento",
            Platform::PrestaShop => "prestashop",
            Platform::Generic => "generic",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "shopify" => Ok(Platform::Shopify),
            "woocommerce" | "woo" => Ok(Platform::WooCommerce),
            "magento" => Ok(Platform::Magento),
            "prestashop" | "presta" => Ok(Platform::PrestaShop),
            "generic" => Ok(Platform::Generic),
            other => Err(format!("unknown platform '{other}'")),
        }
    }
}

/// Result of classifying a storefront. Produced once per sync run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SiteProfile {
    pub platform: Platform,
    /// Classifier confidence in `[0.0, 1.0]`.
    pub confidence: f32,
}

impl SiteProfile {
    #[must_use]
    pub fn new(platform: Platform, confidence: f32) -> Self {
        Self {
            platform,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// Fallback profile used when no platform signature matched.
    #[must_use]
    pub fn generic() -> Self {
        Self::new(Platform::Generic, 0.0)
    }
}
