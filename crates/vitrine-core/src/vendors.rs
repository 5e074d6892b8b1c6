use std::collections::HashSet;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::site::Platform;
use crate::ConfigError;

/// A storefront owner whose site is synchronized. The unit of catalog
/// partitioning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vendor {
    pub id: i64,
    pub public_id: Uuid,
    pub name: String,
    pub slug: String,
    /// Listing or storefront entry URL the sync starts from.
    pub site_url: String,
    /// Skips classification when set.
    pub platform_hint: Option<Platform>,
    pub is_active: bool,
    pub last_synced_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorConfig {
    pub name: String,
    pub site_url: String,
    #[serde(default)]
    pub platform: Option<Platform>,
    #[serde(default = "default_active")]
    pub active: bool,
    pub notes: Option<String>,
}

fn default_active() -> bool {
    true
}

impl VendorConfig {
    /// Generate a URL-safe slug from the vendor name.
    #[must_use]
    pub fn slug(&self) -> String {
        self.name
            .to_lowercase()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' {
                    c
                } else if c == ' ' {
                    '-'
                } else {
                    '\0'
                }
            })
            .filter(|&c| c != '\0')
            .collect::<String>()
            .split('-')
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("-")
    }
}

#[derive(Debug, Deserialize)]
pub struct VendorsFile {
    pub vendors: Vec<VendorConfig>,
}

/// Load and validate the vendors configuration from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_vendors(path: &Path) -> Result<VendorsFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::VendorsFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let vendors_file: VendorsFile = serde_yaml::from_str(&content)?;

    validate_vendors(&vendors_file)?;

    Ok(vendors_file)
}

fn validate_vendors(vendors_file: &VendorsFile) -> Result<(), ConfigError> {
    let mut seen_names = HashSet::new();
    let mut seen_slugs = HashSet::new();

    for vendor in &vendors_file.vendors {
        if vendor.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "vendor name must be non-empty".to_string(),
            ));
        }

        let url = vendor.site_url.trim();
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(ConfigError::Validation(format!(
                "vendor '{}' has invalid site_url '{}'; must be an http(s) URL",
                vendor.name, vendor.site_url
            )));
        }

        if !seen_names.insert(vendor.name.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate vendor name: '{}'",
                vendor.name
            )));
        }

        let slug = vendor.slug();
        if !seen_slugs.insert(slug.clone()) {
            return Err(ConfigError::Validation(format!(
                "duplicate vendor slug: '{}' (from vendor '{}')",
                slug, vendor.name
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "vendors_test.rs"]
mod tests;
