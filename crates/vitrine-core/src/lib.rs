pub mod app_config;
pub mod catalog;
pub mod config;
pub mod products;
pub mod site;
pub mod store;
pub mod sync;
pub mod vendors;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use catalog::{CatalogFields, CatalogRecord, NewCatalogRecord};
pub use config::{load_app_config, load_app_config_from_env};
pub use products::{derive_variants, ExtractedProduct, ProductVariant};
pub use site::{Platform, SiteProfile};
pub use store::{CatalogStore, StoreError, SyncRunStore};
pub use sync::{IncompletePolicy, SyncProgress, SyncRun, SyncRunSummary, SyncState};
pub use vendors::{load_vendors, Vendor, VendorConfig, VendorsFile};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read vendors file {path}: {source}")]
    VendorsFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse vendors file: {0}")]
    VendorsFileParse(#[from] serde_yaml::Error),

    #[error("vendor config validation failed: {0}")]
    Validation(String),
}
