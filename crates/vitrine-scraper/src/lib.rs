pub mod browser;
pub mod classify;
pub mod dedup;
pub mod enrich;
pub mod error;
pub mod extract;
pub mod fields;
pub mod json_walk;
pub(crate) mod retry;
pub mod quality;
pub mod snapshot;

pub use browser::{
    BrowserProvider, NavigateOptions, PageSession, SessionOptions, WaitCondition, WaitUntil,
};
pub use classify::{classify, classify_url};
pub use dedup::dedup_products;
pub use enrich::{enrich_products, merge_detail, EnrichOptions};
pub use error::{ScraperError, SessionError};
pub use extract::{extract_products, ExtractOptions, ExtractionTier, PageKindWeights, PageMode};
pub use quality::{score_product, QualityReport};
pub use snapshot::{capture_page, CaptureOptions, PageSnapshot};
