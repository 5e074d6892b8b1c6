use thiserror::Error;
use vitrine_core::StoreError;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("vendor {vendor_id} already has a sync in progress")]
    AlreadyRunning { vendor_id: i64 },

    #[error("vendor {0} not found")]
    VendorNotFound(i64),

    #[error("sync coordinator is shutting down")]
    ShuttingDown,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Failure to obtain any product data from a page.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("failed to load {url}: {source}")]
    Capture {
        url: String,
        #[source]
        source: vitrine_scraper::SessionError,
    },

    #[error(transparent)]
    Extract(#[from] vitrine_scraper::ScraperError),
}
