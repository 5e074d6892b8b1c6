//! Catalog synchronization: runs the extraction pipeline for a vendor and
//! reconciles the result against the persistent catalog.

pub mod coordinator;
pub mod error;
pub mod memory;
pub mod pipeline;
pub mod synchronizer;

use vitrine_core::{CatalogStore, SyncRunStore};

pub use coordinator::SyncCoordinator;
pub use error::{CollectError, SyncError};
pub use memory::MemoryStore;
pub use pipeline::{collect_products, run_vendor_sync, Collected, PipelineConfig};
pub use synchronizer::{sync_products, BatchResult, ProductOutcome, ScoredProduct, SyncOptions};

/// Everything the pipeline needs from storage.
pub trait SyncStore: CatalogStore + SyncRunStore {}

impl<T: CatalogStore + SyncRunStore + ?Sized> SyncStore for T {}
