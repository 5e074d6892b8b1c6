use std::net::SocketAddr;
use std::path::PathBuf;

use crate::sync::IncompletePolicy;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub vendors_path: PathBuf,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub scraper_request_timeout_secs: u64,
    pub scraper_user_agent: String,
    pub scraper_max_retries: u32,
    pub scraper_retry_backoff_base_secs: u64,
    /// Navigation timeout for enrichment detail pages. Kept below the listing
    /// timeout so a single slow product page cannot stall a run.
    pub enrichment_timeout_secs: u64,
    pub max_enrichment: usize,
    pub max_dom_candidates: usize,
    pub single_page_threshold: i32,
    pub max_concurrent_vendors: usize,
    pub sync_concurrency: usize,
    pub incomplete_policy: IncompletePolicy,
    /// Pending or in-progress runs older than this are failed on recovery.
    pub sync_stale_after_mins: u64,
    /// Cron expression for the recurring sync job. `None` disables the job.
    pub sync_cron: Option<String>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("vendors_path", &self.vendors_path)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field(
                "scraper_request_timeout_secs",
                &self.scraper_request_timeout_secs,
            )
            .field("scraper_user_agent", &self.scraper_user_agent)
            .field("scraper_max_retries", &self.scraper_max_retries)
            .field(
                "scraper_retry_backoff_base_secs",
                &self.scraper_retry_backoff_base_secs,
            )
            .field("enrichment_timeout_secs", &self.enrichment_timeout_secs)
            .field("max_enrichment", &self.max_enrichment)
            .field("max_dom_candidates", &self.max_dom_candidates)
            .field("single_page_threshold", &self.single_page_threshold)
            .field("max_concurrent_vendors", &self.max_concurrent_vendors)
            .field("sync_concurrency", &self.sync_concurrency)
            .field("incomplete_policy", &self.incomplete_policy)
            .field("sync_stale_after_mins", &self.sync_stale_after_mins)
            .field("sync_cron", &self.sync_cron)
            .finish()
    }
}
