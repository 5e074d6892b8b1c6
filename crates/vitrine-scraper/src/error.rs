use thiserror::Error;

/// Failures raised by a [`crate::browser::PageSession`] or its provider.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("could not establish browser session: {0}")]
    Launch(String),

    #[error("navigation to {url} timed out after {timeout_ms}ms")]
    NavigationTimeout { url: String, timeout_ms: u64 },

    #[error("wait for {condition} timed out after {timeout_ms}ms")]
    SelectorWaitTimeout { condition: String, timeout_ms: u64 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("rate limited by {domain} (retry after {retry_after_secs}s)")]
    RateLimited {
        domain: String,
        retry_after_secs: u64,
    },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("page evaluation failed for `{expression}`: {reason}")]
    Evaluate { expression: String, reason: String },

    #[error("no page loaded in session")]
    NoPage,

    #[error("session already closed")]
    Closed,
}

impl SessionError {
    /// Timeouts degrade to partial data rather than failing a run.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            SessionError::NavigationTimeout { .. } | SessionError::SelectorWaitTimeout { .. }
        ) || matches!(self, SessionError::Http(e) if e.is_timeout())
    }
}

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("parse error in {context}: {reason}")]
    Parse { context: String, reason: String },

    #[error("enrichment failed for {url}: {reason}")]
    Enrichment { url: String, reason: String },

    #[error("invalid page URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },
}
