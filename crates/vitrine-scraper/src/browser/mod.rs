//! Page-session seam: navigation, waits, in-page evaluation, and content.
//!
//! The pipeline only talks to [`BrowserProvider`] and [`PageSession`]. Two
//! providers ship with the crate: [`HttpBrowser`] fetches static HTML over
//! HTTP and emulates global lookups from inline scripts, and
//! [`FixtureBrowser`] serves canned pages for tests and offline replays.

mod fixture;
mod globals;
mod http;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::SessionError;

pub use fixture::{FixtureBrowser, FixturePage, SessionLog};
pub use globals::{lookup_path, scan_globals};
pub use http::HttpBrowser;

/// Options applied when a session is opened.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub user_agent: String,
    /// Default navigation timeout for listing pages.
    pub navigation_timeout: Duration,
    pub max_retries: u32,
    pub backoff_base_secs: u64,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            user_agent: "vitrine/0.1 (catalog-sync)".to_string(),
            navigation_timeout: Duration::from_secs(30),
            max_retries: 2,
            backoff_base_secs: 2,
        }
    }
}

/// Lifecycle event a navigation waits for before returning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaitUntil {
    Load,
    #[default]
    DomContentLoaded,
    NetworkIdle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigateOptions {
    pub wait_until: WaitUntil,
    pub timeout: Duration,
}

/// A condition [`PageSession::wait_for`] blocks on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitCondition {
    /// At least one element matches the CSS selector.
    Selector(String),
    /// No network activity for a short quiet window.
    NetworkIdle,
    /// Fixed settle delay.
    Delay(Duration),
}

impl std::fmt::Display for WaitCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WaitCondition::Selector(s) => write!(f, "selector `{s}`"),
            WaitCondition::NetworkIdle => write!(f, "network idle"),
            WaitCondition::Delay(d) => write!(f, "delay {}ms", d.as_millis()),
        }
    }
}

/// Opens scriptable page sessions.
#[async_trait]
pub trait BrowserProvider: Send + Sync {
    /// # Errors
    ///
    /// Returns [`SessionError::Launch`] when no session can be established.
    async fn open(&self, options: &SessionOptions) -> Result<Box<dyn PageSession>, SessionError>;
}

/// One scriptable page context. Steps are issued serially.
#[async_trait]
pub trait PageSession: Send {
    async fn navigate(&mut self, url: &str, options: NavigateOptions) -> Result<(), SessionError>;

    async fn wait_for(
        &mut self,
        condition: &WaitCondition,
        timeout: Duration,
    ) -> Result<(), SessionError>;

    /// Evaluates a dotted global path (e.g. `ShopifyAnalytics.meta.product`)
    /// in the page. Missing values evaluate to `Value::Null`.
    async fn evaluate(&mut self, expression: &str) -> Result<serde_json::Value, SessionError>;

    /// Scrolls to the end of the document so lazy-loaded content renders.
    async fn scroll_to_bottom(&mut self) -> Result<(), SessionError>;

    /// Serialized HTML of the current document.
    async fn content(&mut self) -> Result<String, SessionError>;

    /// URL of the current document after redirects.
    fn current_url(&self) -> Option<String>;

    /// Releases the session. Calling it more than once is a no-op.
    async fn close(&mut self) -> Result<(), SessionError>;
}
