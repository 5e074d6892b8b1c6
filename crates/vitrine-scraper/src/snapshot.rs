//! Capturing a loaded page into an owned, session-free snapshot.
//!
//! Extraction is synchronous and works on [`PageSnapshot`] values, so no
//! parsed DOM is ever held across an await point.

use std::collections::BTreeMap;
use std::time::Duration;

use serde_json::Value;

use crate::browser::{
    lookup_path, scan_globals, NavigateOptions, PageSession, WaitCondition, WaitUntil,
};
use crate::error::SessionError;
use crate::extract::all_global_expressions;

/// HTML and captured globals of one page at one point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct PageSnapshot {
    /// URL after redirects.
    pub url: String,
    pub html: String,
    /// Non-null results of evaluating each global expression, keyed by expression.
    pub globals: BTreeMap<String, Value>,
}

impl PageSnapshot {
    /// Builds a snapshot straight from HTML, resolving globals from inline
    /// scripts. Used for offline extraction and tests.
    #[must_use]
    pub fn from_html(url: impl Into<String>, html: impl Into<String>) -> Self {
        let html = html.into();
        let tree = scan_globals(&html);
        let globals = all_global_expressions()
            .into_iter()
            .filter_map(|expression| {
                let value = lookup_path(&tree, expression);
                (!value.is_null()).then(|| (expression.to_string(), value))
            })
            .collect();
        Self {
            url: url.into(),
            html,
            globals,
        }
    }

    #[must_use]
    pub fn global(&self, expression: &str) -> Option<&Value> {
        self.globals.get(expression)
    }
}

#[derive(Debug, Clone)]
pub struct CaptureOptions {
    pub navigation: NavigateOptions,
    /// Upper bound on the "network settled" wait.
    pub settle_timeout: Duration,
    /// Scroll to the bottom before reading content, to trigger lazy loading.
    pub scroll: bool,
    /// Optional element to wait for before reading content.
    pub ready_selector: Option<String>,
}

impl CaptureOptions {
    #[must_use]
    pub fn listing(timeout: Duration) -> Self {
        Self {
            navigation: NavigateOptions {
                wait_until: WaitUntil::DomContentLoaded,
                timeout,
            },
            settle_timeout: Duration::from_secs(5),
            scroll: true,
            ready_selector: None,
        }
    }

    #[must_use]
    pub fn detail(timeout: Duration) -> Self {
        Self {
            navigation: NavigateOptions {
                wait_until: WaitUntil::DomContentLoaded,
                timeout,
            },
            settle_timeout: Duration::from_secs(3),
            scroll: false,
            ready_selector: None,
        }
    }
}

/// Navigates `session` to `url` and captures a snapshot.
///
/// Timeouts on navigation, settle, and selector waits are logged and the
/// capture continues with whatever the page exposes.
///
/// # Errors
///
/// Returns the navigation error when nothing could be loaded at all, or any
/// non-timeout session failure.
pub async fn capture_page(
    session: &mut dyn PageSession,
    url: &str,
    options: &CaptureOptions,
) -> Result<PageSnapshot, SessionError> {
    let nav_timeout = match session.navigate(url, options.navigation).await {
        Ok(()) => None,
        Err(e) if e.is_timeout() => {
            tracing::warn!(url, error = %e, "navigation timed out, continuing with partial page");
            Some(e)
        }
        Err(e) => return Err(e),
    };

    if let Err(e) = session
        .wait_for(&WaitCondition::NetworkIdle, options.settle_timeout)
        .await
    {
        tracing::debug!(url, error = %e, "network did not settle");
    }

    if let Some(selector) = &options.ready_selector {
        if let Err(e) = session
            .wait_for(
                &WaitCondition::Selector(selector.clone()),
                options.settle_timeout,
            )
            .await
        {
            tracing::warn!(url, error = %e, "ready selector never appeared");
        }
    }

    if options.scroll {
        if let Err(e) = session.scroll_to_bottom().await {
            tracing::debug!(url, error = %e, "scroll failed");
        }
    }

    let html = match session.content().await {
        Ok(html) => html,
        Err(e) => return Err(nav_timeout.unwrap_or(e)),
    };

    let mut globals = BTreeMap::new();
    for expression in all_global_expressions() {
        match session.evaluate(expression).await {
            Ok(Value::Null) => {}
            Ok(value) => {
                globals.insert(expression.to_string(), value);
            }
            Err(e) => tracing::debug!(url, expression, error = %e, "global lookup failed"),
        }
    }

    Ok(PageSnapshot {
        url: session.current_url().unwrap_or_else(|| url.to_string()),
        html,
        globals,
    })
}
