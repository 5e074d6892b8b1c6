//! In-memory provider serving canned pages.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::globals::{lookup_path, scan_globals};
use super::{BrowserProvider, NavigateOptions, PageSession, SessionOptions, WaitCondition};
use crate::error::SessionError;

/// A canned page. Globals are scanned from inline scripts unless supplied.
#[derive(Debug, Clone, Default)]
pub struct FixturePage {
    pub html: String,
    pub globals: Option<Value>,
    /// Navigation to this page times out.
    pub times_out: bool,
}

impl FixturePage {
    #[must_use]
    pub fn html(html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_globals(mut self, globals: Value) -> Self {
        self.globals = Some(globals);
        self
    }

    #[must_use]
    pub fn timing_out() -> Self {
        Self {
            times_out: true,
            ..Self::default()
        }
    }
}

/// Shared record of what sessions did, for assertions.
#[derive(Debug, Default)]
pub struct SessionLog {
    opened: AtomicUsize,
    closed: AtomicUsize,
    navigations: Mutex<Vec<String>>,
}

impl SessionLog {
    #[must_use]
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn navigations(&self) -> Vec<String> {
        self.navigations
            .lock()
            .map(|v| v.clone())
            .unwrap_or_default()
    }
}

#[derive(Debug, Default, Clone)]
pub struct FixtureBrowser {
    pages: Arc<HashMap<String, FixturePage>>,
    fail_launch: bool,
    log: Arc<SessionLog>,
}

impl FixtureBrowser {
    #[must_use]
    pub fn new<I, S>(pages: I) -> Self
    where
        I: IntoIterator<Item = (S, FixturePage)>,
        S: Into<String>,
    {
        let pages = pages
            .into_iter()
            .map(|(url, page)| (normalize(&url.into()), page))
            .collect();
        Self {
            pages: Arc::new(pages),
            fail_launch: false,
            log: Arc::new(SessionLog::default()),
        }
    }

    /// A provider whose `open` always fails.
    #[must_use]
    pub fn failing_launch() -> Self {
        Self {
            fail_launch: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn log(&self) -> Arc<SessionLog> {
        Arc::clone(&self.log)
    }
}

#[async_trait]
impl BrowserProvider for FixtureBrowser {
    async fn open(&self, _options: &SessionOptions) -> Result<Box<dyn PageSession>, SessionError> {
        if self.fail_launch {
            return Err(SessionError::Launch("fixture browser unavailable".to_string()));
        }
        self.log.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FixtureSession {
            pages: Arc::clone(&self.pages),
            log: Arc::clone(&self.log),
            current: None,
            globals: None,
            closed: false,
        }))
    }
}

struct FixtureSession {
    pages: Arc<HashMap<String, FixturePage>>,
    log: Arc<SessionLog>,
    current: Option<(String, FixturePage)>,
    globals: Option<Value>,
    closed: bool,
}

impl FixtureSession {
    fn current(&self) -> Result<&FixturePage, SessionError> {
        if self.closed {
            return Err(SessionError::Closed);
        }
        self.current
            .as_ref()
            .map(|(_, page)| page)
            .ok_or(SessionError::NoPage)
    }
}

#[async_trait]
impl PageSession for FixtureSession {
    async fn navigate(&mut self, url: &str, options: NavigateOptions) -> Result<(), SessionError> {
        if self.closed {
            return Err(SessionError::Closed);
        }
        self.current = None;
        self.globals = None;
        if let Ok(mut navs) = self.log.navigations.lock() {
            navs.push(url.to_string());
        }
        let Some(page) = self.pages.get(&normalize(url)).cloned() else {
            return Err(SessionError::UnexpectedStatus {
                status: 404,
                url: url.to_string(),
            });
        };
        if page.times_out {
            return Err(SessionError::NavigationTimeout {
                url: url.to_string(),
                timeout_ms: u64::try_from(options.timeout.as_millis()).unwrap_or(u64::MAX),
            });
        }
        self.globals = page.globals.clone();
        self.current = Some((url.to_string(), page));
        Ok(())
    }

    async fn wait_for(
        &mut self,
        condition: &WaitCondition,
        timeout: Duration,
    ) -> Result<(), SessionError> {
        let page = self.current()?;
        if let WaitCondition::Selector(selector) = condition {
            let parsed =
                scraper::Selector::parse(selector).map_err(|e| SessionError::Evaluate {
                    expression: selector.clone(),
                    reason: e.to_string(),
                })?;
            let found = scraper::Html::parse_document(&page.html)
                .select(&parsed)
                .next()
                .is_some();
            if !found {
                return Err(SessionError::SelectorWaitTimeout {
                    condition: condition.to_string(),
                    timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                });
            }
        }
        Ok(())
    }

    async fn evaluate(&mut self, expression: &str) -> Result<Value, SessionError> {
        let html = self.current()?.html.clone();
        let tree = self.globals.get_or_insert_with(|| scan_globals(&html));
        Ok(lookup_path(tree, expression))
    }

    async fn scroll_to_bottom(&mut self) -> Result<(), SessionError> {
        self.current().map(|_| ())
    }

    async fn content(&mut self) -> Result<String, SessionError> {
        Ok(self.current()?.html.clone())
    }

    fn current_url(&self) -> Option<String> {
        self.current.as_ref().map(|(url, _)| url.clone())
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        if !self.closed {
            self.closed = true;
            self.log.closed.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

fn normalize(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}
