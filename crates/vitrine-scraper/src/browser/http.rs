//! Static-HTML session backed by `reqwest`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use super::globals::{lookup_path, scan_globals};
use super::{BrowserProvider, NavigateOptions, PageSession, SessionOptions, WaitCondition};
use crate::error::SessionError;
use crate::retry::retry_with_backoff;

/// Opens [`HttpSession`]s. One `reqwest::Client` is built per session so
/// each vendor run gets its own connection pool and cookie-free state.
#[derive(Debug, Default, Clone)]
pub struct HttpBrowser;

impl HttpBrowser {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl BrowserProvider for HttpBrowser {
    async fn open(&self, options: &SessionOptions) -> Result<Box<dyn PageSession>, SessionError> {
        let client = Client::builder()
            .timeout(options.navigation_timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(options.user_agent.as_str())
            .build()
            .map_err(|e| SessionError::Launch(e.to_string()))?;

        Ok(Box::new(HttpSession {
            client,
            max_retries: options.max_retries,
            backoff_base_secs: options.backoff_base_secs,
            page: None,
            closed: false,
        }))
    }
}

struct LoadedPage {
    url: String,
    html: String,
    globals: Option<Value>,
}

struct HttpSession {
    client: Client,
    max_retries: u32,
    backoff_base_secs: u64,
    page: Option<LoadedPage>,
    closed: bool,
}

impl HttpSession {
    fn ensure_open(&self) -> Result<(), SessionError> {
        if self.closed {
            Err(SessionError::Closed)
        } else {
            Ok(())
        }
    }

    fn page(&self) -> Result<&LoadedPage, SessionError> {
        self.ensure_open()?;
        self.page.as_ref().ok_or(SessionError::NoPage)
    }
}

async fn fetch_page(client: Client, url: String) -> Result<(String, String), SessionError> {
    let referer = reqwest::Url::parse(&url)
        .map(|u| u.origin().ascii_serialization())
        .unwrap_or_default();

    let response = client
        .get(&url)
        .header(
            reqwest::header::ACCEPT,
            "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8",
        )
        .header(reqwest::header::ACCEPT_LANGUAGE, "fr-FR,fr;q=0.9,en;q=0.8")
        .header(reqwest::header::REFERER, referer)
        .header(reqwest::header::CACHE_CONTROL, "no-cache")
        .send()
        .await?;
    let status = response.status();

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        let retry_after_secs = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(60);
        let domain = response
            .url()
            .host_str()
            .map_or_else(|| url.clone(), str::to_owned);
        return Err(SessionError::RateLimited {
            domain,
            retry_after_secs,
        });
    }

    if !status.is_success() {
        return Err(SessionError::UnexpectedStatus {
            status: status.as_u16(),
            url,
        });
    }

    let final_url = response.url().to_string();
    let html = response.text().await?;
    Ok((final_url, html))
}

fn document_matches(html: &str, selector: &str) -> Result<bool, SessionError> {
    let parsed = scraper::Selector::parse(selector).map_err(|e| SessionError::Evaluate {
        expression: selector.to_string(),
        reason: e.to_string(),
    })?;
    let document = scraper::Html::parse_document(html);
    let found = document.select(&parsed).next().is_some();
    Ok(found)
}

#[async_trait]
impl PageSession for HttpSession {
    async fn navigate(&mut self, url: &str, options: NavigateOptions) -> Result<(), SessionError> {
        self.ensure_open()?;
        self.page = None;
        let client = self.client.clone();
        let target = url.to_owned();

        let fetch = retry_with_backoff(self.max_retries, self.backoff_base_secs, || {
            fetch_page(client.clone(), target.clone())
        });

        let outcome = tokio::time::timeout(options.timeout, fetch).await;
        let (final_url, html) = match outcome {
            Ok(result) => result.map_err(|e| match e {
                SessionError::Http(ref inner) if inner.is_timeout() => {
                    SessionError::NavigationTimeout {
                        url: target.clone(),
                        timeout_ms: duration_ms(options.timeout),
                    }
                }
                other => other,
            })?,
            Err(_) => {
                return Err(SessionError::NavigationTimeout {
                    url: target,
                    timeout_ms: duration_ms(options.timeout),
                })
            }
        };

        tracing::debug!(url = %final_url, bytes = html.len(), "page loaded");
        self.page = Some(LoadedPage {
            url: final_url,
            html,
            globals: None,
        });
        Ok(())
    }

    async fn wait_for(
        &mut self,
        condition: &WaitCondition,
        timeout: Duration,
    ) -> Result<(), SessionError> {
        match condition {
            WaitCondition::NetworkIdle => {
                self.page()?;
                Ok(())
            }
            WaitCondition::Delay(delay) => {
                self.ensure_open()?;
                tokio::time::sleep((*delay).min(timeout)).await;
                Ok(())
            }
            WaitCondition::Selector(selector) => {
                let page = self.page()?;
                // A static document never changes, so a miss is final.
                if document_matches(&page.html, selector)? {
                    Ok(())
                } else {
                    Err(SessionError::SelectorWaitTimeout {
                        condition: condition.to_string(),
                        timeout_ms: duration_ms(timeout),
                    })
                }
            }
        }
    }

    async fn evaluate(&mut self, expression: &str) -> Result<Value, SessionError> {
        self.ensure_open()?;
        let page = self.page.as_mut().ok_or(SessionError::NoPage)?;
        if page.globals.is_none() {
            page.globals = Some(scan_globals(&page.html));
        }
        Ok(page
            .globals
            .as_ref()
            .map_or(Value::Null, |tree| lookup_path(tree, expression)))
    }

    async fn scroll_to_bottom(&mut self) -> Result<(), SessionError> {
        self.page()?;
        Ok(())
    }

    async fn content(&mut self) -> Result<String, SessionError> {
        Ok(self.page()?.html.clone())
    }

    fn current_url(&self) -> Option<String> {
        self.page.as_ref().map(|p| p.url.clone())
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        self.closed = true;
        self.page = None;
        Ok(())
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
