//! Session backed by a plain HTTP client.
//!
//! Not a browser: documents are fetched and parsed as served, scripts never
//! run and there is nothing to scroll. Sources whose listings only appear
//! after client-side rendering still work through their structured tactics.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE};
use serde_json::Value;
use tracing::debug;

use super::document::select_snapshots;
use super::{
    ElementSnapshot, ListenerSet, NavigateOptions, NavigationResult, PageSession, RawResponse,
    ResponseListener, SessionFactory, SubscriptionId,
};
use crate::error::{CrawlError, Result};

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/118 Safari/537.36";
const ACCEPT_LANGUAGE_VALUE: &str = "zh-TW,zh;q=0.9";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct HttpSessionFactory {
    user_agent: String,
    accept_language: String,
}

impl HttpSessionFactory {
    pub fn new(user_agent: &str, accept_language: &str) -> Self {
        Self {
            user_agent: user_agent.to_string(),
            accept_language: accept_language.to_string(),
        }
    }
}

impl Default for HttpSessionFactory {
    fn default() -> Self {
        Self::new(USER_AGENT, ACCEPT_LANGUAGE_VALUE)
    }
}

#[async_trait]
impl SessionFactory for HttpSessionFactory {
    async fn new_session(&self) -> Result<Box<dyn PageSession>> {
        let mut headers = HeaderMap::new();
        let lang = HeaderValue::from_str(&self.accept_language)
            .map_err(|e| CrawlError::Session(format!("invalid accept-language: {e}")))?;
        headers.insert(ACCEPT_LANGUAGE, lang);

        // One cookie jar per session keeps sources isolated from each other.
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .user_agent(&self.user_agent)
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;

        Ok(Box::new(HttpSession::new(client)))
    }
}

struct LoadedPage {
    url: String,
    html: String,
}

pub struct HttpSession {
    client: reqwest::Client,
    page: Mutex<Option<LoadedPage>>,
    listeners: ListenerSet,
}

impl HttpSession {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            page: Mutex::new(None),
            listeners: ListenerSet::default(),
        }
    }

    fn with_page<T>(&self, f: impl FnOnce(Option<&LoadedPage>) -> T) -> T {
        let guard = self.page.lock().unwrap_or_else(PoisonError::into_inner);
        f(guard.as_ref())
    }

    fn loaded_html(&self) -> Result<String> {
        self.with_page(|p| p.map(|p| p.html.clone()))
            .ok_or_else(|| CrawlError::Session("no document loaded".into()))
    }

    async fn fetch(&self, builder: reqwest::RequestBuilder) -> Result<RawResponse> {
        let resp = builder.send().await?;
        let url = resp.url().to_string();
        let status = resp.status().as_u16();
        let body = resp.text().await?;
        let raw = RawResponse { url, status, body };
        self.listeners.publish(&raw);
        Ok(raw)
    }
}

#[async_trait]
impl PageSession for HttpSession {
    /// The whole body is read before returning, so every wait policy is met.
    async fn navigate(&self, url: &str, options: &NavigateOptions) -> Result<NavigationResult> {
        debug!("GET {} ({:?})", url, options.wait_until);
        let raw = self
            .fetch(self.client.get(url).timeout(options.timeout))
            .await?;

        let result = NavigationResult {
            final_url: raw.url.clone(),
            status: raw.status,
        };
        *self.page.lock().unwrap_or_else(PoisonError::into_inner) = Some(LoadedPage {
            url: raw.url,
            html: raw.body,
        });
        Ok(result)
    }

    fn current_url(&self) -> Option<String> {
        self.with_page(|p| p.map(|p| p.url.clone()))
    }

    async fn request(&self, url: &str, headers: &[(String, String)]) -> Result<RawResponse> {
        let builder = headers
            .iter()
            .fold(self.client.get(url).timeout(REQUEST_TIMEOUT), |b, (k, v)| {
                b.header(k.as_str(), v.as_str())
            });
        self.fetch(builder).await
    }

    /// A static document never changes, so this only checks what is there.
    async fn wait_for_selector(&self, selector: &str, _timeout: Duration) -> Result<bool> {
        Ok(!select_snapshots(&self.loaded_html()?, selector)?.is_empty())
    }

    async fn query_selector_all(&self, selector: &str) -> Result<Vec<ElementSnapshot>> {
        select_snapshots(&self.loaded_html()?, selector)
    }

    async fn evaluate(&self, script: &str) -> Result<Value> {
        debug!("no script engine, skipping: {}", script);
        Ok(Value::Null)
    }

    async fn content(&self) -> Result<String> {
        Ok(self.with_page(|p| p.map(|p| p.html.clone())).unwrap_or_default())
    }

    fn on_response(&self, listener: ResponseListener) -> SubscriptionId {
        self.listeners.add(listener)
    }

    fn off_response(&self, id: SubscriptionId) {
        self.listeners.remove(id);
    }

    async fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}
