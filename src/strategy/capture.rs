//! Reuses listing responses the page fetched on its own.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::{PageOutcome, Tactic};
use crate::error::{CrawlError, Result};
use crate::model::QuerySpec;
use crate::payload::RecordShape;
use crate::session::{PageSession, RawResponse, ResponseListener};

/// Maps an observed response URL to the result page it carries, or `None`
/// when the response is not a listing call.
pub type CaptureMatcher = fn(url: &str) -> Option<u32>;

/// Parsed listing payloads observed during one source run, keyed by page.
#[derive(Clone, Default)]
pub struct Captures {
    pages: Arc<Mutex<HashMap<u32, Value>>>,
}

impl Captures {
    /// Listener to register on the session. Only successful responses with
    /// a JSON body are kept; a later response for the same page replaces
    /// the earlier one.
    pub fn listener(&self, matcher: CaptureMatcher) -> ResponseListener {
        let captures = self.clone();
        Arc::new(move |resp: &RawResponse| {
            let Some(page) = matcher(&resp.url) else { return };
            if !resp.is_success() {
                return;
            }
            match serde_json::from_str::<Value>(&resp.body) {
                Ok(body) => {
                    debug!("captured listing response for page {}: {}", page, resp.url);
                    captures.insert(page, body);
                }
                Err(e) => debug!("ignoring unparseable capture {}: {}", resp.url, e),
            }
        })
    }

    pub fn insert(&self, page: u32, body: Value) {
        self.lock().insert(page, body);
    }

    pub fn get(&self, page: u32) -> Option<Value> {
        self.lock().get(&page).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<u32, Value>> {
        self.pages.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub struct PassiveCapture {
    source: &'static str,
    base: Url,
    captures: Captures,
    shape: &'static RecordShape,
}

impl PassiveCapture {
    pub fn new(source: &'static str, base: Url, captures: Captures, shape: &'static RecordShape) -> Self {
        Self { source, base, captures, shape }
    }
}

#[async_trait]
impl Tactic for PassiveCapture {
    fn name(&self) -> &'static str {
        "capture"
    }

    async fn fetch(&self, _session: &dyn PageSession, page: u32, _query: &QuerySpec) -> Result<PageOutcome> {
        let body = self.captures.get(page).ok_or(CrawlError::NotCaptured(page))?;
        self.shape.decode(&body, &self.base, self.source, page)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::payload::UrlSource;
    use crate::session::scripted::ScriptedSession;
    use crate::session::{NavigateOptions, Subscription, WaitUntil};
    use crate::strategy::testing::query;

    static SHAPE: RecordShape = RecordShape {
        list_keys: &["payload.jobs"],
        title: &["name"],
        company: &["company.brand"],
        location: &["location"],
        salary: &["salary"],
        date: &[],
        url: &[UrlSource::Link("path")],
        total_pages: &[],
    };

    fn matcher(url: &str) -> Option<u32> {
        url.strip_prefix("https://site.example/api/jobs?page=")
            .and_then(|p| p.parse().ok())
    }

    fn opts() -> NavigateOptions {
        NavigateOptions {
            wait_until: WaitUntil::NetworkIdle,
            timeout: std::time::Duration::from_secs(1),
        }
    }

    #[tokio::test]
    async fn navigation_feeds_capture() {
        let body = json!({ "payload": { "jobs": [
            { "name": "Frontend Engineer", "company": { "brand": "ACME" }, "path": "/companies/acme/jobs/1" }
        ] } });
        let session = ScriptedSession::new()
            .page("https://site.example/jobs", "<html></html>")
            .emits("https://site.example/jobs", "https://site.example/api/jobs?page=1", &body.to_string())
            .emits("https://site.example/jobs", "https://site.example/other", "{}");
        let captures = Captures::default();
        {
            let _sub = Subscription::attach(&session, captures.listener(matcher));
            session.navigate("https://site.example/jobs", &opts()).await.unwrap();
        }
        assert_eq!(captures.len(), 1);

        let tactic = PassiveCapture::new(
            "site",
            Url::parse("https://site.example").unwrap(),
            captures,
            &SHAPE,
        );
        let out = tactic.fetch(&session, 1, &query(1)).await.unwrap();
        assert_eq!(out.records[0].url, "https://site.example/companies/acme/jobs/1");
        assert_eq!(out.records[0].company, "ACME");

        let err = tactic.fetch(&session, 2, &query(2)).await.unwrap_err();
        assert!(matches!(err, CrawlError::NotCaptured(2)));
    }

    #[test]
    fn failed_or_unparseable_responses_are_ignored() {
        let captures = Captures::default();
        let listener = captures.listener(matcher);
        listener(&RawResponse {
            url: "https://site.example/api/jobs?page=1".into(),
            status: 500,
            body: "{}".into(),
        });
        listener(&RawResponse {
            url: "https://site.example/api/jobs?page=2".into(),
            status: 200,
            body: "<html>".into(),
        });
        assert!(captures.is_empty());
    }
}
