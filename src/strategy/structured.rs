use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::{PageOutcome, Tactic};
use crate::error::{CrawlError, Result};
use crate::model::QuerySpec;
use crate::payload::RecordShape;
use crate::session::PageSession;

/// A listing endpoint: request URL and headers for a keyword and page.
#[derive(Clone, Copy)]
pub struct ApiEndpoint {
    pub url: fn(keyword: &str, page: u32) -> String,
    pub headers: fn(keyword: &str) -> Vec<(String, String)>,
}

/// Calls the source's listing endpoint directly through the session.
pub struct StructuredCall {
    source: &'static str,
    base: Url,
    endpoint: ApiEndpoint,
    shape: &'static RecordShape,
}

impl StructuredCall {
    pub fn new(source: &'static str, base: Url, endpoint: ApiEndpoint, shape: &'static RecordShape) -> Self {
        Self { source, base, endpoint, shape }
    }
}

#[async_trait]
impl Tactic for StructuredCall {
    fn name(&self) -> &'static str {
        "structured"
    }

    async fn fetch(&self, session: &dyn PageSession, page: u32, query: &QuerySpec) -> Result<PageOutcome> {
        let url = (self.endpoint.url)(&query.keyword, page);
        let headers = (self.endpoint.headers)(&query.keyword);
        debug!("[{}] GET {}", self.source, url);

        let resp = session.request(&url, &headers).await?;
        if !resp.is_success() {
            return Err(CrawlError::PageRequest { url, status: resp.status });
        }

        let body: Value = serde_json::from_str(&resp.body)
            .map_err(|e| CrawlError::MalformedPayload(format!("{url}: {e}")))?;
        self.shape.decode(&body, &self.base, self.source, page)
    }
}
