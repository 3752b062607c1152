//! In-memory session for tests: canned documents and responses.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Notify;

use super::document::select_snapshots;
use super::{
    ElementSnapshot, ListenerSet, NavigateOptions, NavigationResult, PageSession, RawResponse,
    ResponseListener, SessionFactory, SubscriptionId,
};
use crate::error::{CrawlError, Result};

#[derive(Debug, Default)]
pub struct ScriptLog {
    pub navigations: Vec<String>,
    pub requests: Vec<String>,
    pub scripts: usize,
    pub closed: bool,
}

/// Inspection handle that outlives the boxed session.
#[derive(Clone)]
pub struct ScriptHandle {
    pub log: Arc<Mutex<ScriptLog>>,
    listeners: Arc<ListenerSet>,
}

impl ScriptHandle {
    pub fn navigations(&self) -> Vec<String> {
        self.log.lock().unwrap().navigations.clone()
    }

    pub fn requests(&self) -> Vec<String> {
        self.log.lock().unwrap().requests.clone()
    }

    pub fn closed(&self) -> bool {
        self.log.lock().unwrap().closed
    }

    pub fn live_listeners(&self) -> usize {
        self.listeners.len()
    }
}

#[derive(Clone, Default)]
struct ScriptedPage {
    html: String,
    /// Published to listeners when the page is navigated to, like the
    /// client-side calls a rendered page makes.
    emits: Vec<RawResponse>,
}

/// Blocks `request` until released; used to hold a run open.
#[derive(Clone, Default)]
pub struct Gate {
    pub entered: Arc<Notify>,
    pub release: Arc<Notify>,
}

#[derive(Default)]
pub struct ScriptedSession {
    pages: HashMap<String, ScriptedPage>,
    responses: HashMap<String, RawResponse>,
    current: Mutex<Option<String>>,
    listeners: Arc<ListenerSet>,
    log: Arc<Mutex<ScriptLog>>,
    gate: Option<Gate>,
}

impl ScriptedSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, html: &str) -> Self {
        self.pages.entry(url.to_string()).or_default().html = html.to_string();
        self
    }

    /// When `page_url` is navigated to, publish a response for `api_url`.
    pub fn emits(mut self, page_url: &str, api_url: &str, body: &str) -> Self {
        self.pages
            .entry(page_url.to_string())
            .or_default()
            .emits
            .push(RawResponse {
                url: api_url.to_string(),
                status: 200,
                body: body.to_string(),
            });
        self
    }

    pub fn response(mut self, url: &str, status: u16, body: &str) -> Self {
        self.responses.insert(
            url.to_string(),
            RawResponse {
                url: url.to_string(),
                status,
                body: body.to_string(),
            },
        );
        self
    }

    pub fn gated(mut self, gate: Gate) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn handle(&self) -> ScriptHandle {
        ScriptHandle {
            log: Arc::clone(&self.log),
            listeners: Arc::clone(&self.listeners),
        }
    }

    fn current_html(&self) -> Result<String> {
        let current = self.current.lock().unwrap().clone();
        current
            .and_then(|url| self.pages.get(&url).map(|p| p.html.clone()))
            .ok_or_else(|| CrawlError::Session("no document loaded".into()))
    }
}

#[async_trait]
impl PageSession for ScriptedSession {
    async fn navigate(&self, url: &str, _options: &NavigateOptions) -> Result<NavigationResult> {
        self.log.lock().unwrap().navigations.push(url.to_string());
        let page = self
            .pages
            .get(url)
            .cloned()
            .ok_or_else(|| CrawlError::Timeout(format!("navigating to {url}")))?;
        *self.current.lock().unwrap() = Some(url.to_string());
        for emitted in &page.emits {
            self.listeners.publish(emitted);
        }
        Ok(NavigationResult {
            final_url: url.to_string(),
            status: 200,
        })
    }

    fn current_url(&self) -> Option<String> {
        self.current.lock().unwrap().clone()
    }

    async fn request(&self, url: &str, _headers: &[(String, String)]) -> Result<RawResponse> {
        self.log.lock().unwrap().requests.push(url.to_string());
        if let Some(gate) = &self.gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        let resp = self
            .responses
            .get(url)
            .cloned()
            .ok_or_else(|| CrawlError::Network(format!("connection refused: {url}")))?;
        self.listeners.publish(&resp);
        Ok(resp)
    }

    async fn wait_for_selector(&self, selector: &str, _timeout: Duration) -> Result<bool> {
        Ok(!select_snapshots(&self.current_html()?, selector)?.is_empty())
    }

    async fn query_selector_all(&self, selector: &str) -> Result<Vec<ElementSnapshot>> {
        select_snapshots(&self.current_html()?, selector)
    }

    async fn evaluate(&self, _script: &str) -> Result<Value> {
        self.log.lock().unwrap().scripts += 1;
        Ok(Value::Null)
    }

    async fn content(&self) -> Result<String> {
        Ok(self.current_html().unwrap_or_default())
    }

    fn on_response(&self, listener: ResponseListener) -> SubscriptionId {
        self.listeners.add(listener)
    }

    fn off_response(&self, id: SubscriptionId) {
        self.listeners.remove(id);
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.log.lock().unwrap().closed = true;
        Ok(())
    }
}

/// Hands out prepared sessions in order; errors once they run out.
#[derive(Default)]
pub struct ScriptedFactory {
    sessions: Mutex<VecDeque<ScriptedSession>>,
}

impl ScriptedFactory {
    pub fn new(sessions: Vec<ScriptedSession>) -> Self {
        Self {
            sessions: Mutex::new(sessions.into()),
        }
    }
}

#[async_trait]
impl SessionFactory for ScriptedFactory {
    async fn new_session(&self) -> Result<Box<dyn PageSession>> {
        let next = self.sessions.lock().unwrap().pop_front();
        next.map(|s| Box::new(s) as Box<dyn PageSession>)
            .ok_or_else(|| CrawlError::Session("browser unavailable".into()))
    }
}
