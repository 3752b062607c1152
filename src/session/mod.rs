//! The page/session capability the pipeline drives.
//!
//! Browser lifecycle stays with the caller: the pipeline only asks a
//! [`SessionFactory`] for a fresh session per source and closes it afterwards.

pub mod document;
pub mod http;
#[cfg(test)]
pub mod scripted;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

pub use document::ElementSnapshot;
pub use http::{HttpSession, HttpSessionFactory};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitUntil {
    DomContentLoaded,
    NetworkIdle,
}

#[derive(Debug, Clone)]
pub struct NavigateOptions {
    pub wait_until: WaitUntil,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct NavigationResult {
    pub final_url: String,
    pub status: u16,
}

/// A response observed or fetched by the session.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub url: String,
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

pub type ResponseListener = Arc<dyn Fn(&RawResponse) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[async_trait]
pub trait PageSession: Send + Sync {
    async fn navigate(&self, url: &str, options: &NavigateOptions) -> Result<NavigationResult>;

    /// URL of the document currently loaded, if any.
    fn current_url(&self) -> Option<String>;

    /// Raw HTTP request carrying the session's cookies.
    async fn request(&self, url: &str, headers: &[(String, String)]) -> Result<RawResponse>;

    /// `Ok(false)` when the selector did not appear within `timeout`.
    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<bool>;

    async fn query_selector_all(&self, selector: &str) -> Result<Vec<ElementSnapshot>>;

    async fn query_selector_all_text(&self, selector: &str) -> Result<Vec<String>> {
        Ok(self
            .query_selector_all(selector)
            .await?
            .into_iter()
            .map(|e| e.text)
            .collect())
    }

    async fn evaluate(&self, script: &str) -> Result<Value>;

    async fn content(&self) -> Result<String>;

    fn on_response(&self, listener: ResponseListener) -> SubscriptionId;

    fn off_response(&self, id: SubscriptionId);

    async fn close(self: Box<Self>) -> Result<()>;
}

#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn new_session(&self) -> Result<Box<dyn PageSession>>;
}

/// Response listener registration that is removed when dropped, so every
/// exit path of a source run unsubscribes.
pub struct Subscription<'a> {
    session: &'a dyn PageSession,
    id: SubscriptionId,
}

impl<'a> Subscription<'a> {
    pub fn attach(session: &'a dyn PageSession, listener: ResponseListener) -> Self {
        let id = session.on_response(listener);
        Self { session, id }
    }
}

impl Drop for Subscription<'_> {
    fn drop(&mut self) {
        self.session.off_response(self.id);
    }
}

/// Listener bookkeeping shared by session implementations.
#[derive(Default)]
pub struct ListenerSet {
    next_id: AtomicU64,
    listeners: Mutex<Vec<(SubscriptionId, ResponseListener)>>,
}

impl ListenerSet {
    pub fn add(&self, listener: ResponseListener) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().push((id, listener));
        id
    }

    pub fn remove(&self, id: SubscriptionId) {
        self.lock().retain(|(existing, _)| *existing != id);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Listeners run outside the lock so they may not deadlock on it.
    pub fn publish(&self, response: &RawResponse) {
        let listeners: Vec<ResponseListener> =
            self.lock().iter().map(|(_, l)| Arc::clone(l)).collect();
        for listener in listeners {
            listener(response);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(SubscriptionId, ResponseListener)>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    #[test]
    fn publish_reaches_live_listeners_only() {
        let set = ListenerSet::default();
        let hits = Arc::new(AtomicUsize::new(0));

        let h = Arc::clone(&hits);
        let a = set.add(Arc::new(move |_: &RawResponse| {
            h.fetch_add(1, Ordering::SeqCst);
        }));
        let h = Arc::clone(&hits);
        set.add(Arc::new(move |_: &RawResponse| {
            h.fetch_add(10, Ordering::SeqCst);
        }));

        let resp = RawResponse { url: "https://x".into(), status: 200, body: String::new() };
        set.publish(&resp);
        set.remove(a);
        set.publish(&resp);

        assert_eq!(hits.load(Ordering::SeqCst), 21);
        assert_eq!(set.len(), 1);
    }
}
