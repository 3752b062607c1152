//! Acquisition tactics for one results page.
//!
//! A source owns an ordered [`TacticChain`]. Tactics are tried in order and
//! the first one returning at least one record wins the page.

pub mod capture;
pub mod dom;
pub mod structured;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{CrawlError, Result};
use crate::model::QuerySpec;
use crate::payload::DecodedPage;
use crate::session::PageSession;

pub use capture::{CaptureMatcher, Captures, PassiveCapture};
pub use dom::{CardParser, CardSelectors, DomScrape, ScrollPolicy};
pub use structured::{ApiEndpoint, StructuredCall};

pub type PageOutcome = DecodedPage;

#[async_trait]
pub trait Tactic: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch(&self, session: &dyn PageSession, page: u32, query: &QuerySpec)
        -> Result<PageOutcome>;
}

pub struct TacticChain {
    source: &'static str,
    tactics: Vec<Box<dyn Tactic>>,
}

impl TacticChain {
    pub fn new(source: &'static str, tactics: Vec<Box<dyn Tactic>>) -> Self {
        Self { source, tactics }
    }

    pub fn source(&self) -> &'static str {
        self.source
    }

    pub fn tactic_names(&self) -> Vec<&'static str> {
        self.tactics.iter().map(|t| t.name()).collect()
    }

    /// Records for one page. Failing tactics fall through to the next one;
    /// if none produced records the page is empty, unless a hard failure was
    /// seen along the way, which is then returned.
    pub async fn fetch_page(
        &self,
        session: &dyn PageSession,
        page: u32,
        query: &QuerySpec,
    ) -> Result<PageOutcome> {
        let mut hard_failure: Option<CrawlError> = None;

        for tactic in &self.tactics {
            match tactic.fetch(session, page, query).await {
                Ok(outcome) if !outcome.records.is_empty() => {
                    debug!(
                        "[{}] page {} via {}: {} records",
                        self.source,
                        page,
                        tactic.name(),
                        outcome.records.len()
                    );
                    return Ok(outcome);
                }
                Ok(_) => debug!("[{}] page {} via {}: empty", self.source, page, tactic.name()),
                Err(e) if e.is_soft() => {
                    debug!("[{}] page {} via {}: {}", self.source, page, tactic.name(), e)
                }
                Err(e) => {
                    debug!("[{}] page {} via {} failed: {}", self.source, page, tactic.name(), e);
                    hard_failure = Some(e);
                }
            }
        }

        match hard_failure {
            Some(e) => Err(e),
            None => Ok(PageOutcome::default()),
        }
    }
}
