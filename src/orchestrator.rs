use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::debug::DebugSink;
use crate::dedup::dedup_by_url;
use crate::error::{CrawlError, Result};
use crate::model::{CrawlOutcome, JobRecord, QuerySpec, RunConfig, SourceStatus, StopReason};
use crate::pagination::run_pages;
use crate::providers::{Registry, SourceDescriptor};
use crate::session::{NavigateOptions, PageSession, SessionFactory, Subscription, WaitUntil};
use crate::strategy::Captures;

const LANDING_TIMEOUT: Duration = Duration::from_secs(60);

/// Runs the configured sources one after another, each in its own session.
/// At most one run is active at a time; overlapping calls are rejected.
pub struct Orchestrator {
    registry: Registry,
    sessions: Arc<dyn SessionFactory>,
    debug_sink: Option<Arc<dyn DebugSink>>,
    active: Mutex<()>,
}

impl Orchestrator {
    pub fn new(registry: Registry, sessions: Arc<dyn SessionFactory>) -> Self {
        Self {
            registry,
            sessions,
            debug_sink: None,
            active: Mutex::new(()),
        }
    }

    pub fn with_debug_sink(mut self, sink: Arc<dyn DebugSink>) -> Self {
        self.debug_sink = Some(sink);
        self
    }

    pub fn is_running(&self) -> bool {
        self.active.try_lock().is_err()
    }

    /// The only error is [`CrawlError::RunAlreadyInProgress`]; anything that
    /// goes wrong inside a source ends up in that source's status.
    pub async fn run(&self, config: &RunConfig) -> Result<CrawlOutcome> {
        let _guard = self
            .active
            .try_lock()
            .map_err(|_| CrawlError::RunAlreadyInProgress)?;

        let query = &config.query;
        info!(
            "Crawl start: keyword={:?} pages={} delay={}ms sources={} debug={}",
            query.keyword,
            query.page_budget,
            query.inter_page_delay_ms,
            config.sources.join(","),
            query.debug
        );

        let mut all: Vec<JobRecord> = Vec::new();
        let mut statuses = Vec::with_capacity(config.sources.len());

        for name in &config.sources {
            let Some(source) = self.registry.get(name) else {
                warn!("Unknown source {:?}, skipping", name);
                statuses.push(SourceStatus {
                    source: name.clone(),
                    stop: StopReason::UnknownSource,
                    pages_requested: 0,
                    records: 0,
                });
                continue;
            };

            info!("[{}] start", source.name);
            let (records, status) = self.run_source(source, query).await;
            info!("[{}] returned {} records", source.name, records.len());
            all.extend(records);
            statuses.push(status);
        }

        let raw_count = all.len();
        let records = dedup_by_url(all);
        info!("Crawl summary: raw={} deduped={}", raw_count, records.len());

        Ok(CrawlOutcome {
            records,
            raw_count,
            sources: statuses,
        })
    }

    async fn run_source(&self, source: &SourceDescriptor, query: &QuerySpec) -> (Vec<JobRecord>, SourceStatus) {
        let session = match self.sessions.new_session().await {
            Ok(session) => session,
            Err(e) => {
                warn!("[{}] no session: {}", source.name, e);
                let status = SourceStatus {
                    source: source.name.to_string(),
                    stop: StopReason::SessionUnavailable(e.to_string()),
                    pages_requested: 0,
                    records: 0,
                };
                return (Vec::new(), status);
            }
        };

        let run = {
            let captures = Captures::default();
            let _subscription = source
                .provider
                .capture_matcher()
                .map(|matcher| Subscription::attach(session.as_ref(), captures.listener(matcher)));

            if let Some(landing) = source.provider.landing_url(&query.keyword) {
                self.land(session.as_ref(), source.name, &landing).await;
            }

            let chain = source.provider.tactics(&captures);
            run_pages(&chain, session.as_ref(), query, self.debug_sink.as_deref()).await
        };

        if let Err(e) = session.close().await {
            warn!("[{}] closing session: {}", source.name, e);
        }

        let status = SourceStatus {
            source: source.name.to_string(),
            stop: run.stop,
            pages_requested: run.pages_requested,
            records: run.records.len(),
        };
        (run.records, status)
    }

    /// Failure here only costs the captures the landing page would have made.
    async fn land(&self, session: &dyn PageSession, source: &str, url: &str) {
        let options = NavigateOptions {
            wait_until: WaitUntil::NetworkIdle,
            timeout: LANDING_TIMEOUT,
        };
        if let Err(e) = session.navigate(url, &options).await {
            warn!("[{}] landing page {} failed: {}", source, url, e);
        }
    }
}
