use std::time::Duration;

use serde::{Deserialize, Serialize};

/// One job listing in the shape every source is normalized into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    pub title: String,
    pub company: String,
    pub location: String,
    pub salary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    pub url: String,
    /// 1-based index of the result page the record was found on.
    pub page: u32,
    pub source: String,
}

/// Per-run query, shared read-only by every source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySpec {
    pub keyword: String,
    pub page_budget: u32,
    pub inter_page_delay_ms: u64,
    pub debug: bool,
}

impl QuerySpec {
    pub fn inter_page_delay(&self) -> Duration {
        Duration::from_millis(self.inter_page_delay_ms)
    }
}

/// What the caller asks the orchestrator to do in one run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub query: QuerySpec,
    pub sources: Vec<String>,
}

/// Why a source stopped producing pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum StopReason {
    BudgetReached,
    EmptyPage,
    KnownTotalReached,
    Failed(String),
    UnknownSource,
    SessionUnavailable(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceStatus {
    pub source: String,
    pub stop: StopReason,
    /// Pages requested, including the one that ended the loop.
    pub pages_requested: u32,
    pub records: usize,
}

/// Result of one orchestrated run.
#[derive(Debug, Clone, Serialize)]
pub struct CrawlOutcome {
    pub records: Vec<JobRecord>,
    pub raw_count: usize,
    pub sources: Vec<SourceStatus>,
}
