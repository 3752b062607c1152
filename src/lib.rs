//! Job listing crawler: per-source extraction tactics, pagination,
//! and cross-source deduplication.

pub mod classifier;
pub mod config;
pub mod debug;
pub mod dedup;
pub mod error;
pub mod model;
pub mod normalize;
pub mod orchestrator;
pub mod output;
pub mod pagination;
pub mod payload;
pub mod providers;
pub mod session;
pub mod strategy;

pub use error::{CrawlError, Result};
pub use model::{CrawlOutcome, JobRecord, QuerySpec, RunConfig, SourceStatus, StopReason};
pub use orchestrator::Orchestrator;
