use tracing::{debug, info, warn};

use crate::debug::{dump_quietly, DebugSink};
use crate::model::{JobRecord, QuerySpec, StopReason};
use crate::session::PageSession;
use crate::strategy::TacticChain;

/// What one source's page loop produced.
#[derive(Debug)]
pub struct SourceRun {
    pub records: Vec<JobRecord>,
    pub stop: StopReason,
    pub pages_requested: u32,
}

/// Drive pages 1.. through the tactic chain until a stop condition.
///
/// - an empty page stops the loop, whatever budget is left
/// - a failed page stops the loop; earlier pages are kept
/// - a page count advertised by the first successful page caps the loop
/// - otherwise the loop ends at the page budget
///
/// Pages are never retried, and the inter-page delay is slept between
/// accepted pages only.
pub async fn run_pages(
    chain: &TacticChain,
    session: &dyn PageSession,
    query: &QuerySpec,
    debug_sink: Option<&dyn DebugSink>,
) -> SourceRun {
    let source = chain.source();
    let budget = query.page_budget.max(1);
    let mut records = Vec::new();
    let mut known_total: Option<u32> = None;
    let mut first_success = true;
    let mut page = 1;

    let stop = loop {
        match chain.fetch_page(session, page, query).await {
            Ok(outcome) if outcome.records.is_empty() => {
                debug!("[{}] page {} empty, stopping", source, page);
                dump_page(session, query, debug_sink, source, &format!("p{page}-empty")).await;
                break StopReason::EmptyPage;
            }
            Ok(outcome) => {
                debug!("[{}] page {}: {} records", source, page, outcome.records.len());
                if first_success {
                    first_success = false;
                    known_total = outcome.total_pages;
                    if let Some(total) = known_total {
                        debug!("[{}] source reports {} pages", source, total);
                    }
                }
                records.extend(outcome.records);

                if known_total.is_some_and(|total| page >= total) {
                    break StopReason::KnownTotalReached;
                }
                if page >= budget {
                    break StopReason::BudgetReached;
                }
                tokio::time::sleep(query.inter_page_delay()).await;
                page += 1;
            }
            Err(e) => {
                warn!("[{}] page {} failed: {}", source, page, e);
                dump_page(session, query, debug_sink, source, &format!("p{page}-error")).await;
                break StopReason::Failed(e.to_string());
            }
        }
    };

    info!("[{}] stopped after page {}: {:?} ({} records)", source, page, stop, records.len());
    SourceRun {
        records,
        stop,
        pages_requested: page,
    }
}

async fn dump_page(
    session: &dyn PageSession,
    query: &QuerySpec,
    sink: Option<&dyn DebugSink>,
    source: &str,
    tag: &str,
) {
    if !query.debug || sink.is_none() {
        return;
    }
    let content = session.content().await.unwrap_or_default();
    dump_quietly(sink, source, tag, &content).await;
}
