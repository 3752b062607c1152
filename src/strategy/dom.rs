//! Heuristic scrape of the rendered results page.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use tracing::debug;
use url::Url;

use super::{PageOutcome, Tactic};
use crate::classifier::{classify, collapse_whitespace, fragments};
use crate::error::{CrawlError, Result};
use crate::model::QuerySpec;
use crate::normalize::{normalize, RawListing};
use crate::session::{ElementSnapshot, NavigateOptions, PageSession, WaitUntil};

const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(60);
const SCROLL_SCRIPT: &str = "window.scrollBy(0, document.body.scrollHeight)";

static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,2})\s*/\s*(\d{1,2})\b").unwrap());
static SALARY_HINT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(月薪|年薪|元|面議)").unwrap());

/// Bounded scroll-to-load: stops after `rounds` or once the item count
/// stops growing.
#[derive(Debug, Clone, Copy)]
pub struct ScrollPolicy {
    pub rounds: usize,
    pub pause: Duration,
}

/// Sub-selectors for sources with a stable card layout.
#[derive(Debug, Clone, Copy)]
pub struct CardSelectors {
    pub job_link: &'static str,
    /// Heading inside the job link; the link text is used when absent.
    pub heading: &'static str,
    pub company_link: &'static str,
    pub conditions: &'static str,
    pub summary: &'static str,
    pub date_fallback: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub enum CardParser {
    /// The item is the listing anchor; its text goes through the classifier.
    Anchor,
    Card(CardSelectors),
}

impl CardParser {
    pub fn parse(&self, item: &ElementSnapshot) -> Result<Option<RawListing>> {
        match self {
            CardParser::Anchor => Ok(parse_anchor(item)),
            CardParser::Card(selectors) => parse_card(item, selectors),
        }
    }
}

fn parse_anchor(anchor: &ElementSnapshot) -> Option<RawListing> {
    let href = anchor.attr("href")?;
    let fields = classify(&fragments(&anchor.text));
    Some(RawListing::from_fields(fields, href))
}

fn first_text(el: &ElementSnapshot, selector: &str) -> Result<Option<String>> {
    Ok(el
        .select(selector)?
        .into_iter()
        .map(|e| collapse_whitespace(&e.text))
        .find(|t| !t.is_empty()))
}

fn parse_card(card: &ElementSnapshot, s: &CardSelectors) -> Result<Option<RawListing>> {
    let Some(link) = card.select(s.job_link)?.into_iter().next() else {
        return Ok(None);
    };
    let href = link.attr("href").unwrap_or_default().to_string();
    let title = first_text(&link, s.heading)?.unwrap_or_else(|| collapse_whitespace(&link.text));

    let company = match card.select(s.company_link)?.into_iter().next() {
        Some(corp) => first_text(&corp, s.heading)?.unwrap_or_else(|| collapse_whitespace(&corp.text)),
        None => String::new(),
    };

    let conditions: Vec<String> = card
        .select(s.conditions)?
        .into_iter()
        .map(|e| collapse_whitespace(&e.text))
        .collect();
    let location = conditions.first().cloned().unwrap_or_default();
    let salary = conditions
        .iter()
        .find(|t| SALARY_HINT_RE.is_match(t))
        .cloned()
        .unwrap_or_default();

    let summary = card.select(s.summary)?.into_iter().next();
    let date_source = match summary {
        Some(summary) if DATE_RE.is_match(&summary.text) => Some(summary.text),
        _ => first_text(card, s.date_fallback)?,
    };
    let date = date_source.and_then(|text| {
        DATE_RE
            .captures(&text)
            .map(|c| format!("{}/{}", &c[1], &c[2]))
    });

    Ok(Some(RawListing {
        title,
        company,
        location,
        salary,
        date,
        href,
    }))
}

pub struct DomScrape {
    pub source: &'static str,
    pub base: Url,
    pub listing_url: fn(keyword: &str, page: u32) -> String,
    pub container: &'static str,
    pub items: &'static str,
    pub wait_timeout: Duration,
    pub scroll: ScrollPolicy,
    pub parser: CardParser,
}

impl DomScrape {
    async fn ensure_on(&self, session: &dyn PageSession, target: &str) -> Result<()> {
        if session.current_url().as_deref() == Some(target) {
            debug!("[{}] already on {}", self.source, target);
            return Ok(());
        }
        debug!("[{}] navigating to {}", self.source, target);
        let options = NavigateOptions {
            wait_until: WaitUntil::DomContentLoaded,
            timeout: NAVIGATION_TIMEOUT,
        };
        let nav = session.navigate(target, &options).await?;
        if nav.status >= 400 {
            return Err(CrawlError::PageRequest {
                url: target.to_string(),
                status: nav.status,
            });
        }
        Ok(())
    }

    async fn scroll_to_load(&self, session: &dyn PageSession) -> Result<usize> {
        let mut last = 0;
        for _ in 0..self.scroll.rounds {
            let count = session.query_selector_all(self.items).await?.len();
            if count <= last {
                break;
            }
            last = count;
            session.evaluate(SCROLL_SCRIPT).await?;
            tokio::time::sleep(self.scroll.pause).await;
        }
        Ok(last)
    }
}

#[async_trait]
impl Tactic for DomScrape {
    fn name(&self) -> &'static str {
        "dom"
    }

    async fn fetch(&self, session: &dyn PageSession, page: u32, query: &QuerySpec) -> Result<PageOutcome> {
        let target = (self.listing_url)(&query.keyword, page);
        self.ensure_on(session, &target).await?;

        if !session.wait_for_selector(self.container, self.wait_timeout).await? {
            debug!("[{}] {} did not appear on page {}", self.source, self.container, page);
        }
        let visible = self.scroll_to_load(session).await?;
        debug!("[{}] page {}: {} items after scrolling", self.source, page, visible);

        let mut records = Vec::new();
        for item in session.query_selector_all(self.items).await? {
            let Some(raw) = self.parser.parse(&item)? else { continue };
            if let Some(record) = normalize(raw, &self.base, self.source, page) {
                records.push(record);
            }
        }
        Ok(PageOutcome {
            records,
            total_pages: None,
        })
    }
}
