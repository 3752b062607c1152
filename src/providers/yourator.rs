//! Yourator: results are rendered client-side from its own listing API.
//! The results page is opened once when the source starts; listing calls
//! the page makes are captured, and the rendered anchors are the fallback.

use std::sync::LazyLock;
use std::time::Duration;

use url::Url;

use crate::payload::{RecordShape, UrlSource};
use crate::strategy::{
    CardParser, Captures, DomScrape, PassiveCapture, ScrollPolicy, Tactic, TacticChain,
};

pub const NAME: &str = "yourator";

static BASE: LazyLock<Url> = LazyLock::new(|| Url::parse("https://www.yourator.co").unwrap());

const JOB_ANCHORS: &str = "#normal-jobs a[href^=\"/companies/\"][href*=\"/jobs/\"], \
                           #scroll-monitored-jobs a[href^=\"/companies/\"][href*=\"/jobs/\"]";

pub static SHAPE: RecordShape = RecordShape {
    list_keys: &["payload.jobs", "jobs", "data.jobs", "data"],
    title: &["name", "title"],
    company: &["company.brand", "company.name", "companyName"],
    location: &["location", "city", "company.area"],
    salary: &["salary", "salaryDesc"],
    date: &["lastActiveAt", "publishedAt"],
    url: &[UrlSource::Link("path"), UrlSource::Link("url")],
    total_pages: &["payload.totalPages", "totalPages", "meta.totalPages"],
};

/// Human-facing results URL. Page 1 carries no page parameter so it is the
/// same address as the landing page.
pub fn listing_url(keyword: &str, page: u32) -> String {
    let mut params = vec![("sort", "most_related".to_string()), ("term[]", keyword.to_string())];
    if page > 1 {
        params.push(("page", page.to_string()));
    }
    Url::parse_with_params("https://www.yourator.co/jobs", &params)
        .map(String::from)
        .unwrap_or_default()
}

pub fn landing_url(keyword: &str) -> String {
    listing_url(keyword, 1)
}

/// `/api/v4/jobs?...&page=N` responses; a missing page parameter is page 1.
pub fn captured_page(url: &str) -> Option<u32> {
    let url = Url::parse(url).ok()?;
    if url.host_str() != BASE.host_str() || !url.path().starts_with("/api/v4/jobs") {
        return None;
    }
    let page = url
        .query_pairs()
        .find(|(k, _)| k == "page")
        .and_then(|(_, v)| v.parse().ok())
        .unwrap_or(1);
    Some(page)
}

pub fn tactics(captures: &Captures) -> TacticChain {
    let tactics: Vec<Box<dyn Tactic>> = vec![
        Box::new(PassiveCapture::new(NAME, BASE.clone(), captures.clone(), &SHAPE)),
        Box::new(DomScrape {
            source: NAME,
            base: BASE.clone(),
            listing_url,
            container: JOB_ANCHORS,
            items: JOB_ANCHORS,
            wait_timeout: Duration::from_secs(10),
            scroll: ScrollPolicy {
                rounds: 6,
                pause: Duration::from_millis(800),
            },
            parser: CardParser::Anchor,
        }),
    ];
    TacticChain::new(NAME, tactics)
}
