//! 1111 job bank: server-rendered result cards with a stable layout.

use std::sync::LazyLock;
use std::time::Duration;

use url::Url;

use crate::strategy::{
    CardParser, CardSelectors, Captures, DomScrape, ScrollPolicy, Tactic, TacticChain,
};

pub const NAME: &str = "1111";

static BASE: LazyLock<Url> = LazyLock::new(|| Url::parse("https://www.1111.com.tw").unwrap());

const CARDS: CardSelectors = CardSelectors {
    job_link: "a[href^=\"/job/\"]",
    heading: "h2",
    company_link: "a[href^=\"/corp/\"]",
    conditions: ".job-card-condition__text",
    summary: ".job-summary",
    date_fallback: "p",
};

pub fn listing_url(keyword: &str, page: u32) -> String {
    let page = page.to_string();
    Url::parse_with_params(
        "https://www.1111.com.tw/search/job",
        [("ks", keyword), ("page", page.as_str())],
    )
    .map(String::from)
    .unwrap_or_default()
}

pub fn tactics(_captures: &Captures) -> TacticChain {
    let tactics: Vec<Box<dyn Tactic>> = vec![Box::new(DomScrape {
        source: NAME,
        base: BASE.clone(),
        listing_url,
        container: ".job-card",
        items: ".job-card",
        wait_timeout: Duration::from_secs(12),
        scroll: ScrollPolicy {
            rounds: 3,
            pause: Duration::from_millis(700),
        },
        parser: CardParser::Card(CARDS),
    })];
    TacticChain::new(NAME, tactics)
}
