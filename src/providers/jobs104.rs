//! 104 job bank: its search listing API answers plain JSON requests.

use std::sync::LazyLock;

use url::Url;

use crate::payload::{RecordShape, UrlSource};
use crate::strategy::{ApiEndpoint, Captures, StructuredCall, Tactic, TacticChain};

pub const NAME: &str = "104";

static BASE: LazyLock<Url> = LazyLock::new(|| Url::parse("https://www.104.com.tw").unwrap());

pub static SHAPE: RecordShape = RecordShape {
    list_keys: &["data.list", "data.jobs", "list"],
    title: &["jobName", "jobNameSnippet", "title"],
    company: &["custName", "companyName"],
    location: &["jobAddrNoDesc", "jobAddress"],
    salary: &["salaryDesc", "appearSalary"],
    date: &["appearDate"],
    url: &[
        UrlSource::Id { key: "jobNo", prefix: "https://www.104.com.tw/job/" },
        UrlSource::Link("link.job"),
    ],
    total_pages: &["data.page.totalPage", "data.totalPage", "totalPage"],
};

pub fn api_url(keyword: &str, page: u32) -> String {
    let page = page.to_string();
    Url::parse_with_params(
        "https://www.104.com.tw/jobs/search/list",
        [
            ("keyword", keyword),
            ("page", page.as_str()),
            ("mode", "s"),
            ("jobsource", "2018indexpoc"),
        ],
    )
    .map(String::from)
    .unwrap_or_default()
}

fn search_page_url(keyword: &str) -> String {
    Url::parse_with_params("https://www.104.com.tw/jobs/search/", [("keyword", keyword)])
        .map(String::from)
        .unwrap_or_default()
}

/// The API rejects requests that do not look like they come from its own
/// search page.
pub fn api_headers(keyword: &str) -> Vec<(String, String)> {
    vec![
        ("Referer".to_string(), search_page_url(keyword)),
        ("Accept".to_string(), "application/json, text/plain, */*".to_string()),
    ]
}

/// The API is the only tactic; nothing is rendered or captured.
pub fn tactics(_captures: &Captures) -> TacticChain {
    let endpoint = ApiEndpoint {
        url: api_url,
        headers: api_headers,
    };
    let tactics: Vec<Box<dyn Tactic>> =
        vec![Box::new(StructuredCall::new(NAME, BASE.clone(), endpoint, &SHAPE))];
    TacticChain::new(NAME, tactics)
}
