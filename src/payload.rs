//! Locating the listing array inside a structured (JSON) response.
//!
//! Ranked key paths are tried first; when none of them holds an array the
//! value tree is walked breadth-first, depth-bounded, for the first array
//! whose first element looks like a job record.

use std::collections::VecDeque;

use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::{CrawlError, Result};
use crate::model::JobRecord;
use crate::normalize::{normalize, RawListing};

pub const MAX_SEARCH_DEPTH: usize = 5;

const JOB_KEY_HINTS: &[&str] = &["name", "title", "company"];

/// Where a listing array was found, kept for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingLocation {
    Key(&'static str),
    Search { depth: usize },
}

/// Follow a dotted path (`data.page.totalPage`); numeric segments index arrays.
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Scalar at `path` rendered as text; blank strings count as absent.
pub fn text_at(value: &Value, path: &str) -> Option<String> {
    match lookup(value, path)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// First candidate path that yields text.
pub fn first_text(value: &Value, paths: &[&str]) -> Option<String> {
    paths.iter().find_map(|p| text_at(value, p))
}

pub fn locate_listing<'a>(
    body: &'a Value,
    keys: &[&'static str],
) -> Option<(&'a [Value], ListingLocation)> {
    for key in keys {
        if let Some(Value::Array(items)) = lookup(body, key) {
            return Some((items.as_slice(), ListingLocation::Key(*key)));
        }
    }
    search_listing(body)
}

fn search_listing(body: &Value) -> Option<(&[Value], ListingLocation)> {
    let mut queue = VecDeque::from([(body, 0usize)]);

    while let Some((node, depth)) = queue.pop_front() {
        if let Value::Array(items) = node {
            if items.first().is_some_and(looks_like_job) {
                return Some((items.as_slice(), ListingLocation::Search { depth }));
            }
        }
        if depth == MAX_SEARCH_DEPTH {
            continue;
        }
        match node {
            Value::Object(map) => queue.extend(map.values().map(|v| (v, depth + 1))),
            Value::Array(items) => queue.extend(items.iter().map(|v| (v, depth + 1))),
            _ => {}
        }
    }
    None
}

fn looks_like_job(item: &Value) -> bool {
    item.as_object().is_some_and(|map| {
        map.keys().any(|k| {
            let k = k.to_lowercase();
            JOB_KEY_HINTS.iter().any(|hint| k.contains(hint))
        })
    })
}

/// Total page count advertised by the payload, if any candidate path has one.
pub fn total_pages(body: &Value, paths: &[&str]) -> Option<u32> {
    paths.iter().find_map(|p| {
        let n = match lookup(body, p)? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse::<u64>().ok(),
            _ => None,
        }?;
        u32::try_from(n).ok().filter(|n| *n > 0)
    })
}

/// How one listing URL is derived from an item.
#[derive(Debug, Clone, Copy)]
pub enum UrlSource {
    /// A link field, resolved against the source base.
    Link(&'static str),
    /// An identifier appended to a fixed prefix.
    Id {
        key: &'static str,
        prefix: &'static str,
    },
}

/// The shape a source's structured listing is expected to have. Every
/// field is a ranked list of dotted paths; the first one holding text wins.
#[derive(Debug, Clone, Copy)]
pub struct RecordShape {
    pub list_keys: &'static [&'static str],
    pub title: &'static [&'static str],
    pub company: &'static [&'static str],
    pub location: &'static [&'static str],
    pub salary: &'static [&'static str],
    pub date: &'static [&'static str],
    pub url: &'static [UrlSource],
    pub total_pages: &'static [&'static str],
}

/// Records decoded from one structured page, plus the advertised page count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedPage {
    pub records: Vec<JobRecord>,
    pub total_pages: Option<u32>,
}

impl RecordShape {
    pub fn raw_listing(&self, item: &Value) -> RawListing {
        let text = |paths: &[&str]| first_text(item, paths).unwrap_or_default();
        RawListing {
            title: text(self.title),
            company: text(self.company),
            location: text(self.location),
            salary: text(self.salary),
            date: first_text(item, self.date),
            href: self.href(item).unwrap_or_default(),
        }
    }

    fn href(&self, item: &Value) -> Option<String> {
        self.url.iter().find_map(|rule| match rule {
            UrlSource::Link(path) => text_at(item, path),
            UrlSource::Id { key, prefix } => text_at(item, key).map(|id| format!("{prefix}{id}")),
        })
    }

    /// Decode a whole response body. A body without any listing array is
    /// malformed; an empty listing array is a valid empty page.
    pub fn decode(&self, body: &Value, base: &Url, source: &str, page: u32) -> Result<DecodedPage> {
        let (items, at) = locate_listing(body, self.list_keys)
            .ok_or_else(|| CrawlError::MalformedPayload(format!("{source}: no listing array")))?;
        debug!("{} page {}: {} items at {:?}", source, page, items.len(), at);

        let records = items
            .iter()
            .filter_map(|item| normalize(self.raw_listing(item), base, source, page))
            .collect();
        Ok(DecodedPage {
            records,
            total_pages: total_pages(body, self.total_pages),
        })
    }
}
