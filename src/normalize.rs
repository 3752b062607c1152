use url::Url;

use crate::classifier::{collapse_whitespace, ClassifiedFields};
use crate::model::JobRecord;

/// A listing as scraped or decoded, before it is checked and made canonical.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawListing {
    pub title: String,
    pub company: String,
    pub location: String,
    pub salary: String,
    pub date: Option<String>,
    /// Absolute, protocol-relative, or relative to the source base.
    pub href: String,
}

impl RawListing {
    pub fn from_fields(fields: ClassifiedFields, href: impl Into<String>) -> Self {
        Self {
            title: fields.title,
            company: fields.company,
            location: fields.location,
            salary: fields.salary,
            date: None,
            href: href.into(),
        }
    }
}

/// Resolve `href` against `base`; `None` for blank or unparseable links.
/// Fragments are dropped so the same listing always yields one address.
pub fn absolute_url(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    let mut url = base.join(href).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.set_fragment(None);
    Some(url.to_string())
}

/// Build the canonical record. Listings without a title or a usable URL are
/// discarded here, whatever tactic produced them.
pub fn normalize(raw: RawListing, base: &Url, source: &str, page: u32) -> Option<JobRecord> {
    let title = collapse_whitespace(&raw.title);
    if title.is_empty() {
        return None;
    }
    let url = absolute_url(base, &raw.href)?;

    Some(JobRecord {
        title,
        company: collapse_whitespace(&raw.company),
        location: collapse_whitespace(&raw.location),
        salary: collapse_whitespace(&raw.salary),
        date: raw
            .date
            .map(|d| collapse_whitespace(&d))
            .filter(|d| !d.is_empty()),
        url,
        page,
        source: source.to_string(),
    })
}
