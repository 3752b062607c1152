//! Run settings: explicit request first, then environment, then defaults.

use std::path::PathBuf;

use serde::Deserialize;

use crate::model::{QuerySpec, RunConfig};

pub const DEFAULT_KEYWORD: &str = "前端工程師";
pub const DEFAULT_PAGES: u32 = 1;
pub const DEFAULT_DELAY_MS: u64 = 700;
pub const DEFAULT_PROVIDERS: &str = "104,yourator,1111";
pub const DEFAULT_OUTPUT: &str = "/app/data/jobs.json";

/// Source list given either as a JSON array or a comma separated string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SourceList {
    List(Vec<String>),
    Csv(String),
}

impl SourceList {
    pub fn names(&self) -> Vec<String> {
        match self {
            SourceList::List(items) => clean(items.iter().map(String::as_str)),
            SourceList::Csv(csv) => split_csv(csv),
        }
    }
}

/// A count given either as a JSON number or as numeric text (`"3"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Numeric {
    Number(u64),
    Text(#[serde(deserialize_with = "numeric_text")] u64),
}

impl Numeric {
    pub fn get(self) -> u64 {
        match self {
            Numeric::Number(n) | Numeric::Text(n) => n,
        }
    }
}

impl From<u64> for Numeric {
    fn from(n: u64) -> Self {
        Numeric::Number(n)
    }
}

impl From<u32> for Numeric {
    fn from(n: u32) -> Self {
        Numeric::Number(n.into())
    }
}

fn numeric_text<'de, D: serde::Deserializer<'de>>(de: D) -> Result<u64, D::Error> {
    let text = String::deserialize(de)?;
    text.trim()
        .parse()
        .map_err(|_| serde::de::Error::custom(format!("expected a number, got {text:?}")))
}

/// A run request; every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlRequest {
    pub keyword: Option<String>,
    pub pages: Option<Numeric>,
    pub delay: Option<Numeric>,
    pub providers: Option<SourceList>,
    pub debug: Option<bool>,
    /// Empty string means do not write.
    pub output: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub run: RunConfig,
    pub output: Option<PathBuf>,
}

impl CrawlRequest {
    pub fn resolve(self) -> Settings {
        self.resolve_with(|key| std::env::var(key).ok())
    }

    pub fn resolve_with(self, env: impl Fn(&str) -> Option<String>) -> Settings {
        let keyword = self
            .keyword
            .filter(|k| !k.trim().is_empty())
            .or_else(|| env("KEYWORD").filter(|k| !k.trim().is_empty()))
            .unwrap_or_else(|| DEFAULT_KEYWORD.to_string());

        let pages = self
            .pages
            .map(|p| u32::try_from(p.get()).unwrap_or(u32::MAX))
            .or_else(|| env("PAGES").and_then(|p| p.trim().parse().ok()))
            .unwrap_or(DEFAULT_PAGES)
            .max(1);

        let delay = self
            .delay
            .map(Numeric::get)
            .or_else(|| env("DELAY").and_then(|d| d.trim().parse().ok()))
            .unwrap_or(DEFAULT_DELAY_MS);

        let sources = self
            .providers
            .map(|p| p.names())
            .filter(|names| !names.is_empty())
            .or_else(|| env("PROVIDERS").map(|p| split_csv(&p)).filter(|n| !n.is_empty()))
            .unwrap_or_else(|| split_csv(DEFAULT_PROVIDERS));

        let debug = self
            .debug
            .unwrap_or_else(|| env("DEBUG").is_some_and(|d| d.trim() == "true"));

        let output = self
            .output
            .or_else(|| env("OUTPUT"))
            .unwrap_or_else(|| DEFAULT_OUTPUT.to_string());
        let output = (!output.trim().is_empty()).then(|| PathBuf::from(output));

        Settings {
            run: RunConfig {
                query: QuerySpec {
                    keyword,
                    page_budget: pages,
                    inter_page_delay_ms: delay,
                    debug,
                },
                sources,
            },
            output,
        }
    }
}

/// Where the last result is served from: `OUTPUT` or the default path.
pub fn default_output() -> PathBuf {
    std::env::var("OUTPUT")
        .ok()
        .filter(|o| !o.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT))
}

pub fn split_csv(csv: &str) -> Vec<String> {
    clean(csv.split(','))
}

fn clean<'a>(names: impl Iterator<Item = &'a str>) -> Vec<String> {
    names
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
