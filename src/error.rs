use thiserror::Error;

pub type Result<T> = std::result::Result<T, CrawlError>;

#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("unknown source: {0}")]
    UnknownSource(String),

    #[error("request to {url} failed with status {status}")]
    PageRequest { url: String, status: u16 },

    #[error("network error: {0}")]
    Network(String),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("no captured response for page {0}")]
    NotCaptured(u32),

    #[error("invalid selector {selector}: {message}")]
    Selector { selector: String, message: String },

    #[error("session error: {0}")]
    Session(String),

    #[error("a crawl run is already in progress")]
    RunAlreadyInProgress,
}

impl CrawlError {
    /// Soft errors make a tactic fall through without counting as a page failure.
    pub fn is_soft(&self) -> bool {
        matches!(self, CrawlError::MalformedPayload(_) | CrawlError::NotCaptured(_))
    }
}

impl From<reqwest::Error> for CrawlError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            CrawlError::Timeout(err.to_string())
        } else {
            CrawlError::Network(err.to_string())
        }
    }
}
