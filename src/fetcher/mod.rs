pub mod http_fetcher;
pub mod throttle;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::app::Result;

pub use http_fetcher::{FetchSettings, HttpFetcher};
pub use throttle::Throttle;

/// A fetched document, not yet interpreted.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub url: String,
    /// Value of the `Content-Type` header, if the server sent one
    pub content_type: Option<String>,
    pub body: String,
    pub fetched_at: DateTime<Utc>,
}

impl RawDocument {
    pub fn new(url: impl Into<String>, content_type: Option<&str>, body: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            content_type: content_type.map(String::from),
            body: body.into(),
            fetched_at: Utc::now(),
        }
    }

    pub fn html(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self::new(url, Some("text/html; charset=utf-8"), body)
    }

    pub fn json(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self::new(url, Some("application/json"), body)
    }
}

#[async_trait]
pub trait Fetcher {
    /// Fetch the product document for a canonical identifier.
    async fn fetch(&self, canonical_id: &str) -> Result<RawDocument>;
}
