use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{
    HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, DNT, UPGRADE_INSECURE_REQUESTS,
};
use reqwest::Client;

use crate::app::{ReupError, Result};
use crate::config::Config;
use crate::fetcher::{throttle, Fetcher, RawDocument, Throttle};

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
pub const DEFAULT_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,application/json;q=0.9,*/*;q=0.8";
pub const DEFAULT_ACCEPT_LANGUAGE: &str = "en-US,en;q=0.5";
pub const DEFAULT_PRODUCT_URL: &str = "https://www.bestbuy.ca/en-ca/product/{id}";

/// Longest single backoff sleep between retries.
const MAX_RETRY_BACKOFF: Duration = Duration::from_secs(60);

/// Settings for [`HttpFetcher`]
#[derive(Debug, Clone)]
pub struct FetchSettings {
    /// Document URL template; `{id}` is replaced with the canonical id
    pub product_url: String,
    pub user_agent: String,
    pub accept_language: String,
    /// Connect + read timeout for one attempt
    pub timeout: Duration,
    /// Retries after the first attempt, for retryable statuses only
    pub max_retries: u32,
    /// Retry `n` (0-based) sleeps `backoff_factor * 2^n` seconds
    pub backoff_factor: f64,
    /// Minimum gap between any two requests from one fetcher
    pub rate_limit: Duration,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            product_url: DEFAULT_PRODUCT_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_language: DEFAULT_ACCEPT_LANGUAGE.to_string(),
            timeout: Duration::from_secs(20),
            max_retries: 3,
            backoff_factor: 1.0,
            rate_limit: Duration::from_secs(1),
        }
    }
}

impl FetchSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            product_url: config.site.product_url.clone(),
            user_agent: config.site.user_agent.clone(),
            accept_language: config.site.accept_language.clone(),
            timeout: Duration::from_secs(config.api.timeout),
            max_retries: config.api.max_retries,
            backoff_factor: config.api.backoff_factor,
            rate_limit: throttle::gap_from_secs(config.rate_limit),
        }
    }

    pub fn product_url(&self, canonical_id: &str) -> String {
        self.product_url.replace("{id}", canonical_id)
    }

    pub fn retry_backoff(&self, attempt: u32) -> Duration {
        if !self.backoff_factor.is_finite() || self.backoff_factor <= 0.0 {
            return Duration::ZERO;
        }
        let secs = self.backoff_factor * 2f64.powi(attempt.min(16) as i32);
        Duration::try_from_secs_f64(secs)
            .unwrap_or(MAX_RETRY_BACKOFF)
            .min(MAX_RETRY_BACKOFF)
    }
}

/// reqwest-based fetch client with connection reuse, bounded retries and a
/// request throttle.
pub struct HttpFetcher {
    client: Client,
    settings: FetchSettings,
    throttle: Arc<Throttle>,
}

impl HttpFetcher {
    pub fn new(settings: FetchSettings) -> Result<Self> {
        let throttle = Arc::new(Throttle::new(settings.rate_limit));
        Self::with_throttle(settings, throttle)
    }

    /// Build a fetcher that shares its throttle clock with other clients.
    pub fn with_throttle(settings: FetchSettings, throttle: Arc<Throttle>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(DEFAULT_ACCEPT));
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_str(&settings.accept_language).map_err(|_| {
                ReupError::Validation(format!(
                    "Invalid Accept-Language header: {:?}",
                    settings.accept_language
                ))
            })?,
        );
        headers.insert(DNT, HeaderValue::from_static("1"));
        headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));

        let client = Client::builder()
            .timeout(settings.timeout)
            .connect_timeout(settings.timeout)
            .gzip(true)
            .brotli(true)
            .user_agent(settings.user_agent.clone())
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            settings,
            throttle,
        })
    }

    async fn get_once(&self, url: &str) -> Result<RawDocument> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| classify(e, url))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ReupError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        let body = response.text().await.map_err(|e| classify(e, url))?;

        Ok(RawDocument {
            url: url.to_string(),
            content_type,
            body,
            fetched_at: Utc::now(),
        })
    }
}

fn classify(error: reqwest::Error, url: &str) -> ReupError {
    if error.is_timeout() {
        ReupError::Timeout(url.to_string())
    } else {
        ReupError::Network(error)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, canonical_id: &str) -> Result<RawDocument> {
        let url = self.settings.product_url(canonical_id);
        let mut attempt = 0;

        loop {
            self.throttle.acquire().await;
            tracing::debug!("GET {} (attempt {})", url, attempt + 1);

            match self.get_once(&url).await {
                // timeouts and network errors are left to the monitor's backoff
                Err(e @ ReupError::HttpStatus { .. })
                    if e.is_retryable() && attempt < self.settings.max_retries =>
                {
                    let delay = self.settings.retry_backoff(attempt);
                    tracing::warn!(
                        "{}, retry {}/{} in {:?}",
                        e,
                        attempt + 1,
                        self.settings.max_retries,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}
