use thiserror::Error;

use crate::config::ConfigError;

/// HTTP statuses the fetch client retries and the monitor treats as transient.
pub const RETRYABLE_STATUSES: [u16; 6] = [408, 429, 500, 502, 503, 504];

#[derive(Error, Debug)]
pub enum ReupError {
    #[error("Invalid URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Could not parse availability: {0}")]
    ParseFailure(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Target not found: {0}")]
    TargetNotFound(String),

    #[error("Target already monitored: {0}")]
    AlreadyMonitored(String),

    #[error("Cannot {action} target {id} while it is {phase}")]
    InvalidTransition {
        id: String,
        action: &'static str,
        phase: String,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl ReupError {
    pub fn invalid_url(url: &str, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether a later attempt may succeed without any change on our side.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Network(_) => true,
            Self::HttpStatus { status, .. } => RETRYABLE_STATUSES.contains(status),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ReupError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_statuses() {
        for status in RETRYABLE_STATUSES {
            let err = ReupError::HttpStatus {
                status,
                url: "https://example.com".into(),
            };
            assert!(err.is_retryable(), "{status} should be retryable");
        }
    }

    #[test]
    fn test_client_errors_not_retryable() {
        let err = ReupError::HttpStatus {
            status: 404,
            url: "https://example.com".into(),
        };
        assert!(!err.is_retryable());
        assert!(!ReupError::ParseFailure("empty".into()).is_retryable());
        assert!(!ReupError::invalid_url("ftp://x", "bad scheme").is_retryable());
    }

    #[test]
    fn test_timeout_retryable() {
        assert!(ReupError::Timeout("https://example.com".into()).is_retryable());
    }

    #[test]
    fn test_invalid_url_message_carries_url() {
        let err = ReupError::invalid_url("https://example.com/x", "unsupported host");
        let msg = err.to_string();
        assert!(msg.contains("https://example.com/x"));
        assert!(msg.contains("unsupported host"));
    }
}
