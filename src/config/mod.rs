//! Configuration management for reup.
//!
//! Configuration is read from `~/.config/reup/config.toml` at startup.
//! If the file doesn't exist, a default configuration with comments is created.

use crate::fetcher::http_fetcher::{DEFAULT_ACCEPT_LANGUAGE, DEFAULT_PRODUCT_URL, DEFAULT_USER_AGENT};
use crate::locator::DEFAULT_DOMAIN;
use crate::notifier::NotifierConfig;
use crate::parser::ParserConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const DEFAULT_INTERVAL: u64 = 15;
pub const MIN_INTERVAL: u64 = 5;

/// Retries beyond this are almost certainly a misconfiguration.
const MAX_API_RETRIES: u32 = 10;

/// Main configuration struct.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default seconds between checks of one target
    pub check_interval: u64,
    /// Lower bound for any requested interval
    pub min_interval: u64,
    /// Minimum seconds between two outbound requests
    pub rate_limit: f64,
    pub notification_timeout: u64,
    pub enable_notifications: bool,
    /// Log filter used when `RUST_LOG` is unset
    pub log_level: String,
    pub site: SiteConfig,
    pub api: ApiConfig,
    pub cache: CacheConfig,
    pub parser: ParserConfig,
    pub notifier: NotifierConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            check_interval: DEFAULT_INTERVAL,
            min_interval: MIN_INTERVAL,
            rate_limit: 1.0,
            notification_timeout: 10,
            enable_notifications: true,
            log_level: "info".to_string(),
            site: SiteConfig::default(),
            api: ApiConfig::default(),
            cache: CacheConfig::default(),
            parser: ParserConfig::default(),
            notifier: NotifierConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Hosts outside this domain are rejected by the locator
    pub domain: String,
    /// Product document URL; `{id}` is replaced with the product id
    pub product_url: String,
    pub user_agent: String,
    pub accept_language: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            domain: DEFAULT_DOMAIN.to_string(),
            product_url: DEFAULT_PRODUCT_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_language: DEFAULT_ACCEPT_LANGUAGE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub max_retries: u32,
    /// Request timeout in seconds
    pub timeout: u64,
    pub backoff_factor: f64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            timeout: 20,
            backoff_factor: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enable: bool,
    /// Entry lifetime in seconds
    pub max_age: u64,
    /// Maximum number of entries
    pub max_size: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enable: true,
            max_age: 10,
            max_size: 1000,
        }
    }
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, creates a default one with comments.
    /// If the config file exists but is invalid, returns an error.
    /// Missing fields in the config file will use default values.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
            return Ok(Self::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path; the file must exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(config.normalized())
    }

    /// Get the default config file path: `~/.config/reup/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("reup").join("config.toml"))
    }

    /// Clamp out-of-range values instead of rejecting the whole file.
    pub fn normalized(mut self) -> Self {
        if self.min_interval == 0 {
            tracing::warn!("min_interval must be at least 1 second, using 1");
            self.min_interval = 1;
        }
        if self.check_interval < self.min_interval {
            tracing::warn!(
                "check_interval {} is below min_interval {}, clamping",
                self.check_interval,
                self.min_interval
            );
            self.check_interval = self.min_interval;
        }
        if !self.rate_limit.is_finite() || self.rate_limit < 0.0 {
            tracing::warn!("rate_limit {} is invalid, disabling throttle", self.rate_limit);
            self.rate_limit = 0.0;
        }
        if self.api.max_retries > MAX_API_RETRIES {
            tracing::warn!(
                "api.max_retries {} is too high, using {}",
                self.api.max_retries,
                MAX_API_RETRIES
            );
            self.api.max_retries = MAX_API_RETRIES;
        }
        if self.api.timeout == 0 {
            tracing::warn!("api.timeout must be at least 1 second, using 1");
            self.api.timeout = 1;
        }
        self
    }

    /// Create a default config file with comments.
    fn create_default_config(path: &PathBuf) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.clone(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.clone(),
                source: e,
            })?;

        Ok(())
    }

    /// Generate the default config file content with comments.
    fn default_config_content() -> String {
        r##"# reup configuration
#
# Intervals are in seconds. Any interval below min_interval is raised to it,
# and any interval above 7 days is lowered to 7 days.

check_interval = 15
min_interval = 5

# Minimum seconds between two requests to the site
rate_limit = 1.0

enable_notifications = true
notification_timeout = 10

# Used when RUST_LOG is not set
log_level = "info"

[site]
domain = "bestbuy.ca"
# {id} is replaced with the product id. The JSON API lives at
# "https://www.bestbuy.ca/api/v2/json/product/{id}"
product_url = "https://www.bestbuy.ca/en-ca/product/{id}"
accept_language = "en-US,en;q=0.5"

[api]
max_retries = 3
timeout = 20
backoff_factor = 1.0

[cache]
enable = true
# Keep below check_interval, or monitors will keep seeing the cached record
max_age = 10
max_size = 1000

[parser]
# Phrases are matched case-insensitively against the visible page text.
# Out-of-stock phrases win over in-stock phrases.
out_of_stock_phrases = ["sold out", "coming soon", "not available online", "check stores"]
in_stock_phrases = ["add to cart", "ship it"]
title_suffixes = [" | Best Buy Canada", " | Best Buy"]
purchase_control_state = "ADD_TO_CART"

[notifier]
# Program run on restock, with title and message appended as arguments.
# command = ["notify-send", "--app-name=reup"]
"##
        .to_string()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}
