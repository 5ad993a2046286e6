//! # reup
//!
//! Polls product pages and raises one alert each time an item comes back in
//! stock, while keeping to the site's request budget.
//!
//! ## Architecture
//!
//! reup follows a modular pipeline architecture:
//!
//! ```text
//! Locator → Fetcher → Parser → Cache → Checker → Monitor → Notifier
//! ```
//!
//! - [`locator`]: Extracts the product id from a product URL
//! - [`fetcher`]: Throttled, retrying HTTP client
//! - [`parser`]: Turns API payloads or rendered pages into availability records
//! - [`monitor`]: Schedules checks per target and detects restocks
//!
//! ## Quick Start
//!
//! ```bash
//! # Check a product once
//! reup check https://www.bestbuy.ca/en-ca/product/18931348
//!
//! # Keep checking every 30 seconds until Ctrl-C
//! reup watch https://www.bestbuy.ca/en-ca/product/18931348 --interval 30s
//!
//! # Monitor every product of a profile
//! reup profile gpus.json
//! ```

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together all components:
/// locator, fetcher, cache, checker, notifier.
pub mod app;

/// Response cache shared by all monitors.
pub mod cache;

/// One-shot availability checks, single and parallel.
pub mod checker;

/// Configuration management.
///
/// Loads from `~/.config/reup/config.toml`, supporting:
/// - Check intervals and the request rate limit
/// - Retry, timeout and cache settings
/// - Parser phrase lists
/// - An external notification command
pub mod config;

/// Foreground runner that logs engine events until interrupted.
pub mod daemon;

/// Command-line interface using clap.
///
/// Defines the CLI structure and subcommands:
/// - `resolve <url>...` - Print product ids
/// - `check <url>...` - Check availability once
/// - `watch <url>...` - Monitor until interrupted
/// - `profile <file>` - Monitor a profile's products
/// - `config` - Show effective configuration
pub mod cli;

/// Core domain models.
///
/// - [`TargetRef`](domain::TargetRef): A monitored product
/// - [`AvailabilityRecord`](domain::AvailabilityRecord): Result of one check
/// - [`Profile`](domain::Profile): Named list of products with intervals
pub mod domain;

/// HTTP fetching with throttling and retries.
///
/// - [`Fetcher`](fetcher::Fetcher): Async trait for document fetching
/// - [`HttpFetcher`](fetcher::http_fetcher::HttpFetcher): reqwest-based implementation
/// - [`Throttle`](fetcher::throttle::Throttle): Minimum gap between requests
pub mod fetcher;

pub mod locator;

/// Per-target monitoring state machine and scheduler.
pub mod monitor;

/// Notification gateway.
pub mod notifier;

/// Availability parsing for API payloads and HTML pages.
pub mod parser;
