//! Repeated availability checks for monitored targets.
//!
//! # Lifecycle
//!
//! ```text
//! start → Running ⇄ Paused
//!            ↓        ↓
//!          Stopped (terminal, id released)
//! ```
//!
//! A running target is checked, then rescheduled after its interval on
//! success or after an exponential backoff on failure. A restock (out of
//! stock to in stock) produces exactly one notification.
//!
//! # Usage
//!
//! ```rust,ignore
//! use reup::app::AppContext;
//!
//! let ctx = AppContext::new(config)?;
//! let engine = ctx.engine();
//! let mut events = engine.subscribe();
//!
//! let target = engine.add_target("https://www.bestbuy.ca/en-ca/product/18931348")?;
//! engine.start_monitoring(&target, Some("30s"))?;
//!
//! while let Ok(event) = events.recv().await {
//!     println!("{:?}", event);
//! }
//! ```

pub mod engine;
pub mod event;
pub mod interval;
pub mod scheduler;
pub mod state;

pub use engine::{Engine, EngineSettings};
pub use event::MonitorEvent;
pub use interval::{format_interval, parse_interval, resolve_interval, MAX_INTERVAL};
pub use state::{retry_delay, MonitorLabel, MonitorPhase, MonitorState};
