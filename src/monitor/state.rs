use std::fmt;
use std::time::Duration;

use tokio::time::Instant;

use crate::domain::{AvailabilityRecord, TargetRef};

/// Delay after the first consecutive failure; doubles with each further one.
pub const BACKOFF_BASE: Duration = Duration::from_secs(15);
pub const MAX_BACKOFF: Duration = Duration::from_secs(300);

/// Wait before retrying after `consecutive_errors` failures in a row:
/// 15s, 30s, 60s, ... capped at 300s.
pub fn retry_delay(consecutive_errors: u32) -> Duration {
    let exponent = consecutive_errors.saturating_sub(1).min(16);
    BACKOFF_BASE
        .saturating_mul(1u32 << exponent)
        .min(MAX_BACKOFF)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorPhase {
    Running,
    Paused,
    Stopped,
}

impl fmt::Display for MonitorPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MonitorPhase::Running => "running",
            MonitorPhase::Paused => "paused",
            MonitorPhase::Stopped => "stopped",
        })
    }
}

/// How a target was added, for display and group operations only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum MonitorLabel {
    #[default]
    Product,
    Profile(String),
    Task(String),
}

impl fmt::Display for MonitorLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorLabel::Product => f.write_str("product"),
            MonitorLabel::Profile(name) => write!(f, "profile:{}", name),
            MonitorLabel::Task(name) => write!(f, "task:{}", name),
        }
    }
}

/// Per-target state, mutated only by the engine that owns it.
#[derive(Debug, Clone)]
pub struct MonitorState {
    pub target: TargetRef,
    pub label: MonitorLabel,
    pub phase: MonitorPhase,
    pub last_record: Option<AvailabilityRecord>,
    pub consecutive_errors: u32,
    /// `None` while paused, stopped or while a check is running
    pub next_check_at: Option<Instant>,
    pub interval: Duration,
    pub last_error: Option<String>,
    pub checks: u64,
}

impl MonitorState {
    pub fn new(target: TargetRef, label: MonitorLabel, interval: Duration) -> Self {
        Self {
            target,
            label,
            phase: MonitorPhase::Running,
            last_record: None,
            consecutive_errors: 0,
            next_check_at: None,
            interval,
            last_error: None,
            checks: 0,
        }
    }

    pub fn id(&self) -> &str {
        self.target.canonical_id()
    }

    pub fn was_in_stock(&self) -> bool {
        self.last_record.as_ref().is_some_and(|r| r.in_stock)
    }

    /// Store a successful check. Returns true on an out-of-stock to in-stock
    /// transition; no previous record counts as out of stock.
    pub fn record_success(&mut self, record: AvailabilityRecord) -> bool {
        let restocked = !self.was_in_stock() && record.in_stock;
        self.consecutive_errors = 0;
        self.last_error = None;
        self.checks += 1;
        self.last_record = Some(record);
        restocked
    }

    /// Count a failed check and return the backoff before the next one.
    /// The last record is kept as is.
    pub fn record_failure(&mut self, error: impl Into<String>) -> Duration {
        self.consecutive_errors = self.consecutive_errors.saturating_add(1);
        self.last_error = Some(error.into());
        self.checks += 1;
        retry_delay(self.consecutive_errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> MonitorState {
        MonitorState::new(
            TargetRef::new("https://www.bestbuy.ca/en-ca/product/1234567", "1234567"),
            MonitorLabel::Product,
            Duration::from_secs(15),
        )
    }

    fn record(in_stock: bool) -> AvailabilityRecord {
        let mut record = AvailabilityRecord::new("Item");
        record.in_stock = in_stock;
        record
    }

    #[test]
    fn test_backoff_sequence() {
        let delays: Vec<u64> = (1..=8).map(|n| retry_delay(n).as_secs()).collect();
        assert_eq!(delays, [15, 30, 60, 120, 240, 300, 300, 300]);
        assert_eq!(retry_delay(u32::MAX), MAX_BACKOFF);
    }

    #[test]
    fn test_backoff_never_decreases() {
        let mut prev = Duration::ZERO;
        for n in 1..100 {
            let delay = retry_delay(n);
            assert!(delay >= prev && delay <= MAX_BACKOFF);
            prev = delay;
        }
    }

    #[test]
    fn test_transitions_only_on_restock() {
        let mut state = state();
        let restocks: Vec<bool> = [false, false, true, true, false, true]
            .into_iter()
            .map(|in_stock| state.record_success(record(in_stock)))
            .collect();
        assert_eq!(restocks, [false, false, true, false, false, true]);
    }

    #[test]
    fn test_first_in_stock_counts_as_restock() {
        assert!(state().record_success(record(true)));
    }

    #[test]
    fn test_failure_keeps_last_record() {
        let mut state = state();
        state.record_success(record(true));

        assert_eq!(state.record_failure("timeout"), Duration::from_secs(15));
        assert_eq!(state.record_failure("timeout"), Duration::from_secs(30));
        assert!(state.was_in_stock());
        assert_eq!(state.consecutive_errors, 2);

        // Recovery while still in stock is not a new transition.
        assert!(!state.record_success(record(true)));
        assert_eq!(state.consecutive_errors, 0);
        assert!(state.last_error.is_none());
    }
}
