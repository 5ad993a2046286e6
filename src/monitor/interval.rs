//! Check interval parsing and clamping.

use std::time::Duration;

/// Longest interval between two checks of one target.
pub const MAX_INTERVAL: Duration = Duration::from_secs(7 * 86400);

/// Parse an interval like `"15"`, `"15s"`, `"2m"`, `"1h"` or `"1d"` into seconds.
pub fn parse_interval(s: &str) -> Result<u64, String> {
    let s = s.trim().to_lowercase();

    let (digits, unit) = if let Some(hours) = s.strip_suffix('h') {
        (hours, 3600)
    } else if let Some(minutes) = s.strip_suffix('m') {
        (minutes, 60)
    } else if let Some(days) = s.strip_suffix('d') {
        (days, 86400)
    } else if let Some(secs) = s.strip_suffix('s') {
        (secs, 1)
    } else {
        (s.as_str(), 1)
    };

    digits
        .trim()
        .parse::<u64>()
        .map_err(|_| format!("Invalid interval: {}. Use format like '15', '30s', '2m', '1h'", s))?
        .checked_mul(unit)
        .ok_or_else(|| format!("Interval too large: {}", s))
}

/// Format interval for display
pub fn format_interval(secs: u64) -> String {
    if secs >= 86400 && secs.is_multiple_of(86400) {
        format!("{}d", secs / 86400)
    } else if secs >= 3600 && secs.is_multiple_of(3600) {
        format!("{}h", secs / 3600)
    } else if secs >= 60 && secs.is_multiple_of(60) {
        format!("{}m", secs / 60)
    } else {
        format!("{}s", secs)
    }
}

/// Effective interval for a caller-supplied value.
///
/// Missing or unparsable input yields `default`; anything below `min` is
/// raised to `min` and anything above [`MAX_INTERVAL`] lowered to it.
/// Never fails.
pub fn resolve_interval(raw: Option<&str>, default: u64, min: u64) -> Duration {
    let secs = match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => default,
        Some(raw) => match parse_interval(raw) {
            Ok(secs) => secs,
            Err(e) => {
                tracing::warn!("{}; using default of {}s", e, default);
                default
            }
        },
    };

    if secs < min {
        tracing::debug!("Interval {}s is below minimum, using {}s", secs, min);
    }
    let secs = secs.max(min);
    if secs > MAX_INTERVAL.as_secs() {
        tracing::warn!(
            "Interval {}s is above maximum, using {}",
            secs,
            format_interval(MAX_INTERVAL.as_secs())
        );
    }
    Duration::from_secs(secs.min(MAX_INTERVAL.as_secs()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_interval() {
        assert_eq!(parse_interval("1h").unwrap(), 3600);
        assert_eq!(parse_interval("2m").unwrap(), 120);
        assert_eq!(parse_interval("1d").unwrap(), 86400);
        assert_eq!(parse_interval("15s").unwrap(), 15);
        assert_eq!(parse_interval(" 15 ").unwrap(), 15);
        assert_eq!(parse_interval("30S").unwrap(), 30);
    }

    #[test]
    fn test_parse_interval_invalid() {
        assert!(parse_interval("").is_err());
        assert!(parse_interval("abc").is_err());
        assert!(parse_interval("-5").is_err());
        assert!(parse_interval("1.5m").is_err());
        assert!(parse_interval("99999999999999999999h").is_err());
    }

    #[test]
    fn test_format_interval() {
        assert_eq!(format_interval(86400), "1d");
        assert_eq!(format_interval(7200), "2h");
        assert_eq!(format_interval(300), "5m");
        assert_eq!(format_interval(15), "15s");
        assert_eq!(format_interval(90), "90s");
    }

    #[test]
    fn test_interval_clamped_to_minimum() {
        assert_eq!(resolve_interval(Some("2"), 15, 5), Duration::from_secs(5));
        assert_eq!(resolve_interval(Some("0"), 15, 5), Duration::from_secs(5));
        assert_eq!(resolve_interval(Some("30"), 15, 5), Duration::from_secs(30));
    }

    #[test]
    fn test_non_numeric_falls_back_to_default() {
        assert_eq!(
            resolve_interval(Some("not-a-number"), 15, 5),
            Duration::from_secs(15)
        );
        assert_eq!(resolve_interval(None, 20, 5), Duration::from_secs(20));
        assert_eq!(resolve_interval(Some("  "), 20, 5), Duration::from_secs(20));
    }

    #[test]
    fn test_default_below_minimum_is_clamped() {
        assert_eq!(resolve_interval(Some("x"), 2, 5), Duration::from_secs(5));
    }

    #[test]
    fn test_resolve_interval_capped() {
        assert_eq!(
            resolve_interval(Some("18446744073709551615"), 15, 5),
            MAX_INTERVAL
        );
        assert_eq!(resolve_interval(Some("30d"), 15, 5), MAX_INTERVAL);
        assert_eq!(resolve_interval(None, u64::MAX, 5), MAX_INTERVAL);
        assert_eq!(resolve_interval(Some("7d"), 15, 5), MAX_INTERVAL);
    }
}
