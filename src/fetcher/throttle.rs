use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};

/// Minimum wall-clock gap between outbound requests.
///
/// Callers that arrive early wait; they are never rejected. The lock is held
/// across the wait so concurrent callers are released one gap apart.
#[derive(Debug)]
pub struct Throttle {
    min_gap: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl Throttle {
    pub fn new(min_gap: Duration) -> Self {
        Self {
            min_gap,
            last_request: Mutex::new(None),
        }
    }

    pub async fn acquire(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(prev) = *last {
            let ready_at = prev + self.min_gap;
            let now = Instant::now();
            if ready_at > now {
                tracing::debug!("Rate limit: waiting {:?}", ready_at - now);
                sleep_until(ready_at).await;
            }
        }

        *last = Some(Instant::now());
    }
}

/// Gap for a configured number of seconds; unusable values mean no gap.
pub fn gap_from_secs(secs: f64) -> Duration {
    if secs > 0.0 {
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::ZERO)
    } else {
        Duration::ZERO
    }
}
