use std::time::Duration;

use crate::domain::AvailabilityRecord;

/// Published by the engine on every state change and check outcome.
#[derive(Debug, Clone)]
pub enum MonitorEvent {
    Started {
        id: String,
        interval: Duration,
    },
    Checked {
        id: String,
        record: AvailabilityRecord,
        from_cache: bool,
    },
    Restocked {
        id: String,
        record: AvailabilityRecord,
    },
    CheckFailed {
        id: String,
        error: String,
        consecutive_errors: u32,
        retry_in: Duration,
    },
    Paused {
        id: String,
    },
    Resumed {
        id: String,
    },
    Stopped {
        id: String,
    },
}
