//! Foreground runner for the monitoring engine.
//!
//! Prints every engine event with a timestamp until SIGINT or SIGTERM, then
//! stops all monitors.

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use chrono::Local;
use tokio::sync::broadcast::error::RecvError;

use crate::monitor::{format_interval, Engine, MonitorEvent};

/// Daemon configuration
#[derive(Debug, Clone, Default)]
pub struct DaemonConfig {
    /// Log file path (None = stdout)
    pub log_file: Option<PathBuf>,
    /// Print every successful check, not only changes and failures
    pub verbose: bool,
}

/// Daemon runner
pub struct Daemon {
    engine: Engine,
    config: DaemonConfig,
}

impl Daemon {
    pub fn new(engine: Engine, config: DaemonConfig) -> Self {
        Self { engine, config }
    }

    /// Log a message with timestamp
    fn log(&self, msg: &str) {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        let line = format!("[{}] {}", timestamp, msg);

        if let Some(ref log_path) = self.config.log_file {
            if let Ok(mut file) = fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(log_path)
            {
                let _ = writeln!(file, "{}", line);
            }
        } else {
            println!("{}", line);
        }
    }

    /// Run until a shutdown signal arrives.
    pub async fn run(self) -> crate::app::Result<()> {
        let mut events = self.engine.subscribe();
        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        self.log(&format!(
            "reup started: {} target(s), PID {}",
            self.engine.len(),
            std::process::id()
        ));
        for state in self.engine.list() {
            self.log(&format!(
                "  {} every {} [{}]",
                state.target.raw_url(),
                format_interval(state.interval.as_secs()),
                state.label
            ));
        }

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                event = events.recv() => match event {
                    Ok(event) => {
                        if let Some(line) = describe_event(&event, self.config.verbose) {
                            self.log(&line);
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("Event log fell behind, {} events skipped", skipped);
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }

        self.log("Shutting down...");
        for state in self.engine.list() {
            if let Err(e) = self.engine.stop_monitoring(state.id()) {
                tracing::debug!("Stop of {} failed: {}", state.id(), e);
            }
        }
        self.engine.shutdown().await;

        Ok(())
    }
}

/// Resolves on SIGINT or SIGTERM (Ctrl-C elsewhere).
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => {},
                    _ = sigint.recv() => {},
                }
            }
            _ => {
                tracing::warn!("Could not install signal handlers, falling back to Ctrl-C");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

/// One log line for an event; routine checks only when `verbose`.
pub fn describe_event(event: &MonitorEvent, verbose: bool) -> Option<String> {
    match event {
        MonitorEvent::Started { id, interval } => Some(format!(
            "Monitoring {} every {}",
            id,
            format_interval(interval.as_secs())
        )),
        MonitorEvent::Checked {
            id,
            record,
            from_cache,
        } => verbose.then(|| {
            format!(
                "{}: {}{}",
                id,
                record,
                if *from_cache { " (cached)" } else { "" }
            )
        }),
        MonitorEvent::Restocked { id, record } => Some(format!(
            "IN STOCK: {} ({}) at {}, {} units",
            record.name,
            id,
            record.display_price(),
            record.units_available
        )),
        MonitorEvent::CheckFailed {
            id,
            error,
            consecutive_errors,
            retry_in,
        } => Some(format!(
            "{}: check failed ({} in a row), retrying in {}: {}",
            id,
            consecutive_errors,
            format_interval(retry_in.as_secs()),
            error
        )),
        MonitorEvent::Paused { id } => Some(format!("Paused {}", id)),
        MonitorEvent::Resumed { id } => Some(format!("Resumed {}", id)),
        MonitorEvent::Stopped { id } => Some(format!("Stopped {}", id)),
    }
}
