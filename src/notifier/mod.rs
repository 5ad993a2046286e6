//! Notification gateway.
//!
//! The engine hands `(title, message)` pairs to a [`Notifier`] and never waits
//! on the outcome; failures are logged by the caller and go no further.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;

use crate::app::{ReupError, Result};
use crate::domain::AvailabilityRecord;

pub const RESTOCK_TITLE: &str = "Product In Stock!";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifierConfig {
    /// Program and leading arguments; title and message are appended
    pub command: Option<Vec<String>>,
}

#[async_trait]
pub trait Notifier {
    async fn notify(&self, title: &str, message: &str, timeout_secs: u64) -> Result<()>;
}

/// Title and message announcing a restock.
pub fn restock_message(record: &AvailabilityRecord) -> (String, String) {
    (
        RESTOCK_TITLE.to_string(),
        format!(
            "{} is now available!\n{} units in stock",
            record.name, record.units_available
        ),
    )
}

/// Pick the gateway described by the configuration.
pub fn from_config(config: &NotifierConfig) -> Arc<dyn Notifier + Send + Sync> {
    match config.command.as_deref() {
        Some([program, args @ ..]) if !program.trim().is_empty() => {
            Arc::new(CommandNotifier::new(program.clone(), args.to_vec()))
        }
        _ => Arc::new(LogNotifier),
    }
}

/// Writes notifications to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, title: &str, message: &str, _timeout_secs: u64) -> Result<()> {
        tracing::info!("{}: {}", title, message.replace('\n', " | "));
        Ok(())
    }
}

/// Runs an external program such as `notify-send` for every notification.
#[derive(Debug, Clone)]
pub struct CommandNotifier {
    program: String,
    args: Vec<String>,
}

impl CommandNotifier {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

#[async_trait]
impl Notifier for CommandNotifier {
    async fn notify(&self, title: &str, message: &str, timeout_secs: u64) -> Result<()> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(title)
            .arg(message)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        let status = tokio::time::timeout(Duration::from_secs(timeout_secs.max(1)), child.wait())
            .await
            .map_err(|_| {
                ReupError::Timeout(format!("notifier {} did not exit", self.program))
            })??;

        if status.success() {
            Ok(())
        } else {
            Err(ReupError::Other(format!(
                "notifier {} exited with {}",
                self.program, status
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_restock_message() {
        let mut record = AvailabilityRecord::new("RTX 5090");
        record.units_available = 3;
        let (title, message) = restock_message(&record);
        assert_eq!(title, "Product In Stock!");
        assert_eq!(message, "RTX 5090 is now available!\n3 units in stock");
    }

    #[tokio::test]
    async fn test_log_notifier_succeeds() {
        assert_ok!(LogNotifier.notify("t", "m", 10).await);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_notifier_exit_status() {
        assert_ok!(CommandNotifier::new("true", vec![]).notify("t", "m", 5).await);
        assert_err!(CommandNotifier::new("false", vec![]).notify("t", "m", 5).await);
    }

    #[tokio::test]
    async fn test_missing_program_fails() {
        let notifier = CommandNotifier::new("reup-no-such-notifier", vec![]);
        assert!(matches!(
            notifier.notify("t", "m", 5).await,
            Err(ReupError::Io(_))
        ));
    }
}
