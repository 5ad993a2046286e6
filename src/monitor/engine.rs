use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{broadcast, Notify};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};

use crate::app::{ReupError, Result};
use crate::checker::{Check, StockChecker};
use crate::config::{Config, DEFAULT_INTERVAL, MIN_INTERVAL};
use crate::domain::{AvailabilityRecord, Profile, ProfileEntry, TargetRef};
use crate::locator::Locator;
use crate::monitor::event::MonitorEvent;
use crate::monitor::interval::{resolve_interval, MAX_INTERVAL};
use crate::monitor::scheduler::{DueTick, Registry};
use crate::monitor::state::{MonitorLabel, MonitorPhase, MonitorState};
use crate::notifier::{restock_message, Notifier};

const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Seconds between checks when the caller gives no usable interval
    pub default_interval: u64,
    pub min_interval: u64,
    pub notification_timeout: u64,
    pub enable_notifications: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            default_interval: DEFAULT_INTERVAL,
            min_interval: MIN_INTERVAL,
            notification_timeout: 10,
            enable_notifications: true,
        }
    }
}

impl EngineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            default_interval: config.check_interval,
            min_interval: config.min_interval,
            notification_timeout: config.notification_timeout,
            enable_notifications: config.enable_notifications,
        }
    }
}

struct Shared {
    checker: Arc<StockChecker>,
    locator: Locator,
    notifier: Arc<dyn Notifier + Send + Sync>,
    settings: EngineSettings,
    registry: Mutex<Registry>,
    wake: Notify,
    events: broadcast::Sender<MonitorEvent>,
}

/// Drives every monitored target from one scheduler task.
///
/// Checks of different targets run concurrently; checks of one target never
/// overlap. Must be created inside a tokio runtime. Dropping the engine stops
/// scheduling; checks already running finish and are discarded.
pub struct Engine {
    shared: Arc<Shared>,
    scheduler: JoinHandle<()>,
}

impl Engine {
    pub fn new(
        checker: Arc<StockChecker>,
        locator: Locator,
        notifier: Arc<dyn Notifier + Send + Sync>,
        settings: EngineSettings,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let shared = Arc::new(Shared {
            checker,
            locator,
            notifier,
            settings,
            registry: Mutex::new(Registry::default()),
            wake: Notify::new(),
            events,
        });
        let scheduler = tokio::spawn(run_scheduler(shared.clone()));

        Self { shared, scheduler }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.shared.events.subscribe()
    }

    /// Validate a product URL for monitoring.
    pub fn add_target(&self, url: &str) -> Result<TargetRef> {
        let target = self.shared.locator.target(url)?;
        if self.shared.lock().contains(target.canonical_id()) {
            return Err(ReupError::AlreadyMonitored(target.canonical_id().to_string()));
        }
        Ok(target)
    }

    /// Start checking `target`, first check immediately. Returns the
    /// effective interval.
    pub fn start_monitoring(&self, target: &TargetRef, interval: Option<&str>) -> Result<Duration> {
        self.start_labeled(target, interval, MonitorLabel::Product)
    }

    pub fn start_labeled(
        &self,
        target: &TargetRef,
        interval: Option<&str>,
        label: MonitorLabel,
    ) -> Result<Duration> {
        let settings = &self.shared.settings;
        let interval = resolve_interval(interval, settings.default_interval, settings.min_interval);
        let id = target.canonical_id();

        {
            let mut registry = self.shared.lock();
            registry.insert(MonitorState::new(target.clone(), label, interval))?;
            registry.schedule(id, Instant::now());
        }
        self.shared.wake.notify_one();

        tracing::info!("Monitoring {} every {}s", id, interval.as_secs());
        self.shared.publish(MonitorEvent::Started {
            id: id.to_string(),
            interval,
        });
        Ok(interval)
    }

    /// Resolve, register and start in one step.
    pub fn watch(&self, url: &str, interval: Option<&str>) -> Result<TargetRef> {
        let target = self.add_target(url)?;
        self.start_monitoring(&target, interval)?;
        Ok(target)
    }

    pub fn pause_monitoring(&self, id: &str) -> Result<()> {
        {
            let mut registry = self.shared.lock();
            let slot = registry
                .get_mut(id)
                .ok_or_else(|| ReupError::TargetNotFound(id.to_string()))?;
            ensure_phase(id, "pause", slot.state.phase, MonitorPhase::Running)?;
            slot.state.phase = MonitorPhase::Paused;
            registry.cancel(id);
        }

        tracing::info!("Paused {}", id);
        self.shared.publish(MonitorEvent::Paused { id: id.to_string() });
        Ok(())
    }

    /// Resume a paused target with an immediate check.
    pub fn resume_monitoring(&self, id: &str) -> Result<()> {
        {
            let mut registry = self.shared.lock();
            let slot = registry
                .get_mut(id)
                .ok_or_else(|| ReupError::TargetNotFound(id.to_string()))?;
            ensure_phase(id, "resume", slot.state.phase, MonitorPhase::Paused)?;
            slot.state.phase = MonitorPhase::Running;

            // A check still running from before the pause reschedules itself.
            if !registry.is_in_flight(id) {
                registry.schedule(id, Instant::now());
            }
        }
        self.shared.wake.notify_one();

        tracing::info!("Resumed {}", id);
        self.shared.publish(MonitorEvent::Resumed { id: id.to_string() });
        Ok(())
    }

    /// Stop monitoring and free the id for re-adding. Returns the final state.
    pub fn stop_monitoring(&self, id: &str) -> Result<MonitorState> {
        let slot = self
            .shared
            .lock()
            .remove(id)
            .ok_or_else(|| ReupError::TargetNotFound(id.to_string()))?;

        let mut state = slot.state;
        state.phase = MonitorPhase::Stopped;
        state.next_check_at = None;

        tracing::info!("Stopped {}", id);
        self.shared.publish(MonitorEvent::Stopped { id: id.to_string() });
        Ok(state)
    }

    pub fn get_last_record(&self, id: &str) -> Result<Option<AvailabilityRecord>> {
        Ok(self.snapshot(id)?.last_record)
    }

    pub fn snapshot(&self, id: &str) -> Result<MonitorState> {
        self.shared
            .lock()
            .get(id)
            .map(|slot| slot.state.clone())
            .ok_or_else(|| ReupError::TargetNotFound(id.to_string()))
    }

    /// All monitored targets, ordered by id.
    pub fn list(&self) -> Vec<MonitorState> {
        let mut states: Vec<MonitorState> = self
            .shared
            .lock()
            .slots()
            .map(|slot| slot.state.clone())
            .collect();
        states.sort_by(|a, b| a.id().cmp(b.id()));
        states
    }

    pub fn len(&self) -> usize {
        self.shared.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn ids_with_label(&self, label: &MonitorLabel) -> Vec<String> {
        let mut ids: Vec<String> = self
            .shared
            .lock()
            .slots()
            .filter(|slot| &slot.state.label == label)
            .map(|slot| slot.state.id().to_string())
            .collect();
        ids.sort();
        ids
    }

    /// Pause every running target with `label`. Returns how many were paused.
    pub fn pause_label(&self, label: &MonitorLabel) -> usize {
        self.ids_with_label(label)
            .iter()
            .filter(|id| self.pause_monitoring(id).is_ok())
            .count()
    }

    pub fn resume_label(&self, label: &MonitorLabel) -> usize {
        self.ids_with_label(label)
            .iter()
            .filter(|id| self.resume_monitoring(id).is_ok())
            .count()
    }

    pub fn stop_label(&self, label: &MonitorLabel) -> usize {
        self.ids_with_label(label)
            .iter()
            .filter(|id| self.stop_monitoring(id).is_ok())
            .count()
    }

    /// Add and start every product of a profile under the profile's label.
    ///
    /// An invalid profile is rejected as a whole; a bad product only fails
    /// its own entry.
    pub fn load_profile(&self, profile: &Profile) -> Result<Vec<(String, Result<TargetRef>)>> {
        profile.validate()?;
        let label = MonitorLabel::Profile(profile.name.clone());

        let results = profile
            .products
            .iter()
            .map(|entry| {
                let interval = profile.entry_interval(entry);
                let result = self.add_target(&entry.url).and_then(|target| {
                    self.start_labeled(&target, interval.as_deref(), label.clone())?;
                    Ok(target)
                });
                if let Err(e) = &result {
                    tracing::warn!("Skipping {} in profile {}: {}", entry.url, profile.name, e);
                }
                (entry.url.clone(), result)
            })
            .collect();

        Ok(results)
    }

    /// The profile's currently monitored products with their effective intervals.
    pub fn export_profile(&self, name: &str) -> Profile {
        let label = MonitorLabel::Profile(name.to_string());
        let mut profile = Profile::new(name);
        profile.products = self
            .list()
            .into_iter()
            .filter(|state| state.label == label)
            .map(|state| ProfileEntry {
                url: state.target.raw_url().to_string(),
                interval: Some(state.interval.as_secs()),
            })
            .collect();
        profile
    }

    /// Stop scheduling and wait for the scheduler task to exit.
    pub async fn shutdown(mut self) {
        self.scheduler.abort();
        let _ = (&mut self.scheduler).await;
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.scheduler.abort();
    }
}

fn ensure_phase(
    id: &str,
    action: &'static str,
    actual: MonitorPhase,
    expected: MonitorPhase,
) -> Result<()> {
    if actual == expected {
        Ok(())
    } else {
        Err(ReupError::InvalidTransition {
            id: id.to_string(),
            action,
            phase: actual.to_string(),
        })
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, event: MonitorEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn complete_tick(&self, id: &str, instance: u64, result: Result<Check>) {
        let mut events = Vec::new();
        let mut restocked = None;

        {
            let mut registry = self.lock();
            let now = Instant::now();
            let Some(slot) = registry.finish(id, instance, now) else {
                tracing::debug!("Discarding check result for {}: monitor was stopped", id);
                drop(registry);
                self.wake.notify_one();
                return;
            };
            let state = &mut slot.state;

            let delay = match result {
                Ok(Check { record, from_cache }) => {
                    let restock = state.record_success(record.clone());
                    tracing::debug!("Checked {}: {}", id, record);
                    events.push(MonitorEvent::Checked {
                        id: id.to_string(),
                        record: record.clone(),
                        from_cache,
                    });
                    if restock {
                        tracing::info!("{} ({}) is back in stock", record.name, id);
                        events.push(MonitorEvent::Restocked {
                            id: id.to_string(),
                            record: record.clone(),
                        });
                        restocked = Some(record);
                    }
                    state.interval
                }
                Err(e) => {
                    let error = e.to_string();
                    let delay = state.record_failure(error.clone());
                    tracing::warn!(
                        "Check failed for {} ({} in a row), retrying in {}s: {}",
                        id,
                        state.consecutive_errors,
                        delay.as_secs(),
                        error
                    );
                    events.push(MonitorEvent::CheckFailed {
                        id: id.to_string(),
                        error,
                        consecutive_errors: state.consecutive_errors,
                        retry_in: delay,
                    });
                    delay
                }
            };

            if state.phase == MonitorPhase::Running {
                registry.schedule(id, now + delay.min(MAX_INTERVAL));
            }
        }
        self.wake.notify_one();

        for event in events {
            self.publish(event);
        }
        if let Some(record) = restocked {
            self.notify_restock(&record);
        }
    }

    fn notify_restock(&self, record: &AvailabilityRecord) {
        if !self.settings.enable_notifications {
            tracing::debug!("Notifications disabled, not announcing {}", record.name);
            return;
        }

        let (title, message) = restock_message(record);
        let notifier = self.notifier.clone();
        let timeout = self.settings.notification_timeout;
        tokio::spawn(async move {
            if let Err(e) = notifier.notify(&title, &message, timeout).await {
                tracing::warn!("Could not send notification: {}", e);
            }
        });
    }
}

async fn run_scheduler(shared: Arc<Shared>) {
    loop {
        let (due, next) = {
            let mut registry = shared.lock();
            let due = registry.take_due(Instant::now());
            (due, registry.next_due())
        };

        for tick in due {
            tokio::spawn(run_tick(shared.clone(), tick));
        }

        match next {
            Some(at) => {
                tokio::select! {
                    _ = sleep_until(at) => {}
                    _ = shared.wake.notified() => {}
                }
            }
            None => shared.wake.notified().await,
        }
    }
}

async fn run_tick(shared: Arc<Shared>, tick: DueTick) {
    tracing::debug!("Checking {}", tick.id);
    let result = shared.checker.check(&tick.id).await;
    shared.complete_tick(&tick.id, tick.instance, result);
}
