//! Background sync scheduling.
//!
//! A single scheduler task owns all sync execution. Startup, interval and
//! manual triggers funnel into it over a channel, so two syncs never run
//! concurrently in-process no matter how triggers interleave. Other
//! processes are held off by the data-directory lock.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::time::{Instant, MissedTickBehavior, interval_at, sleep};

use crate::config::SyncConfig;
use crate::http::HttpTransport;
use crate::lock::SyncLock;
use crate::sync::{SyncEngine, SyncOutcome};

/// Delay before the startup sync, leaving the upstream session a moment
/// to settle after login.
pub const STARTUP_SYNC_DELAY: Duration = Duration::from_millis(1600);

const TRIGGER_QUEUE: usize = 8;
const EVENT_QUEUE: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncTrigger {
    Startup,
    Interval,
    Manual,
}

impl SyncTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncTrigger::Startup => "startup",
            SyncTrigger::Interval => "interval",
            SyncTrigger::Manual => "manual",
        }
    }
}

#[derive(Debug, Clone)]
pub enum SchedulerEvent {
    Started(SyncTrigger),
    Completed(SyncOutcome),
    Failed(String),
    Skipped,
}

/// Cheap cloneable handle for requesting syncs and observing outcomes.
#[derive(Clone)]
pub struct SchedulerHandle {
    triggers: mpsc::Sender<SyncTrigger>,
    events: broadcast::Sender<SchedulerEvent>,
}

impl SchedulerHandle {
    pub fn request_sync(&self) {
        if self.triggers.try_send(SyncTrigger::Manual).is_err() {
            tracing::debug!("sync request dropped, scheduler busy or gone");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SchedulerEvent> {
        self.events.subscribe()
    }
}

pub struct Scheduler {
    config: SyncConfig,
    config_path: Option<PathBuf>,
    transport: Arc<dyn HttpTransport>,
    triggers: mpsc::Receiver<SyncTrigger>,
    events: broadcast::Sender<SchedulerEvent>,
}

impl Scheduler {
    pub fn new(config: SyncConfig, transport: Arc<dyn HttpTransport>) -> (Self, SchedulerHandle) {
        let (trigger_tx, trigger_rx) = mpsc::channel(TRIGGER_QUEUE);
        let (event_tx, _) = broadcast::channel(EVENT_QUEUE);

        let handle = SchedulerHandle {
            triggers: trigger_tx,
            events: event_tx.clone(),
        };
        let scheduler = Self {
            config,
            config_path: None,
            transport,
            triggers: trigger_rx,
            events: event_tx,
        };
        (scheduler, handle)
    }

    /// Reload configuration from `path` before every run, so edits take
    /// effect without restarting. The sync interval stays as it was at
    /// startup.
    pub fn reload_from(mut self, path: PathBuf) -> Self {
        self.config_path = Some(path);
        self
    }

    /// Drive the scheduler until every [`SchedulerHandle`] is dropped.
    pub async fn run(mut self) {
        let period = Duration::from_secs(self.config.auto_sync_minutes.max(1) * 60);
        let mut timer = interval_at(Instant::now() + period, period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let startup = sleep(STARTUP_SYNC_DELAY);
        tokio::pin!(startup);
        let mut startup_pending = true;

        loop {
            tokio::select! {
                _ = &mut startup, if startup_pending => {
                    startup_pending = false;
                    self.run_once(SyncTrigger::Startup).await;
                }
                _ = timer.tick() => {
                    self.run_once(SyncTrigger::Interval).await;
                }
                trigger = self.triggers.recv() => match trigger {
                    Some(trigger) => self.run_once(trigger).await,
                    None => break,
                },
            }
        }
    }

    async fn run_once(&self, trigger: SyncTrigger) {
        let config = self.load_config();

        let data_dir = match config.data_path() {
            Ok(dir) => dir,
            Err(e) => {
                self.publish(SchedulerEvent::Failed(e.to_string()));
                return;
            }
        };

        let guard = match SyncLock::new(&data_dir).try_acquire() {
            Ok(Some(guard)) => guard,
            Ok(None) => {
                tracing::info!(trigger = trigger.as_str(), "another sync is running, skipping");
                self.publish(SchedulerEvent::Skipped);
                return;
            }
            Err(e) => {
                self.publish(SchedulerEvent::Failed(e.to_string()));
                return;
            }
        };

        self.publish(SchedulerEvent::Started(trigger));
        let engine = SyncEngine::new(config, self.transport.clone());
        let result = engine.run().await;

        // The lock is released before the outcome is announced.
        drop(guard);

        match result {
            Ok(outcome) => self.publish(SchedulerEvent::Completed(outcome)),
            Err(e) => {
                tracing::error!(trigger = trigger.as_str(), error = %e, "sync failed");
                self.publish(SchedulerEvent::Failed(e.to_string()));
            }
        }
    }

    fn load_config(&self) -> SyncConfig {
        let Some(path) = &self.config_path else {
            return self.config.clone();
        };
        match SyncConfig::load_from(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(error = %e, "could not reload config, using startup copy");
                self.config.clone()
            }
        }
    }

    // Send failures just mean nobody is listening right now.
    fn publish(&self, event: SchedulerEvent) {
        let _ = self.events.send(event);
    }
}
