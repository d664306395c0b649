//! Named wake-up scheduling
//!
//! Wake-ups are one-shot and identified by name. Scheduling a name that is
//! already pending replaces it, so a tab never owns two wake-ups of the same
//! kind. Fired names are delivered on an mpsc channel; the registry never
//! awaits the scheduler.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::{runtime::Handle, sync::mpsc, task::JoinHandle, time::sleep};
use tracing::{debug, info, warn};

use crate::utils::time::{now_ms, seconds_to_ms};

/// A wake-up that has been scheduled but has not fired yet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingWakeUp {
    pub name: String,
    /// Epoch milliseconds at which the wake-up fires
    pub fire_timestamp: i64,
}

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Failed to access wake-up store {path}: {source}")]
    Store {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode wake-up store: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Scheduler state unavailable: {0}")]
    Lock(String),
}

/// Deferred, name-addressed wake-ups provided by the host
pub trait Scheduler: Send + Sync {
    /// Schedule `name` to fire after `delay_seconds`, replacing any pending one
    fn schedule(&self, name: &str, delay_seconds: u64) -> Result<(), SchedulerError>;

    /// Cancel `name`; returns whether something was pending
    fn cancel(&self, name: &str) -> Result<bool, SchedulerError>;

    /// Every wake-up that has not fired yet
    fn list_pending(&self) -> Vec<PendingWakeUp>;
}

struct ArmedWakeUp {
    fire_timestamp: i64,
    generation: u64,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct Armed {
    next_generation: u64,
    entries: HashMap<String, ArmedWakeUp>,
}

impl Armed {
    fn snapshot(&self) -> Vec<PendingWakeUp> {
        let mut pending: Vec<PendingWakeUp> = self
            .entries
            .iter()
            .map(|(name, armed)| PendingWakeUp {
                name: name.clone(),
                fire_timestamp: armed.fire_timestamp,
            })
            .collect();
        pending.sort_by(|a, b| a.name.cmp(&b.name));
        pending
    }
}

/// Scheduler backed by tokio timers, optionally persisted to a JSON file
pub struct TokioScheduler {
    armed: Arc<Mutex<Armed>>,
    fired_tx: mpsc::UnboundedSender<String>,
    store: Option<PathBuf>,
    runtime: Handle,
}

impl TokioScheduler {
    /// Create a scheduler that spawns its timers on `runtime`
    pub fn new(
        runtime: Handle,
        fired_tx: mpsc::UnboundedSender<String>,
        store: Option<PathBuf>,
    ) -> Self {
        Self {
            armed: Arc::new(Mutex::new(Armed::default())),
            fired_tx,
            store,
            runtime,
        }
    }

    /// Re-arm the wake-ups saved by a previous run and return them
    ///
    /// Wake-ups whose fire time has already passed fire immediately.
    pub fn restore(&self) -> Result<Vec<PendingWakeUp>, SchedulerError> {
        let Some(path) = &self.store else {
            return Ok(Vec::new());
        };
        if !path.exists() {
            debug!("No wake-up store at {}, starting empty", path.display());
            return Ok(Vec::new());
        }

        let raw = fs::read_to_string(path).map_err(|source| SchedulerError::Store {
            path: path.clone(),
            source,
        })?;
        let saved: Vec<PendingWakeUp> = serde_json::from_str(&raw)?;

        let mut armed = self.lock()?;
        for wake_up in &saved {
            self.arm(&mut armed, &wake_up.name, wake_up.fire_timestamp);
        }
        info!("Restored {} wake-ups from {}", saved.len(), path.display());
        Ok(saved)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Armed>, SchedulerError> {
        self.armed
            .lock()
            .map_err(|e| SchedulerError::Lock(e.to_string()))
    }

    /// Spawn the timer task for `name`; caller holds the lock
    fn arm(&self, armed: &mut Armed, name: &str, fire_timestamp: i64) {
        if let Some(previous) = armed.entries.remove(name) {
            previous.handle.abort();
        }

        armed.next_generation += 1;
        let generation = armed.next_generation;
        let delay_ms = (fire_timestamp - now_ms()).max(0) as u64;

        let shared = Arc::clone(&self.armed);
        let fired_tx = self.fired_tx.clone();
        let store = self.store.clone();
        let task_name = name.to_string();

        let handle = self.runtime.spawn(async move {
            sleep(Duration::from_millis(delay_ms)).await;

            let remaining = {
                let Ok(mut armed) = shared.lock() else {
                    warn!("Scheduler state poisoned, dropping wake-up {}", task_name);
                    return;
                };
                // A newer wake-up with the same name replaced this one
                if armed.entries.get(&task_name).map(|e| e.generation) != Some(generation) {
                    return;
                }
                armed.entries.remove(&task_name);
                armed.snapshot()
            };

            if let Some(path) = &store {
                if let Err(e) = write_store(path, &remaining) {
                    warn!("Failed to persist wake-ups after {} fired: {}", task_name, e);
                }
            }

            debug!("Wake-up {} fired", task_name);
            if fired_tx.send(task_name.clone()).is_err() {
                warn!("Wake-up {} fired but no dispatcher is listening", task_name);
            }
        });

        armed.entries.insert(
            name.to_string(),
            ArmedWakeUp {
                fire_timestamp,
                generation,
                handle,
            },
        );
    }

    /// Synchronous write, called with the lock held so an older snapshot
    /// can never overwrite a newer one
    fn persist(&self, armed: &Armed) -> Result<(), SchedulerError> {
        match &self.store {
            Some(path) => write_store(path, &armed.snapshot()),
            None => Ok(()),
        }
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, name: &str, delay_seconds: u64) -> Result<(), SchedulerError> {
        let fire_timestamp = now_ms().saturating_add(seconds_to_ms(delay_seconds));
        let mut armed = self.lock()?;
        self.arm(&mut armed, name, fire_timestamp);
        debug!("Scheduled wake-up {} in {}s", name, delay_seconds);
        self.persist(&armed)
    }

    fn cancel(&self, name: &str) -> Result<bool, SchedulerError> {
        let mut armed = self.lock()?;
        match armed.entries.remove(name) {
            Some(previous) => {
                previous.handle.abort();
                debug!("Cancelled wake-up {}", name);
                self.persist(&armed)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn list_pending(&self) -> Vec<PendingWakeUp> {
        match self.armed.lock() {
            Ok(armed) => armed.snapshot(),
            Err(e) => {
                warn!("Scheduler state poisoned: {}", e);
                Vec::new()
            }
        }
    }
}

fn write_store(path: &Path, pending: &[PendingWakeUp]) -> Result<(), SchedulerError> {
    let encoded = serde_json::to_string_pretty(pending)?;
    fs::write(path, encoded).map_err(|source| SchedulerError::Store {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheduler(store: Option<PathBuf>) -> (TokioScheduler, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (TokioScheduler::new(Handle::current(), tx, store), rx)
    }

    #[tokio::test]
    async fn fires_scheduled_wake_up() {
        let (scheduler, mut rx) = scheduler(None);
        scheduler.schedule("closeTab_1", 0).unwrap();

        let fired = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap();
        assert_eq!(fired.as_deref(), Some("closeTab_1"));
        assert!(scheduler.list_pending().is_empty());
    }

    #[tokio::test]
    async fn rescheduling_replaces_pending_wake_up() {
        let (scheduler, _rx) = scheduler(None);
        scheduler.schedule("warnTab_4", 600).unwrap();
        scheduler.schedule("warnTab_4", 900).unwrap();

        let pending = scheduler.list_pending();
        assert_eq!(pending.len(), 1);
        assert!(pending[0].fire_timestamp - now_ms() > 600_000);
    }

    #[tokio::test]
    async fn cancelled_wake_up_never_fires() {
        let (scheduler, mut rx) = scheduler(None);
        scheduler.schedule("closeTab_2", 0).unwrap();
        assert!(scheduler.cancel("closeTab_2").unwrap());
        assert!(!scheduler.cancel("closeTab_2").unwrap());

        let fired = tokio::time::timeout(Duration::from_millis(200), rx.recv()).await;
        assert!(fired.is_err());
    }

    #[tokio::test]
    async fn pending_wake_ups_survive_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alarms.json");

        {
            let (scheduler, _rx) = scheduler(Some(path.clone()));
            scheduler.schedule("closeTab_9", 3_600).unwrap();
            scheduler.schedule("warnTab_9", 3_540).unwrap();
        }

        let (restored, _rx) = scheduler(Some(path));
        assert_eq!(restored.restore().unwrap().len(), 2);
        let names: Vec<String> = restored.list_pending().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["closeTab_9".to_string(), "warnTab_9".to_string()]);
    }

    #[tokio::test]
    async fn store_tracks_cancellations() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alarms.json");
        let (scheduler, _rx) = scheduler(Some(path.clone()));

        scheduler.schedule("closeTab_3", 600).unwrap();
        scheduler.schedule("warnTab_3", 540).unwrap();
        scheduler.cancel("warnTab_3").unwrap();

        let saved: Vec<PendingWakeUp> =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved, scheduler.list_pending());
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].name, "closeTab_3");
    }

    #[tokio::test]
    async fn restore_without_store_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let (scheduler, _rx) = scheduler(Some(dir.path().join("missing.json")));
        assert!(scheduler.restore().unwrap().is_empty());
    }
}
