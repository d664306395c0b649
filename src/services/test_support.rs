//! Recording fakes for the host adapters

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};

use super::{
    InMemoryTabs, Notifier, NotifyError, PendingWakeUp, Scheduler, SchedulerError, Tab,
    TabControl, TabError,
};
use crate::state::TabId;

/// Scheduler that only remembers what is pending
#[derive(Default)]
pub struct FakeScheduler {
    pub pending: Mutex<BTreeMap<String, u64>>,
    pub fail: Mutex<bool>,
}

impl FakeScheduler {
    pub fn delay_of(&self, name: &str) -> Option<u64> {
        self.pending.lock().unwrap().get(name).copied()
    }

    pub fn names(&self) -> Vec<String> {
        self.pending.lock().unwrap().keys().cloned().collect()
    }

    pub fn set_failing(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }
}

impl Scheduler for FakeScheduler {
    fn schedule(&self, name: &str, delay_seconds: u64) -> Result<(), SchedulerError> {
        if *self.fail.lock().unwrap() {
            return Err(SchedulerError::Lock("scheduler offline".to_string()));
        }
        self.pending
            .lock()
            .unwrap()
            .insert(name.to_string(), delay_seconds);
        Ok(())
    }

    fn cancel(&self, name: &str) -> Result<bool, SchedulerError> {
        Ok(self.pending.lock().unwrap().remove(name).is_some())
    }

    fn list_pending(&self) -> Vec<PendingWakeUp> {
        self.pending
            .lock()
            .unwrap()
            .iter()
            .map(|(name, delay)| PendingWakeUp {
                name: name.clone(),
                fire_timestamp: (*delay as i64) * 1000,
            })
            .collect()
    }
}

/// Notifier that records every request
#[derive(Default)]
pub struct FakeNotifier {
    pub created: Mutex<Vec<(TabId, u64, bool, bool)>>,
    pub warnings: Mutex<Vec<(TabId, u64)>>,
}

impl FakeNotifier {
    pub fn warning_count(&self) -> usize {
        self.warnings.lock().unwrap().len()
    }
}

impl Notifier for FakeNotifier {
    fn show_created(
        &self,
        tab_id: TabId,
        duration: u64,
        is_iteration: bool,
        will_iterate: bool,
    ) -> Result<String, NotifyError> {
        self.created
            .lock()
            .unwrap()
            .push((tab_id, duration, is_iteration, will_iterate));
        Ok(format!("created-{}", tab_id))
    }

    fn show_warning(&self, tab_id: TabId, seconds_left: u64) -> Result<String, NotifyError> {
        self.warnings.lock().unwrap().push((tab_id, seconds_left));
        Ok(format!("warning-{}", tab_id))
    }
}

/// Adapters shared between a registry under test and its assertions
pub struct Harness {
    pub scheduler: Arc<FakeScheduler>,
    pub tabs: Arc<InMemoryTabs>,
    pub notifier: Arc<FakeNotifier>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            scheduler: Arc::new(FakeScheduler::default()),
            tabs: Arc::new(InMemoryTabs::new()),
            notifier: Arc::new(FakeNotifier::default()),
        }
    }

    pub fn open_tab(&self, url: &str) -> Tab {
        self.tabs.open(url, Some(format!("Title of {}", url))).unwrap()
    }

    pub fn tab_exists(&self, tab_id: TabId) -> bool {
        !matches!(self.tabs.get_tab(tab_id), Err(TabError::NotFound(_)))
    }
}
