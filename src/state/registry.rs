//! Timer registry and per-tab state machine
//!
//! The registry is the only owner of timer records. Every transition updates
//! the record first and then issues its scheduler, tab and notifier calls.
//! Adapter failures never roll a transition back; they are logged and handed
//! to the caller in [`Outcome::warnings`].
//!
//! Wake-up handlers re-check the current record before acting, because a
//! wake-up can arrive after the timer it was armed for has been stopped,
//! paused or moved.

use std::{collections::BTreeMap, fmt, sync::Arc};

use tracing::{debug, info, warn};

use super::{StartOptions, TabId, TimerError, TimerRecord, TimerStatus, WakeUp, UNKNOWN_TAB_TITLE};
use crate::{
    config::TimerSettings,
    services::{Notifier, PendingWakeUp, Scheduler, TabControl, TabError},
    utils::time::{remaining_seconds, seconds_to_ms},
};

/// Side-effect report of a committed transition
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// Adapter calls that failed while the transition was applied
    pub warnings: Vec<String>,
}

impl Outcome {
    fn note(&mut self, action: &str, error: impl fmt::Display) {
        let message = format!("Failed to {}: {}", action, error);
        warn!("{}", message);
        self.warnings.push(message);
    }
}

/// In-memory map of tracked tabs and the state machine driving them
pub struct TimerRegistry {
    timers: BTreeMap<TabId, TimerRecord>,
    settings: TimerSettings,
    scheduler: Arc<dyn Scheduler>,
    tabs: Arc<dyn TabControl>,
    notifier: Arc<dyn Notifier>,
}

impl TimerRegistry {
    pub fn new(
        settings: TimerSettings,
        scheduler: Arc<dyn Scheduler>,
        tabs: Arc<dyn TabControl>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            timers: BTreeMap::new(),
            settings,
            scheduler,
            tabs,
            notifier,
        }
    }

    pub fn settings(&self) -> &TimerSettings {
        &self.settings
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Start (or replace) the timer of `tab_id`
    pub fn start(
        &mut self,
        tab_id: TabId,
        options: StartOptions,
        now_ms: i64,
    ) -> Result<Outcome, TimerError> {
        if options.duration == 0 {
            return Err(TimerError::InvalidDuration(
                "duration must be greater than zero".to_string(),
            ));
        }

        let mut outcome = Outcome::default();
        self.start_running(tab_id, options, false, now_ms, &mut outcome);
        Ok(outcome)
    }

    fn start_running(
        &mut self,
        tab_id: TabId,
        options: StartOptions,
        is_iteration: bool,
        now_ms: i64,
        outcome: &mut Outcome,
    ) {
        let title = options
            .tab_title
            .clone()
            .filter(|title| !title.trim().is_empty())
            .or_else(|| self.tabs.get_tab(tab_id).ok().map(|tab| tab.title))
            .unwrap_or_else(|| UNKNOWN_TAB_TITLE.to_string());

        let record = TimerRecord::running(tab_id, &options, title, now_ms);
        if self.timers.insert(tab_id, record).is_some() {
            debug!("Replacing existing timer for tab {}", tab_id);
        }

        self.disarm(tab_id, outcome);
        self.arm(tab_id, options.duration, options.warning_threshold_seconds, outcome);

        info!(
            "Timer created for tab {}, duration: {} seconds, warning at {} seconds{}",
            tab_id,
            options.duration,
            options.warning_threshold_seconds,
            if options.iterate_on_close { ", iterating" } else { "" }
        );

        if options.notifications_enabled {
            if let Err(e) = self.notifier.show_created(
                tab_id,
                options.duration,
                is_iteration,
                options.iterate_on_close,
            ) {
                outcome.note("show timer created notification", e);
            }
        }
    }

    /// Freeze a running timer, keeping the seconds left
    pub fn pause(&mut self, tab_id: TabId, now_ms: i64) -> Result<Outcome, TimerError> {
        let record = self
            .timers
            .get_mut(&tab_id)
            .ok_or(TimerError::NotFound(tab_id))?;

        let mut outcome = Outcome::default();
        if record.paused {
            debug!("Timer for tab {} is already paused", tab_id);
            return Ok(outcome);
        }

        let remaining = remaining_seconds(record.end_time, now_ms);
        record.paused = true;
        record.remaining_seconds = Some(remaining);

        self.disarm(tab_id, &mut outcome);
        info!("Timer paused for tab {} with {} seconds remaining", tab_id, remaining);
        Ok(outcome)
    }

    /// Resume a paused timer
    ///
    /// The stored remaining time wins over `new_duration`; the caller's value
    /// is only used when nothing was stored, which re-arms a running timer.
    pub fn resume(
        &mut self,
        tab_id: TabId,
        new_duration: u64,
        now_ms: i64,
    ) -> Result<Outcome, TimerError> {
        let record = self
            .timers
            .get_mut(&tab_id)
            .ok_or(TimerError::NotFound(tab_id))?;

        let seconds = match record.remaining_seconds {
            Some(stored) => stored,
            None if new_duration > 0 => new_duration,
            None => {
                return Err(TimerError::InvalidDuration(
                    "newDuration must be greater than zero".to_string(),
                ))
            }
        }
        .max(1);

        record.paused = false;
        record.remaining_seconds = None;
        record.warning_already_shown = false;
        record.end_time = now_ms.saturating_add(seconds_to_ms(seconds));
        let threshold = record.warning_threshold_seconds;

        let mut outcome = Outcome::default();
        self.disarm(tab_id, &mut outcome);
        self.arm(tab_id, seconds, threshold, &mut outcome);
        info!("Timer resumed for tab {} with {} seconds", tab_id, seconds);
        Ok(outcome)
    }

    /// Add time to a timer, paused or running
    pub fn extend(
        &mut self,
        tab_id: TabId,
        additional: u64,
        now_ms: i64,
    ) -> Result<Outcome, TimerError> {
        if additional == 0 {
            return Err(TimerError::InvalidDuration(
                "additionalTime must be greater than zero".to_string(),
            ));
        }
        let record = self
            .timers
            .get_mut(&tab_id)
            .ok_or(TimerError::NotFound(tab_id))?;

        let mut outcome = Outcome::default();
        if record.paused {
            let remaining = record.remaining_seconds.unwrap_or(0).saturating_add(additional);
            record.remaining_seconds = Some(remaining);
            info!("Paused timer for tab {} extended to {} seconds", tab_id, remaining);
            return Ok(outcome);
        }

        record.end_time = record.end_time.saturating_add(seconds_to_ms(additional));
        record.warning_already_shown = false;
        let remaining = remaining_seconds(record.end_time, now_ms);
        let threshold = record.warning_threshold_seconds;

        self.disarm(tab_id, &mut outcome);
        self.arm(tab_id, remaining, threshold, &mut outcome);
        info!(
            "Timer for tab {} extended by {} seconds, {} seconds remaining",
            tab_id, additional, remaining
        );
        Ok(outcome)
    }

    /// Skip ahead on a running timer; never leaves less than one second
    pub fn fast_forward(
        &mut self,
        tab_id: TabId,
        seconds_to_skip: u64,
        now_ms: i64,
    ) -> Result<(u64, Outcome), TimerError> {
        if seconds_to_skip == 0 {
            return Err(TimerError::InvalidDuration(
                "secondsToSkip must be greater than zero".to_string(),
            ));
        }
        let record = self
            .timers
            .get_mut(&tab_id)
            .ok_or(TimerError::NotFound(tab_id))?;
        if record.paused {
            return Err(TimerError::Paused(tab_id));
        }

        let earliest = now_ms.saturating_add(1000);
        record.end_time = record
            .end_time
            .saturating_sub(seconds_to_ms(seconds_to_skip))
            .max(earliest);
        record.warning_already_shown = false;
        let remaining = remaining_seconds(record.end_time, now_ms);
        let threshold = record.warning_threshold_seconds;

        let mut outcome = Outcome::default();
        self.disarm(tab_id, &mut outcome);
        self.arm(tab_id, remaining, threshold, &mut outcome);
        info!(
            "Timer for tab {} fast-forwarded by {} seconds, {} seconds remaining",
            tab_id, seconds_to_skip, remaining
        );
        Ok((remaining, outcome))
    }

    /// Drop the timer of `tab_id` and its wake-ups
    pub fn stop(&mut self, tab_id: TabId) -> Result<Outcome, TimerError> {
        if self.timers.remove(&tab_id).is_none() {
            info!("No active timer found for tab {}", tab_id);
            return Err(TimerError::NotFound(tab_id));
        }

        let mut outcome = Outcome::default();
        self.disarm(tab_id, &mut outcome);
        info!("Timer stopped for tab {}", tab_id);
        Ok(outcome)
    }

    /// Apply a new warning threshold to every tracked timer
    ///
    /// Running timers get their warning wake-up re-armed; close wake-ups are
    /// left alone.
    pub fn update_warning_threshold(&mut self, threshold: u64, now_ms: i64) -> (usize, Outcome) {
        let mut running = Vec::new();
        for record in self.timers.values_mut() {
            record.warning_threshold_seconds = threshold;
            if !record.paused {
                record.warning_already_shown = false;
                running.push((record.tab_id, remaining_seconds(record.end_time, now_ms)));
            }
        }

        let mut outcome = Outcome::default();
        for (tab_id, remaining) in running {
            self.arm_warning(tab_id, remaining, threshold, &mut outcome);
        }

        info!(
            "Warning time set to {} seconds for {} timers",
            threshold,
            self.timers.len()
        );
        (self.timers.len(), outcome)
    }

    /// Show a warning right now, ignoring the duplicate guard
    pub fn test_warning(&mut self, tab_id: TabId, now_ms: i64) -> Result<Outcome, TimerError> {
        let record = self.timers.get(&tab_id).ok_or(TimerError::NotFound(tab_id))?;
        let remaining = record.remaining_at(now_ms);

        let mut outcome = Outcome::default();
        if let Err(e) = self.notifier.show_warning(tab_id, remaining) {
            outcome.note("show test warning", e);
        }
        Ok(outcome)
    }

    /// Remaining seconds and record for `tab_id`, if tracked
    pub fn check(&self, tab_id: TabId, now_ms: i64) -> Option<(u64, &TimerRecord)> {
        self.timers
            .get(&tab_id)
            .map(|record| (record.remaining_at(now_ms), record))
    }

    /// Status line for every tracked tab, ordered by tab id
    pub fn status(&self, now_ms: i64) -> Vec<TimerStatus> {
        self.timers.values().map(|record| record.status(now_ms)).collect()
    }

    pub fn all(&self) -> &BTreeMap<TabId, TimerRecord> {
        &self.timers
    }

    /// React to a fired wake-up
    pub fn handle_wake_up(&mut self, name: &str, now_ms: i64) -> Outcome {
        let mut outcome = Outcome::default();
        match WakeUp::parse(name) {
            Some(WakeUp::Warning(tab_id)) => self.on_warning(tab_id, now_ms, &mut outcome),
            Some(WakeUp::Close(tab_id)) => self.on_close(tab_id, now_ms, &mut outcome),
            None => debug!("Ignoring unknown wake-up {}", name),
        }
        outcome
    }

    fn on_warning(&mut self, tab_id: TabId, now_ms: i64, outcome: &mut Outcome) {
        let Some(record) = self.timers.get_mut(&tab_id) else {
            debug!("Warning wake-up for untracked tab {}", tab_id);
            return;
        };
        if record.paused {
            debug!("Warning wake-up for paused tab {}", tab_id);
            return;
        }

        let remaining = remaining_seconds(record.end_time, now_ms);
        let window = record
            .warning_threshold_seconds
            .saturating_add(self.settings.warning_tolerance_seconds);

        if remaining > window
            || remaining <= self.settings.warning_floor_seconds
            || !record.notifications_enabled
            || record.warning_already_shown
        {
            debug!(
                "Skipping warning for tab {}: {} seconds left, window {}, shown {}",
                tab_id, remaining, window, record.warning_already_shown
            );
            return;
        }

        record.warning_already_shown = true;
        info!("Warning tab {}: closing in {} seconds", tab_id, remaining);
        if let Err(e) = self.notifier.show_warning(tab_id, remaining) {
            outcome.note("show warning notification", e);
        }
    }

    fn on_close(&mut self, tab_id: TabId, now_ms: i64, outcome: &mut Outcome) {
        let Some(record) = self.timers.get(&tab_id) else {
            debug!("Close wake-up for untracked tab {}", tab_id);
            return;
        };
        if record.paused {
            debug!("Close wake-up for paused tab {}", tab_id);
            return;
        }

        // The deadline moved after this wake-up was armed
        let remaining = remaining_seconds(record.end_time, now_ms);
        if remaining > self.settings.warning_tolerance_seconds {
            debug!(
                "Early close wake-up for tab {}, {} seconds still left; re-arming",
                tab_id, remaining
            );
            self.schedule(WakeUp::Close(tab_id), remaining, outcome);
            return;
        }

        let Some(snapshot) = self.timers.remove(&tab_id) else {
            return;
        };
        self.disarm(tab_id, outcome);
        info!("Alarm triggered for tab {}, attempting to close", tab_id);

        let tab = match self.tabs.get_tab(tab_id) {
            Ok(tab) => tab,
            Err(TabError::NotFound(_)) => {
                warn!("Tab {} not found, nothing to close", tab_id);
                return;
            }
            Err(e) => {
                outcome.note("look up tab", e);
                return;
            }
        };

        if let Err(e) = self.tabs.close_tab(tab_id) {
            outcome.note(&format!("close tab {}", tab_id), e);
            return;
        }
        info!("Tab {} ({}) closed by timer", tab_id, tab.url);

        if !snapshot.iterate_on_close {
            return;
        }

        match self.tabs.create_tab(&tab.url) {
            Ok(new_tab) => {
                info!("Iterating timer: tab {} recreated as tab {}", tab_id, new_tab.id);
                let options = StartOptions {
                    duration: snapshot.duration.max(1),
                    warning_threshold_seconds: snapshot.warning_threshold_seconds,
                    notifications_enabled: snapshot.notifications_enabled,
                    iterate_on_close: true,
                    tab_title: Some(new_tab.title.clone()),
                };
                self.start_running(new_tab.id, options, true, now_ms, outcome);
            }
            Err(e) => outcome.note(&format!("recreate tab for {}", tab.url), e),
        }
    }

    /// The tab went away by other means; forget its timer
    pub fn tab_removed(&mut self, tab_id: TabId) -> bool {
        let mut outcome = Outcome::default();
        self.disarm(tab_id, &mut outcome);

        if self.timers.remove(&tab_id).is_some() {
            info!("Tab {} was closed manually, timer cleared", tab_id);
            true
        } else {
            false
        }
    }

    /// Rebuild records from close wake-ups that outlived the previous process
    ///
    /// Only the deadline survives a restart, so warning state, notification
    /// preference and iteration fall back to defaults.
    pub fn recover(&mut self, surviving: &[PendingWakeUp], now_ms: i64) -> usize {
        let mut restored = 0;
        for pending in surviving {
            let Some(WakeUp::Close(tab_id)) = WakeUp::parse(&pending.name) else {
                continue;
            };
            if self.timers.contains_key(&tab_id) {
                continue;
            }

            let remaining = remaining_seconds(pending.fire_timestamp, now_ms).max(1);
            let tab_title = self
                .tabs
                .get_tab(tab_id)
                .map(|tab| tab.title)
                .unwrap_or_else(|_| UNKNOWN_TAB_TITLE.to_string());

            self.timers.insert(
                tab_id,
                TimerRecord {
                    tab_id,
                    end_time: pending.fire_timestamp,
                    remaining_seconds: None,
                    duration: remaining,
                    warning_threshold_seconds: self.settings.default_warning_seconds,
                    notifications_enabled: false,
                    iterate_on_close: false,
                    warning_already_shown: false,
                    paused: false,
                    tab_title,
                },
            );
            info!("Restored timer for tab {}, remaining time: {} seconds", tab_id, remaining);
            restored += 1;
        }
        restored
    }

    /// Seconds after which the warning wake-up should fire, if it should at all
    pub fn warning_delay(&self, seconds_left: u64, threshold: u64) -> Option<u64> {
        if seconds_left <= threshold {
            return None;
        }
        let delay = seconds_left - threshold;
        (delay >= self.settings.min_schedule_delay_seconds.max(1)).then_some(delay)
    }

    fn arm(&self, tab_id: TabId, seconds_left: u64, threshold: u64, outcome: &mut Outcome) {
        let seconds_left = seconds_left.max(1);
        self.schedule(WakeUp::Close(tab_id), seconds_left, outcome);
        self.arm_warning(tab_id, seconds_left, threshold, outcome);
    }

    fn arm_warning(&self, tab_id: TabId, seconds_left: u64, threshold: u64, outcome: &mut Outcome) {
        self.cancel(WakeUp::Warning(tab_id), outcome);
        match self.warning_delay(seconds_left, threshold) {
            Some(delay) => self.schedule(WakeUp::Warning(tab_id), delay, outcome),
            None => debug!(
                "No warning for tab {}: {} seconds left, threshold {}",
                tab_id, seconds_left, threshold
            ),
        }
    }

    fn disarm(&self, tab_id: TabId, outcome: &mut Outcome) {
        self.cancel(WakeUp::Close(tab_id), outcome);
        self.cancel(WakeUp::Warning(tab_id), outcome);
    }

    fn schedule(&self, wake_up: WakeUp, delay_seconds: u64, outcome: &mut Outcome) {
        let name = wake_up.name();
        if let Err(e) = self.scheduler.schedule(&name, delay_seconds.max(1)) {
            outcome.note(&format!("schedule {}", name), e);
        }
    }

    fn cancel(&self, wake_up: WakeUp, outcome: &mut Outcome) {
        let name = wake_up.name();
        if let Err(e) = self.scheduler.cancel(&name) {
            outcome.note(&format!("cancel {}", name), e);
        }
    }
}
