//! Main application state management

use std::{
    sync::{Arc, Mutex},
    time::Instant,
};
use tracing::{debug, info, warn};

use super::{TabId, TimerRegistry};
use crate::{
    api::commands::{dispatch, Command, CommandResponse},
    config::Config,
    services::{
        notifier::button_request, InMemoryTabs, LogNotifier, NotifierRequest, PendingWakeUp,
        Scheduler,
    },
    utils::time::now_ms,
};

/// Everything the host can deliver to the timer engine
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    /// A request from the popup or another caller
    Command(Command),
    /// A scheduled wake-up fired
    WakeUp(String),
    /// A tab was closed by something other than the timer
    TabRemoved(TabId),
    /// The user clicked a notification button
    NotificationButton {
        notification_id: String,
        button_index: usize,
    },
}

/// Main application state shared by the HTTP handlers and background tasks
pub struct AppState {
    /// Timer records; every event is applied under this lock in one step
    pub registry: Mutex<TimerRegistry>,
    /// Tab host driven through the HTTP API
    pub tabs: Arc<InMemoryTabs>,
    /// Notification sink and history
    pub notifier: Arc<LogNotifier>,
    pub scheduler: Arc<dyn Scheduler>,
    /// Server metadata
    pub start_time: Instant,
    pub port: u16,
    pub host: String,
}

impl AppState {
    /// Create the application state around an already-built scheduler
    pub fn new(config: &Config, scheduler: Arc<dyn Scheduler>) -> Self {
        let settings = config.timer_settings();
        let tabs = Arc::new(InMemoryTabs::new());
        let notifier = Arc::new(LogNotifier::new(settings.extend_step_seconds));

        let registry = TimerRegistry::new(
            settings,
            Arc::clone(&scheduler),
            tabs.clone(),
            notifier.clone(),
        );

        Self {
            registry: Mutex::new(registry),
            tabs,
            notifier,
            scheduler,
            start_time: Instant::now(),
            port: config.port,
            host: config.host.clone(),
        }
    }

    fn lock_registry(&self) -> Result<std::sync::MutexGuard<'_, TimerRegistry>, String> {
        self.registry
            .lock()
            .map_err(|e| format!("Failed to lock timer registry: {}", e))
    }

    /// Apply one host event
    ///
    /// Commands (including those relayed from notification buttons) produce
    /// a response; wake-ups and tab removals do not.
    pub fn dispatch(&self, event: HostEvent) -> Result<Option<CommandResponse>, String> {
        let now = now_ms();
        match event {
            HostEvent::Command(command) => {
                let mut registry = self.lock_registry()?;
                Ok(Some(dispatch(&mut registry, command, now)))
            }
            HostEvent::WakeUp(name) => {
                let outcome = self.lock_registry()?.handle_wake_up(&name, now);
                if !outcome.warnings.is_empty() {
                    warn!("Wake-up {} completed with {} failures", name, outcome.warnings.len());
                }
                Ok(None)
            }
            HostEvent::TabRemoved(tab_id) => {
                if !self.lock_registry()?.tab_removed(tab_id) {
                    debug!("Removed tab {} had no timer", tab_id);
                }
                Ok(None)
            }
            HostEvent::NotificationButton {
                notification_id,
                button_index,
            } => {
                let Some(request) = button_request(&notification_id, button_index) else {
                    debug!(
                        "Button {} on notification {} needs no action",
                        button_index, notification_id
                    );
                    return Ok(None);
                };
                let command = self.command_for(request)?;
                self.dispatch(HostEvent::Command(command))
            }
        }
    }

    fn command_for(&self, request: NotifierRequest) -> Result<Command, String> {
        Ok(match request {
            NotifierRequest::ExtendRequested(tab_id) => {
                let step = self.lock_registry()?.settings().extend_step_seconds;
                info!("Extending timer for tab {} by {} seconds from notification", tab_id, step);
                Command::ExtendTimer {
                    tab_id: tab_id.into(),
                    additional_time: i64::try_from(step).unwrap_or(i64::MAX),
                }
            }
            NotifierRequest::CancelRequested(tab_id) => {
                info!("Cancelling timer for tab {} from notification", tab_id);
                Command::StopTimer {
                    tab_id: tab_id.into(),
                }
            }
        })
    }

    /// Rebuild timers from wake-ups that survived a restart
    pub fn recover_timers(&self, surviving: &[PendingWakeUp]) -> Result<usize, String> {
        let restored = self.lock_registry()?.recover(surviving, now_ms());
        Ok(restored)
    }

    /// Number of tracked timers
    pub fn timer_count(&self) -> Result<usize, String> {
        Ok(self.lock_registry()?.len())
    }

    /// Calculate server uptime as a formatted string
    pub fn get_uptime(&self) -> String {
        let duration = self.start_time.elapsed();
        let hours = duration.as_secs() / 3600;
        let minutes = (duration.as_secs() % 3600) / 60;
        let seconds = duration.as_secs() % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use serde_json::json;

    use super::*;
    use crate::services::{notifier::NotificationKind, test_support::FakeScheduler, TabControl};

    fn state() -> (AppState, Arc<FakeScheduler>) {
        let config = Config::try_parse_from(["fade-that"]).unwrap();
        let scheduler = Arc::new(FakeScheduler::default());
        (AppState::new(&config, scheduler.clone()), scheduler)
    }

    fn command(request: serde_json::Value) -> HostEvent {
        HostEvent::Command(Command::from_request(request).unwrap().unwrap())
    }

    #[test]
    fn warning_button_extends_timer() {
        let (state, scheduler) = state();
        let tab = state.tabs.open("https://example.com", None).unwrap();
        state
            .dispatch(command(json!({"action": "startTimer", "tabId": tab.id.0, "duration": 120})))
            .unwrap();
        state
            .dispatch(command(json!({"action": "testWarning", "tabId": tab.id.0})))
            .unwrap();

        let warning = state
            .notifier
            .recent()
            .into_iter()
            .find(|n| n.kind == NotificationKind::Warning)
            .unwrap();
        let response = state
            .dispatch(HostEvent::NotificationButton {
                notification_id: warning.id,
                button_index: 0,
            })
            .unwrap();

        assert!(matches!(response, Some(CommandResponse::Ack(ref ack)) if ack.success));
        let close_delay = scheduler.delay_of(&format!("closeTab_{}", tab.id)).unwrap();
        assert!(close_delay > 400);
    }

    #[test]
    fn cancel_button_stops_timer() {
        let (state, _) = state();
        state
            .dispatch(command(json!({"action": "startTimer", "tabId": 5, "duration": 120})))
            .unwrap();
        state.dispatch(command(json!({"action": "testWarning", "tabId": 5}))).unwrap();

        let warning = state.notifier.recent().pop().unwrap();
        state
            .dispatch(HostEvent::NotificationButton {
                notification_id: warning.id,
                button_index: 1,
            })
            .unwrap();
        assert_eq!(state.timer_count().unwrap(), 0);
    }

    #[test]
    fn tab_removed_event_clears_timer() {
        let (state, scheduler) = state();
        state
            .dispatch(command(json!({"action": "startTimer", "tabId": 9, "duration": 600})))
            .unwrap();
        state
            .dispatch(command(json!({"action": "pauseTimer", "tabId": 9})))
            .unwrap();

        assert_eq!(state.dispatch(HostEvent::TabRemoved(TabId(9))).unwrap(), None);
        assert_eq!(state.timer_count().unwrap(), 0);
        assert!(scheduler.names().is_empty());
    }

    #[test]
    fn close_wake_up_closes_tab() {
        let (state, _) = state();
        let tab = state.tabs.open("https://example.com", None).unwrap();
        state
            .dispatch(command(json!({"action": "startTimer", "tabId": tab.id.0, "duration": 3})))
            .unwrap();

        state
            .dispatch(HostEvent::WakeUp(format!("closeTab_{}", tab.id)))
            .unwrap();

        assert_eq!(state.timer_count().unwrap(), 0);
        assert!(state.tabs.get_tab(tab.id).is_err());
    }
}
