//! User-facing notifications
//!
//! The registry asks for "created" and "warning" alerts through the
//! [`Notifier`] trait. Button clicks travel the other way: the notification
//! id carries the kind and tab, and [`button_request`] turns a click into a
//! request the command surface can execute.

use std::{collections::VecDeque, sync::Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::state::TabId;

const ID_PREFIX: &str = "fade-that";
const HISTORY_LIMIT: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Created,
    Warning,
}

impl NotificationKind {
    fn as_str(self) -> &'static str {
        match self {
            NotificationKind::Created => "created",
            NotificationKind::Warning => "warning",
        }
    }
}

/// A notification as shown to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub tab_id: TabId,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub buttons: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotifyError {
    #[error("Not showing notification: {0}")]
    Rejected(String),

    #[error("Notification delivery failed: {0}")]
    Delivery(String),
}

/// What a notification button asks the timer engine to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifierRequest {
    ExtendRequested(TabId),
    CancelRequested(TabId),
}

/// Alerts the timer engine can raise
pub trait Notifier: Send + Sync {
    /// Announce a new (or iterated) timer; returns the notification id
    fn show_created(
        &self,
        tab_id: TabId,
        duration: u64,
        is_iteration: bool,
        will_iterate: bool,
    ) -> Result<String, NotifyError>;

    /// Warn that the tab closes in `seconds_left`; returns the notification id
    fn show_warning(&self, tab_id: TabId, seconds_left: u64) -> Result<String, NotifyError>;
}

/// "2 minutes and 5 seconds" above one minute, "45 seconds" otherwise
pub fn format_time_text(seconds: u64) -> String {
    if seconds > 60 {
        format!("{} minutes and {} seconds", seconds / 60, seconds % 60)
    } else {
        format!("{} seconds", seconds)
    }
}

/// Build a notification id that [`button_request`] can decode
pub fn notification_id(kind: NotificationKind, tab_id: TabId, at: DateTime<Utc>) -> String {
    format!(
        "{}-{}-{}-{}",
        ID_PREFIX,
        kind.as_str(),
        at.timestamp_millis(),
        tab_id
    )
}

/// Translate a button click into a request for the timer engine
///
/// Button 0 on a warning extends the timer; button 1 always cancels. Anything
/// else (including "Ok" on a created notification) is a dismissal.
pub fn button_request(notification_id: &str, button_index: usize) -> Option<NotifierRequest> {
    let rest = notification_id.strip_prefix(ID_PREFIX)?.strip_prefix('-')?;
    let mut parts = rest.split('-');
    let kind = parts.next()?;
    let tab_id = TabId(parts.last()?.parse().ok()?);

    match (kind, button_index) {
        ("warning", 0) => Some(NotifierRequest::ExtendRequested(tab_id)),
        (_, 1) => Some(NotifierRequest::CancelRequested(tab_id)),
        _ => None,
    }
}

fn extend_label(extend_seconds: u64) -> String {
    if extend_seconds % 60 == 0 {
        format!("Extend by {} minutes", extend_seconds / 60)
    } else {
        format!("Extend by {} seconds", extend_seconds)
    }
}

/// Build the "timer started" notification
pub fn created_notification(
    tab_id: TabId,
    duration: u64,
    is_iteration: bool,
    will_iterate: bool,
    at: DateTime<Utc>,
) -> Notification {
    let time_text = format_time_text(duration);
    let message = if is_iteration {
        format!("Tab recreated and will close again in {} (iteration mode).", time_text)
    } else if will_iterate {
        format!("Tab will close in {}. Timer will iterate after completion.", time_text)
    } else {
        format!("Tab will close in {}.", time_text)
    };

    Notification {
        id: notification_id(NotificationKind::Created, tab_id, at),
        tab_id,
        kind: NotificationKind::Created,
        title: (if is_iteration { "Timer Iterated" } else { "Timer Started" }).to_string(),
        message,
        buttons: vec!["Ok".to_string()],
        created_at: at,
    }
}

/// Build the "tab closing soon" notification
pub fn warning_notification(
    tab_id: TabId,
    seconds_left: u64,
    extend_seconds: u64,
    at: DateTime<Utc>,
) -> Notification {
    Notification {
        id: notification_id(NotificationKind::Warning, tab_id, at),
        tab_id,
        kind: NotificationKind::Warning,
        title: "Tab Closing Soon".to_string(),
        message: format!("The tab will close in {}.", format_time_text(seconds_left)),
        buttons: vec![extend_label(extend_seconds), "Cancel Timer".to_string()],
        created_at: at,
    }
}

/// Notifier that writes alerts to the log and keeps the most recent ones
#[derive(Debug)]
pub struct LogNotifier {
    extend_seconds: u64,
    history: Mutex<VecDeque<Notification>>,
}

impl LogNotifier {
    pub fn new(extend_seconds: u64) -> Self {
        Self {
            extend_seconds,
            history: Mutex::new(VecDeque::new()),
        }
    }

    /// Most recent notifications, oldest first
    pub fn recent(&self) -> Vec<Notification> {
        match self.history.lock() {
            Ok(history) => history.iter().cloned().collect(),
            Err(e) => {
                warn!("Notification history poisoned: {}", e);
                Vec::new()
            }
        }
    }

    fn publish(&self, notification: Notification) -> Result<String, NotifyError> {
        info!(
            tab_id = %notification.tab_id,
            id = %notification.id,
            "{}: {}",
            notification.title,
            notification.message
        );

        let id = notification.id.clone();
        let mut history = self
            .history
            .lock()
            .map_err(|e| NotifyError::Delivery(format!("Failed to lock history: {}", e)))?;
        if history.len() == HISTORY_LIMIT {
            history.pop_front();
        }
        history.push_back(notification);
        Ok(id)
    }
}

impl Notifier for LogNotifier {
    fn show_created(
        &self,
        tab_id: TabId,
        duration: u64,
        is_iteration: bool,
        will_iterate: bool,
    ) -> Result<String, NotifyError> {
        if duration == 0 {
            debug!("Not showing created notification for tab {}: zero duration", tab_id);
            return Err(NotifyError::Rejected(format!("duration is {}", duration)));
        }
        self.publish(created_notification(
            tab_id,
            duration,
            is_iteration,
            will_iterate,
            Utc::now(),
        ))
    }

    fn show_warning(&self, tab_id: TabId, seconds_left: u64) -> Result<String, NotifyError> {
        if seconds_left == 0 {
            debug!("Not showing warning for tab {}: no time left", tab_id);
            return Err(NotifyError::Rejected("secondsLeft is 0".to_string()));
        }
        self.publish(warning_notification(
            tab_id,
            seconds_left,
            self.extend_seconds,
            Utc::now(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_minutes_above_one_minute() {
        assert_eq!(format_time_text(45), "45 seconds");
        assert_eq!(format_time_text(60), "60 seconds");
        assert_eq!(format_time_text(125), "2 minutes and 5 seconds");
    }

    #[test]
    fn created_message_mentions_iteration() {
        let at = Utc::now();
        let first = created_notification(TabId(2), 300, false, true, at);
        assert_eq!(first.title, "Timer Started");
        assert_eq!(
            first.message,
            "Tab will close in 5 minutes and 0 seconds. Timer will iterate after completion."
        );

        let again = created_notification(TabId(5), 30, true, true, at);
        assert_eq!(again.title, "Timer Iterated");
        assert_eq!(
            again.message,
            "Tab recreated and will close again in 30 seconds (iteration mode)."
        );
    }

    #[test]
    fn warning_buttons_map_to_requests() {
        let warning = warning_notification(TabId(42), 59, 300, Utc::now());
        assert_eq!(warning.buttons[0], "Extend by 5 minutes");

        assert_eq!(
            button_request(&warning.id, 0),
            Some(NotifierRequest::ExtendRequested(TabId(42)))
        );
        assert_eq!(
            button_request(&warning.id, 1),
            Some(NotifierRequest::CancelRequested(TabId(42)))
        );
    }

    #[test]
    fn created_ok_button_is_a_dismissal() {
        let created = created_notification(TabId(8), 90, false, false, Utc::now());
        assert_eq!(button_request(&created.id, 0), None);
        assert_eq!(button_request("someone-else-warning-1-8", 0), None);
    }

    #[test]
    fn log_notifier_skips_empty_warnings_and_keeps_history() {
        let notifier = LogNotifier::new(300);
        assert!(notifier.show_warning(TabId(1), 0).is_err());

        notifier.show_warning(TabId(1), 30).unwrap();
        notifier.show_created(TabId(1), 120, false, false).unwrap();

        let recent = notifier.recent();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].kind, NotificationKind::Warning);
        assert_eq!(recent[1].message, "Tab will close in 2 minutes and 0 seconds.");
    }
}
