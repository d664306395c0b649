//! Timer record structure and per-tab bookkeeping

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::utils::time::{remaining_seconds, seconds_to_ms};

/// Label used when the tab title is unknown
pub const UNKNOWN_TAB_TITLE: &str = "Unknown Tab";

/// Browser tab identifier, normalized once at the command boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(pub u32);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Timer attached to a single tracked tab
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerRecord {
    pub tab_id: TabId,
    /// Epoch milliseconds at which the tab closes; stale while paused
    pub end_time: i64,
    /// Authoritative seconds left, only present while paused
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_seconds: Option<u64>,
    /// Originally requested seconds, reused when iterating
    pub duration: u64,
    pub warning_threshold_seconds: u64,
    pub notifications_enabled: bool,
    pub iterate_on_close: bool,
    pub warning_already_shown: bool,
    pub paused: bool,
    pub tab_title: String,
}

/// Options for a fresh timer
#[derive(Debug, Clone, PartialEq)]
pub struct StartOptions {
    pub duration: u64,
    pub warning_threshold_seconds: u64,
    pub notifications_enabled: bool,
    pub iterate_on_close: bool,
    pub tab_title: Option<String>,
}

impl TimerRecord {
    /// Create a running record that closes `duration` seconds after `now_ms`
    pub fn running(tab_id: TabId, options: &StartOptions, tab_title: String, now_ms: i64) -> Self {
        Self {
            tab_id,
            end_time: now_ms.saturating_add(seconds_to_ms(options.duration)),
            remaining_seconds: None,
            duration: options.duration,
            warning_threshold_seconds: options.warning_threshold_seconds,
            notifications_enabled: options.notifications_enabled,
            iterate_on_close: options.iterate_on_close,
            warning_already_shown: false,
            paused: false,
            tab_title,
        }
    }

    /// Seconds left at `now_ms`, whichever state the timer is in
    pub fn remaining_at(&self, now_ms: i64) -> u64 {
        if self.paused {
            self.remaining_seconds.unwrap_or(0)
        } else {
            remaining_seconds(self.end_time, now_ms)
        }
    }

    /// Snapshot shown in the timer status list
    pub fn status(&self, now_ms: i64) -> TimerStatus {
        TimerStatus {
            tab_id: self.tab_id,
            remaining_time: self.remaining_at(now_ms),
            paused: self.paused,
            tab_title: self.tab_title.clone(),
        }
    }
}

/// Per-tab entry of the timer status list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerStatus {
    pub tab_id: TabId,
    pub remaining_time: u64,
    pub paused: bool,
    pub tab_title: String,
}
