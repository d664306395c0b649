//! Command surface
//!
//! Requests arrive as JSON objects tagged by `action`, the way the popup and
//! the notification buttons send them. Tab ids may be numbers or numeric
//! strings; they are normalized into [`TabId`] here and nowhere else.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::state::{
    Outcome, StartOptions, TabId, TimerError, TimerRecord, TimerRegistry, TimerStatus,
};

const ACTIONS: &[&str] = &[
    "startTimer",
    "checkTimer",
    "pauseTimer",
    "updateTimer",
    "extendTimer",
    "fastForwardTimer",
    "stopTimer",
    "getTimerStatus",
    "getAllTimers",
    "updateWarningTimeForActiveTimers",
    "testWarning",
];

/// Tab id as sent by a caller, before validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TabIdParam {
    Number(i64),
    Text(String),
}

impl TabIdParam {
    pub fn normalize(&self) -> Result<TabId, TimerError> {
        let parsed = match self {
            TabIdParam::Number(n) => u32::try_from(*n).ok(),
            TabIdParam::Text(s) => s.trim().parse::<u32>().ok(),
        };
        parsed.map(TabId).ok_or_else(|| {
            let raw = match self {
                TabIdParam::Number(n) => n.to_string(),
                TabIdParam::Text(s) => format!("{:?}", s),
            };
            TimerError::InvalidTabId(raw)
        })
    }
}

impl From<TabId> for TabIdParam {
    fn from(tab_id: TabId) -> Self {
        TabIdParam::Number(i64::from(tab_id.0))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Command {
    #[serde(rename_all = "camelCase")]
    StartTimer {
        tab_id: TabIdParam,
        duration: i64,
        #[serde(default)]
        warning_time: Option<i64>,
        #[serde(default)]
        enable_notifications: Option<bool>,
        #[serde(default)]
        tab_title: Option<String>,
        #[serde(default)]
        iterate_timer: Option<bool>,
    },
    #[serde(rename_all = "camelCase")]
    CheckTimer { tab_id: TabIdParam },
    #[serde(rename_all = "camelCase")]
    PauseTimer { tab_id: TabIdParam },
    #[serde(rename_all = "camelCase")]
    UpdateTimer { tab_id: TabIdParam, new_duration: i64 },
    #[serde(rename_all = "camelCase")]
    ExtendTimer { tab_id: TabIdParam, additional_time: i64 },
    #[serde(rename_all = "camelCase")]
    FastForwardTimer { tab_id: TabIdParam, seconds_to_skip: i64 },
    #[serde(rename_all = "camelCase")]
    StopTimer { tab_id: TabIdParam },
    GetTimerStatus,
    GetAllTimers,
    #[serde(rename_all = "camelCase")]
    UpdateWarningTimeForActiveTimers { new_warning_time: i64 },
    #[serde(rename_all = "camelCase")]
    TestWarning { tab_id: TabIdParam },
}

impl Command {
    /// Parse a raw request
    ///
    /// Requests without a known `action` are not ours to answer and yield
    /// `Ok(None)`; a known action with a bad payload is a caller error.
    pub fn from_request(request: Value) -> Result<Option<Self>, String> {
        let known = request
            .get("action")
            .and_then(Value::as_str)
            .is_some_and(|action| ACTIONS.contains(&action));
        if !known {
            return Ok(None);
        }

        serde_json::from_value(request)
            .map(Some)
            .map_err(|e| format!("Invalid request: {}", e))
    }
}

/// `{success, error?}` acknowledgement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ack {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResponse {
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_time: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timer: Option<TimerRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FastForwardResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_time: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusListResponse {
    pub success: bool,
    pub tabs_with_timers: Vec<TimerStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllTimersResponse {
    pub success: bool,
    pub timers: BTreeMap<TabId, TimerRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WarningUpdateResponse {
    pub success: bool,
    pub updated_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Response to any command, serialized without a wrapper
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CommandResponse {
    Ack(Ack),
    Check(CheckResponse),
    FastForward(FastForwardResponse),
    StatusList(StatusListResponse),
    AllTimers(AllTimersResponse),
    WarningUpdate(WarningUpdateResponse),
}

impl CommandResponse {
    /// Caller error that never reached the registry
    pub fn rejected(error: String) -> Self {
        CommandResponse::Ack(Ack {
            success: false,
            error: Some(error),
            warnings: Vec::new(),
        })
    }

    fn from_outcome(result: Result<Outcome, TimerError>) -> Self {
        match result {
            Ok(outcome) => CommandResponse::Ack(Ack {
                success: true,
                error: None,
                warnings: outcome.warnings,
            }),
            Err(e) => CommandResponse::rejected(e.to_string()),
        }
    }
}

fn seconds(value: i64, field: &str) -> Result<u64, TimerError> {
    u64::try_from(value)
        .map_err(|_| TimerError::InvalidDuration(format!("{} must not be negative", field)))
}

fn start_options(
    duration: i64,
    warning_time: Option<i64>,
    default_warning: u64,
    enable_notifications: Option<bool>,
    iterate_timer: Option<bool>,
    tab_title: Option<String>,
) -> Result<StartOptions, TimerError> {
    let duration = seconds(duration, "duration")?;
    let warning_threshold_seconds = match warning_time {
        Some(value) => seconds(value, "warningTime")?,
        None => default_warning,
    };
    Ok(StartOptions {
        duration,
        warning_threshold_seconds,
        notifications_enabled: enable_notifications.unwrap_or(true),
        iterate_on_close: iterate_timer.unwrap_or(false),
        tab_title,
    })
}

fn update_timer(
    registry: &mut TimerRegistry,
    tab_id: &TabIdParam,
    new_duration: i64,
    now_ms: i64,
) -> Result<Outcome, TimerError> {
    let tab_id = tab_id.normalize()?;
    registry.resume(tab_id, seconds(new_duration, "newDuration")?, now_ms)
}

fn extend_timer(
    registry: &mut TimerRegistry,
    tab_id: &TabIdParam,
    additional_time: i64,
    now_ms: i64,
) -> Result<Outcome, TimerError> {
    let tab_id = tab_id.normalize()?;
    registry.extend(tab_id, seconds(additional_time, "additionalTime")?, now_ms)
}

fn fast_forward_timer(
    registry: &mut TimerRegistry,
    tab_id: &TabIdParam,
    seconds_to_skip: i64,
    now_ms: i64,
) -> Result<(u64, Outcome), TimerError> {
    let tab_id = tab_id.normalize()?;
    registry.fast_forward(tab_id, seconds(seconds_to_skip, "secondsToSkip")?, now_ms)
}

/// Execute `command` against the registry
pub fn dispatch(registry: &mut TimerRegistry, command: Command, now_ms: i64) -> CommandResponse {
    match command {
        Command::StartTimer {
            tab_id,
            duration,
            warning_time,
            enable_notifications,
            tab_title,
            iterate_timer,
        } => {
            let default_warning = registry.settings().default_warning_seconds;
            let result = tab_id.normalize().and_then(|tab_id| {
                let options = start_options(
                    duration,
                    warning_time,
                    default_warning,
                    enable_notifications,
                    iterate_timer,
                    tab_title,
                )?;
                registry.start(tab_id, options, now_ms)
            });
            CommandResponse::from_outcome(result)
        }

        Command::CheckTimer { tab_id } => {
            let response = match tab_id.normalize() {
                Ok(tab_id) => match registry.check(tab_id, now_ms) {
                    Some((remaining, record)) => CheckResponse {
                        active: true,
                        remaining_time: Some(remaining),
                        timer: Some(record.clone()),
                        error: None,
                    },
                    None => CheckResponse {
                        active: false,
                        remaining_time: None,
                        timer: None,
                        error: None,
                    },
                },
                Err(e) => CheckResponse {
                    active: false,
                    remaining_time: None,
                    timer: None,
                    error: Some(e.to_string()),
                },
            };
            CommandResponse::Check(response)
        }

        Command::PauseTimer { tab_id } => CommandResponse::from_outcome(
            tab_id
                .normalize()
                .and_then(|tab_id| registry.pause(tab_id, now_ms)),
        ),

        Command::UpdateTimer {
            tab_id,
            new_duration,
        } => CommandResponse::from_outcome(update_timer(registry, &tab_id, new_duration, now_ms)),

        Command::ExtendTimer {
            tab_id,
            additional_time,
        } => CommandResponse::from_outcome(extend_timer(registry, &tab_id, additional_time, now_ms)),

        Command::FastForwardTimer {
            tab_id,
            seconds_to_skip,
        } => {
            let response = match fast_forward_timer(registry, &tab_id, seconds_to_skip, now_ms) {
                Ok((remaining, outcome)) => FastForwardResponse {
                    success: true,
                    remaining_time: Some(remaining),
                    error: None,
                    warnings: outcome.warnings,
                },
                Err(e) => FastForwardResponse {
                    success: false,
                    remaining_time: None,
                    error: Some(e.to_string()),
                    warnings: Vec::new(),
                },
            };
            CommandResponse::FastForward(response)
        }

        Command::StopTimer { tab_id } => CommandResponse::from_outcome(
            tab_id.normalize().and_then(|tab_id| registry.stop(tab_id)),
        ),

        Command::GetTimerStatus => CommandResponse::StatusList(StatusListResponse {
            success: true,
            tabs_with_timers: registry.status(now_ms),
        }),

        Command::GetAllTimers => CommandResponse::AllTimers(AllTimersResponse {
            success: true,
            timers: registry.all().clone(),
        }),

        Command::UpdateWarningTimeForActiveTimers { new_warning_time } => {
            let response = match seconds(new_warning_time, "newWarningTime") {
                Ok(threshold) => {
                    let (updated_count, outcome) =
                        registry.update_warning_threshold(threshold, now_ms);
                    WarningUpdateResponse {
                        success: true,
                        updated_count,
                        error: None,
                        warnings: outcome.warnings,
                    }
                }
                Err(e) => WarningUpdateResponse {
                    success: false,
                    updated_count: 0,
                    error: Some(e.to_string()),
                    warnings: Vec::new(),
                },
            };
            CommandResponse::WarningUpdate(response)
        }

        Command::TestWarning { tab_id } => CommandResponse::from_outcome(
            tab_id
                .normalize()
                .and_then(|tab_id| registry.test_warning(tab_id, now_ms)),
        ),
    }
}
