//! Errors reported by timer commands

use thiserror::Error;

use super::TabId;

/// Rejections produced by the timer registry
///
/// Side-effect failures from the scheduler, tab host or notifier are never
/// turned into a `TimerError`; they are logged and reported as warnings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimerError {
    #[error("Invalid tabId: {0}")]
    InvalidTabId(String),

    #[error("Invalid duration: {0}")]
    InvalidDuration(String),

    #[error("No active timer found")]
    NotFound(TabId),

    #[error("Cannot fast-forward a paused timer")]
    Paused(TabId),
}
