//! Restart discovery

use std::sync::Arc;
use tracing::{info, warn};

use crate::{services::TokioScheduler, state::AppState};

/// Re-arm persisted wake-ups and rebuild the timers they belong to
///
/// Runs once before the wake-up dispatcher starts, so wake-ups that were
/// already due fire against the rebuilt records.
pub fn restart_recovery(state: &AppState, scheduler: &Arc<TokioScheduler>) -> usize {
    let surviving = match scheduler.restore() {
        Ok(surviving) => surviving,
        Err(e) => {
            warn!("Failed to restore wake-ups, starting without timers: {}", e);
            return 0;
        }
    };

    match state.recover_timers(&surviving) {
        Ok(restored) => {
            if restored > 0 {
                info!("Recovered {} timers from a previous run", restored);
            }
            restored
        }
        Err(e) => {
            warn!("Failed to recover timers: {}", e);
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use tokio::{runtime::Handle, sync::mpsc};

    use super::*;
    use crate::{config::Config, services::Scheduler, state::TabId};

    #[tokio::test]
    async fn timers_come_back_after_restart() {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("alarms.json");
        let config = Config::try_parse_from(["fade-that"]).unwrap();

        {
            let (tx, _rx) = mpsc::unbounded_channel();
            let scheduler = TokioScheduler::new(Handle::current(), tx, Some(store.clone()));
            scheduler.schedule("closeTab_21", 900).unwrap();
            scheduler.schedule("warnTab_21", 840).unwrap();
        }

        let (tx, _rx) = mpsc::unbounded_channel();
        let scheduler = Arc::new(TokioScheduler::new(Handle::current(), tx, Some(store)));
        let state = AppState::new(&config, scheduler.clone());

        assert_eq!(restart_recovery(&state, &scheduler), 1);
        let registry = state.registry.lock().unwrap();
        let (remaining, record) = registry.check(TabId(21), crate::utils::now_ms()).unwrap();
        assert!((899..=900).contains(&remaining));
        assert!(!record.notifications_enabled);
    }
}
