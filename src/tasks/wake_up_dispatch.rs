//! Wake-up dispatch background task

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::state::{AppState, HostEvent};

/// Background task that feeds fired wake-ups into the timer registry
pub async fn wake_up_dispatch_task(state: Arc<AppState>, mut fired_rx: mpsc::UnboundedReceiver<String>) {
    info!("Starting wake-up dispatch task");

    while let Some(name) = fired_rx.recv().await {
        if let Err(e) = state.dispatch(HostEvent::WakeUp(name.clone())) {
            error!("Failed to handle wake-up {}: {}", name, e);
        }
    }

    info!("Wake-up channel closed, dispatch task exiting");
}
