//! Fade That - close browser tabs on a timer
//! 
//! This is the main entry point for the fade-that server.

use std::sync::Arc;
use tokio::{net::TcpListener, runtime::Handle, sync::mpsc};
use tracing::info;

use fade_that::{
    config::Config,
    state::AppState,
    api::create_router,
    services::TokioScheduler,
    tasks::{restart_recovery, wake_up_dispatch_task},
    utils::shutdown_signal,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("fade_that={},tower_http=info", config.log_level()))
        .init();

    info!("Starting fade-that server v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration: host={}, port={}, warning={}s, min delay={}s, store={:?}",
          config.host, config.port, config.warning_time, config.min_schedule_delay,
          config.alarm_store);

    // Fired wake-ups flow from the scheduler to the dispatch task
    let (fired_tx, fired_rx) = mpsc::unbounded_channel();
    let scheduler = Arc::new(TokioScheduler::new(
        Handle::current(),
        fired_tx,
        config.alarm_store.clone(),
    ));

    // Create application state
    let state = Arc::new(AppState::new(&config, scheduler.clone()));

    // Rebuild timers whose wake-ups survived the last run
    restart_recovery(&state, &scheduler);

    // Start the wake-up dispatch background task
    let dispatch_state = Arc::clone(&state);
    tokio::spawn(async move {
        wake_up_dispatch_task(dispatch_state, fired_rx).await;
    });

    // Create HTTP router with all endpoints
    let app = create_router(state);

    // Bind to the specified address
    let addr = config.address();
    let listener = TcpListener::bind(&addr).await?;
    
    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  POST   /command                      - Timer commands (startTimer, pauseTimer, ...)");
    info!("  POST   /tabs                         - Open a tab");
    info!("  GET    /tabs                         - List open tabs");
    info!("  DELETE /tabs/:id                     - Report a tab closed by the user");
    info!("  GET    /notifications                - Recent notifications");
    info!("  POST   /notifications/:id/buttons/:n - Click a notification button");
    info!("  GET    /status                       - Service status");
    info!("  GET    /health                       - Health check");

    // Setup graceful shutdown
    let server = axum::serve(listener, app);
    
    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    info!("Server shutdown complete");
    Ok(())
}
