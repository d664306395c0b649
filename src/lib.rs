//! Fade That - close browser tabs on a timer
//! 
//! This library provides the timer engine behind the extension: per-tab
//! timer records, named wake-up scheduling, pre-close warnings, pause/resume,
//! time adjustment and iteration, plus the HTTP host that drives it.

pub mod config;
pub mod state;
pub mod api;
pub mod services;
pub mod tasks;
pub mod utils;

// Re-export commonly used types
pub use config::{Config, TimerSettings};
pub use state::{AppState, HostEvent, TimerRegistry};
pub use api::create_router;
pub use utils::signals::shutdown_signal;
