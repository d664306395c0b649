//! Utility functions module
//! 
//! Shutdown signal handling and wall-clock helpers shared across the service.

pub mod signals;
pub mod time;

// Re-export main functions
pub use signals::shutdown_signal;
pub use time::{now_ms, remaining_seconds};
