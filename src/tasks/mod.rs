//! Background tasks module
//! 
//! Tasks that run alongside the HTTP server: restart discovery and the
//! wake-up dispatcher.

pub mod restart_recovery;
pub mod wake_up_dispatch;

// Re-export main functions
pub use restart_recovery::restart_recovery;
pub use wake_up_dispatch::wake_up_dispatch_task;
