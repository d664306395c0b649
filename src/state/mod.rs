//! State management module
//! 
//! Timer records, the registry that owns them, and the process-wide
//! application state wrapping the registry for the host.

pub mod app_state;
pub mod error;
pub mod registry;
pub mod timer_record;
pub mod wake_up;

// Re-export main types
pub use app_state::{AppState, HostEvent};
pub use error::TimerError;
pub use registry::{Outcome, TimerRegistry};
pub use timer_record::{StartOptions, TabId, TimerRecord, TimerStatus, UNKNOWN_TAB_TITLE};
pub use wake_up::WakeUp;
