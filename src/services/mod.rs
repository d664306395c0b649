//! Host adapters module
//! 
//! The timer engine reaches the outside world only through these three
//! traits: named wake-ups, tab control and user notifications.

pub mod notifier;
pub mod scheduler;
pub mod tabs;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export main types
pub use notifier::{LogNotifier, Notification, Notifier, NotifierRequest, NotifyError};
pub use scheduler::{PendingWakeUp, Scheduler, SchedulerError, TokioScheduler};
pub use tabs::{InMemoryTabs, Tab, TabControl, TabError};
