//! Configuration and CLI argument handling

use std::path::PathBuf;

use clap::Parser;

/// CLI argument parsing structure
#[derive(Parser, Debug, Clone)]
#[command(name = "fade-that")]
#[command(about = "Close browser tabs on a timer, with warnings, pause/resume and iteration")]
#[command(version = "1.0.0")]
pub struct Config {
    /// Port to bind the server to
    #[arg(short, long, default_value = "20554")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Default seconds before close at which the warning fires
    #[arg(short, long, default_value = "60")]
    pub warning_time: u64,

    /// Smallest delay, in seconds, a warning wake-up may be scheduled with
    #[arg(long, default_value = "2")]
    pub min_schedule_delay: u64,

    /// Seconds a warning wake-up may arrive early and still be honoured
    #[arg(long, default_value = "5")]
    pub warning_tolerance: u64,

    /// Warnings are skipped when no more than this many seconds remain
    #[arg(long, default_value = "5")]
    pub warning_floor: u64,

    /// Seconds added when the user clicks "extend" on a warning notification
    #[arg(long, default_value = "300")]
    pub extend_step: u64,

    /// JSON file holding pending wake-ups so they survive a restart
    #[arg(long)]
    pub alarm_store: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Get the server address as a formatted string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }

    /// Engine constants derived from the command line
    pub fn timer_settings(&self) -> TimerSettings {
        TimerSettings {
            default_warning_seconds: self.warning_time,
            min_schedule_delay_seconds: self.min_schedule_delay,
            warning_tolerance_seconds: self.warning_tolerance,
            warning_floor_seconds: self.warning_floor,
            extend_step_seconds: self.extend_step,
        }
    }
}

/// Tunables for the timer registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerSettings {
    /// Warning threshold used when a start command omits one
    pub default_warning_seconds: u64,
    /// A warning wake-up closer than this is never scheduled
    pub min_schedule_delay_seconds: u64,
    /// How far above the threshold a warning wake-up may land
    pub warning_tolerance_seconds: u64,
    /// Warnings need strictly more than this many seconds left
    pub warning_floor_seconds: u64,
    /// Extension applied from a warning notification button
    pub extend_step_seconds: u64,
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            default_warning_seconds: 60,
            min_schedule_delay_seconds: 2,
            warning_tolerance_seconds: 5,
            warning_floor_seconds: 5,
            extend_step_seconds: 300,
        }
    }
}
