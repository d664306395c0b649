//! Wall-clock helpers
//!
//! Deadlines are epoch milliseconds internally; everything crossing the
//! command boundary is whole seconds.

use chrono::Utc;

/// Current wall-clock time in epoch milliseconds
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Seconds left until `end_ms`, rounded up and clamped at zero
pub fn remaining_seconds(end_ms: i64, now_ms: i64) -> u64 {
    let diff = end_ms - now_ms;
    if diff <= 0 {
        0
    } else {
        ((diff + 999) / 1000) as u64
    }
}

/// Convert whole seconds into milliseconds without overflowing an `i64`
pub fn seconds_to_ms(seconds: u64) -> i64 {
    i64::try_from(seconds.saturating_mul(1000)).unwrap_or(i64::MAX)
}
