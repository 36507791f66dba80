//! Time-related utilities with clock abstraction for testability.

use chrono::{DateTime, FixedOffset, Utc};

/// JST is UTC+9
const JST_OFFSET_SECS: i32 = 9 * 3600;

/// Clock trait for dependency injection and testing
pub trait Clock: Send + Sync {
    /// Current Unix timestamp (milliseconds)
    fn now_millis(&self) -> i64;
}

/// System clock implementation (uses actual system time)
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Fixed clock implementation for testing (returns a fixed time)
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    fixed_time: i64,
}

impl FixedClock {
    /// Create a new fixed clock with the given timestamp
    pub fn new(fixed_time_millis: i64) -> Self {
        Self {
            fixed_time: fixed_time_millis,
        }
    }
}

impl Clock for FixedClock {
    fn now_millis(&self) -> i64 {
        self.fixed_time
    }
}

/// Format a Unix timestamp (milliseconds) as a JST wall-clock time (`HH:MM:SS.mmm`).
///
/// Out-of-range timestamps fall back to the raw millisecond value.
pub fn format_jst_clock(timestamp_millis: i64) -> String {
    match (
        DateTime::from_timestamp_millis(timestamp_millis),
        FixedOffset::east_opt(JST_OFFSET_SECS),
    ) {
        (Some(utc), Some(jst)) => utc.with_timezone(&jst).format("%H:%M:%S%.3f").to_string(),
        _ => timestamp_millis.to_string(),
    }
}
