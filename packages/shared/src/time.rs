//! Time-related utilities with clock abstraction for testability.

use chrono::{FixedOffset, TimeZone, Utc};

/// JST is UTC+9
const JST_OFFSET_SECS: i32 = 9 * 3600;

/// Clock trait for dependency injection and testing
pub trait Clock: Send + Sync {
    /// Get current Unix timestamp (milliseconds)
    fn now_millis(&self) -> i64;
}

/// System clock implementation (uses actual system time)
#[derive(Debug, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        now_millis()
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

/// Get current Unix timestamp (milliseconds)
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Timestamp (milliseconds) at which a countdown of `secs` seconds started now ends.
pub fn deadline_after(clock: &dyn Clock, secs: u64) -> i64 {
    let millis = i64::try_from(secs.saturating_mul(1000)).unwrap_or(i64::MAX);
    clock.now_millis().saturating_add(millis)
}

/// Convert Unix timestamp (milliseconds) to JST RFC 3339 format
///
/// Falls back to the raw millisecond value when the timestamp is out of range.
pub fn timestamp_to_jst_rfc3339(timestamp_millis: i64) -> String {
    FixedOffset::east_opt(JST_OFFSET_SECS)
        .and_then(|jst| jst.timestamp_millis_opt(timestamp_millis).single())
        .map_or_else(|| timestamp_millis.to_string(), |dt| dt.to_rfc3339())
}
