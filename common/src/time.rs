// Time types used across the engine
//
// Cascades never read the wall clock: every event carries its own timestamp so
// that replaying the same events produces the same ledger. The wall clock is
// only used by the command line tool to stamp events that were not given one.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

// Seconds timestamps used to determine it using its type
pub type TimestampSeconds = u64;

// UTC day number (days since the unix epoch)
pub type DayNumber = u64;

pub const SECONDS_PER_DAY: u64 = 86_400;

/// UTC day containing the timestamp
#[inline]
pub fn day_of(timestamp: TimestampSeconds) -> DayNumber {
    timestamp / SECONDS_PER_DAY
}

#[inline]
pub fn get_current_time() -> Duration {
    // A clock set before 1970 is reported as the epoch itself
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
}

// Return timestamp in seconds
pub fn get_current_time_in_seconds() -> TimestampSeconds {
    get_current_time().as_secs()
}
