//! Time-related utility functions.
//!
//! Shell-visible payloads carry timestamps as milliseconds since the Unix
//! epoch, matching what `Date.now()` produces on the application side. This
//! module provides the conversions.

use std::time::{SystemTime, UNIX_EPOCH};

/// Convert a `SystemTime` to milliseconds since the Unix epoch.
///
/// Times before the epoch saturate to `0` rather than failing; sensor
/// timestamps from a sane clock never land there.
///
/// # Arguments
///
/// * `time` - The system time to convert
///
/// # Example
///
/// ```
/// use std::time::SystemTime;
/// use magbridge::time::unix_millis;
///
/// let sampled_at = SystemTime::now();
/// assert!(unix_millis(sampled_at) > 0);
/// ```
pub fn unix_millis(time: SystemTime) -> u64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(elapsed) => elapsed.as_millis() as u64,
        Err(_) => 0,
    }
}

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    unix_millis(SystemTime::now())
}
