//! Bridge configuration.
//!
//! This module contains the [`BridgeConfig`] struct with the tunable
//! timeouts of the plugin, and [`WatchOptions`], the per-watch settings
//! parsed from invocation arguments.

use std::time::Duration;

use serde_json::Value;

use crate::platform::SampleRate;

/// Default timeout for one-shot sensor operations in milliseconds.
pub const DEFAULT_ONESHOT_TIMEOUT_MS: u64 = 1_000;

/// Default timeout for the best-effort sample in a device info snapshot,
/// in milliseconds.
pub const DEFAULT_INFO_SNAPSHOT_TIMEOUT_MS: u64 = 500;

/// Default outbound response channel capacity.
pub const DEFAULT_RESPONSE_CHANNEL_CAPACITY: usize = 64;

/// Default watch reporting interval in milliseconds.
pub const DEFAULT_WATCH_FREQUENCY_MS: u64 = 100;

/// Platform label reported in device info snapshots.
pub const DEFAULT_PLATFORM_LABEL: &str = "simulated";

/// Configuration for a magnetometer bridge.
#[derive(Clone, Debug)]
pub struct BridgeConfig {
    /// Platform label included in device info snapshots.
    pub platform: String,

    /// How long a one-shot operation waits for its first sample before
    /// reporting a timeout error.
    pub oneshot_timeout: Duration,

    /// How long a device info snapshot waits for a best-effort sample.
    /// Unlike one-shot operations, running out of time here is not an
    /// error; the snapshot simply omits the reading.
    pub info_snapshot_timeout: Duration,

    /// Outbound response channel capacity.
    pub response_capacity: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            platform: DEFAULT_PLATFORM_LABEL.to_string(),
            oneshot_timeout: Duration::from_millis(DEFAULT_ONESHOT_TIMEOUT_MS),
            info_snapshot_timeout: Duration::from_millis(DEFAULT_INFO_SNAPSHOT_TIMEOUT_MS),
            response_capacity: DEFAULT_RESPONSE_CHANNEL_CAPACITY,
        }
    }
}

/// Per-watch settings parsed from invocation arguments.
///
/// Watch requests never fail on bad arguments. Anything that does not
/// parse as a number falls back to the defaults, the same forgiving
/// treatment shells give optional plugin parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WatchOptions {
    /// Requested reporting interval.
    pub frequency: Duration,

    /// Minimum change in magnetic heading, in degrees, before the next
    /// update is delivered. Zero delivers every update. Field watches
    /// ignore this.
    pub filter_deg: f64,
}

impl WatchOptions {
    /// Parse watch settings from positional arguments.
    ///
    /// The first argument is the reporting interval in milliseconds, the
    /// second the heading filter in degrees. Negative intervals collapse
    /// to the fastest supported rate; negative filters to no filtering.
    pub fn from_args(args: &[Value]) -> Self {
        let frequency_ms = args
            .first()
            .and_then(Value::as_f64)
            .map(|ms| ms.max(1.0) as u64)
            .unwrap_or(DEFAULT_WATCH_FREQUENCY_MS);
        let filter_deg = args
            .get(1)
            .and_then(Value::as_f64)
            .map(|deg| deg.max(0.0))
            .unwrap_or(0.0);

        Self {
            frequency: Duration::from_millis(frequency_ms),
            filter_deg,
        }
    }

    /// Delivery rate tier matching the requested interval.
    pub fn rate(&self) -> SampleRate {
        SampleRate::from_interval(self.frequency)
    }
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            frequency: Duration::from_millis(DEFAULT_WATCH_FREQUENCY_MS),
            filter_deg: 0.0,
        }
    }
}
