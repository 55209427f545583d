//! Sensor delivery rate tiers.

use std::time::Duration;

/// Requested intervals at or below this map to [`SampleRate::Fastest`].
const FASTEST_CUTOFF_MS: u64 = 20;

/// Requested intervals at or below this map to [`SampleRate::Game`].
const GAME_CUTOFF_MS: u64 = 60;

/// Requested intervals at or below this map to [`SampleRate::Ui`].
const UI_CUTOFF_MS: u64 = 200;

/// Delivery rate tier for a sensor subscription.
///
/// Platforms schedule sensor delivery in coarse tiers rather than exact
/// intervals; a requested frequency in milliseconds snaps to the nearest
/// tier that can honor it. The tier names and cutoffs follow the mobile
/// sensor-delay convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SampleRate {
    /// As fast as the sensor can deliver.
    Fastest,
    /// Gaming rate, roughly 50 Hz.
    Game,
    /// Interface rate, roughly 16 Hz.
    Ui,
    /// Default monitoring rate, roughly 5 Hz.
    #[default]
    Normal,
}

impl SampleRate {
    /// Snap a requested delivery interval to its tier.
    pub fn from_interval(interval: Duration) -> Self {
        Self::from_millis(interval.as_millis() as u64)
    }

    /// Snap a requested delivery interval in milliseconds to its tier.
    pub fn from_millis(interval_ms: u64) -> Self {
        if interval_ms <= FASTEST_CUTOFF_MS {
            Self::Fastest
        } else if interval_ms <= GAME_CUTOFF_MS {
            Self::Game
        } else if interval_ms <= UI_CUTOFF_MS {
            Self::Ui
        } else {
            Self::Normal
        }
    }

    /// Nominal delivery interval for backends that generate their own
    /// ticks. `Fastest` has no platform-defined delay; the simulated clock
    /// runs it at 10 ms.
    pub fn interval(&self) -> Duration {
        match self {
            Self::Fastest => Duration::from_millis(10),
            Self::Game => Duration::from_millis(20),
            Self::Ui => Duration::from_millis(60),
            Self::Normal => Duration::from_millis(200),
        }
    }
}

impl std::fmt::Display for SampleRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fastest => write!(f, "Fastest"),
            Self::Game => write!(f, "Game"),
            Self::Ui => write!(f, "Ui"),
            Self::Normal => write!(f, "Normal"),
        }
    }
}
