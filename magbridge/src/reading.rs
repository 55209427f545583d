//! Core sensor data types for the magnetometer bridge.
//!
//! This module defines the types that cross the bridge boundary as JSON:
//!
//! - [`SensorAccuracy`] - Calibration quality tier reported by the platform
//! - [`FieldReading`] - One raw magnetic field sample with derived magnitude
//! - [`Heading`] - One compass heading sample
//! - [`MagnetometerInfo`] - Capability and status snapshot
//!
//! Field names serialize exactly as the application shell expects them
//! (camelCase keys, numeric accuracy codes).

use serde::de::{Deserializer, Error as DeError};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

/// Magnetometer accuracy tier (higher is better).
///
/// Mirrors the platform sensor accuracy scale: `0` unreliable, `1` low,
/// `2` medium, `3` high. Serialized as the bare numeric code.
///
/// # Ordering
///
/// Variants order from worst to best, so `accuracy < SensorAccuracy::Medium`
/// is the calibration test used throughout the adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum SensorAccuracy {
    /// Readings cannot be trusted; the sensor needs figure-eight calibration.
    Unreliable,
    /// Low accuracy, calibration recommended.
    Low,
    /// Acceptable accuracy.
    Medium,
    /// Full accuracy.
    #[default]
    High,
}

impl SensorAccuracy {
    /// Numeric code used on the wire.
    #[inline]
    pub fn code(&self) -> u8 {
        match self {
            Self::Unreliable => 0,
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
        }
    }

    /// Parse a wire code. Returns `None` for codes outside `0..=3`.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Unreliable),
            1 => Some(Self::Low),
            2 => Some(Self::Medium),
            3 => Some(Self::High),
            _ => None,
        }
    }

    /// Whether this tier calls for user calibration.
    ///
    /// Anything below `Medium` does.
    #[inline]
    pub fn needs_calibration(&self) -> bool {
        *self < Self::Medium
    }
}

impl std::fmt::Display for SensorAccuracy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unreliable => write!(f, "Unreliable"),
            Self::Low => write!(f, "Low"),
            Self::Medium => write!(f, "Medium"),
            Self::High => write!(f, "High"),
        }
    }
}

impl Serialize for SensorAccuracy {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

impl<'de> Deserialize<'de> for SensorAccuracy {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = u8::deserialize(deserializer)?;
        Self::from_code(code)
            .ok_or_else(|| D::Error::custom(format!("invalid accuracy code: {code}")))
    }
}

/// One raw magnetometer sample.
///
/// Axis values are in microteslas in the device coordinate frame. The
/// magnitude is derived at construction time so every reading the shell
/// sees satisfies `magnitude == sqrt(x² + y² + z²)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldReading {
    /// Field strength along the device X axis in microteslas.
    pub x: f64,

    /// Field strength along the device Y axis in microteslas.
    pub y: f64,

    /// Field strength along the device Z axis in microteslas.
    pub z: f64,

    /// Total field strength in microteslas.
    pub magnitude: f64,

    /// Sample time in milliseconds since the Unix epoch.
    pub timestamp: u64,
}

impl FieldReading {
    /// Create a reading from axis values, deriving the magnitude.
    ///
    /// # Arguments
    ///
    /// * `x`, `y`, `z` - Axis values in microteslas
    /// * `timestamp` - Sample time in milliseconds since the Unix epoch
    pub fn new(x: f64, y: f64, z: f64, timestamp: u64) -> Self {
        Self {
            x,
            y,
            z,
            magnitude: (x * x + y * y + z * z).sqrt(),
            timestamp,
        }
    }
}

/// One compass heading sample.
///
/// Headings are degrees clockwise from north in `[0, 360)`. The platform
/// decides whether a true-north heading is available; when it is not, the
/// true heading equals the magnetic heading. A negative `headingAccuracy`
/// means the platform could not estimate the error band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Heading {
    /// Heading relative to magnetic north in degrees.
    pub magnetic_heading: f64,

    /// Heading relative to true north in degrees.
    pub true_heading: f64,

    /// Estimated error in degrees, or `-1.0` when unknown.
    pub heading_accuracy: f64,

    /// Sample time in milliseconds since the Unix epoch.
    pub timestamp: u64,
}

impl Heading {
    /// Create a heading sample.
    ///
    /// # Arguments
    ///
    /// * `magnetic_heading` - Degrees from magnetic north
    /// * `true_heading` - Degrees from true north
    /// * `accuracy_deg` - Error estimate in degrees, `None` when the
    ///   platform does not provide one (serialized as `-1`)
    /// * `timestamp` - Sample time in milliseconds since the Unix epoch
    pub fn new(
        magnetic_heading: f64,
        true_heading: f64,
        accuracy_deg: Option<f64>,
        timestamp: u64,
    ) -> Self {
        Self {
            magnetic_heading,
            true_heading,
            heading_accuracy: accuracy_deg.unwrap_or(-1.0),
            timestamp,
        }
    }
}

/// Capability and status snapshot returned by `getMagnetometerInfo`.
///
/// The `reading` field is best-effort: when no sample arrives within the
/// snapshot budget the key is left out of the JSON entirely rather than
/// set to null.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MagnetometerInfo {
    /// Whether a magnetometer is present.
    pub is_available: bool,

    /// Last cached accuracy tier.
    pub accuracy: SensorAccuracy,

    /// Last cached calibration flag.
    pub calibration_needed: bool,

    /// Platform label, e.g. `"simulated"`.
    pub platform: String,

    /// Fresh sample, if one arrived within the snapshot budget.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reading: Option<FieldReading>,
}
