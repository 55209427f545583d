//! Platform sensor services.
//!
//! The adapter never touches hardware directly; it talks to whatever sensor
//! stack the platform provides through two trait seams:
//!
//! - [`MotionService`] - raw magnetometer samples
//! - [`LocationService`] - compass headings and the permission gate
//!
//! Both deliver data as a channel per subscription: the service pushes
//! samples until the subscriber drops the receiver. The simulated backend
//! in [`simulated`] implements both seams; the azimuth math it shares with
//! fusion-based backends lives in [`fusion`].

pub mod fusion;
mod rate;
pub mod simulated;

pub use rate::SampleRate;
pub use simulated::{SimulatedPlatform, SimulatedPlatformConfig};

use tokio::sync::mpsc;

use crate::reading::{FieldReading, Heading, SensorAccuracy};

/// Errors a platform service can raise when opening a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PlatformError {
    /// The sensor hardware or service is missing.
    #[error("sensor service unavailable")]
    Unavailable,

    /// The user or system denied access to the service.
    #[error("sensor access not authorized")]
    PermissionDenied,
}

/// Authorization state of the heading service.
///
/// Heading access rides on the platform's location permission; a denied
/// grant fails heading operations without touching the raw magnetometer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Authorization {
    /// Access granted (or not required on this platform).
    #[default]
    Granted,
    /// Access denied by the user or a device policy.
    Denied,
}

impl std::fmt::Display for Authorization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Granted => write!(f, "Granted"),
            Self::Denied => write!(f, "Denied"),
        }
    }
}

/// One raw magnetometer sample from the platform.
///
/// Axis values are microteslas in the device frame. The platform reports
/// raw data only; derived values such as the magnitude are the adapter's
/// business.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSample {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Sample time in milliseconds since the Unix epoch.
    pub timestamp_ms: u64,
}

/// One heading update from the platform.
///
/// The adapter forwards these faithfully and never reinterprets them: a
/// platform that cannot tell true from magnetic north reports both equal,
/// and one that cannot estimate its error reports `accuracy_deg: None`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadingUpdate {
    /// Degrees clockwise from magnetic north in `[0, 360)`.
    pub magnetic_heading: f64,

    /// Degrees clockwise from true north in `[0, 360)`.
    pub true_heading: f64,

    /// Estimated error band in degrees, if the platform knows it.
    pub accuracy_deg: Option<f64>,

    /// Magnetometer accuracy tier at the time of this update.
    pub sensor_accuracy: SensorAccuracy,

    /// Sample time in milliseconds since the Unix epoch.
    pub timestamp_ms: u64,
}

impl From<FieldSample> for FieldReading {
    fn from(sample: FieldSample) -> Self {
        FieldReading::new(sample.x, sample.y, sample.z, sample.timestamp_ms)
    }
}

impl From<HeadingUpdate> for Heading {
    fn from(update: HeadingUpdate) -> Self {
        Heading::new(
            update.magnetic_heading,
            update.true_heading,
            update.accuracy_deg,
            update.timestamp_ms,
        )
    }
}

/// Raw magnetometer service (platform motion stack).
pub trait MotionService: Send + Sync {
    /// Whether a magnetometer is present on this device.
    fn is_available(&self) -> bool;

    /// Open a raw field subscription at the given delivery rate.
    ///
    /// Samples flow until the receiver is dropped; dropping it is the only
    /// way to end the subscription.
    fn field_updates(&self, rate: SampleRate)
        -> Result<mpsc::Receiver<FieldSample>, PlatformError>;
}

/// Compass heading service (platform location stack).
pub trait LocationService: Send + Sync {
    /// Whether heading data can be produced on this device.
    fn is_available(&self) -> bool;

    /// Current location-permission grant.
    fn authorization(&self) -> Authorization;

    /// Open a heading subscription at the given delivery rate.
    ///
    /// Fails with [`PlatformError::PermissionDenied`] when the grant is
    /// missing; updates flow until the receiver is dropped.
    fn heading_updates(
        &self,
        rate: SampleRate,
    ) -> Result<mpsc::Receiver<HeadingUpdate>, PlatformError>;
}
