//! Simulated sensor backend.
//!
//! Drives the bridge without hardware. The model is a fixed world magnetic
//! field over a device that yaws at a constant rate, with optional fixed
//! pitch and roll and a small sinusoidal interference wobble on the sampled
//! axes. Headings are not faked separately: they are computed from the
//! simulated body-frame field and gravity through the same
//! [`fusion`] math a real fusion backend would use, so raw readings and
//! headings stay physically consistent.
//!
//! Each subscription runs its own pump task that stops as soon as the
//! subscriber drops the receiver.

use std::time::Instant;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use super::fusion;
use super::{
    Authorization, FieldSample, HeadingUpdate, LocationService, MotionService, PlatformError,
    SampleRate,
};
use crate::reading::SensorAccuracy;
use crate::time::now_millis;

/// Default world field in north/east/down components, microteslas.
///
/// A mid-latitude field: ~28 uT horizontal, ~46 uT vertical, ~54 uT total.
const DEFAULT_FIELD_NORTH_UT: f64 = 25.5;
const DEFAULT_FIELD_EAST_UT: f64 = -12.3;
const DEFAULT_FIELD_DOWN_UT: f64 = 45.8;

/// Standard gravity, m/s².
const GRAVITY_MS2: f64 = 9.81;

/// Wobble phase advance per sample.
const WOBBLE_PHASE_STEP: f64 = 0.1;

/// Z-axis wobble amplitude relative to the horizontal amplitude.
const WOBBLE_Z_RATIO: f64 = 0.6;

/// Capacity of each subscription channel.
const CHANNEL_CAPACITY: usize = 16;

/// Configuration for the simulated platform.
#[derive(Debug, Clone)]
pub struct SimulatedPlatformConfig {
    /// Whether the simulated device has a magnetometer at all.
    pub available: bool,

    /// Location-permission grant for heading access.
    pub authorization: Authorization,

    /// World magnetic field in north/east/down components, microteslas.
    /// The field's horizontal bearing defines where magnetic north is.
    pub world_field: [f64; 3],

    /// Sinusoidal interference amplitude on the sampled axes, microteslas.
    pub wobble_ut: f64,

    /// Device yaw at simulation start, degrees clockwise from world north.
    pub initial_yaw_deg: f64,

    /// Constant yaw rate, degrees per second (positive turns clockwise).
    pub yaw_rate_deg_s: f64,

    /// Fixed pitch of the device, degrees.
    pub pitch_deg: f64,

    /// Fixed roll of the device, degrees.
    pub roll_deg: f64,

    /// Magnetic declination, degrees east positive. Separates the true
    /// heading from the magnetic one.
    pub declination_deg: f64,

    /// Accuracy tier attached to every heading update.
    pub accuracy: SensorAccuracy,

    /// Error band attached to heading updates, degrees.
    pub heading_accuracy_deg: Option<f64>,
}

impl Default for SimulatedPlatformConfig {
    fn default() -> Self {
        Self {
            available: true,
            authorization: Authorization::Granted,
            world_field: [
                DEFAULT_FIELD_NORTH_UT,
                DEFAULT_FIELD_EAST_UT,
                DEFAULT_FIELD_DOWN_UT,
            ],
            wobble_ut: 1.5,
            initial_yaw_deg: 180.0,
            yaw_rate_deg_s: 10.0,
            pitch_deg: 0.0,
            roll_deg: 0.0,
            declination_deg: 0.0,
            accuracy: SensorAccuracy::High,
            heading_accuracy_deg: Some(15.0),
        }
    }
}

/// Simulated motion and location services.
///
/// Implements both [`MotionService`] and [`LocationService`]; the same
/// instance (behind two `Arc` handles) usually backs both seams of the
/// plugin so readings and headings share one device trajectory.
#[derive(Clone)]
pub struct SimulatedPlatform {
    config: SimulatedPlatformConfig,
    epoch: Instant,
}

impl SimulatedPlatform {
    pub fn new(config: SimulatedPlatformConfig) -> Self {
        Self {
            config,
            epoch: Instant::now(),
        }
    }

    /// Device yaw after `elapsed_s` seconds of simulation.
    fn yaw_at(&self, elapsed_s: f64) -> f64 {
        fusion::normalize_degrees(
            self.config.initial_yaw_deg + self.config.yaw_rate_deg_s * elapsed_s,
        )
    }

    /// Raw field sample at a point in the trajectory.
    fn field_sample_at(&self, elapsed_s: f64, wobble_phase: f64) -> FieldSample {
        let yaw = self.yaw_at(elapsed_s);
        let mut field = body_vector(
            self.config.world_field,
            yaw,
            self.config.pitch_deg,
            self.config.roll_deg,
        );

        let amplitude = self.config.wobble_ut;
        field[0] += wobble_phase.sin() * amplitude;
        field[1] += wobble_phase.cos() * amplitude;
        field[2] += (wobble_phase * 0.5).sin() * amplitude * WOBBLE_Z_RATIO;

        FieldSample {
            x: field[0],
            y: field[1],
            z: field[2],
            timestamp_ms: now_millis(),
        }
    }

    /// Heading update at a point in the trajectory, derived from the same
    /// (wobbled) field a raw subscriber would see at that moment.
    fn heading_at(&self, elapsed_s: f64, wobble_phase: f64) -> HeadingUpdate {
        let sample = self.field_sample_at(elapsed_s, wobble_phase);
        let gravity = gravity_vector(self.config.pitch_deg, self.config.roll_deg);

        // Unsolvable orientations report heading 0, like the mobile stacks.
        let magnetic =
            fusion::tilt_compensated_azimuth([sample.x, sample.y, sample.z], gravity)
                .unwrap_or(0.0);
        let true_heading = fusion::normalize_degrees(magnetic + self.config.declination_deg);

        HeadingUpdate {
            magnetic_heading: magnetic,
            true_heading,
            accuracy_deg: self.config.heading_accuracy_deg,
            sensor_accuracy: self.config.accuracy,
            timestamp_ms: sample.timestamp_ms,
        }
    }

    async fn pump_fields(self, rate: SampleRate, tx: mpsc::Sender<FieldSample>) {
        let mut ticker = tokio::time::interval(rate.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut phase: f64 = 0.0;

        loop {
            ticker.tick().await;
            let sample = self.field_sample_at(self.epoch.elapsed().as_secs_f64(), phase);
            if tx.send(sample).await.is_err() {
                debug!("simulated field subscription closed");
                break;
            }
            phase += WOBBLE_PHASE_STEP;
        }
    }

    async fn pump_headings(self, rate: SampleRate, tx: mpsc::Sender<HeadingUpdate>) {
        let mut ticker = tokio::time::interval(rate.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut phase: f64 = 0.0;

        loop {
            ticker.tick().await;
            let update = self.heading_at(self.epoch.elapsed().as_secs_f64(), phase);
            if tx.send(update).await.is_err() {
                debug!("simulated heading subscription closed");
                break;
            }
            phase += WOBBLE_PHASE_STEP;
        }
    }
}

impl MotionService for SimulatedPlatform {
    fn is_available(&self) -> bool {
        self.config.available
    }

    fn field_updates(
        &self,
        rate: SampleRate,
    ) -> Result<mpsc::Receiver<FieldSample>, PlatformError> {
        if !self.config.available {
            return Err(PlatformError::Unavailable);
        }

        debug!(rate = %rate, "opening simulated field subscription");
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let platform = self.clone();
        tokio::spawn(platform.pump_fields(rate, tx));
        Ok(rx)
    }
}

impl LocationService for SimulatedPlatform {
    fn is_available(&self) -> bool {
        self.config.available
    }

    fn authorization(&self) -> Authorization {
        self.config.authorization
    }

    fn heading_updates(
        &self,
        rate: SampleRate,
    ) -> Result<mpsc::Receiver<HeadingUpdate>, PlatformError> {
        if !self.config.available {
            return Err(PlatformError::Unavailable);
        }
        if self.config.authorization == Authorization::Denied {
            return Err(PlatformError::PermissionDenied);
        }

        debug!(rate = %rate, "opening simulated heading subscription");
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let platform = self.clone();
        tokio::spawn(platform.pump_headings(rate, tx));
        Ok(rx)
    }
}

/// World vector (north/east/down) expressed in the device frame at the
/// given attitude. Device axes: x right, y top, z out of the screen.
fn body_vector(world: [f64; 3], yaw_deg: f64, pitch_deg: f64, roll_deg: f64) -> [f64; 3] {
    let yaw = yaw_deg.to_radians();
    let (north, east, down) = (world[0], world[1], world[2]);

    // Yaw only: device y points at `yaw`, device x trails it by 90°.
    let flat = [
        -north * yaw.sin() + east * yaw.cos(),
        north * yaw.cos() + east * yaw.sin(),
        -down,
    ];

    // Tilting the device rotates sensed vectors the opposite way.
    let pitched = rotate_about_x(flat, -pitch_deg);
    rotate_about_y(pitched, -roll_deg)
}

/// Gravity as the accelerometer would report it at the given attitude.
fn gravity_vector(pitch_deg: f64, roll_deg: f64) -> [f64; 3] {
    let flat = [0.0, 0.0, GRAVITY_MS2];
    let pitched = rotate_about_x(flat, -pitch_deg);
    rotate_about_y(pitched, -roll_deg)
}

fn rotate_about_x(v: [f64; 3], deg: f64) -> [f64; 3] {
    let (sin, cos) = deg.to_radians().sin_cos();
    [v[0], v[1] * cos - v[2] * sin, v[1] * sin + v[2] * cos]
}

fn rotate_about_y(v: [f64; 3], deg: f64) -> [f64; 3] {
    let (sin, cos) = deg.to_radians().sin_cos();
    [v[0] * cos + v[2] * sin, v[1], -v[0] * sin + v[2] * cos]
}
