//! Common types and utilities shared across CLI commands.

use clap::{Args, ValueEnum};
use serde_json::Value;
use tokio::sync::mpsc;

use magbridge::bridge::{CallbackId, PluginResponse, ResponseStatus};
use magbridge::config::BridgeConfig;
use magbridge::platform::{Authorization, SimulatedPlatform, SimulatedPlatformConfig};
use magbridge::reading::SensorAccuracy;
use magbridge::service::MagnetometerBridge;

use crate::error::CliError;

/// Reported sensor accuracy for the simulated magnetometer.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
pub enum AccuracyArg {
    /// Sensor readings cannot be trusted
    Unreliable,
    /// Low confidence, calibration recommended
    Low,
    /// Medium confidence
    Medium,
    /// Full confidence, sensor is calibrated
    High,
}

impl From<AccuracyArg> for SensorAccuracy {
    fn from(arg: AccuracyArg) -> Self {
        match arg {
            AccuracyArg::Unreliable => SensorAccuracy::Unreliable,
            AccuracyArg::Low => SensorAccuracy::Low,
            AccuracyArg::Medium => SensorAccuracy::Medium,
            AccuracyArg::High => SensorAccuracy::High,
        }
    }
}

/// Simulated device flags shared by every command.
#[derive(Debug, Clone, Args)]
pub struct SimArgs {
    /// Simulate a device without a magnetometer
    #[arg(long, global = true)]
    pub unavailable: bool,

    /// Simulate denied location permission (heading operations will fail)
    #[arg(long, global = true)]
    pub deny_location: bool,

    /// Magnetic declination in degrees (true heading = magnetic + declination)
    #[arg(long, global = true, default_value_t = 0.0)]
    pub declination: f64,

    /// Device rotation rate in degrees per second
    #[arg(long, global = true, default_value_t = 10.0)]
    pub yaw_rate: f64,

    /// Initial device heading in degrees
    #[arg(long, global = true, default_value_t = 180.0)]
    pub initial_heading: f64,

    /// Device pitch in degrees
    #[arg(long, global = true, default_value_t = 0.0)]
    pub pitch: f64,

    /// Device roll in degrees
    #[arg(long, global = true, default_value_t = 0.0)]
    pub roll: f64,

    /// Sensor accuracy reported by the simulated magnetometer
    #[arg(long, global = true, value_enum, default_value_t = AccuracyArg::High)]
    pub accuracy: AccuracyArg,
}

impl SimArgs {
    /// Build the simulated platform configuration from the CLI flags.
    pub fn platform_config(&self) -> SimulatedPlatformConfig {
        SimulatedPlatformConfig {
            available: !self.unavailable,
            authorization: if self.deny_location {
                Authorization::Denied
            } else {
                Authorization::Granted
            },
            declination_deg: self.declination,
            yaw_rate_deg_s: self.yaw_rate,
            initial_yaw_deg: self.initial_heading,
            pitch_deg: self.pitch,
            roll_deg: self.roll,
            accuracy: self.accuracy.into(),
            ..SimulatedPlatformConfig::default()
        }
    }
}

/// Start a bridge backed by the simulated platform described by `sim`.
pub fn start_bridge(sim: &SimArgs) -> (MagnetometerBridge, mpsc::Receiver<PluginResponse>) {
    let platform = SimulatedPlatform::new(sim.platform_config());
    MagnetometerBridge::start_simulated(platform, BridgeConfig::default())
}

/// Wait for the final response addressed to `callback_id`.
///
/// Keep-alive acks and responses for other callbacks are skipped. An error
/// response is converted into [`CliError::Device`].
pub async fn await_result(
    responses: &mut mpsc::Receiver<PluginResponse>,
    callback_id: &CallbackId,
) -> Result<Value, CliError> {
    loop {
        let response = responses.recv().await.ok_or(CliError::ResponseStream)?;
        if response.callback_id != *callback_id {
            continue;
        }
        match response.status {
            ResponseStatus::Ok => return Ok(response.payload),
            ResponseStatus::Error => return Err(device_error(&response.payload)),
            ResponseStatus::NoResult => continue,
        }
    }
}

/// Decode a response payload into a typed value.
pub fn decode<T: serde::de::DeserializeOwned>(payload: Value) -> Result<T, CliError> {
    serde_json::from_value(payload).map_err(|e| CliError::Payload(e.to_string()))
}

/// Convert an error payload into a [`CliError::Device`].
pub fn device_error(payload: &Value) -> CliError {
    let code = payload
        .get("code")
        .and_then(Value::as_u64)
        .unwrap_or_default() as u8;
    let message = payload
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("unknown device error")
        .to_string();
    CliError::Device { code, message }
}

/// Format a millisecond timestamp as local wall-clock time.
pub fn format_timestamp(timestamp_ms: u64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms as i64)
        .map(|instant| {
            instant
                .with_timezone(&chrono::Local)
                .format("%H:%M:%S%.3f")
                .to_string()
        })
        .unwrap_or_else(|| format!("{timestamp_ms} ms"))
}
