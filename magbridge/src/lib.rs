//! Magbridge - Magnetometer plugin bridge
//!
//! This library implements the device side of a magnetometer/compass
//! plugin: shell-style invocations go in, callback-correlated responses
//! come out, and a pluggable platform layer supplies the sensor data.
//!
//! # High-Level API
//!
//! For most use cases, the [`service`] module provides the facade:
//!
//! ```ignore
//! use magbridge::bridge::{Action, Invocation};
//! use magbridge::config::BridgeConfig;
//! use magbridge::platform::{SimulatedPlatform, SimulatedPlatformConfig};
//! use magbridge::service::MagnetometerBridge;
//!
//! let platform = SimulatedPlatform::new(SimulatedPlatformConfig::default());
//! let (bridge, mut responses) =
//!     MagnetometerBridge::start_simulated(platform, BridgeConfig::default());
//!
//! bridge.invoke(Invocation::of(Action::GetReading, "callback-1")).await?;
//! let reading = responses.recv().await;
//! ```

pub mod bridge;
pub mod config;
pub mod error;
pub mod logging;
pub mod platform;
pub mod plugin;
pub mod reading;
pub mod service;
pub mod time;

/// Version of the magbridge library and CLI.
///
/// This is synchronized across all components in the workspace.
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
