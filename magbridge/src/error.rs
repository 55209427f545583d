//! Error types for the plugin bridge.
//!
//! Failures that reach the application shell travel as a structured
//! `{code, message}` JSON payload with a stable numeric code, so shell-side
//! handlers can branch without string matching. Code `3` is the historical
//! not-available code shared with the device orientation plugin family;
//! the remaining codes extend the same table.

use serde_json::{json, Value};
use thiserror::Error;

use crate::platform::PlatformError;

/// Errors surfaced to the application shell by plugin operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PluginError {
    /// The platform refused access to the heading service.
    #[error("Location permission denied")]
    PermissionDenied,

    /// No sample arrived within the one-shot budget.
    #[error("Timeout waiting for {0}")]
    Timeout(&'static str),

    /// The device has no usable magnetometer.
    #[error("Magnetometer not available")]
    ServiceUnavailable,

    /// A stop was requested while no watch of that kind was active.
    #[error("No active watch")]
    NoActiveWatch,

    /// The shell named an operation this plugin does not implement.
    #[error("Invalid action: {0}")]
    InvalidAction(String),
}

impl PluginError {
    /// Stable numeric code for the shell-visible error payload.
    pub fn code(&self) -> u8 {
        match self {
            Self::PermissionDenied => 1,
            Self::Timeout(_) => 2,
            Self::ServiceUnavailable => 3,
            Self::NoActiveWatch => 4,
            Self::InvalidAction(_) => 5,
        }
    }

    /// Build the `{code, message}` payload delivered to the shell.
    pub fn payload(&self) -> Value {
        json!({
            "code": self.code(),
            "message": self.to_string(),
        })
    }
}

impl From<PlatformError> for PluginError {
    fn from(err: PlatformError) -> Self {
        match err {
            PlatformError::Unavailable => Self::ServiceUnavailable,
            PlatformError::PermissionDenied => Self::PermissionDenied,
        }
    }
}
