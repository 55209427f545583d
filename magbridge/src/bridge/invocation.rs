//! Inbound command types.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde_json::Value;

use crate::error::PluginError;

/// Opaque token correlating a response with the shell call that caused it.
///
/// The shell mints these; the plugin only ever copies them into responses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CallbackId(String);

impl CallbackId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CallbackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CallbackId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for CallbackId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Operations the plugin implements, keyed by their wire names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    IsAvailable,
    GetReading,
    GetHeading,
    WatchReadings,
    StopWatch,
    WatchHeading,
    StopWatchHeading,
    GetMagnetometerInfo,
    GetAccuracy,
    IsCalibrationNeeded,
    GetFieldStrength,
}

impl Action {
    /// The name the shell uses on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IsAvailable => "isAvailable",
            Self::GetReading => "getReading",
            Self::GetHeading => "getHeading",
            Self::WatchReadings => "watchReadings",
            Self::StopWatch => "stopWatch",
            Self::WatchHeading => "watchHeading",
            Self::StopWatchHeading => "stopWatchHeading",
            Self::GetMagnetometerInfo => "getMagnetometerInfo",
            Self::GetAccuracy => "getAccuracy",
            Self::IsCalibrationNeeded => "isCalibrationNeeded",
            Self::GetFieldStrength => "getFieldStrength",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Action {
    type Err = PluginError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "isAvailable" => Ok(Self::IsAvailable),
            "getReading" => Ok(Self::GetReading),
            "getHeading" => Ok(Self::GetHeading),
            "watchReadings" => Ok(Self::WatchReadings),
            "stopWatch" => Ok(Self::StopWatch),
            "watchHeading" => Ok(Self::WatchHeading),
            "stopWatchHeading" => Ok(Self::StopWatchHeading),
            "getMagnetometerInfo" => Ok(Self::GetMagnetometerInfo),
            "getAccuracy" => Ok(Self::GetAccuracy),
            "isCalibrationNeeded" => Ok(Self::IsCalibrationNeeded),
            "getFieldStrength" => Ok(Self::GetFieldStrength),
            other => Err(PluginError::InvalidAction(other.to_string())),
        }
    }
}

/// One command from the application shell.
///
/// The action arrives as a raw string: the shell is free to send names this
/// plugin has never heard of, and those must still be answered (with an
/// invalid-action error) on the supplied callback.
#[derive(Debug, Clone)]
pub struct Invocation {
    /// Wire name of the requested operation.
    pub action: String,

    /// Positional JSON arguments, possibly empty.
    pub args: Vec<Value>,

    /// Where the response goes.
    pub callback_id: CallbackId,
}

impl Invocation {
    /// Create an invocation from a raw action string.
    pub fn new(
        action: impl Into<String>,
        args: Vec<Value>,
        callback_id: impl Into<CallbackId>,
    ) -> Self {
        Self {
            action: action.into(),
            args,
            callback_id: callback_id.into(),
        }
    }

    /// Create an invocation for a known action with no arguments.
    pub fn of(action: Action, callback_id: impl Into<CallbackId>) -> Self {
        Self::new(action.as_str(), Vec::new(), callback_id)
    }

    /// Create an invocation for a known action with arguments.
    pub fn with_args(
        action: Action,
        args: Vec<Value>,
        callback_id: impl Into<CallbackId>,
    ) -> Self {
        Self::new(action.as_str(), args, callback_id)
    }
}
