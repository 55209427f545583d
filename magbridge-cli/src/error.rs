//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::process;

use magbridge::service::BridgeError;

/// Permission-denied code in device error payloads.
const DEVICE_CODE_PERMISSION: u8 = 1;

/// Not-available code in device error payloads.
const DEVICE_CODE_UNAVAILABLE: u8 = 3;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// The bridge refused an invocation
    Invoke(BridgeError),
    /// The response stream ended before a result arrived
    ResponseStream,
    /// The device answered with an error payload
    Device { code: u8, message: String },
    /// A response payload did not match the expected shape
    Payload(String),
    /// Failed to wait for the shutdown signal
    Signal(std::io::Error),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        // Print additional help for specific errors
        match self {
            CliError::Device { code, .. } if *code == DEVICE_CODE_PERMISSION => {
                eprintln!();
                eprintln!("The simulated platform denied location access.");
                eprintln!("Heading operations need it; rerun without --deny-location.");
            }
            CliError::Device { code, .. } if *code == DEVICE_CODE_UNAVAILABLE => {
                eprintln!();
                eprintln!("The simulated device has no magnetometer.");
                eprintln!("Rerun without --unavailable to enable the sensor.");
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Invoke(e) => write!(f, "Failed to queue invocation: {}", e),
            CliError::ResponseStream => write!(f, "Response stream ended unexpectedly"),
            CliError::Device { code, message } => {
                write!(f, "Device error (code {}): {}", code, message)
            }
            CliError::Payload(msg) => write!(f, "Malformed response payload: {}", msg),
            CliError::Signal(e) => write!(f, "Failed to wait for shutdown signal: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Invoke(e) => Some(e),
            CliError::Signal(e) => Some(e),
            _ => None,
        }
    }
}

impl From<BridgeError> for CliError {
    fn from(e: BridgeError) -> Self {
        CliError::Invoke(e)
    }
}
