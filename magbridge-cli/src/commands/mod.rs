//! CLI command implementations.
//!
//! Each subcommand has its own module with argument definitions and handlers.
//!
//! # Command Modules
//!
//! - [`common`] - Shared argument types and response helpers
//! - [`heading`] - One-shot compass heading
//! - [`info`] - Device information snapshot
//! - [`read`] - One-shot magnetometer reading
//! - [`strength`] - Total field strength measurement
//! - [`watch`] - Continuous magnetometer stream
//! - [`watch_heading`] - Continuous heading stream

pub mod common;
pub mod heading;
pub mod info;
pub mod read;
pub mod strength;
pub mod watch;
pub mod watch_heading;
