//! # Line follower library.
//!
//! This library allows the executable, benchmarks and tests to access the items defined
//! inside the line crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Command server - publishes velocity commands and diagnostic images
pub mod cmd_server;

/// Data store - the state of the executable shared between cycles
pub mod data_store;

/// Input client - latches camera frames, sign detections and poses
pub mod input_client;

/// Line control module - converts the line error and signs into a velocity command
pub mod line_ctrl;

/// Executable parameters
pub mod params;

/// Vision module - extracts the line error from camera frames
pub mod vision;
