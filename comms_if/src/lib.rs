//! # Communications interface crate.
//!
//! Provides the interface types exchanged with the equipment around the line follower (camera,
//! sign detector, odometry, drive base) and the network abstractions used to carry them.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Message definitions for equipment (camera, signs, odometry, drive)
pub mod eqpt;

/// Network module
pub mod net;
