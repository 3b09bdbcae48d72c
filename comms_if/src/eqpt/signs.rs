//! # Sign Detection Communications Module
//!
//! The sign detector (outside this software) classifies road signs, traffic lights and the
//! dotted line marking an intersection, and publishes the result as a vector of flags.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Flags raised by the sign detector for the most recent detection.
///
/// Each message replaces the previous one entirely, so a flag which is not set in the latest
/// message is considered no longer detected. Missing fields deserialise as `false`.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignEvent {
    /// Dotted line marker, the rover is arriving at an intersection
    pub dotted_line: bool,

    /// Ahead only sign, continue straight through the intersection
    pub ahead_only: bool,

    /// Turn left sign
    pub turn_left: bool,

    /// Turn right sign
    pub turn_right: bool,

    /// Roundabout sign
    pub roundabout: bool,

    /// Give way sign
    pub give_way: bool,

    /// Stop sign
    pub stop: bool,

    /// Roadwork sign, proceed slowly
    pub roadwork: bool,

    /// Red traffic light
    pub red_light: bool,

    /// Yellow traffic light
    pub yellow_light: bool,
}
