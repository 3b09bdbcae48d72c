//! # Line control module
//!
//! Line control turns the normalised line error, the latest sign detections and the robot's
//! pose into a velocity command. Every cycle it evaluates, in order:
//!
//! 1. Intersection entry, when the dotted line marker has been seen for enough consecutive
//!    cycles.
//! 2. Waiting at an intersection for a sign which selects the manouvre to perform.
//! 3. Executing the manouvre: drive forwards a set distance then turn on the spot.
//! 4. Following the line with a PD controller.
//! 5. Sign overrides (roadwork, stop, red and yellow lights).
//!
//! The resulting command is then limited to the capabilities of the drive base.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod calc_intersection;
mod calc_line_follow;
mod calc_overrides;
mod params;
mod pd_ctrl;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::eqpt::odom::Pose;
use serde::Serialize;

pub use params::*;
pub use pd_ctrl::*;
pub use state::*;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A manouvre latched on entry to an intersection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mnvr {
    /// The sign which selected this manouvre
    pub kind: MnvrKind,

    /// Pose of the robot when the intersection was entered
    pub origin: Pose,

    /// Distance to drive forwards from the origin before turning.
    ///
    /// Units: meters
    pub distance_m: f64,

    /// Heading change to achieve once the distance has been covered. Positive turns left.
    ///
    /// Units: radians
    pub heading_delta_rad: f64,

    /// True once the distance has been covered and the robot is turning on the spot.
    pub rotating: bool,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The mode of line control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CtrlMode {
    /// Following the line with the PD controller
    LineFollowing,

    /// Stopped at an intersection waiting for a sign
    IntersectionDetectWait,

    /// Executing an intersection manouvre
    IntersectionMoving,
}

/// The sign which selected an intersection manouvre.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MnvrKind {
    AheadOnly,
    TurnRight,
    TurnLeft,
    Roundabout,
    GiveWay,
}

/// The sign override applied to the command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SignOverride {
    Roadwork,
    Stop,
    RedLight,
    YellowLight,
}

/// Possible errors that can occur during LineCtrl operation.
#[derive(Debug, thiserror::Error)]
pub enum LineCtrlError {
    #[error("Could not load the line control parameters: {0}")]
    ParamLoadError(util::params::LoadError),

    #[error("Invalid line control parameters: {0}")]
    InvalidParams(String),

    #[error("Could not initialise the line control archives: {0}")]
    ArchiveError(util::archive::ArchiveError),

    #[error("Received a non-finite line error: {0}")]
    NonFiniteError(f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for CtrlMode {
    fn default() -> Self {
        CtrlMode::LineFollowing
    }
}
