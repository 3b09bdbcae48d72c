//! # Line vision module
//!
//! Turns camera frames into a normalised lateral error between the robot and the line it is
//! following. Processing happens in two stages:
//!
//! 1. [`ImgProc`] resizes, crops, denoises and binarises the frame into a [`BinaryMask`].
//! 2. [`LineLoc`] closes gaps in the mask and extracts the error using one of the
//!    [`LocStrategy`] algorithms.
//!
//! The error is positive when the line is to the right of the image centre and is always
//! within `[-1, 1]`.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod calc_contour_topology;
mod calc_row_scan;
mod img_proc;
mod line_loc;
mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use img_proc::*;
pub use line_loc::*;
pub use params::*;
pub use state::*;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Value of a line pixel in a [`BinaryMask`].
pub const LINE_PIXEL: u8 = 255;

/// Value of a background pixel in a [`BinaryMask`].
pub const BACKGROUND_PIXEL: u8 = 0;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A single channel image in which every pixel is either [`LINE_PIXEL`] or
/// [`BACKGROUND_PIXEL`].
pub type BinaryMask = image::GrayImage;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during LineVision operation.
#[derive(Debug, thiserror::Error)]
pub enum VisionError {
    #[error("No camera frame has been received yet")]
    NoFrame,

    #[error("Could not decode the camera frame: {0}")]
    FrameDecodeError(comms_if::eqpt::cam::FrameError),

    #[error("Resize divisor must be non-zero")]
    ZeroResizeDivisor,

    #[error("A {width}x{height} frame is too small to be resized by a divisor of {divisor}")]
    FrameTooSmall { width: u32, height: u32, divisor: u32 },

    #[error("The region of interest is empty: columns [{left}, {right}), rows [{top}, {bottom})")]
    EmptyRoi {
        left: u32,
        right: u32,
        top: u32,
        bottom: u32,
    },
}
