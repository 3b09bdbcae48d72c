//! Parameters structure for LineVision

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the vision pipeline, one table per stage.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Params {
    /// Image preprocessing parameters
    pub img_proc: ImgProcParams,

    /// Line location parameters
    pub line_loc: LineLocParams,
}

/// Parameters for the image preprocessor.
#[derive(Debug, Clone, Deserialize)]
pub struct ImgProcParams {
    // ---- GEOMETRY ----

    /// Integer divisor applied to both dimensions of the raw frame.
    pub resize_divisor: u32,

    /// Top edge of the region of interest as a fraction of the resized height.
    pub roi_top: Fraction,

    /// Bottom edge (exclusive) of the region of interest as a fraction of the resized height.
    pub roi_bottom: Fraction,

    /// Left edge of the region of interest as a fraction of the resized width.
    pub roi_left: Fraction,

    /// Right edge (exclusive) of the region of interest as a fraction of the resized width.
    pub roi_right: Fraction,

    // ---- FILTERING ----

    /// Radius of the median filter, a radius of `r` gives a `2r + 1` square kernel.
    ///
    /// Units: pixels
    pub median_radius: u32,

    /// Binarisation method
    pub threshold: ThresholdMode,

    /// Whether the line is darker or lighter than the floor in the raw frame.
    pub line_polarity: LinePolarity,
}

/// Parameters for the line locator.
#[derive(Debug, Clone, Deserialize)]
pub struct LineLocParams {
    /// The algorithm used to extract the error from the mask.
    pub strategy: LocStrategy,

    /// Offset of the scanned row from the bottom edge of the mask, used by `RowScan`.
    ///
    /// Units: pixels
    pub scan_row_offset_px: u32,

    // ---- MORPHOLOGY ----

    /// Radius of the square dilation element, side `2r + 1`.
    pub dilate_radius: u8,

    /// Number of dilations to apply, 0 disables dilation.
    pub dilate_iterations: u32,

    /// Radius of the square erosion element, side `2r + 1`.
    pub erode_radius: u8,

    /// Number of erosions to apply, 0 disables erosion.
    pub erode_iterations: u32,
}

/// A fraction `numerator / denominator`, written `[num, den]` in parameter files.
///
/// Applied with integer arithmetic so that crop bounds truncate the same way on every
/// platform.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Fraction(pub u32, pub u32);

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Binarisation methods.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum ThresholdMode {
    /// Pixels brighter than `level` are bright, all others dark.
    ///
    /// Intensity uses the Rec.601 weights (0.299 R + 0.587 G + 0.114 B), not the Rec.709
    /// weights of `image`'s own grayscale conversion. Levels carried over from other tools must
    /// be on the same scale.
    Fixed { level: u8 },

    /// The level is chosen from the image histogram using Otsu's method.
    Otsu,
}

/// Brightness of the line relative to the floor.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub enum LinePolarity {
    /// Dark line on a light floor
    Dark,

    /// Light line on a dark floor
    Light,
}

/// Algorithms available to extract the error from a mask.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub enum LocStrategy {
    /// Centre of the line run on a single row near the bottom of the mask.
    RowScan,

    /// Horizontal position of the highest contour vertex in the mask.
    ContourTopology,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for ImgProcParams {
    /// The fixed threshold pipeline for a dark line, with the camera looking at the floor
    /// ahead of the robot.
    fn default() -> Self {
        Self {
            resize_divisor: 3,
            roi_top: Fraction(2, 3),
            roi_bottom: Fraction(1, 1),
            roi_left: Fraction(1, 3),
            roi_right: Fraction(2, 3),
            median_radius: 2,
            threshold: ThresholdMode::Fixed { level: 85 },
            line_polarity: LinePolarity::Dark,
        }
    }
}

impl Default for LineLocParams {
    fn default() -> Self {
        Self {
            strategy: LocStrategy::RowScan,
            scan_row_offset_px: 10,
            dilate_radius: 1,
            dilate_iterations: 3,
            erode_radius: 5,
            erode_iterations: 1,
        }
    }
}

impl Fraction {
    /// Apply the fraction to a length, truncating towards zero.
    pub fn of(&self, length: u32) -> u32 {
        if self.1 == 0 {
            return 0;
        }

        ((length as u64 * self.0 as u64) / self.1 as u64) as u32
    }
}
