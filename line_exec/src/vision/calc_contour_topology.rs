//! Contour topology line location

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use imageproc::contours::find_contours;

// Internal imports
use super::line_loc::normalise;
use super::*;

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl LineLoc {
    /// Locate the line from the highest point on any contour of the line pixels.
    ///
    /// Contours are visited in the order they are traced and their vertices in order, so
    /// ties on the smallest y go to the first contour, then the first vertex. Returns `None`
    /// if the mask holds no contours.
    pub(crate) fn calc_contour_topology(&self, mask: &BinaryMask) -> Option<f64> {
        let contours = find_contours::<i32>(mask);

        let mut top: Option<(i32, i32)> = None;

        for point in contours.iter().flat_map(|c| c.points.iter()) {
            match top {
                Some((_, y)) if point.y >= y => (),
                _ => top = Some((point.x, point.y)),
            }
        }

        let (x, _) = top?;

        Some(normalise(x as f64, mask.width()))
    }
}
