//! Line location, from a [`BinaryMask`] to a normalised lateral error.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use imageproc::{distance_transform::Norm, morphology};
use log::trace;

// Internal
use super::{BinaryMask, LineLocParams, LocStrategy};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Line locator.
///
/// Holds the most recent error so that frames in which the line cannot be found leave the
/// error unchanged.
#[derive(Debug, Clone)]
pub struct LineLoc {
    pub(crate) params: LineLocParams,

    pub(crate) prev_error: Option<f64>,

    pub(crate) line_found: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl LineLoc {
    pub fn new(params: LineLocParams) -> Self {
        Self {
            params,
            prev_error: None,
            line_found: false,
        }
    }

    /// The most recent error, `None` if the line has never been found.
    pub fn error(&self) -> Option<f64> {
        self.prev_error
    }

    /// True if the line was found by the last call to [`LineLoc::locate`].
    pub fn line_found(&self) -> bool {
        self.line_found
    }

    /// Close the mask and locate the line in it.
    ///
    /// The closed mask is returned alongside the error so it can be published for
    /// diagnostics.
    pub fn locate(&mut self, mask: &BinaryMask) -> (Option<f64>, BinaryMask) {
        let closed = self.close(mask);

        let error = match self.params.strategy {
            LocStrategy::RowScan => self.calc_row_scan(&closed),
            LocStrategy::ContourTopology => self.calc_contour_topology(&closed),
        };

        self.line_found = error.is_some();

        match error {
            Some(e) => {
                let e = util::maths::clamp(e, -1.0, 1.0);
                trace!("LineLoc: line found, error {:.4}", e);
                self.prev_error = Some(e);
            }
            None => trace!("LineLoc: line not found, keeping {:?}", self.prev_error),
        }

        (self.prev_error, closed)
    }

    /// Dilate then erode the line pixels of the mask.
    pub fn close(&self, mask: &BinaryMask) -> BinaryMask {
        let mut closed = mask.clone();

        for _ in 0..self.params.dilate_iterations {
            closed = morphology::dilate(&closed, Norm::LInf, self.params.dilate_radius);
        }

        for _ in 0..self.params.erode_iterations {
            closed = morphology::erode(&closed, Norm::LInf, self.params.erode_radius);
        }

        closed
    }
}

/// Convert a horizontal pixel position in a mask of the given width to a normalised error.
///
/// The centre is the integer middle column, the scale is half the real width.
pub(crate) fn normalise(x: f64, width: u32) -> f64 {
    let centre = (width / 2) as f64;
    let half_width = width as f64 / 2.0;

    (x - centre) / half_width
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::vision::{BACKGROUND_PIXEL, LINE_PIXEL};
    use image::Luma;

    fn params(strategy: LocStrategy) -> LineLocParams {
        LineLocParams {
            strategy,
            scan_row_offset_px: 2,
            dilate_radius: 1,
            dilate_iterations: 0,
            erode_radius: 1,
            erode_iterations: 0,
        }
    }

    #[test]
    fn test_normalise() {
        assert_eq!(normalise(50.0, 100), 0.0);
        assert_eq!(normalise(100.0, 100), 1.0);
        assert_eq!(normalise(0.0, 100), -1.0);

        // Odd widths keep the integer centre
        assert!((normalise(35.0, 71)).abs() < 1e-12);
    }

    #[test]
    fn test_close_fills_gap() {
        // Two line blocks separated by a one pixel gap
        let mask = BinaryMask::from_fn(9, 9, |x, _| {
            if x == 4 {
                Luma([BACKGROUND_PIXEL])
            } else if (2..7).contains(&x) {
                Luma([LINE_PIXEL])
            } else {
                Luma([BACKGROUND_PIXEL])
            }
        });

        let mut p = params(LocStrategy::RowScan);
        p.dilate_iterations = 1;
        p.erode_iterations = 1;

        let closed = LineLoc::new(p).close(&mask);

        assert_eq!(closed.get_pixel(4, 4)[0], LINE_PIXEL);
        assert_eq!(closed.get_pixel(0, 4)[0], BACKGROUND_PIXEL);
        assert_eq!(closed.get_pixel(8, 4)[0], BACKGROUND_PIXEL);
    }

    #[test]
    fn test_zero_iterations_is_identity() {
        let mask = BinaryMask::from_fn(5, 5, |x, y| {
            Luma([if (x + y) % 2 == 0 { LINE_PIXEL } else { BACKGROUND_PIXEL }])
        });

        assert_eq!(LineLoc::new(params(LocStrategy::RowScan)).close(&mask), mask);
    }

    #[test]
    fn test_error_in_range() {
        let mut loc = LineLoc::new(params(LocStrategy::RowScan));

        // Line only in the last column of a width 4 mask: run of 1 starting at x = 3,
        // centroid 3.5, error (3.5 - 2) / 2 = 0.75, within range
        let mask = BinaryMask::from_fn(4, 4, |x, _| {
            Luma([if x == 3 { LINE_PIXEL } else { BACKGROUND_PIXEL }])
        });
        let (e, _) = loc.locate(&mask);
        assert_eq!(e, Some(0.75));

        // Width 1: centre 0, half width 0.5, run of 1 at x = 0 gives 0.5 / 0.5 = 1.0
        let mask = BinaryMask::from_pixel(1, 4, Luma([LINE_PIXEL]));
        let (e, _) = loc.locate(&mask);
        assert_eq!(e, Some(1.0));

        // Lines running from any column to the right edge stay in range
        for width in 1..12 {
            for col in 0..width {
                let mask = BinaryMask::from_fn(width, 4, |x, _| {
                    Luma([if x >= col { LINE_PIXEL } else { BACKGROUND_PIXEL }])
                });
                let (e, _) = loc.locate(&mask);
                let e = e.unwrap();
                assert!((-1.0..=1.0).contains(&e), "width {} col {}: {}", width, col, e);
            }
        }
    }
}
