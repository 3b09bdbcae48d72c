//! Row scan line location

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal imports
use super::line_loc::normalise;
use super::*;

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl LineLoc {
    /// Locate the line on a single row near the bottom of the mask.
    ///
    /// The centroid is taken as the middle of the run of line pixels which starts at the
    /// leftmost line pixel on the row. Returns `None` if the row does not exist or contains
    /// no line pixels.
    pub(crate) fn calc_row_scan(&self, mask: &BinaryMask) -> Option<f64> {
        let offset = self.params.scan_row_offset_px;

        if offset == 0 || offset > mask.height() {
            return None;
        }
        let y = mask.height() - offset;

        let row: Vec<bool> = (0..mask.width())
            .map(|x| mask.get_pixel(x, y)[0] == LINE_PIXEL)
            .collect();

        let first = row.iter().position(|&p| p)?;
        let run = row[first..].iter().take_while(|&&p| p).count();

        let centroid = first as f64 + run as f64 / 2.0;

        Some(normalise(centroid, mask.width()))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use image::Luma;

    fn row_scan_loc(offset: u32) -> LineLoc {
        LineLoc::new(LineLocParams {
            strategy: LocStrategy::RowScan,
            scan_row_offset_px: offset,
            dilate_radius: 1,
            dilate_iterations: 0,
            erode_radius: 1,
            erode_iterations: 0,
        })
    }

    /// A mask with line pixels on columns `[x0, x1)` of every row.
    fn band(width: u32, height: u32, x0: u32, x1: u32) -> BinaryMask {
        BinaryMask::from_fn(width, height, |x, _| {
            Luma([if x >= x0 && x < x1 {
                LINE_PIXEL
            } else {
                BACKGROUND_PIXEL
            }])
        })
    }

    #[test]
    fn test_row_scan_formula() {
        let loc = row_scan_loc(10);

        // width 100, first line pixel at 60, run of 10: (60 + 5 - 50) / 50 = 0.3
        let e = loc.calc_row_scan(&band(100, 54, 60, 70)).unwrap();
        assert!((e - 0.3).abs() < 1e-12);

        // Line to the left gives a negative error
        let e = loc.calc_row_scan(&band(100, 54, 20, 30)).unwrap();
        assert!((e + 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_row_scan_uses_first_run() {
        let loc = row_scan_loc(1);

        // Two runs on the row, only the left one counts
        let mask = BinaryMask::from_fn(100, 4, |x, _| {
            Luma([if (10..20).contains(&x) || (80..90).contains(&x) {
                LINE_PIXEL
            } else {
                BACKGROUND_PIXEL
            }])
        });

        let e = loc.calc_row_scan(&mask).unwrap();
        assert!((e - (15.0 - 50.0) / 50.0).abs() < 1e-12);
    }

    #[test]
    fn test_row_scan_uses_offset_row() {
        let loc = row_scan_loc(3);

        // Only row 7 (= 10 - 3) carries the line
        let mask = BinaryMask::from_fn(10, 10, |x, y| {
            Luma([if y == 7 && x >= 6 {
                LINE_PIXEL
            } else {
                BACKGROUND_PIXEL
            }])
        });

        let e = loc.calc_row_scan(&mask).unwrap();
        assert!((e - (8.0 - 5.0) / 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_row_scan_no_signal() {
        let mut loc = row_scan_loc(10);

        assert_eq!(loc.calc_row_scan(&band(100, 54, 0, 0)), None);

        // Mask shorter than the offset
        assert_eq!(loc.calc_row_scan(&band(100, 5, 40, 60)), None);

        // Through `locate` the previous value is kept
        let (e, _) = loc.locate(&band(100, 54, 60, 70));
        assert!((e.unwrap() - 0.3).abs() < 1e-12);
        let (e, _) = loc.locate(&band(100, 54, 0, 0));
        assert!((e.unwrap() - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_row_scan_before_first_line() {
        let mut loc = row_scan_loc(10);

        let (e, _) = loc.locate(&band(100, 54, 0, 0));
        assert_eq!(e, None);
        assert_eq!(loc.error(), None);
    }
}
