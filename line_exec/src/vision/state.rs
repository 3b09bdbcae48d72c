//! Implementations for the LineVision state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::debug;
use serde::Serialize;

// Internal
use super::{BinaryMask, ImgProc, LineLoc, Params, VisionError, LINE_PIXEL};
use comms_if::eqpt::cam::CamFrame;
use util::{module::State, params, session::Session};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Line vision module state
pub struct LineVision {
    img_proc: ImgProc,

    line_loc: LineLoc,

    report: StatusReport,
}

/// Input data to LineVision.
#[derive(Default)]
pub struct InputData {
    /// The latest camera frame, or `None` if no frame has been received yet.
    pub frame: Option<CamFrame>,
}

/// Output of LineVision processing.
#[derive(Clone, Debug)]
pub struct OutputData {
    /// The most recent normalised error, `None` until the line has been found once.
    pub error: Option<f64>,

    /// The closed mask the error was extracted from.
    pub mask: BinaryMask,
}

/// Status report for LineVision processing.
#[derive(Clone, Copy, Default, Serialize, Debug)]
pub struct StatusReport {
    /// True if the line was found in this frame, false if the error is the previous one.
    pub line_found: bool,

    /// Number of line pixels in the closed mask.
    pub num_line_pixels: usize,

    /// Width of the mask in pixels
    pub mask_width: u32,

    /// Height of the mask in pixels
    pub mask_height: u32,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl LineVision {
    /// Create a new instance directly from parameters.
    pub fn from_params(params: Params) -> Self {
        Self {
            img_proc: ImgProc::new(params.img_proc),
            line_loc: LineLoc::new(params.line_loc),
            report: StatusReport::default(),
        }
    }

    /// The most recent normalised error.
    pub fn error(&self) -> Option<f64> {
        self.line_loc.error()
    }
}

impl Default for LineVision {
    fn default() -> Self {
        Self::from_params(Params::default())
    }
}

impl State for LineVision {
    type InitData = String;
    type InitError = params::LoadError;

    type InputData = InputData;
    type OutputData = OutputData;
    type StatusReport = StatusReport;
    type ProcError = VisionError;

    /// Initialise the LineVision module.
    ///
    /// Expected init data is the name of the parameter file, which is chosen in the
    /// executable's parameters.
    fn init(
        &mut self,
        init_data: Self::InitData,
        _session: &Session,
    ) -> Result<(), Self::InitError> {
        let params: Params = params::load(&init_data)?;

        *self = Self::from_params(params);

        Ok(())
    }

    /// Process the latest camera frame.
    ///
    /// On error the previous error is left unchanged and can still be read with
    /// [`LineVision::error`].
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        self.report = StatusReport::default();

        let frame = input_data.frame.as_ref().ok_or(VisionError::NoFrame)?;

        let cam_image = frame
            .to_cam_image()
            .map_err(VisionError::FrameDecodeError)?;

        let mask = self.img_proc.process(&cam_image.image)?;

        let (error, closed) = self.line_loc.locate(&mask);

        self.report.line_found = self.line_loc.line_found();
        self.report.num_line_pixels = closed.pixels().filter(|p| p[0] == LINE_PIXEL).count();
        self.report.mask_width = closed.width();
        self.report.mask_height = closed.height();

        debug!(
            "LineVision: error {:?}, {} line pixels",
            error, self.report.num_line_pixels
        );

        Ok((
            OutputData {
                error,
                mask: closed,
            },
            self.report,
        ))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::vision::LocStrategy;
    use chrono::Utc;
    use comms_if::eqpt::cam::ImageFormat;

    /// A raw 640x480 RGB frame of a light floor with a dark stripe over columns `[x0, x1)`.
    fn stripe_frame(x0: u32, x1: u32) -> CamFrame {
        let (width, height) = (640u32, 480u32);
        let mut data = Vec::with_capacity((width * height * 3) as usize);

        for _ in 0..height {
            for x in 0..width {
                let v = if x >= x0 && x < x1 { 20 } else { 220 };
                data.extend_from_slice(&[v, v, v]);
            }
        }

        CamFrame {
            timestamp: Utc::now(),
            format: ImageFormat::Raw,
            width,
            height,
            channels: 3,
            data,
        }
    }

    #[test]
    fn test_no_frame() {
        let mut vision = LineVision::default();

        assert!(matches!(
            vision.proc(&InputData::default()),
            Err(VisionError::NoFrame)
        ));
        assert_eq!(vision.error(), None);
    }

    #[test]
    fn test_pipeline_centred_line() {
        let mut vision = LineVision::default();

        let (out, report) = vision
            .proc(&InputData {
                frame: Some(stripe_frame(300, 340)),
            })
            .unwrap();

        assert!(report.line_found);
        assert_eq!((report.mask_width, report.mask_height), (71, 54));
        assert_eq!(out.mask.dimensions(), (71, 54));

        // The stripe is on the frame centre
        let e = out.error.unwrap();
        assert!(e.abs() < 0.2, "error {}", e);
    }

    #[test]
    fn test_pipeline_line_to_right() {
        let mut vision = LineVision::default();

        let (out, _) = vision
            .proc(&InputData {
                frame: Some(stripe_frame(380, 400)),
            })
            .unwrap();

        assert!(out.error.unwrap() > 0.2);
    }

    #[test]
    fn test_bad_frame_keeps_error() {
        let mut vision = LineVision::default();

        let (out, _) = vision
            .proc(&InputData {
                frame: Some(stripe_frame(300, 340)),
            })
            .unwrap();
        let good = out.error;
        assert!(good.is_some());

        let mut bad = stripe_frame(300, 340);
        bad.data.truncate(100);
        assert!(matches!(
            vision.proc(&InputData { frame: Some(bad) }),
            Err(VisionError::FrameDecodeError(_))
        ));
        assert_eq!(vision.error(), good);

        // A frame without any line also keeps the previous error
        let (out, report) = vision
            .proc(&InputData {
                frame: Some(stripe_frame(0, 0)),
            })
            .unwrap();
        assert!(!report.line_found);
        assert_eq!(out.error, good);
    }

    #[test]
    fn test_contour_pipeline() {
        let mut params = Params::default();
        params.line_loc.strategy = LocStrategy::ContourTopology;
        let mut vision = LineVision::from_params(params);

        let (out, report) = vision
            .proc(&InputData {
                frame: Some(stripe_frame(380, 400)),
            })
            .unwrap();

        assert!(report.line_found);
        assert!(out.error.unwrap() > 0.2);
    }
}
