//! Image preprocessing, from a raw camera image to a [`BinaryMask`].

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use image::{imageops, imageops::FilterType, DynamicImage, GrayImage, Luma, RgbImage};
use imageproc::{contrast, filter, map::map_colors};
use log::trace;

// Internal
use super::{BinaryMask, ImgProcParams, LinePolarity, ThresholdMode, VisionError};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Image preprocessor.
#[derive(Debug, Clone)]
pub struct ImgProc {
    params: ImgProcParams,
}

/// Pixel bounds of a region of interest, end bounds exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Roi {
    pub left: u32,
    pub right: u32,
    pub top: u32,
    pub bottom: u32,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ImgProc {
    pub fn new(params: ImgProcParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &ImgProcParams {
        &self.params
    }

    /// Run the full preprocessing chain on the given image.
    pub fn process(&self, image: &DynamicImage) -> Result<BinaryMask, VisionError> {
        let resized = self.resize(&image.to_rgb8())?;

        let roi = self.roi(resized.width(), resized.height())?;
        let cropped = imageops::crop_imm(
            &resized,
            roi.left,
            roi.top,
            roi.right - roi.left,
            roi.bottom - roi.top,
        )
        .to_image();

        let denoised = match self.params.median_radius {
            0 => cropped,
            r => filter::median_filter(&cropped, r, r),
        };

        let gray = luma_rec601(&denoised);

        let mask = self.binarise(&gray);

        trace!(
            "ImgProc: {}x{} -> {}x{} mask",
            image.width(),
            image.height(),
            mask.width(),
            mask.height()
        );

        Ok(mask)
    }

    /// Compute the region of interest for an image of the given (resized) dimensions.
    pub fn roi(&self, width: u32, height: u32) -> Result<Roi, VisionError> {
        let p = &self.params;

        let roi = Roi {
            left: p.roi_left.of(width),
            right: p.roi_right.of(width).min(width),
            top: p.roi_top.of(height),
            bottom: p.roi_bottom.of(height).min(height),
        };

        if roi.right <= roi.left || roi.bottom <= roi.top {
            return Err(VisionError::EmptyRoi {
                left: roi.left,
                right: roi.right,
                top: roi.top,
                bottom: roi.bottom,
            });
        }

        Ok(roi)
    }

    /// Downscale the image by the integer resize divisor.
    fn resize(&self, image: &RgbImage) -> Result<RgbImage, VisionError> {
        let divisor = self.params.resize_divisor;

        if divisor == 0 {
            return Err(VisionError::ZeroResizeDivisor);
        }
        if divisor == 1 {
            return Ok(image.clone());
        }

        let width = image.width() / divisor;
        let height = image.height() / divisor;

        if width == 0 || height == 0 {
            return Err(VisionError::FrameTooSmall {
                width: image.width(),
                height: image.height(),
                divisor,
            });
        }

        Ok(imageops::resize(image, width, height, FilterType::Triangle))
    }

    /// Threshold the intensity image and normalise the result so that line pixels are set.
    fn binarise(&self, gray: &GrayImage) -> BinaryMask {
        let level = match self.params.threshold {
            ThresholdMode::Fixed { level } => level,
            ThresholdMode::Otsu => contrast::otsu_level(gray),
        };

        let mut mask = contrast::threshold(gray, level);

        if self.params.line_polarity == LinePolarity::Dark {
            imageops::invert(&mut mask);
        }

        mask
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Intensity using the Rec.601 luma weights, which fixed threshold levels are tuned against.
pub(crate) fn luma_rec601(rgb: &RgbImage) -> GrayImage {
    map_colors(rgb, |p| {
        let [r, g, b] = p.0;
        let l = 0.299 * f32::from(r) + 0.587 * f32::from(g) + 0.114 * f32::from(b);

        Luma([l.round() as u8])
    })
}
