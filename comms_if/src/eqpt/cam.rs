//! # Camera Equipment Communications Module
//!
//! Frames are published by the camera equipment (outside this software) and by the line
//! executable's diagnostic stream.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::{serde::ts_milliseconds, DateTime, Utc};
use image::{DynamicImage, GrayImage, RgbImage, RgbaImage};
use serde::{Deserialize, Serialize};
use std::io::Cursor;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// An individual frame from a camera, as transmitted on the network.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CamFrame {
    /// UTC timestamp at which the frame was acquired
    #[serde(with = "ts_milliseconds")]
    pub timestamp: DateTime<Utc>,

    /// The format of this frame
    pub format: ImageFormat,

    /// Width of the frame in pixels
    pub width: u32,

    /// Height of the frame in pixels
    pub height: u32,

    /// Number of channels per pixel (1 = mono, 3 = RGB, 4 = RGBA)
    pub channels: u8,

    /// The formatted image data
    pub data: Vec<u8>,
}

/// A decoded camera image.
#[derive(Clone, Debug)]
pub struct CamImage {
    /// UTC timestamp at which the frame was acquired
    pub timestamp: DateTime<Utc>,

    /// The image itself
    pub image: DynamicImage,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Possible formats for camera images. This is used rather than image::ImageFormat to:
///     1. Restrict the formats that can be sent back and forth
///     2. Allow serialisation as image::ImageFormat does not implement serde.
#[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq)]
pub enum ImageFormat {
    /// Raw interleaved 8-bit pixels, row major, `width * height * channels` bytes.
    Raw,

    /// PNG image
    Png,

    /// JPEG image with a quality value between 1 and 100, where 100 is best.
    Jpeg(u8),
}

/// Errors converting between frames and images.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("Raw frame has {actual} bytes but {width}x{height}x{channels} needs {expected}")]
    RawSizeMismatch {
        width: u32,
        height: u32,
        channels: u8,
        expected: usize,
        actual: usize,
    },

    #[error("Unsupported channel count for a raw frame: {0}")]
    UnsupportedChannels(u8),

    #[error("Could not decode or encode the image: {0}")]
    ImageError(image::ImageError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl CamFrame {
    /// Convert this camera frame into a camera image
    pub fn to_cam_image(&self) -> Result<CamImage, FrameError> {
        let image = match self.format {
            ImageFormat::Raw => self.raw_to_image()?,
            ImageFormat::Png => {
                image::load_from_memory_with_format(&self.data, image::ImageFormat::Png)
                    .map_err(FrameError::ImageError)?
            }
            ImageFormat::Jpeg(_) => {
                image::load_from_memory_with_format(&self.data, image::ImageFormat::Jpeg)
                    .map_err(FrameError::ImageError)?
            }
        };

        Ok(CamImage {
            timestamp: self.timestamp,
            image,
        })
    }

    /// Build a dynamic image from raw pixel data.
    fn raw_to_image(&self) -> Result<DynamicImage, FrameError> {
        let expected = self.width as usize * self.height as usize * self.channels as usize;

        let size_err = || FrameError::RawSizeMismatch {
            width: self.width,
            height: self.height,
            channels: self.channels,
            expected,
            actual: self.data.len(),
        };

        if self.data.len() != expected {
            return Err(size_err());
        }

        let data = self.data.clone();

        match self.channels {
            1 => GrayImage::from_raw(self.width, self.height, data)
                .map(DynamicImage::ImageLuma8)
                .ok_or_else(size_err),
            3 => RgbImage::from_raw(self.width, self.height, data)
                .map(DynamicImage::ImageRgb8)
                .ok_or_else(size_err),
            4 => RgbaImage::from_raw(self.width, self.height, data)
                .map(DynamicImage::ImageRgba8)
                .ok_or_else(size_err),
            c => Err(FrameError::UnsupportedChannels(c)),
        }
    }
}

impl CamImage {
    /// Convert this camera image into a camera frame with the given format
    pub fn to_cam_frame(&self, format: ImageFormat) -> Result<CamFrame, FrameError> {
        let channels = self.image.color().channel_count();

        let data = match format {
            ImageFormat::Raw => self.image.as_bytes().to_vec(),
            ImageFormat::Png => {
                let mut data = Vec::<u8>::new();
                self.image
                    .write_to(&mut Cursor::new(&mut data), image::ImageOutputFormat::Png)
                    .map_err(FrameError::ImageError)?;
                data
            }
            ImageFormat::Jpeg(q) => {
                let mut data = Vec::<u8>::new();
                self.image
                    .write_to(
                        &mut Cursor::new(&mut data),
                        image::ImageOutputFormat::Jpeg(q),
                    )
                    .map_err(FrameError::ImageError)?;
                data
            }
        };

        Ok(CamFrame {
            timestamp: self.timestamp,
            format,
            width: self.image.width(),
            height: self.image.height(),
            channels,
            data,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn raw_frame(width: u32, height: u32, channels: u8, len: usize) -> CamFrame {
        CamFrame {
            timestamp: Utc::now(),
            format: ImageFormat::Raw,
            width,
            height,
            channels,
            data: vec![128; len],
        }
    }

    #[test]
    fn test_raw_decode() {
        let img = raw_frame(4, 2, 3, 24).to_cam_image().unwrap();
        assert_eq!(img.image.width(), 4);
        assert_eq!(img.image.height(), 2);
        assert!(matches!(img.image, DynamicImage::ImageRgb8(_)));
    }

    #[test]
    fn test_raw_decode_errors() {
        assert!(matches!(
            raw_frame(4, 2, 3, 23).to_cam_image(),
            Err(FrameError::RawSizeMismatch { expected: 24, actual: 23, .. })
        ));
        assert!(matches!(
            raw_frame(4, 2, 2, 16).to_cam_image(),
            Err(FrameError::UnsupportedChannels(2))
        ));
    }

    #[test]
    fn test_png_decode_garbage() {
        let frame = CamFrame {
            format: ImageFormat::Png,
            ..raw_frame(4, 2, 3, 24)
        };
        assert!(matches!(frame.to_cam_image(), Err(FrameError::ImageError(_))));
    }

    #[test]
    fn test_png_frame_keeps_mono_mask() {
        let mask = GrayImage::from_fn(6, 3, |x, _| image::Luma([if x < 3 { 0 } else { 255 }]));
        let cam_image = CamImage {
            timestamp: Utc::now(),
            image: DynamicImage::ImageLuma8(mask.clone()),
        };

        let frame = cam_image.to_cam_frame(ImageFormat::Png).unwrap();
        assert_eq!(frame.channels, 1);

        let back = frame.to_cam_image().unwrap();
        assert_eq!(back.image.to_luma8(), mask);
    }
}
