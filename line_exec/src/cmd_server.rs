//! # Command Server
//!
//! Publishes the velocity command every control cycle, and optionally the processed line mask
//! as a diagnostic image.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::Utc;
use image::DynamicImage;

use comms_if::{
    eqpt::{
        cam::{CamImage, FrameError, ImageFormat},
        drive::VelocityCmd,
    },
    net::{zmq, MessageError, MonitoredSocket, MonitoredSocketError, NetParams, SocketOptions},
};

use crate::vision::BinaryMask;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The command server
pub struct CmdServer {
    cmd_socket: MonitoredSocket,

    diag_socket: Option<MonitoredSocket>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum CmdServerError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("Could not send the velocity command: {0}")]
    CmdSendError(MessageError),

    #[error("Could not send the diagnostic image: {0}")]
    DiagSendError(MessageError),

    #[error("Could not encode the diagnostic image: {0}")]
    DiagEncodeError(FrameError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl CmdServer {
    /// Create a new instance of the command server.
    ///
    /// The diagnostic stream is only bound if `publish_diagnostics` is set. This function will
    /// not block until a subscriber connects.
    pub fn new(
        ctx: &zmq::Context,
        params: &NetParams,
        publish_diagnostics: bool,
    ) -> Result<Self, CmdServerError> {
        let cmd_socket = MonitoredSocket::new(
            ctx,
            zmq::PUB,
            SocketOptions::publisher(),
            &params.velocity_cmd_endpoint,
        )
        .map_err(CmdServerError::SocketError)?;

        let diag_socket = match publish_diagnostics {
            true => Some(
                MonitoredSocket::new(
                    ctx,
                    zmq::PUB,
                    SocketOptions::publisher(),
                    &params.diag_image_endpoint,
                )
                .map_err(CmdServerError::SocketError)?,
            ),
            false => None,
        };

        Ok(Self {
            cmd_socket,
            diag_socket,
        })
    }

    /// Publish a velocity command.
    pub fn send_cmd(&self, cmd: &VelocityCmd) -> Result<(), CmdServerError> {
        self.cmd_socket
            .send_json(cmd)
            .map_err(CmdServerError::CmdSendError)
    }

    /// Publish the mask as a PNG frame on the diagnostic stream, if it is enabled.
    pub fn send_diag(&self, mask: &BinaryMask) -> Result<(), CmdServerError> {
        let socket = match self.diag_socket {
            Some(ref s) => s,
            None => return Ok(()),
        };

        let frame = diag_frame(mask)?;

        socket
            .send_json(&frame)
            .map_err(CmdServerError::DiagSendError)
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Encode a mask as a PNG camera frame stamped with the current time.
fn diag_frame(mask: &BinaryMask) -> Result<comms_if::eqpt::cam::CamFrame, CmdServerError> {
    CamImage {
        timestamp: Utc::now(),
        image: DynamicImage::ImageLuma8(mask.clone()),
    }
    .to_cam_frame(ImageFormat::Png)
    .map_err(CmdServerError::DiagEncodeError)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::vision::{BACKGROUND_PIXEL, LINE_PIXEL};
    use image::Luma;

    #[test]
    fn test_diag_frame() {
        let mask = BinaryMask::from_fn(8, 4, |x, _| {
            Luma([if x < 4 { LINE_PIXEL } else { BACKGROUND_PIXEL }])
        });

        let frame = diag_frame(&mask).unwrap();
        assert_eq!(frame.format, ImageFormat::Png);
        assert_eq!((frame.width, frame.height, frame.channels), (8, 4, 1));

        let decoded = frame.to_cam_image().unwrap();
        assert_eq!(decoded.image.to_luma8(), mask);
    }
}
