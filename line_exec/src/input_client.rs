//! # Input Client
//!
//! The input client subscribes to the camera frame, sign detection and pose streams. A
//! background thread receives messages as they are published and latches the most recent
//! value of each stream, so the main loop always reads the latest data without waiting.
//!
//! Each message simply replaces the previously latched value, there is no queueing and no
//! ordering between the streams. A malformed message is logged and the previous value is kept.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{error, info, warn};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use comms_if::{
    eqpt::{cam::CamFrame, odom::Pose, signs::SignEvent},
    net::{zmq, MessageError, MonitoredSocket, MonitoredSocketError, NetParams, SocketOptions},
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Time the background thread waits for a message before checking whether it should stop.
const POLL_TIMEOUT_MS: i64 = 50;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The input client
pub struct InputClient {
    bg_jh: Option<JoinHandle<()>>,
    bg_run: Arc<AtomicBool>,
    latched: Arc<Mutex<LatchedInputs>>,
}

/// The most recent value received on each input stream.
#[derive(Debug, Default, Clone)]
pub struct LatchedInputs {
    /// Latest camera frame
    pub frame: Option<CamFrame>,

    /// Latest sign detections, all flags clear until the first detection
    pub signs: SignEvent,

    /// Latest pose
    pub pose: Option<Pose>,

    /// Status of each stream, indexed by [`InputStream::index`]
    pub status: [StreamStatus; 3],
}

/// Health of a single input stream.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StreamStatus {
    /// Number of valid messages received
    pub num_msgs: u64,

    /// True if the publisher is connected
    pub connected: bool,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// The input streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputStream {
    CamFrame,
    Signs,
    Pose,
}

impl InputStream {
    pub const ALL: [InputStream; 3] = [
        InputStream::CamFrame,
        InputStream::Signs,
        InputStream::Pose,
    ];

    /// Position of the stream in [`LatchedInputs::status`].
    pub fn index(self) -> usize {
        match self {
            InputStream::CamFrame => 0,
            InputStream::Signs => 1,
            InputStream::Pose => 2,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InputClientError {
    #[error("Socket error on the {0:?} stream: {1}")]
    SocketError(InputStream, MonitoredSocketError),

    #[error("Could not read a message from the {0:?} stream: {1}")]
    MessageError(InputStream, MessageError),

    #[error("Could not deserialize a message from the {0:?} stream: {1}")]
    DeserializeError(InputStream, serde_json::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl InputClient {
    /// Create a new instance of the input client and start its background thread.
    ///
    /// This function does not wait for the publishers to be available.
    pub fn new(ctx: &zmq::Context, params: &NetParams) -> Result<Self, InputClientError> {
        let mut sockets = Vec::with_capacity(InputStream::ALL.len());

        for stream in InputStream::ALL.iter() {
            let endpoint = match stream {
                InputStream::CamFrame => &params.cam_frame_endpoint,
                InputStream::Signs => &params.signs_endpoint,
                InputStream::Pose => &params.pose_endpoint,
            };

            let socket = MonitoredSocket::new(
                ctx,
                zmq::SUB,
                SocketOptions::latched_subscriber(),
                endpoint,
            )
            .map_err(|e| InputClientError::SocketError(*stream, e))?;

            sockets.push((*stream, socket));
        }

        let bg_run = Arc::new(AtomicBool::new(true));
        let latched = Arc::new(Mutex::new(LatchedInputs::default()));

        let bg_run_clone = bg_run.clone();
        let latched_clone = latched.clone();

        let bg_jh = Some(thread::spawn(move || {
            bg_thread(sockets, bg_run_clone, latched_clone)
        }));

        Ok(Self {
            bg_jh,
            bg_run,
            latched,
        })
    }

    /// Get the latest sign detections and pose.
    pub fn control_inputs(&self) -> (SignEvent, Option<Pose>) {
        let latched = lock(&self.latched);

        (latched.signs, latched.pose)
    }

    /// Get a copy of the latest camera frame.
    pub fn latest_frame(&self) -> Option<CamFrame> {
        lock(&self.latched).frame.clone()
    }

    /// Status of each stream, indexed by [`InputStream::index`].
    pub fn stream_status(&self) -> [StreamStatus; 3] {
        lock(&self.latched).status
    }
}

impl Drop for InputClient {
    fn drop(&mut self) {
        self.bg_run.store(false, Ordering::Relaxed);

        if let Some(jh) = self.bg_jh.take() {
            if jh.join().is_err() {
                error!("InputClient background thread panicked");
            }
        }
    }
}

impl LatchedInputs {
    /// Latch a message received on the given stream.
    ///
    /// On error the previously latched value is left unchanged.
    pub fn handle_message(
        &mut self,
        stream: InputStream,
        msg: &str,
    ) -> Result<(), InputClientError> {
        let de_err = |e| InputClientError::DeserializeError(stream, e);

        match stream {
            InputStream::CamFrame => {
                self.frame = Some(serde_json::from_str(msg).map_err(de_err)?)
            }
            InputStream::Signs => self.signs = serde_json::from_str(msg).map_err(de_err)?,
            InputStream::Pose => self.pose = Some(serde_json::from_str(msg).map_err(de_err)?),
        }

        self.status[stream.index()].num_msgs += 1;

        Ok(())
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Lock the latched inputs, ignoring poisoning. Every field is replaced in a single assignment.
fn lock(latched: &Mutex<LatchedInputs>) -> MutexGuard<LatchedInputs> {
    latched.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Time to wait before polling again after a poll error, `None` to retry immediately.
///
/// An interrupted poll is retried straight away, any other error is retried after one poll
/// timeout. The background thread only stops when the client is dropped.
fn poll_error_backoff(e: zmq::Error) -> Option<Duration> {
    match e {
        zmq::Error::EINTR => None,
        _ => Some(Duration::from_millis(POLL_TIMEOUT_MS as u64)),
    }
}

/// Background thread, latches each message as it arrives.
fn bg_thread(
    sockets: Vec<(InputStream, MonitoredSocket)>,
    run: Arc<AtomicBool>,
    latched: Arc<Mutex<LatchedInputs>>,
) {
    let mut connected = [false; 3];

    while run.load(Ordering::Relaxed) {
        for (stream, socket) in sockets.iter() {
            let now = socket.connected();
            if now != connected[stream.index()] {
                info!("{:?} stream connected: {}", stream, now);
                connected[stream.index()] = now;
                lock(&latched).status[stream.index()].connected = now;
            }
        }

        let ready: Vec<bool> = {
            let mut items: Vec<zmq::PollItem> = sockets
                .iter()
                .map(|(_, s)| s.as_poll_item(zmq::POLLIN))
                .collect();

            match zmq::poll(&mut items, POLL_TIMEOUT_MS) {
                Ok(0) => continue,
                Ok(_) => items.iter().map(|i| i.is_readable()).collect(),
                Err(e) => {
                    if let Some(backoff) = poll_error_backoff(e) {
                        error!("Error polling the input sockets: {}", e);
                        thread::sleep(backoff);
                    }
                    continue;
                }
            }
        };

        for ((stream, socket), _) in sockets.iter().zip(ready).filter(|(_, r)| *r) {
            // Drain the socket so only the most recent message is latched
            let mut last = None;
            loop {
                match socket.try_recv_string() {
                    Ok(Some(msg)) => last = Some(msg),
                    Ok(None) => break,
                    Err(e) => {
                        warn!("{}", InputClientError::MessageError(*stream, e));
                        break;
                    }
                }
            }

            if let Some(msg) = last {
                if let Err(e) = lock(&latched).handle_message(*stream, &msg) {
                    warn!("{}, keeping the previous value", e);
                }
            }
        }
    }
}
