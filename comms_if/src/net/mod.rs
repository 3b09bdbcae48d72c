//! # Network Module
//!
//! Networking abstractions over ZMQ. Every stream in the line follower is a PUB/SUB pair
//! carrying one JSON encoded message type, so a subscriber only ever needs the latest message
//! and a slow subscriber simply drops stale ones.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::{
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
    thread,
};
use zmq::{Context, Socket, SocketEvent, SocketType};

// Export zmq
pub use zmq;

// ------------------------------------------------------------------------------------------------
// MACROS
// ------------------------------------------------------------------------------------------------

macro_rules! set_sockopts {
    ($socket:expr, $(($opt:ident, $val:expr)),+) => {
        $(
            $socket.$opt($val)
                .map_err(|e| MonitoredSocketError::SocketOptionError(stringify!($opt).into(), e))?;
        )+
    };
}

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Receive timeout of the monitor socket, bounds how long dropping a socket waits for its
/// monitor thread.
const MONITOR_POLL_MS: i32 = 100;

// ------------------------------------------------------------------------------------------------
// STATICS
// ------------------------------------------------------------------------------------------------

/// Number of monitors created, gives each monitor a unique inproc endpoint.
static NUM_MONITORS: AtomicUsize = AtomicUsize::new(0);

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Network endpoints used by the line follower.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetParams {
    /// Camera frame stream (SUB, connects to the camera publisher)
    pub cam_frame_endpoint: String,

    /// Sign detection stream (SUB, connects to the sign detector publisher)
    pub signs_endpoint: String,

    /// Odometry pose stream (SUB, connects to the odometry publisher)
    pub pose_endpoint: String,

    /// Velocity command stream (PUB, bound by the line executable)
    pub velocity_cmd_endpoint: String,

    /// Diagnostic image stream (PUB, bound by the line executable)
    pub diag_image_endpoint: String,
}

/// A zmq socket with a background monitor tracking whether a peer is connected.
///
/// Derefs to the underlying [`zmq::Socket`] so it can be used with `zmq::poll` and the raw
/// send/recv functions.
pub struct MonitoredSocket {
    socket: Socket,

    monitor_handle: Option<thread::JoinHandle<()>>,

    shutdown: Arc<AtomicBool>,

    connected: Arc<AtomicBool>,
}

/// Options applied to a [`MonitoredSocket`].
///
/// The `i32` options correspond to the options of the same name in the
/// [`zmq_setsockopt`](http://api.zeromq.org/4-2:zmq-setsockopt) documentation, in
/// milliseconds.
pub struct SocketOptions {
    /// Bind to the endpoint rather than connect. Publishers bind, subscribers connect.
    pub bind: bool,

    /// Block in `MonitoredSocket::new()` until the first connection is made.
    pub block_on_first_connect: bool,

    /// `ZMQ_CONFLATE`, only set on subscribers
    pub conflate: bool,

    /// `ZMQ_LINGER`
    pub linger: i32,

    /// `ZMQ_RECONNECT_IVL`
    pub reconnect_ivl: i32,

    /// `ZMQ_RCVTIMEO`
    pub recv_timeout: i32,

    /// `ZMQ_SNDTIMEO`
    pub send_timeout: i32,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
pub enum MonitoredSocketError {
    #[error("Error creating the socket: {0}")]
    CreateSocketError(zmq::Error),

    #[error("Error enabling monitoring for the socket: {0}")]
    MonitoringEnableError(zmq::Error),

    #[error("Could not connect the socket to {0}: {1:?}")]
    CouldNotConnect(String, Option<zmq::Error>),

    #[error("Could not read event from monitor socket: {0}")]
    EventReadError(zmq::Error),

    #[error("Could not set the {0} socket option: {1}")]
    SocketOptionError(String, zmq::Error),
}

/// Errors sending or receiving JSON messages.
#[derive(thiserror::Error, Debug)]
pub enum MessageError {
    #[error("Could not send the message: {0}")]
    SendError(zmq::Error),

    #[error("Could not receive a message: {0}")]
    RecvError(zmq::Error),

    #[error("Received a message which is not valid UTF-8")]
    NonUtf8,

    #[error("Could not serialize the message: {0}")]
    SerializationError(serde_json::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl MonitoredSocket {
    /// Create a socket of `socket_type`, bound or connected to `endpoint`.
    ///
    /// Subscribers are subscribed to every message on the stream.
    pub fn new(
        ctx: &Context,
        socket_type: SocketType,
        socket_options: SocketOptions,
        endpoint: &str,
    ) -> Result<Self, MonitoredSocketError> {
        let socket = ctx
            .socket(socket_type)
            .map_err(MonitoredSocketError::CreateSocketError)?;

        let monitor_endpoint = format!(
            "inproc://monitor_{}",
            NUM_MONITORS.fetch_add(1, Ordering::Relaxed)
        );

        socket
            .monitor(&monitor_endpoint, SocketEvent::ALL as i32)
            .map_err(MonitoredSocketError::MonitoringEnableError)?;
        let monitor = ctx
            .socket(zmq::PAIR)
            .map_err(MonitoredSocketError::CreateSocketError)?;
        monitor
            .connect(&monitor_endpoint)
            .map_err(|e| {
                MonitoredSocketError::CouldNotConnect(monitor_endpoint.clone(), Some(e))
            })?;
        set_sockopts!(monitor, (set_rcvtimeo, MONITOR_POLL_MS));

        socket_options.set(&socket, socket_type)?;

        match socket_options.bind {
            false => socket.connect(endpoint),
            true => socket.bind(endpoint),
        }
        .map_err(|e| MonitoredSocketError::CouldNotConnect(endpoint.into(), Some(e)))?;

        if socket_type == zmq::SUB {
            set_sockopts!(socket, (set_subscribe, b""));
        }

        let connected = Arc::new(AtomicBool::new(false));

        if socket_options.block_on_first_connect {
            loop {
                match read_event(&monitor) {
                    Ok(Some(SocketEvent::CONNECTED)) => break,
                    Ok(Some(SocketEvent::CONNECT_DELAYED))
                    | Ok(Some(SocketEvent::CONNECT_RETRIED)) => (),
                    Ok(Some(_)) => {
                        return Err(MonitoredSocketError::CouldNotConnect(endpoint.into(), None))
                    }
                    Ok(None) | Err(zmq::Error::EAGAIN) => (),
                    Err(e) => return Err(MonitoredSocketError::EventReadError(e)),
                }
            }

            connected.store(true, Ordering::Relaxed);
        }

        let shutdown = Arc::new(AtomicBool::new(false));

        let monitor_handle = {
            let shutdown = shutdown.clone();
            let connected = connected.clone();
            let endpoint = endpoint.to_string();

            thread::spawn(move || monitor_socket(monitor, endpoint, shutdown, connected))
        };

        Ok(Self {
            socket,
            monitor_handle: Some(monitor_handle),
            shutdown,
            connected,
        })
    }

    /// True if a peer is currently connected.
    pub fn connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    /// Serialize the value to JSON and send it.
    pub fn send_json<T: Serialize>(&self, value: &T) -> Result<(), MessageError> {
        let msg = serde_json::to_string(value).map_err(MessageError::SerializationError)?;

        self.socket.send(&msg, 0).map_err(MessageError::SendError)
    }

    /// Receive a string message without blocking, `Ok(None)` if nothing is waiting.
    pub fn try_recv_string(&self) -> Result<Option<String>, MessageError> {
        match self.socket.recv_string(zmq::DONTWAIT) {
            Ok(Ok(s)) => Ok(Some(s)),
            Ok(Err(_)) => Err(MessageError::NonUtf8),
            Err(zmq::Error::EAGAIN) => Ok(None),
            Err(e) => Err(MessageError::RecvError(e)),
        }
    }
}

impl Drop for MonitoredSocket {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);

        if let Some(h) = self.monitor_handle.take() {
            if h.join().is_err() {
                warn!("Socket monitor thread panicked");
            }
        }
    }
}

impl std::ops::Deref for MonitoredSocket {
    type Target = Socket;

    fn deref(&self) -> &Self::Target {
        &self.socket
    }
}

impl SocketOptions {
    /// Set these options on a socket of the given type.
    fn set(&self, socket: &Socket, socket_type: SocketType) -> Result<(), MonitoredSocketError> {
        set_sockopts!(
            socket,
            (set_linger, self.linger),
            (set_reconnect_ivl, self.reconnect_ivl),
            (set_rcvtimeo, self.recv_timeout),
            (set_sndtimeo, self.send_timeout)
        );

        if socket_type == zmq::SUB {
            set_sockopts!(socket, (set_conflate, self.conflate));
        }

        Ok(())
    }

    /// Options for a subscriber to a latched stream.
    ///
    /// Only the most recent message is kept and the subscriber does not wait for the publisher
    /// to exist, since equipment may start after the line executable.
    pub fn latched_subscriber() -> Self {
        Self {
            conflate: true,
            linger: 0,
            recv_timeout: 0,
            ..Default::default()
        }
    }

    /// Options for a subscriber which waits for its publisher before returning.
    pub fn blocking_subscriber() -> Self {
        Self {
            block_on_first_connect: true,
            linger: 0,
            ..Default::default()
        }
    }

    /// Options for a publisher bound by this software.
    pub fn publisher() -> Self {
        Self {
            bind: true,
            linger: 0,
            send_timeout: 10,
            ..Default::default()
        }
    }
}

impl Default for SocketOptions {
    /// zmq defaults, connecting without blocking.
    fn default() -> Self {
        Self {
            bind: false,
            block_on_first_connect: false,
            conflate: false,
            linger: 30_000,
            reconnect_ivl: 100,
            recv_timeout: -1,
            send_timeout: -1,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Read an event from a monitor socket, `Ok(None)` if the event frame is malformed.
fn read_event(monitor: &Socket) -> Result<Option<SocketEvent>, zmq::Error> {
    let msg = monitor.recv_msg(0)?;

    // The second frame is the peer address
    if monitor.get_rcvmore()? {
        monitor.recv_msg(0)?;
    }

    Ok(msg
        .get(0..2)
        .map(|b| SocketEvent::from_raw(u16::from_ne_bytes([b[0], b[1]]))))
}

fn monitor_socket(
    monitor: Socket,
    endpoint: String,
    shutdown: Arc<AtomicBool>,
    connected: Arc<AtomicBool>,
) {
    while !shutdown.load(Ordering::Relaxed) {
        match read_event(&monitor) {
            Ok(Some(SocketEvent::CONNECTED)) | Ok(Some(SocketEvent::ACCEPTED)) => {
                debug!("Peer connected on {}", endpoint);
                connected.store(true, Ordering::Relaxed)
            }
            Ok(Some(SocketEvent::DISCONNECTED)) => {
                debug!("Peer disconnected on {}", endpoint);
                connected.store(false, Ordering::Relaxed)
            }
            Ok(_) | Err(zmq::Error::EAGAIN) => (),
            Err(e) => {
                warn!("Error reading events for {}: {}", endpoint, e);
                break;
            }
        }
    }
}
