//! Main line follower executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise all modules
//!     - Main loop, once per control cycle:
//!         - Read the latest sign detections and pose from the input client
//!         - On vision cycles, process the latest camera frame into a line error
//!         - Line control processing
//!         - Publish the velocity command
//!
//! # Latency
//!
//! Vision and control run on the same thread. Vision runs once every
//! `round(vision_period_s / control_period_s)` cycles, and a slow vision step delays the control
//! processing of the same cycle. This shows up as a cycle overrun warning. Inputs are received
//! on a background thread so they are never delayed by processing.
//!
//! # Modules
//!
//! All modules (e.g. `line_ctrl`) shall meet the following requirements:
//!     1. Provide a public struct implementing the `util::module::State` trait.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{debug, info, warn};
use std::thread;
use std::time::{Duration, Instant};

// Internal
use comms_if::{eqpt::drive::VelocityCmd, net::NetParams};
use line_lib::{
    cmd_server::CmdServer,
    data_store::DataStore,
    input_client::{InputClient, InputStream},
    line_ctrl,
    params::LineExecParams,
    vision,
};
use util::{
    archive::Archived,
    host,
    logger::{logger_init, LevelFilter},
    module::State,
    session::Session,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of consecutive vision failures logged as warnings. Further failures are logged at
/// debug level until vision recovers.
const VISION_ERROR_REPEAT_LIMIT: u64 = 1;

/// Period between input stream status log records.
///
/// Units: seconds
const STATUS_LOG_PERIOD_S: f64 = 10.0;

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("line_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Debug, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Line Follower Executable\n");
    info!(
        "Running on: {}",
        host::get_hostname().unwrap_or_else(|| "unknown host".into())
    );
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let net_params: NetParams =
        util::params::load("net.toml").wrap_err("Could not load net params")?;

    let exec_params: LineExecParams =
        util::params::load("line_exec.toml").wrap_err("Could not load line_exec params")?;

    exec_params
        .validate()
        .map_err(|e| eyre!("Invalid line_exec params: {}", e))?;

    let vision_cycle_divisor = exec_params.vision_cycle_divisor();

    info!(
        "Exec parameters loaded: control period {} s, vision every {} cycles",
        exec_params.control_period_s, vision_cycle_divisor
    );

    // ---- INITIALISE DATASTORE ----

    info!("Initialising modules...");

    let mut ds = DataStore::default();

    // ---- INITIALISE MODULES ----

    ds.line_vision
        .init(exec_params.vision_params_file.clone(), &session)
        .wrap_err("Failed to initialise LineVision")?;
    info!(
        "LineVision init complete, using {}",
        exec_params.vision_params_file
    );

    ds.line_ctrl
        .init(
            line_ctrl::InitData {
                params_file: "line_ctrl.toml",
                archive: exec_params.archive_enabled,
            },
            &session,
        )
        .wrap_err("Failed to initialise LineCtrl")?;
    info!("LineCtrl init complete");

    info!("Module initialisation complete\n");

    // ---- INITIALISE NETWORK ----

    info!("Initialising network");

    let zmq_ctx = comms_if::net::zmq::Context::new();

    let input_client = {
        let c = InputClient::new(&zmq_ctx, &net_params)
            .wrap_err("Failed to initialise InputClient")?;
        info!("InputClient initialised");
        c
    };

    let cmd_server = {
        let s = CmdServer::new(&zmq_ctx, &net_params, exec_params.publish_diagnostics)
            .wrap_err("Failed to initialise CmdServer")?;
        info!("CmdServer initialised");
        s
    };

    info!("Network initialisation complete");

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    let cycle_period = Duration::from_secs_f64(exec_params.control_period_s);
    let status_log_cycles =
        ((STATUS_LOG_PERIOD_S / exec_params.control_period_s).round() as u128).max(1);

    loop {
        // Get cycle start time
        let cycle_start_instant = Instant::now();

        // Clear items that need wiping at the start of the cycle
        ds.cycle_start(vision_cycle_divisor);

        // ---- DATA INPUT ----

        let (signs, pose) = input_client.control_inputs();

        // ---- VISION PROCESSING ----

        if ds.is_vision_cycle {
            let vision_input = vision::InputData {
                frame: input_client.latest_frame(),
            };

            match ds.line_vision.proc(&vision_input) {
                Ok((o, r)) => {
                    ds.line_error = o.error;
                    ds.line_vision_status_rpt = r;
                    ds.num_consec_vision_errors = 0;

                    if let Err(e) = cmd_server.send_diag(&o.mask) {
                        warn!("Could not publish the diagnostic image: {}", e);
                    }
                }
                Err(e) => {
                    // The previous error is kept, control continues on stale data
                    ds.num_consec_vision_errors += 1;

                    if ds.num_consec_vision_errors > VISION_ERROR_REPEAT_LIMIT {
                        debug!("LineVision processing failed: {}", e);
                    } else {
                        warn!("LineVision processing failed: {}", e);
                    }
                }
            }
        }

        // ---- CONTROL ALGORITHM PROCESSING ----

        ds.line_ctrl_input = line_ctrl::InputData {
            error: ds.line_error,
            signs,
            pose,
        };

        match ds.line_ctrl.proc(&ds.line_ctrl_input) {
            Ok((o, r)) => {
                ds.line_ctrl_output = o;
                ds.line_ctrl_status_rpt = r;
            }
            Err(e) => {
                warn!("Error during LineCtrl processing, stopping: {}", e);
                ds.line_ctrl_output = VelocityCmd::stop();
            }
        };

        // Command is sent every cycle, even if unchanged
        if let Err(e) = cmd_server.send_cmd(&ds.line_ctrl_output) {
            warn!("CmdServer error: {}", e);
        }

        // ---- WRITE ARCHIVES ----

        if exec_params.archive_enabled {
            if let Err(e) = ds.line_ctrl.write() {
                warn!("Could not write the LineCtrl archives: {}", e);
            }
        }

        // ---- STATUS LOGGING ----

        if ds.num_cycles % status_log_cycles == 0 {
            let status = input_client.stream_status();

            for stream in InputStream::ALL.iter() {
                let s = status[stream.index()];
                info!(
                    "[{:.1} s] {:?} stream: {} messages, connected: {}",
                    ds.session_time_s, stream, s.num_msgs, s.connected
                );
            }
        }

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;

        // Get sleep duration
        match cycle_period.checked_sub(cycle_dur) {
            Some(d) => {
                ds.num_consec_cycle_overruns = 0;
                thread::sleep(d);
            }
            None => {
                ds.num_consec_cycle_overruns += 1;
                warn!(
                    "Cycle {} overran by {:.06} s (vision cycle: {}, {} consecutive)",
                    ds.num_cycles,
                    cycle_dur.as_secs_f64() - cycle_period.as_secs_f64(),
                    ds.is_vision_cycle,
                    ds.num_consec_cycle_overruns
                );
            }
        }

        ds.cycle_end();
    }
}
