//! # Data Store

use comms_if::eqpt::drive::VelocityCmd;

use crate::{line_ctrl, vision};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Global data store for the executable.
#[derive(Default)]
pub struct DataStore {
    // Cycle management
    /// Number of cycles already executed
    pub num_cycles: u128,

    /// True if vision processing runs on this cycle
    pub is_vision_cycle: bool,

    /// Session elapsed time
    pub session_time_s: f64,

    // LineVision
    pub line_vision: vision::LineVision,
    pub line_vision_status_rpt: vision::StatusReport,

    /// Latest line error, kept between vision cycles and across vision failures
    pub line_error: Option<f64>,

    // LineCtrl
    pub line_ctrl: line_ctrl::LineCtrl,
    pub line_ctrl_input: line_ctrl::InputData,
    pub line_ctrl_output: VelocityCmd,
    pub line_ctrl_status_rpt: line_ctrl::StatusReport,

    // Monitoring Counters
    /// Number of consecutive cycle overruns
    pub num_consec_cycle_overruns: u64,

    /// Number of consecutive vision failures
    pub num_consec_vision_errors: u64,
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl DataStore {
    /// Perform actions required at the start of a cycle.
    ///
    /// Clears those items that need clearing at the start of a cycle, and sets the vision cycle
    /// flag.
    pub fn cycle_start(&mut self, vision_cycle_divisor: u64) {
        self.is_vision_cycle = self.num_cycles % (vision_cycle_divisor.max(1) as u128) == 0;

        self.line_ctrl_input = line_ctrl::InputData::default();
        self.line_ctrl_output = VelocityCmd::default();
        self.line_ctrl_status_rpt = line_ctrl::StatusReport::default();

        self.session_time_s = util::session::elapsed_seconds().unwrap_or_default();
    }

    /// Perform actions required at the end of a cycle.
    pub fn cycle_end(&mut self) {
        self.num_cycles += 1;
    }
}
