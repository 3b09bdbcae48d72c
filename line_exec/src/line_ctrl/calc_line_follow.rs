//! Line following calculations

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal imports
use super::*;
use comms_if::eqpt::drive::VelocityCmd;

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl LineCtrl {
    /// Follow the line using the PD controller.
    ///
    /// Until the first error is available the robot is kept still.
    pub(crate) fn calc_line_follow(&mut self, error: Option<f64>) -> VelocityCmd {
        let error = match error {
            Some(e) => e,
            None => return VelocityCmd::stop(),
        };

        let out = self.pd.update(error);

        self.report.deadband_active = out.in_deadband;
        self.report.angular_limited = out.limited;

        VelocityCmd::new(self.params.nominal_speed_ms, out.demand)
    }
}
