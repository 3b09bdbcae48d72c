//! Sign overrides and drive base limits

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use log::info;

// Internal imports
use super::*;
use comms_if::eqpt::{drive::VelocityCmd, signs::SignEvent};
use util::maths::{clamp, clamp_sym};

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl LineCtrl {
    /// Apply the sign overrides to the command.
    ///
    /// The overrides are evaluated in the order roadwork, stop, red light, yellow light.
    /// Each one replaces what came before it, so the last matching override wins.
    pub(crate) fn apply_overrides(&mut self, signs: &SignEvent, cmd: VelocityCmd) -> VelocityCmd {
        let mut cmd = cmd;
        let mut applied = None;

        if signs.roadwork {
            cmd.linear_ms = self.params.reduced_speed_ms;
            applied = Some(SignOverride::Roadwork);
        }
        if signs.stop {
            cmd = VelocityCmd::stop();
            applied = Some(SignOverride::Stop);
        }
        if signs.red_light {
            cmd = VelocityCmd::stop();
            applied = Some(SignOverride::RedLight);
        }
        if signs.yellow_light {
            cmd.linear_ms = self.params.reduced_speed_ms;
            applied = Some(SignOverride::YellowLight);
        }

        if applied != self.last_override {
            info!("Sign override: {:?}", applied);
            self.last_override = applied;
        }
        self.report.sign_override = applied;

        cmd
    }

    /// Limit the command to the capabilities of the drive base.
    pub(crate) fn enforce_limits(&mut self, cmd: VelocityCmd) -> VelocityCmd {
        let linear_ms = clamp(
            cmd.linear_ms,
            self.params.min_linear_ms,
            self.params.max_linear_ms,
        );
        let (angular_rads, angular_limited) =
            clamp_sym(cmd.angular_rads, self.params.max_hw_angular_rads);

        self.report.linear_hw_limited = linear_ms != cmd.linear_ms;
        self.report.angular_hw_limited = angular_limited;

        VelocityCmd::new(linear_ms, angular_rads)
    }
}
