//! Intersection entry and manouvre calculations

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use log::{info, warn};

// Internal imports
use super::*;
use comms_if::eqpt::{drive::VelocityCmd, signs::SignEvent};
use util::maths::get_ang_dist;

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl MnvrKind {
    /// Select a manouvre from the sign detections.
    ///
    /// Signs are considered in the order ahead only, turn right, turn left, roundabout, give
    /// way, and the first one raised is chosen.
    pub fn select(signs: &SignEvent) -> Option<Self> {
        if signs.ahead_only {
            Some(MnvrKind::AheadOnly)
        } else if signs.turn_right {
            Some(MnvrKind::TurnRight)
        } else if signs.turn_left {
            Some(MnvrKind::TurnLeft)
        } else if signs.roundabout {
            Some(MnvrKind::Roundabout)
        } else if signs.give_way {
            Some(MnvrKind::GiveWay)
        } else {
            None
        }
    }

    /// The heading change for this manouvre given the turn angle magnitude.
    pub fn heading_delta_rad(&self, turn_angle_rad: f64) -> f64 {
        match self {
            MnvrKind::TurnRight => -turn_angle_rad,
            MnvrKind::TurnLeft => turn_angle_rad,
            MnvrKind::AheadOnly | MnvrKind::Roundabout | MnvrKind::GiveWay => 0.0,
        }
    }
}

impl LineCtrl {
    /// Check for entry into an intersection while following the line.
    ///
    /// The dotted line must be seen on `entry_debounce_ticks` consecutive cycles, which
    /// gives any odometry reset triggered by the marker time to settle before the origin is
    /// latched.
    pub(crate) fn calc_entry(&mut self, input: &InputData) {
        if self.mode != CtrlMode::LineFollowing || !input.signs.dotted_line {
            self.dotted_line_count = 0;
            return;
        }

        self.dotted_line_count = self.dotted_line_count.saturating_add(1);

        if self.dotted_line_count < self.params.entry_debounce_ticks {
            return;
        }

        match input.pose {
            Some(pose) => {
                info!(
                    "Intersection entered at ({:.3}, {:.3}) m, heading {:.3} rad",
                    pose.position_m[0], pose.position_m[1], pose.heading_rad
                );

                self.clear_mnvr();
                self.origin = Some(pose);
                self.dotted_line_count = 0;
                self.set_mode(CtrlMode::IntersectionDetectWait);
            }
            None => {
                if self.dotted_line_count == self.params.entry_debounce_ticks {
                    warn!("Intersection detected but no pose is available, deferring entry");
                }
            }
        }
    }

    /// Wait at the intersection for a sign selecting the manouvre.
    ///
    /// Once a manouvre is selected it is started in the same cycle.
    pub(crate) fn calc_detect_wait(&mut self, input: &InputData) -> VelocityCmd {
        let origin = match self.origin {
            Some(o) => o,
            None => {
                warn!("Waiting at an intersection without an origin, resuming line following");
                self.clear_mnvr();
                self.set_mode(CtrlMode::LineFollowing);
                return VelocityCmd::stop();
            }
        };

        if let Some(kind) = MnvrKind::select(&input.signs) {
            let mnvr = Mnvr {
                kind,
                origin,
                distance_m: self.params.mnvr_distance_m,
                heading_delta_rad: kind.heading_delta_rad(self.params.mnvr_turn_angle_rad),
                rotating: false,
            };

            info!(
                "Intersection manouvre {:?}: {:.3} m then {:.3} rad",
                kind, mnvr.distance_m, mnvr.heading_delta_rad
            );

            self.mnvr = Some(mnvr);
            self.set_mode(CtrlMode::IntersectionMoving);

            return self.calc_moving(input);
        }

        self.detect_wait_ticks = self.detect_wait_ticks.saturating_add(1);

        if let Some(timeout) = self.params.detect_wait_timeout_ticks {
            if self.detect_wait_ticks >= timeout {
                warn!(
                    "No sign seen after {} cycles at the intersection, resuming line following",
                    self.detect_wait_ticks
                );
                self.report.detect_wait_timed_out = true;
                self.clear_mnvr();
                self.set_mode(CtrlMode::LineFollowing);
            }
        }

        VelocityCmd::stop()
    }

    /// Execute the latched manouvre: drive to the target distance then turn on the spot to
    /// the target heading change.
    ///
    /// The cycle on which the manouvre completes commands a stop, line following resumes on
    /// the next cycle.
    pub(crate) fn calc_moving(&mut self, input: &InputData) -> VelocityCmd {
        let mut mnvr = match self.mnvr {
            Some(m) => m,
            None => {
                warn!("Executing a manouvre but none is latched, resuming line following");
                self.clear_mnvr();
                self.set_mode(CtrlMode::LineFollowing);
                return VelocityCmd::stop();
            }
        };

        self.report.mnvr_kind = Some(mnvr.kind);

        let pose = match input.pose {
            Some(p) => p,
            None => {
                warn!("No pose available during intersection manouvre, holding position");
                return VelocityCmd::stop();
            }
        };

        let displacement_m = mnvr.origin.distance_to(&pose);
        let heading_change_rad = get_ang_dist(mnvr.origin.heading_rad, pose.heading_rad);

        self.report.mnvr_displacement_m = displacement_m;
        self.report.mnvr_heading_change_rad = heading_change_rad;

        if !mnvr.rotating {
            if displacement_m < mnvr.distance_m {
                return VelocityCmd::new(self.params.mnvr_speed_ms, 0.0);
            }

            mnvr.rotating = true;
            self.mnvr = Some(mnvr);
        }

        let delta = mnvr.heading_delta_rad;
        let reached = if delta > 0.0 {
            heading_change_rad >= delta
        } else if delta < 0.0 {
            heading_change_rad <= delta
        } else {
            true
        };

        if !reached {
            return VelocityCmd::new(0.0, self.params.mnvr_turn_rate_rads * delta.signum());
        }

        info!(
            "Intersection manouvre {:?} complete after {:.3} m, {:.3} rad",
            mnvr.kind, displacement_m, heading_change_rad
        );

        self.clear_mnvr();
        self.set_mode(CtrlMode::LineFollowing);

        VelocityCmd::stop()
    }
}
