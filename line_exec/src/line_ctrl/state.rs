//! Implementations for the LineCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{info, trace};
use serde::Serialize;

// Internal
use super::{CtrlMode, LineCtrlError, Mnvr, MnvrKind, Params, PdCtrl, SignOverride};
use comms_if::eqpt::{drive::VelocityCmd, odom::Pose, signs::SignEvent};
use util::{
    archive::{ArchiveError, Archived, Archiver},
    module::State,
    params,
    session::Session,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Line control module state
pub struct LineCtrl {
    pub(crate) params: Params,

    pub(crate) pd: PdCtrl,

    pub(crate) mode: CtrlMode,

    /// Number of consecutive cycles the dotted line has been seen for.
    pub(crate) dotted_line_count: u32,

    /// Number of cycles spent waiting for a sign at the current intersection.
    pub(crate) detect_wait_ticks: u32,

    /// Pose latched on entry to the current intersection.
    pub(crate) origin: Option<Pose>,

    pub(crate) mnvr: Option<Mnvr>,

    pub(crate) last_override: Option<SignOverride>,

    pub(crate) report: StatusReport,
    arch_report: Archiver,

    pub(crate) output: VelocityCmd,
    arch_output: Archiver,
}

/// Data required to initialise LineCtrl.
pub struct InitData {
    /// Name of the parameter file
    pub params_file: &'static str,

    /// Whether to archive the status report and output every cycle
    pub archive: bool,
}

/// Input data to Line Control.
#[derive(Debug, Default, Clone, Copy)]
pub struct InputData {
    /// The latest normalised line error, `None` if the line has never been found.
    pub error: Option<f64>,

    /// The latest sign detections.
    pub signs: SignEvent,

    /// The latest pose of the robot, `None` if no pose has been received yet.
    pub pose: Option<Pose>,
}

/// Status report for LineCtrl processing.
#[derive(Clone, Copy, Default, Serialize, Debug)]
pub struct StatusReport {
    /// The mode at the end of the cycle
    pub mode: CtrlMode,

    /// True if the mode changed during the cycle
    pub mode_changed: bool,

    /// Consecutive cycles the dotted line has been seen for
    pub dotted_line_count: u32,

    /// The manouvre being executed
    pub mnvr_kind: Option<MnvrKind>,

    /// Distance from the intersection origin.
    ///
    /// Units: meters
    pub mnvr_displacement_m: f64,

    /// Heading change from the intersection origin.
    ///
    /// Units: radians
    pub mnvr_heading_change_rad: f64,

    /// True if the intersection wait timed out this cycle
    pub detect_wait_timed_out: bool,

    /// True if the line error was inside the deadband
    pub deadband_active: bool,

    /// True if the PD demand was limited
    pub angular_limited: bool,

    /// The sign override applied this cycle
    pub sign_override: Option<SignOverride>,

    /// True if no line error has been received yet, so the robot is held still
    pub awaiting_error: bool,

    /// True if the forwards speed was limited to the drive base capabilities
    pub linear_hw_limited: bool,

    /// True if the turn rate was limited to the drive base capabilities
    pub angular_hw_limited: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl LineCtrl {
    /// Create a new instance directly from parameters.
    pub fn from_params(params: Params) -> Result<Self, LineCtrlError> {
        params.validate().map_err(LineCtrlError::InvalidParams)?;

        Ok(Self::with_params(params))
    }

    fn with_params(params: Params) -> Self {
        let pd = PdCtrl::new(
            params.k_p,
            params.k_d,
            params.deadband,
            params.max_angular_rads,
        );

        Self {
            params,
            pd,
            mode: CtrlMode::LineFollowing,
            dotted_line_count: 0,
            detect_wait_ticks: 0,
            origin: None,
            mnvr: None,
            last_override: None,
            report: StatusReport::default(),
            arch_report: Archiver::default(),
            output: VelocityCmd::default(),
            arch_output: Archiver::default(),
        }
    }

    /// The current control mode.
    pub fn mode(&self) -> CtrlMode {
        self.mode
    }

    /// Clear everything latched for the current intersection.
    pub(crate) fn clear_mnvr(&mut self) {
        self.origin = None;
        self.mnvr = None;
        self.detect_wait_ticks = 0;
    }

    /// Change mode, logging the transition.
    pub(crate) fn set_mode(&mut self, mode: CtrlMode) {
        if self.mode != mode {
            info!("LineCtrl mode change: {:?} -> {:?}", self.mode, mode);
            self.mode = mode;
        }
    }
}

impl Default for LineCtrl {
    fn default() -> Self {
        Self::with_params(Params::default())
    }
}

impl State for LineCtrl {
    type InitData = InitData;
    type InitError = LineCtrlError;

    type InputData = InputData;
    type OutputData = VelocityCmd;
    type StatusReport = StatusReport;
    type ProcError = LineCtrlError;

    /// Initialise the LineCtrl module.
    fn init(
        &mut self,
        init_data: Self::InitData,
        session: &Session,
    ) -> Result<(), Self::InitError> {
        let params: Params =
            params::load(init_data.params_file).map_err(LineCtrlError::ParamLoadError)?;

        *self = Self::from_params(params)?;

        if init_data.archive {
            self.arch_report = Archiver::from_path(session, "line_ctrl/status_report.csv")
                .map_err(LineCtrlError::ArchiveError)?;
            self.arch_output = Archiver::from_path(session, "line_ctrl/output.csv")
                .map_err(LineCtrlError::ArchiveError)?;
        }

        Ok(())
    }

    /// Perform cyclic processing of Line Control.
    ///
    /// A command is produced on every call, unless the line error is not finite.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        // Clear the status report
        self.report = StatusReport::default();

        if let Some(e) = input_data.error {
            if !e.is_finite() {
                return Err(LineCtrlError::NonFiniteError(e));
            }
        }

        let start_mode = self.mode;

        // Intersection entry is checked first so that a new intersection is handled in the
        // same cycle it is detected.
        self.calc_entry(input_data);

        let mut cmd = match self.mode {
            CtrlMode::LineFollowing => self.calc_line_follow(input_data.error),
            CtrlMode::IntersectionDetectWait => self.calc_detect_wait(input_data),
            CtrlMode::IntersectionMoving => self.calc_moving(input_data),
        };

        // The derivative term always works from the previous cycle's error
        if let Some(e) = input_data.error {
            self.pd.track(e);
        }

        cmd = self.apply_overrides(&input_data.signs, cmd);
        cmd = self.enforce_limits(cmd);

        // Never move before the line has been seen
        if input_data.error.is_none() {
            cmd = VelocityCmd::stop();
            self.report.awaiting_error = true;
        }

        self.report.mode = self.mode;
        self.report.mode_changed = self.mode != start_mode;
        self.report.dotted_line_count = self.dotted_line_count;
        if self.report.mnvr_kind.is_none() {
            self.report.mnvr_kind = self.mnvr.map(|m| m.kind);
        }

        trace!(
            "LineCtrl output: linear {:.4} m/s, angular {:.4} rad/s ({:?})",
            cmd.linear_ms,
            cmd.angular_rads,
            self.mode
        );

        self.output = cmd;

        Ok((cmd, self.report))
    }
}

impl Archived for LineCtrl {
    fn write(&mut self) -> Result<(), ArchiveError> {
        self.arch_report.serialise(self.report)?;
        self.arch_output.serialise(self.output)?;

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const EPS: f64 = 1e-9;

    fn ctrl() -> LineCtrl {
        LineCtrl::from_params(Params::default()).unwrap()
    }

    fn input(error: Option<f64>, signs: SignEvent, pose: Option<Pose>) -> InputData {
        InputData {
            error,
            signs,
            pose,
        }
    }

    fn dotted() -> SignEvent {
        SignEvent {
            dotted_line: true,
            ..Default::default()
        }
    }

    fn tick(ctrl: &mut LineCtrl, inp: InputData) -> (VelocityCmd, StatusReport) {
        ctrl.proc(&inp).unwrap()
    }

    /// Drive the controller into the intersection wait mode with the origin at `origin`.
    fn enter_intersection(ctrl: &mut LineCtrl, origin: Pose) {
        for _ in 0..ctrl.params.entry_debounce_ticks {
            tick(ctrl, input(Some(0.0), dotted(), Some(origin)));
        }
        assert_eq!(ctrl.mode(), CtrlMode::IntersectionDetectWait);
    }

    #[test]
    fn test_no_motion_before_first_error() {
        let mut c = ctrl();

        let roadwork = SignEvent {
            roadwork: true,
            ..Default::default()
        };

        for signs in [SignEvent::default(), roadwork, dotted()].iter() {
            let (cmd, report) = tick(&mut c, input(None, *signs, Some(Pose::default())));
            assert_eq!(cmd, VelocityCmd::stop());
            assert!(report.awaiting_error);
        }

        // First error arrives, the robot moves off
        let (cmd, _) = tick(&mut c, input(Some(0.0), SignEvent::default(), None));
        assert!((cmd.linear_ms - 0.08).abs() < EPS);
    }

    #[test]
    fn test_pd_example_through_cycle() {
        let mut c = ctrl();

        // First cycle is inside the deadband, but still records the previous error
        let (cmd, report) = tick(&mut c, input(Some(0.05), SignEvent::default(), None));
        assert_eq!(cmd.angular_rads, 0.0);
        assert!(report.deadband_active);

        let (cmd, report) = tick(&mut c, input(Some(0.08), SignEvent::default(), None));
        assert!((cmd.angular_rads - 0.01648).abs() < EPS);
        assert!((cmd.linear_ms - 0.08).abs() < EPS);
        assert!(!report.deadband_active);
    }

    #[test]
    fn test_deadband_and_clamp() {
        let mut c = ctrl();

        let (cmd, _) = tick(&mut c, input(Some(-0.05), SignEvent::default(), None));
        assert_eq!(cmd.angular_rads, 0.0);

        let (cmd, report) = tick(&mut c, input(Some(1.0), SignEvent::default(), None));
        assert!((cmd.angular_rads - 0.2).abs() < EPS);
        assert!(report.angular_limited);

        let (cmd, _) = tick(&mut c, input(Some(-1.0), SignEvent::default(), None));
        assert!((cmd.angular_rads + 0.2).abs() < EPS);
    }

    #[test]
    fn test_entry_debounce() {
        let mut c = ctrl();
        let pose = Some(Pose::default());

        // One cycle is not enough
        tick(&mut c, input(Some(0.0), dotted(), pose));
        assert_eq!(c.mode(), CtrlMode::LineFollowing);

        // A gap resets the count
        tick(&mut c, input(Some(0.0), SignEvent::default(), pose));
        tick(&mut c, input(Some(0.0), dotted(), pose));
        assert_eq!(c.mode(), CtrlMode::LineFollowing);

        // Second consecutive cycle enters the intersection and stops
        let (cmd, report) = tick(&mut c, input(Some(0.0), dotted(), pose));
        assert_eq!(c.mode(), CtrlMode::IntersectionDetectWait);
        assert!(report.mode_changed);
        assert_eq!(cmd, VelocityCmd::stop());
    }

    #[test]
    fn test_entry_deferred_without_pose() {
        let mut c = ctrl();

        for _ in 0..5 {
            tick(&mut c, input(Some(0.0), dotted(), None));
            assert_eq!(c.mode(), CtrlMode::LineFollowing);
        }

        tick(&mut c, input(Some(0.0), dotted(), Some(Pose::default())));
        assert_eq!(c.mode(), CtrlMode::IntersectionDetectWait);
    }

    #[test]
    fn test_detect_wait_holds_still() {
        let mut c = ctrl();
        enter_intersection(&mut c, Pose::default());

        for _ in 0..50 {
            let (cmd, _) = tick(&mut c, input(Some(0.3), SignEvent::default(), None));
            assert_eq!(cmd, VelocityCmd::stop());
            assert_eq!(c.mode(), CtrlMode::IntersectionDetectWait);
        }
    }

    #[test]
    fn test_detect_wait_timeout() {
        let mut params = Params::default();
        params.detect_wait_timeout_ticks = Some(3);
        let mut c = LineCtrl::from_params(params).unwrap();
        enter_intersection(&mut c, Pose::default());

        // The entry cycle counts as the first cycle of waiting
        let (cmd, report) = tick(&mut c, input(Some(0.0), SignEvent::default(), None));
        assert_eq!(cmd, VelocityCmd::stop());
        assert!(!report.detect_wait_timed_out);
        assert_eq!(c.mode(), CtrlMode::IntersectionDetectWait);

        let (cmd, report) = tick(&mut c, input(Some(0.0), SignEvent::default(), None));
        assert_eq!(cmd, VelocityCmd::stop());
        assert!(report.detect_wait_timed_out);
        assert_eq!(c.mode(), CtrlMode::LineFollowing);
        assert!(c.mnvr.is_none() && c.origin.is_none());
    }

    #[test]
    fn test_turn_right_mnvr() {
        let mut c = ctrl();
        let origin = Pose::new(1.0, 2.0, 0.5);
        enter_intersection(&mut c, origin);

        let turn_right = SignEvent {
            turn_right: true,
            ..Default::default()
        };

        // Selecting the target starts driving in the same cycle
        let (cmd, report) = tick(&mut c, input(Some(0.0), turn_right, Some(origin)));
        assert_eq!(c.mode(), CtrlMode::IntersectionMoving);
        assert_eq!(report.mnvr_kind, Some(MnvrKind::TurnRight));
        assert!((cmd.linear_ms - 0.1).abs() < EPS);
        assert_eq!(cmd.angular_rads, 0.0);

        // Signs no longer matter once moving
        let (cmd, _) = tick(
            &mut c,
            input(Some(0.0), SignEvent::default(), Some(Pose::new(1.1, 2.1, 0.5))),
        );
        assert!((cmd.linear_ms - 0.1).abs() < EPS);

        // Distance covered, rotation is negative for a right turn
        for &heading in [0.5, 0.0, -0.8].iter() {
            let (cmd, _) = tick(
                &mut c,
                input(Some(0.0), SignEvent::default(), Some(Pose::new(1.2, 2.2, heading))),
            );
            assert_eq!(cmd.linear_ms, 0.0);
            assert!((cmd.angular_rads + 0.1).abs() < EPS);
            assert_eq!(c.mode(), CtrlMode::IntersectionMoving);
        }

        // Target reached, back to line following exactly once
        let done = Some(Pose::new(1.2, 2.2, 0.5 - 1.41));
        let (cmd, report) = tick(&mut c, input(Some(0.3), SignEvent::default(), done));
        assert_eq!(cmd, VelocityCmd::stop());
        assert_eq!(c.mode(), CtrlMode::LineFollowing);
        assert!(report.mode_changed);
        assert!(c.mnvr.is_none() && c.origin.is_none());

        let (cmd, report) = tick(&mut c, input(Some(0.3), SignEvent::default(), done));
        assert!(!report.mode_changed);
        assert_eq!(c.mode(), CtrlMode::LineFollowing);
        assert!((cmd.linear_ms - 0.08).abs() < EPS);
    }

    #[test]
    fn test_turn_left_rotates_positive() {
        let mut c = ctrl();
        enter_intersection(&mut c, Pose::default());

        let turn_left = SignEvent {
            turn_left: true,
            ..Default::default()
        };
        tick(&mut c, input(Some(0.0), turn_left, Some(Pose::default())));

        let (cmd, _) = tick(
            &mut c,
            input(Some(0.0), SignEvent::default(), Some(Pose::new(0.0, 0.3, 0.2))),
        );
        assert!((cmd.angular_rads - 0.1).abs() < EPS);

        let (_, report) = tick(
            &mut c,
            input(Some(0.0), SignEvent::default(), Some(Pose::new(0.0, 0.3, 1.45))),
        );
        assert_eq!(c.mode(), CtrlMode::LineFollowing);
        assert!(report.mode_changed);
    }

    #[test]
    fn test_ahead_only_skips_rotation() {
        let mut c = ctrl();
        enter_intersection(&mut c, Pose::default());

        let ahead = SignEvent {
            ahead_only: true,
            // Lower priority flags are ignored
            turn_left: true,
            ..Default::default()
        };
        let (_, report) = tick(&mut c, input(Some(0.0), ahead, Some(Pose::default())));
        assert_eq!(report.mnvr_kind, Some(MnvrKind::AheadOnly));

        let (cmd, _) = tick(
            &mut c,
            input(Some(0.0), SignEvent::default(), Some(Pose::new(0.25, 0.0, 0.0))),
        );
        assert_eq!(cmd, VelocityCmd::stop());
        assert_eq!(c.mode(), CtrlMode::LineFollowing);
    }

    #[test]
    fn test_stop_override() {
        let mut c = ctrl();

        let stop = SignEvent {
            stop: true,
            ..Default::default()
        };

        tick(&mut c, input(Some(0.5), SignEvent::default(), None));
        let (cmd, report) = tick(&mut c, input(Some(0.6), stop, None));
        assert_eq!(cmd, VelocityCmd::stop());
        assert_eq!(report.sign_override, Some(SignOverride::Stop));

        let red = SignEvent {
            red_light: true,
            ..Default::default()
        };
        let (cmd, _) = tick(&mut c, input(Some(0.6), red, None));
        assert_eq!(cmd, VelocityCmd::stop());
    }

    #[test]
    fn test_override_last_match_wins() {
        let mut c = ctrl();

        // Stop is evaluated after roadwork
        let signs = SignEvent {
            roadwork: true,
            stop: true,
            ..Default::default()
        };
        let (cmd, report) = tick(&mut c, input(Some(0.5), signs, None));
        assert_eq!(cmd, VelocityCmd::stop());
        assert_eq!(report.sign_override, Some(SignOverride::Stop));

        // Yellow is evaluated after stop, only the speed is replaced
        let signs = SignEvent {
            stop: true,
            yellow_light: true,
            ..Default::default()
        };
        let (cmd, report) = tick(&mut c, input(Some(0.5), signs, None));
        assert!((cmd.linear_ms - 0.04).abs() < EPS);
        assert_eq!(cmd.angular_rads, 0.0);
        assert_eq!(report.sign_override, Some(SignOverride::YellowLight));

        // Roadwork alone keeps the PD turn demand
        let signs = SignEvent {
            roadwork: true,
            ..Default::default()
        };
        let (cmd, _) = tick(&mut c, input(Some(0.5), signs, None));
        assert!((cmd.linear_ms - 0.04).abs() < EPS);
        assert!(cmd.angular_rads > 0.0);
    }

    #[test]
    fn test_hw_limits() {
        let mut params = Params::default();
        params.nominal_speed_ms = 0.5;
        params.max_angular_rads = 2.0;
        params.max_hw_angular_rads = 0.15;
        let mut c = LineCtrl::from_params(params).unwrap();

        let (cmd, report) = tick(&mut c, input(Some(1.0), SignEvent::default(), None));
        assert!((cmd.linear_ms - 0.3).abs() < EPS);
        assert!((cmd.angular_rads - 0.15).abs() < EPS);
        assert!(report.linear_hw_limited);
        assert!(report.angular_hw_limited);
    }

    #[test]
    fn test_non_finite_error() {
        let mut c = ctrl();

        assert!(matches!(
            c.proc(&input(Some(f64::NAN), SignEvent::default(), None)),
            Err(LineCtrlError::NonFiniteError(_))
        ));
    }

    #[test]
    fn test_stop_with_linear_limits() {
        // A minimum forwards speed above zero would turn every stop into forwards motion
        let mut params = Params::default();
        params.min_linear_ms = 0.05;
        assert!(matches!(
            LineCtrl::from_params(params),
            Err(LineCtrlError::InvalidParams(_))
        ));

        // A reversing limit is allowed and leaves stops untouched
        let mut params = Params::default();
        params.min_linear_ms = -0.1;
        let mut c = LineCtrl::from_params(params).unwrap();

        let stop = SignEvent {
            stop: true,
            ..Default::default()
        };
        let (cmd, report) = tick(&mut c, input(Some(0.3), stop, None));
        assert_eq!(cmd, VelocityCmd::stop());
        assert!(!report.linear_hw_limited);
    }

    #[test]
    fn test_wide_turn_completes() {
        let mut params = Params::default();
        params.mnvr_turn_angle_rad = 4.0;
        assert!(LineCtrl::from_params(params.clone()).is_err());

        params.mnvr_turn_angle_rad = 3.0;
        let mut c = LineCtrl::from_params(params).unwrap();
        enter_intersection(&mut c, Pose::default());

        let turn_left = SignEvent {
            turn_left: true,
            ..Default::default()
        };
        tick(&mut c, input(Some(0.0), turn_left, Some(Pose::default())));

        // Headings arrive wrapped to [-pi, pi]
        let mut completed = false;
        for k in 1..=80 {
            let heading = util::maths::get_ang_dist(0.0, k as f64 * 0.05);
            tick(
                &mut c,
                input(Some(0.0), SignEvent::default(), Some(Pose::new(0.3, 0.0, heading))),
            );
            if c.mode() == CtrlMode::LineFollowing {
                completed = true;
                break;
            }
        }
        assert!(completed);
    }

    #[test]
    fn test_prev_error_tracked_through_mnvr() {
        let mut c = ctrl();

        // Error before the intersection is zero
        enter_intersection(&mut c, Pose::default());

        let ahead = SignEvent {
            ahead_only: true,
            ..Default::default()
        };
        tick(&mut c, input(Some(0.4), ahead, Some(Pose::default())));

        // Completion cycle sees an error of 0.3
        let done = Some(Pose::new(0.25, 0.0, 0.0));
        tick(&mut c, input(Some(0.3), SignEvent::default(), done));
        assert_eq!(c.mode(), CtrlMode::LineFollowing);

        // No change in error since the last manouvre cycle, so no derivative term
        let (cmd, _) = tick(&mut c, input(Some(0.3), SignEvent::default(), done));
        assert!((cmd.angular_rads - 0.06).abs() < EPS);
    }

    #[test]
    fn test_invalid_params() {
        let mut params = Params::default();
        params.entry_debounce_ticks = 0;

        assert!(matches!(
            LineCtrl::from_params(params),
            Err(LineCtrlError::InvalidParams(_))
        ));
    }
}
