//! Parameters structure for LineCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for line control.
#[derive(Debug, Clone, Deserialize)]
pub struct Params {
    // ---- LINE FOLLOWING ----

    /// Proportional gain on the normalised line error.
    ///
    /// Units: radians/second
    pub k_p: f64,

    /// Derivative gain on the change in normalised line error between cycles.
    ///
    /// Units: radians/second
    pub k_d: f64,

    /// Errors with a magnitude at or below this value produce no turn demand.
    pub deadband: f64,

    /// Maximum magnitude of the PD turn demand.
    ///
    /// Units: radians/second
    pub max_angular_rads: f64,

    /// Forwards speed while following the line.
    ///
    /// Units: meters/second
    pub nominal_speed_ms: f64,

    // ---- INTERSECTIONS ----

    /// Number of consecutive cycles the dotted line must be seen for before entering an
    /// intersection.
    pub entry_debounce_ticks: u32,

    /// Distance to drive forwards into the intersection before turning.
    ///
    /// Units: meters
    pub mnvr_distance_m: f64,

    /// Magnitude of the heading change for turn left and turn right manouvres.
    ///
    /// Units: radians
    pub mnvr_turn_angle_rad: f64,

    /// Forwards speed while driving into the intersection.
    ///
    /// Units: meters/second
    pub mnvr_speed_ms: f64,

    /// Magnitude of the turn rate while turning on the spot.
    ///
    /// Units: radians/second
    pub mnvr_turn_rate_rads: f64,

    /// If set, the number of cycles to wait at an intersection for a sign before resuming
    /// line following. If not set the robot waits indefinitely.
    #[serde(default)]
    pub detect_wait_timeout_ticks: Option<u32>,

    // ---- OVERRIDES ----

    /// Forwards speed when a roadwork sign or yellow light is detected.
    ///
    /// Units: meters/second
    pub reduced_speed_ms: f64,

    // ---- CAPABILITIES ----

    /// Minimum forwards speed of the drive base.
    ///
    /// Units: meters/second
    pub min_linear_ms: f64,

    /// Maximum forwards speed of the drive base.
    ///
    /// Units: meters/second
    pub max_linear_ms: f64,

    /// Maximum turn rate magnitude of the drive base.
    ///
    /// Units: radians/second
    pub max_hw_angular_rads: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            k_p: 0.20,
            k_d: 0.016,
            deadband: 0.05,
            max_angular_rads: 0.2,
            nominal_speed_ms: 0.08,
            entry_debounce_ticks: 2,
            mnvr_distance_m: 0.25,
            mnvr_turn_angle_rad: 1.4,
            mnvr_speed_ms: 0.1,
            mnvr_turn_rate_rads: 0.1,
            detect_wait_timeout_ticks: None,
            reduced_speed_ms: 0.04,
            min_linear_ms: 0.0,
            max_linear_ms: 0.3,
            max_hw_angular_rads: 1.0,
        }
    }
}

impl Params {
    /// Check the parameters are consistent, returning a description of the first problem
    /// found.
    pub fn validate(&self) -> Result<(), String> {
        let non_negative = [
            ("deadband", self.deadband),
            ("max_angular_rads", self.max_angular_rads),
            ("mnvr_distance_m", self.mnvr_distance_m),
            ("mnvr_turn_angle_rad", self.mnvr_turn_angle_rad),
            ("max_hw_angular_rads", self.max_hw_angular_rads),
        ];

        for (name, value) in non_negative.iter() {
            if !value.is_finite() || *value < 0.0 {
                return Err(format!("{} must be finite and non-negative, got {}", name, value));
            }
        }

        // Manouvres must always make progress towards their target
        let positive = [
            ("mnvr_speed_ms", self.mnvr_speed_ms),
            ("mnvr_turn_rate_rads", self.mnvr_turn_rate_rads),
        ];

        for (name, value) in positive.iter() {
            if !value.is_finite() || *value <= 0.0 {
                return Err(format!("{} must be finite and positive, got {}", name, value));
            }
        }

        // Heading change is measured wrapped to [-pi, pi]
        if self.mnvr_turn_angle_rad >= std::f64::consts::PI {
            return Err(format!(
                "mnvr_turn_angle_rad must be less than pi, got {}",
                self.mnvr_turn_angle_rad
            ));
        }

        if self.entry_debounce_ticks == 0 {
            return Err("entry_debounce_ticks must be at least 1".into());
        }

        // A stop must remain a stop after the drive base limits
        if !(self.min_linear_ms <= 0.0 && 0.0 <= self.max_linear_ms) {
            return Err(format!(
                "linear limits [{}, {}] must include zero",
                self.min_linear_ms, self.max_linear_ms
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_validate() {
        assert!(Params::default().validate().is_ok());

        let mut p = Params::default();
        p.entry_debounce_ticks = 0;
        assert!(p.validate().is_err());

        let mut p = Params::default();
        p.deadband = -0.1;
        assert!(p.validate().is_err());

        let mut p = Params::default();
        p.min_linear_ms = 1.0;
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_linear_limits_include_zero() {
        let mut p = Params::default();
        p.min_linear_ms = 0.05;
        assert!(p.validate().is_err());

        let mut p = Params::default();
        p.max_linear_ms = -0.05;
        p.min_linear_ms = -0.1;
        assert!(p.validate().is_err());

        let mut p = Params::default();
        p.min_linear_ms = -0.1;
        assert!(p.validate().is_ok());
    }

    #[test]
    fn test_mnvr_must_progress() {
        let mut p = Params::default();
        p.mnvr_turn_angle_rad = 4.0;
        assert!(p.validate().is_err());

        let mut p = Params::default();
        p.mnvr_turn_angle_rad = std::f64::consts::PI;
        assert!(p.validate().is_err());

        let mut p = Params::default();
        p.mnvr_turn_angle_rad = 3.0;
        assert!(p.validate().is_ok());

        let mut p = Params::default();
        p.mnvr_turn_rate_rads = 0.0;
        assert!(p.validate().is_err());

        let mut p = Params::default();
        p.mnvr_speed_ms = 0.0;
        assert!(p.validate().is_err());

        let mut p = Params::default();
        p.mnvr_speed_ms = -0.1;
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_timeout_optional() {
        let p: Params = util::params::from_str(
            r#"
            k_p = 0.2
            k_d = 0.016
            deadband = 0.05
            max_angular_rads = 0.2
            nominal_speed_ms = 0.08
            entry_debounce_ticks = 2
            mnvr_distance_m = 0.25
            mnvr_turn_angle_rad = 1.4
            mnvr_speed_ms = 0.1
            mnvr_turn_rate_rads = 0.1
            reduced_speed_ms = 0.04
            min_linear_ms = 0.0
            max_linear_ms = 0.3
            max_hw_angular_rads = 1.0
            "#,
        )
        .unwrap();

        assert_eq!(p.detect_wait_timeout_ticks, None);
    }
}
