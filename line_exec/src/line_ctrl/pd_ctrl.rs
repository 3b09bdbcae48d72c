//! PD controller on the normalised line error

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Proportional-derivative controller with a deadband and a symmetric output limit.
///
/// There is no integral term.
#[derive(Debug, Clone, Copy)]
pub struct PdCtrl {
    k_p: f64,
    k_d: f64,
    deadband: f64,
    limit: f64,

    prev_error: f64,
}

/// The result of a single controller update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PdOutput {
    /// The limited demand
    pub demand: f64,

    /// True if the error was inside the deadband
    pub in_deadband: bool,

    /// True if the demand was limited
    pub limited: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PdCtrl {
    pub fn new(k_p: f64, k_d: f64, deadband: f64, limit: f64) -> Self {
        Self {
            k_p,
            k_d,
            deadband,
            limit,
            prev_error: 0.0,
        }
    }

    /// The error passed to the last call to [`PdCtrl::update`].
    pub fn prev_error(&self) -> f64 {
        self.prev_error
    }

    /// Record an error without computing a demand.
    ///
    /// The derivative term of the next update is taken against this error.
    pub fn track(&mut self, error: f64) {
        self.prev_error = error;
    }

    /// Compute the demand for the given error and record it as the previous error.
    pub fn update(&mut self, error: f64) -> PdOutput {
        let proportional = self.k_p * error;
        let derivative = self.k_d * (error - self.prev_error);

        self.prev_error = error;

        if error.abs() <= self.deadband {
            return PdOutput {
                demand: 0.0,
                in_deadband: true,
                limited: false,
            };
        }

        let (demand, limited) = util::maths::clamp_sym(proportional + derivative, self.limit);

        PdOutput {
            demand,
            in_deadband: false,
            limited,
        }
    }
}
