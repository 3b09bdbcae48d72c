//! # Line Executable Parameters
//!
//! This module provide parameters for the line executable.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct LineExecParams {
    /// Period of the control cycle.
    ///
    /// Units: seconds
    pub control_period_s: f64,

    /// Period of the vision processing, rounded to a whole number of control cycles.
    ///
    /// Units: seconds
    pub vision_period_s: f64,

    /// Name of the vision parameter file to use, this selects the vision pipeline.
    pub vision_params_file: String,

    /// Publish the processed line mask on the diagnostic stream
    pub publish_diagnostics: bool,

    /// Archive the line control status report and output every cycle
    pub archive_enabled: bool,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl LineExecParams {
    /// Check the cycle periods are usable.
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("control_period_s", self.control_period_s),
            ("vision_period_s", self.vision_period_s),
        ]
        .iter()
        {
            if !value.is_finite() || *value <= 0.0 {
                return Err(format!("{} must be finite and positive, got {}", name, value));
            }
        }

        Ok(())
    }

    /// Number of control cycles between each vision cycle, at least 1.
    pub fn vision_cycle_divisor(&self) -> u64 {
        let ratio = (self.vision_period_s / self.control_period_s).round();

        if ratio.is_finite() && ratio >= 1.0 {
            ratio as u64
        } else {
            1
        }
    }
}
