//! Cyclic module interface
//!
//! The processing blocks of `line_exec` (line vision, line control) are driven by the main loop
//! through the [`State`] trait: one `init` at startup, then one `proc` per cycle on which the
//! module is scheduled.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use crate::session::Session;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A cyclic processing module.
///
/// Modules keep whatever they latch between cycles (previous error, controller mode) in the
/// implementing struct. A failed `proc` must leave that latched state usable on the next cycle.
pub trait State {
    /// Data needed to initialise the module, usually the name of its parameter file.
    type InitData;

    /// Error raised by `init`. These are fatal at startup.
    type InitError: std::error::Error + Send + Sync + 'static;

    /// Data consumed each cycle.
    type InputData;

    /// Data produced each cycle.
    type OutputData;

    /// Diagnostic report produced each cycle alongside the output.
    type StatusReport;

    /// Error raised by `proc`. The main loop logs these and continues.
    type ProcError: std::error::Error;

    /// Load parameters and reset the module, opening any archives in `session`.
    fn init(&mut self, init_data: Self::InitData, session: &Session)
        -> Result<(), Self::InitError>;

    /// Run one cycle of processing.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>;
}
