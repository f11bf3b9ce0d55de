//! Parameters structure for ControlLoop

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use ctrl_if::SolveMode;
use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the control loop.
#[derive(Debug, Clone, Deserialize)]
pub struct Params {
    /// Maximum time the state sampler may block for before the tick is
    /// treated as missed.
    ///
    /// Units: seconds
    pub state_timeout_s: f64,

    /// Time budget handed to the optimizer for one solve.
    ///
    /// Units: seconds
    pub optim_timeout_s: f64,

    /// Number of consecutive optimizer failures after which the loop stops
    /// with a fatal error.
    pub max_consec_optim_failures: u64,

    /// Whether the optimizer should block and refine within its budget or
    /// return its best-available solution immediately.
    pub solve_mode: SolveMode,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            state_timeout_s: 0.005,
            optim_timeout_s: 0.01,
            max_consec_optim_failures: 10,
            solve_mode: SolveMode::BestEffort,
        }
    }
}
