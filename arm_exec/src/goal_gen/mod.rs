//! Goal trajectory generator module
//!
//! Produces the moving end-effector target the control loop tracks: a
//! multi-lobe sinusoidal pattern in the arm base frame, a pure function of
//! simulated time so replays and tests are reproducible.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use params::*;
pub use state::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during GoalGen initialisation.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("Could not load GoalGen parameters: {0}")]
    ParamLoadError(util::params::LoadError),

    #[error("The configured goal attitude quaternion is degenerate (norm = {0})")]
    DegenerateAttitude(f64),

    #[error("The configured goal period must be positive, got {0} s")]
    NonPositivePeriod(f64),
}

/// Possible errors that can occur during GoalGen processing.
#[derive(Debug, thiserror::Error)]
pub enum ProcError {
    #[error("Simulated time is not finite: {0}")]
    NonFiniteTime(f64),
}
