//! Control loop module
//!
//! The centrepiece of the arm software: each tick it projects the current
//! goal for diagnostics, samples the arm state, asks the trajectory
//! optimizer for a fresh solution, extracts the near-term command and
//! dispatches it, emitting a status report with tracking error and optimizer
//! latency.
//!
//! # Failure policy
//!
//! - State sample timeout: the tick is skipped, no command is issued and the
//!   loop stays in `Running`.
//! - Optimizer failure: the tick is skipped and a consecutive-failure
//!   counter increments; once it reaches the configured limit the loop stops
//!   with a fatal error rather than silently spinning against a dead
//!   optimizer. Any successful solve resets the counter.
//! - Dispatch failure: recorded in the report, non-fatal.
//! - Stop requests are honoured only at the tick boundary, in-flight
//!   collaborator calls always complete first.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod report;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Serialize;

// Internal
pub use params::*;
pub use report::*;
pub use state::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The possible modes of the control loop.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize)]
pub enum Mode {
    /// Before the first tick.
    Idle,

    /// Steady-state ticking.
    Running,

    /// Terminal mode, entered on cancellation or an unrecoverable
    /// collaborator failure. The optimizer has been shut down.
    Stopped,
}

impl Default for Mode {
    fn default() -> Self {
        Mode::Idle
    }
}

/// Why a tick was skipped without a command being dispatched.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize)]
pub enum SkipCause {
    /// The state sampler did not return within its timeout.
    StateTimeout,

    /// The state sampler failed outright.
    StateFault,

    /// The optimizer could not produce a solution.
    OptimFailure,
}

/// Possible errors that can occur during ControlLoop initialisation.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("Could not load ControlLoop parameters: {0}")]
    ParamLoadError(util::params::LoadError),

    #[error("The consecutive optimizer failure limit must be at least 1")]
    ZeroFailureLimit,
}

/// Possible errors that can occur during ControlLoop processing.
///
/// Recoverable per-tick failures never appear here, they are absorbed into
/// the tick's status report. Only fatal conditions escape.
#[derive(Debug, thiserror::Error)]
pub enum ProcError {
    #[error("The control loop has not been initialised")]
    NotInitialised,

    #[error("proc called after the control loop has stopped")]
    AlreadyStopped,

    #[error("The optimizer failed on {failures} consecutive ticks, limit is {limit}")]
    FatalOptimExhaustion { failures: u64, limit: u64 },
}
