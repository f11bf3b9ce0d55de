//! Status report for the control loop

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

use super::{Mode, SkipCause};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The per-tick status report, the loop's diagnostic record.
#[derive(Debug, Default, Clone, Serialize)]
pub struct StatusReport {
    /// Simulated time of the tick this report describes.
    ///
    /// Units: seconds
    pub sim_time_s: f64,

    /// The mode the loop is in after processing this tick.
    pub mode: Mode,

    /// Position tracking error between the optimizer's predicted
    /// end-effector pose and the current goal.
    ///
    /// Units: meters
    pub track_error_m: f64,

    /// Attitude tracking error between the optimizer's predicted
    /// end-effector pose and the current goal.
    ///
    /// Units: radians
    pub track_error_rad: f64,

    /// Wall-clock time the optimizer call took this tick.
    ///
    /// Units: seconds
    pub optim_latency_s: f64,

    /// Wall-clock time between this tick and the previous one, `None` on the
    /// first tick.
    ///
    /// Units: seconds
    pub observed_period_s: Option<f64>,

    /// Why this tick was skipped, or `None` if it completed.
    pub skip: Option<SkipCause>,

    /// True if the command dispatch failed this tick (non-fatal).
    pub dispatch_failed: bool,

    /// Current count of consecutive optimizer failures.
    pub consec_optim_failures: u64,
}
