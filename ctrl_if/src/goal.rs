//! # End-effector goal definitions

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::pose::Pose;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The desired end-effector target for one control tick.
///
/// Regenerated once per tick by the goal generator and read-only thereafter.
#[derive(Debug, Copy, Clone, Default, Serialize, Deserialize)]
pub struct Goal {
    /// The target end-effector pose in the arm base frame.
    pub pose_rb: Pose,

    /// The simulated time this goal was generated for.
    ///
    /// Units: seconds
    pub sim_time_s: f64,
}
