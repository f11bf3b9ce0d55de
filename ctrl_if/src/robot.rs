//! # Robot state and joint command definitions

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A snapshot of the arm's sensed joint state.
///
/// Produced once per control tick by the state sampler and immutable for the
/// remainder of that tick's processing. All three vectors have the arm's
/// degree-of-freedom count as their length.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RobotState {
    /// Joint positions.
    ///
    /// Units: radians
    pub pos_rad: Vec<f64>,

    /// Joint velocities.
    ///
    /// Units: radians/second
    pub vel_rads: Vec<f64>,

    /// Joint accelerations.
    ///
    /// Units: radians/second^2
    pub acc_radss: Vec<f64>,
}

/// A joint-space demand to be applied by the command dispatcher this tick.
///
/// The demand vector's interpretation depends on the configured control
/// space. Ownership is handed to the dispatcher and the command is not
/// retained across the tick boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JointCommand {
    /// The control space the demands are expressed in.
    pub space: ControlSpace,

    /// The demanded value for each joint.
    ///
    /// Units: radians, radians/second or radians/second^2 depending on
    /// `space`.
    pub demands: Vec<f64>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// The control space a joint command is expressed in.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub enum ControlSpace {
    Position,
    Velocity,
    Acceleration,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl RobotState {
    /// Build a zeroed state for an arm with the given degree-of-freedom count.
    pub fn zeros(dof: usize) -> Self {
        Self {
            pos_rad: vec![0.0; dof],
            vel_rads: vec![0.0; dof],
            acc_radss: vec![0.0; dof],
        }
    }

    /// The degree-of-freedom count of this state.
    pub fn dof(&self) -> usize {
        self.pos_rad.len()
    }
}

impl JointCommand {
    /// The degree-of-freedom count of this command.
    pub fn dof(&self) -> usize {
        self.demands.len()
    }
}
