//! # Collaborator contracts
//!
//! The control loop drives three external collaborators each tick: a state
//! sampler, a trajectory optimizer and a command dispatcher. Each is modelled
//! as a trait so alternative implementations (a different sampling strategy,
//! a hardware dispatcher) can be substituted without touching the loop.
//!
//! All calls are synchronous from the loop's perspective. Implementations may
//! be internally concurrent but must return (or report a timeout) within the
//! budget they are given.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::goal::Goal;
use crate::pose::Pose;
use crate::robot::{JointCommand, RobotState};
use crate::traj::CandidateBundle;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The result of one optimizer solve.
#[derive(Debug, Clone)]
pub struct Solution {
    /// The recommended near-term command, taken from the top-ranked
    /// candidate's first waypoint.
    pub command: JointCommand,

    /// The end-effector pose the optimizer predicts the command will reach,
    /// in the arm base frame.
    pub ee_pose_rb: Pose,

    /// The sampled candidate trajectories, ranked best-first, with points in
    /// the arm base frame.
    pub bundle: CandidateBundle,

    /// Time the optimizer spent producing this solution.
    ///
    /// Units: seconds
    pub solve_time_s: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// How the optimizer should trade latency against solution quality.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub enum SolveMode {
    /// Keep refining until the solve's time budget is exhausted.
    Block,

    /// Return the best available solution immediately after one pass.
    BestEffort,
}

/// Errors which can occur while sampling the robot state.
#[derive(Debug, Error)]
pub enum StateSampleError {
    #[error("State sample did not complete within {timeout_s} s")]
    Timeout { timeout_s: f64 },

    #[error("State sensing failed: {0}")]
    SensorFailure(String),
}

/// Errors which can occur during an optimizer solve.
#[derive(Debug, Error)]
pub enum OptimError {
    #[error("The optimizer could not produce any candidate trajectory: {0}")]
    NoSolution(String),

    #[error("Internal optimizer failure: {0}")]
    Internal(String),
}

/// Errors which can occur while dispatching a command.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Command has {got} demands but the arm has {expected} joints")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Actuator fault: {0}")]
    ActuatorFault(String),
}

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Provides the arm's current sensed joint state.
pub trait StateSampler {
    /// Sample the current robot state.
    ///
    /// The call must not block for longer than `timeout_s` seconds; if the
    /// sample cannot be produced in time `StateSampleError::Timeout` is
    /// returned and the caller treats the tick as missed.
    fn sample(&mut self, timeout_s: f64) -> Result<RobotState, StateSampleError>;
}

/// Produces candidate trajectories and a recommended near-term command.
///
/// Treated as an opaque black box by the control loop: only this contract is
/// relied upon, never the optimizer's internal algorithm.
pub trait TrajectoryOptimizer {
    /// Solve for the given state and goal.
    ///
    /// `dt_s` is the control period the near-term command will be held for.
    /// `timeout_s` is the time budget for this solve; once it is spent the
    /// implementation shall return its best available solution rather than
    /// keep refining. The loop never issues a second solve before the first
    /// returns.
    fn solve(
        &mut self,
        state: &RobotState,
        goal: &Goal,
        dt_s: f64,
        timeout_s: f64,
        mode: SolveMode,
    ) -> Result<Solution, OptimError>;

    /// Release any resources held by the optimizer.
    ///
    /// Called exactly once when the control loop terminates.
    fn shutdown(&mut self);
}

/// Applies a joint command to the actuators.
pub trait CommandDispatcher {
    /// Dispatch the given command.
    ///
    /// Implementations shall validate the command's dimensionality against
    /// the arm's degree-of-freedom count.
    fn dispatch(&mut self, command: &JointCommand) -> Result<(), DispatchError>;
}
