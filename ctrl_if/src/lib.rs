//! # Control interfaces crate.
//!
//! Provides the common data types and collaborator contracts shared between
//! the arm control loop and the equipment it drives (state sensing,
//! trajectory optimisation and command dispatch).

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Rigid 3D pose (position + orientation) definitions
pub mod pose;

/// Robot state and joint command definitions
pub mod robot;

/// End-effector goal definitions
pub mod goal;

/// Candidate trajectory bundle definitions
pub mod traj;

/// Collaborator contracts (state sampler, trajectory optimizer, command dispatcher)
pub mod optim;

// ------------------------------------------------------------------------------------------------
// REEXPORTS
// ------------------------------------------------------------------------------------------------

pub use goal::Goal;
pub use optim::{
    CommandDispatcher, DispatchError, OptimError, Solution, SolveMode, StateSampleError,
    StateSampler, TrajectoryOptimizer,
};
pub use pose::{Pose, PoseError};
pub use robot::{ControlSpace, JointCommand, RobotState};
pub use traj::{CandidateBundle, CandidateTrajectory};
