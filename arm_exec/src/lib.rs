//! # Arm library.
//!
//! This library allows other crates in the workspace, and the executable's
//! own integration tests, to access items defined inside the arm crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Global data store for the executable
pub mod data_store;

/// World to arm-base frame transform
pub mod frame;

/// Goal trajectory generator module - produces the moving end-effector target
pub mod goal_gen;

/// Control loop module - drives the arm towards the goal each tick
pub mod ctrl_loop;

/// Simulated arm plant - bench stand-in for the real manipulator
pub mod sim_arm;

/// Sampling trajectory optimizer - bench implementation of the optimizer contract
pub mod sampling_optim;
