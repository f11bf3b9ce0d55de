//! Parameters for the simulated arm plant.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

use super::ArmKinematics;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct Params {
    /// Kinematic description of the arm.
    pub kinematics: ArmKinematics,

    /// Initial joint positions at spawn.
    ///
    /// Units: radians
    pub initial_pos_rad: [f64; 3],

    /// Time constant of the first-order joint response.
    ///
    /// Units: seconds
    pub joint_tau_s: f64,

    /// Maximum joint rate.
    ///
    /// Units: radians/second
    pub max_joint_rate_rads: f64,

    /// Position of the arm base frame origin in the world frame.
    ///
    /// Units: meters
    pub spawn_pos_m_w: [f64; 3],

    /// Attitude of the arm base frame in the world frame, scalar-first
    /// `[w, x, y, z]`.
    pub spawn_att_q_w_wxyz: [f64; 4],
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            kinematics: ArmKinematics {
                link_lengths_m: [0.4, 0.4],
                base_height_m: 0.2,
            },
            initial_pos_rad: [0.0, 0.6, -1.2],
            joint_tau_s: 0.05,
            max_joint_rate_rads: 2.5,
            spawn_pos_m_w: [1.0, 2.0, 0.0],
            spawn_att_q_w_wxyz: [1.0, 0.0, 0.0, 0.0],
        }
    }
}
