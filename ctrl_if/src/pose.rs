//! # Pose definitions
//!
//! A pose is a rigid transform between two frames, used both for the arm's
//! mounting pose (world to arm base) and for end-effector targets in the arm
//! base frame.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::{Quaternion, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Maximum deviation from 1.0 accepted for the norm of a raw orientation quaternion.
pub const QUAT_UNIT_NORM_TOL: f64 = 1e-6;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A rigid 3D pose (position and orientation).
///
/// The frame the pose is expressed in is given by the owning item, for
/// example [`crate::goal::Goal`] poses are in the arm base frame.
///
/// Raw quaternions entering this type are **scalar-first**, `[w, x, y, z]`.
/// This convention is applied uniformly across the software.
#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
pub struct Pose {
    /// The position of the pose's frame in its parent frame.
    ///
    /// Units: meters
    pub position_m: Vector3<f64>,

    /// The orientation of the pose's frame in its parent frame. This
    /// quaternion rotates a vector from the pose's frame into the parent
    /// frame.
    pub attitude_q: UnitQuaternion<f64>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors which can occur when constructing a pose from raw data.
#[derive(Debug, Error)]
pub enum PoseError {
    #[error(
        "The orientation quaternion is not a unit quaternion (norm = {norm}, tolerance = {tol})"
    )]
    InvalidOrientation { norm: f64, tol: f64 },
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Pose {
    /// Build a pose from a raw position and scalar-first `[w, x, y, z]`
    /// quaternion.
    ///
    /// The quaternion must be a unit quaternion to within
    /// [`QUAT_UNIT_NORM_TOL`], otherwise `PoseError::InvalidOrientation` is
    /// returned. Callers holding unnormalised orientations must normalise
    /// them explicitly before constructing a pose.
    pub fn from_raw(
        position_m: [f64; 3],
        attitude_q_wxyz: [f64; 4],
    ) -> Result<Self, PoseError> {
        let q = Quaternion::new(
            attitude_q_wxyz[0],
            attitude_q_wxyz[1],
            attitude_q_wxyz[2],
            attitude_q_wxyz[3],
        );

        let norm = q.norm();
        if (norm - 1.0).abs() > QUAT_UNIT_NORM_TOL {
            return Err(PoseError::InvalidOrientation {
                norm,
                tol: QUAT_UNIT_NORM_TOL,
            });
        }

        Ok(Self {
            position_m: Vector3::from(position_m),
            attitude_q: UnitQuaternion::from_quaternion(q),
        })
    }

    /// The identity pose, i.e. coincident with the parent frame.
    pub fn identity() -> Self {
        Self {
            position_m: Vector3::zeros(),
            attitude_q: UnitQuaternion::identity(),
        }
    }

    /// Distance between the positions of this pose and another.
    ///
    /// Units: meters
    pub fn pos_distance_m(&self, other: &Pose) -> f64 {
        (self.position_m - other.position_m).norm()
    }

    /// Angular distance between the orientations of this pose and another.
    ///
    /// Units: radians
    pub fn att_distance_rad(&self, other: &Pose) -> f64 {
        self.attitude_q.angle_to(&other.attitude_q)
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_from_raw_accepts_unit_quat() {
        let pose = Pose::from_raw([1.0, 2.0, 3.0], [1.0, 0.0, 0.0, 0.0]).unwrap();
        assert_eq!(pose.position_m, Vector3::new(1.0, 2.0, 3.0));
        assert!(pose.att_distance_rad(&Pose::identity()) < 1e-12);
    }

    #[test]
    fn test_from_raw_rejects_non_unit_quat() {
        // The bench goal orientation parameter is not unit and must be
        // rejected here rather than silently normalised.
        let result = Pose::from_raw([0.0; 3], [0.0, 0.99, -0.01, -0.01]);
        assert!(matches!(
            result,
            Err(PoseError::InvalidOrientation { .. })
        ));
    }
}
