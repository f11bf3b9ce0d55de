//! # Frame transform module
//!
//! Provides the fixed transform between the world frame and the arm base
//! frame, along with the pure pose composition and inversion operations the
//! control loop uses to project goals and candidate trajectories for
//! diagnostics.
//!
//! Control maths itself stays in the arm base frame, projection into the
//! world frame is a diagnostic side-channel only.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::{UnitQuaternion, Vector3};

// Internal
use ctrl_if::{Pose, PoseError};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The transform from the world frame to the arm base frame.
///
/// Fixed at initialisation from the arm's spawn pose and never mutated
/// afterwards, so it may be read by any diagnostic consumer without
/// synchronisation for the loop's entire lifetime.
#[derive(Debug, Copy, Clone)]
pub struct FrameTransform {
    /// The arm base frame expressed in the world frame.
    w_t_rb: Pose,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl FrameTransform {
    /// Build the transform from the arm's spawn pose (arm base in the world
    /// frame).
    ///
    /// The pose's orientation is already guaranteed unit by the `Pose` type,
    /// raw data must come in through [`Pose::from_raw`] which rejects
    /// non-unit quaternions.
    pub fn new(w_t_rb: Pose) -> Self {
        Self { w_t_rb }
    }

    /// Build the transform from a raw position and scalar-first quaternion.
    pub fn from_raw(
        position_m: [f64; 3],
        attitude_q_wxyz: [f64; 4],
    ) -> Result<Self, PoseError> {
        Ok(Self::new(Pose::from_raw(position_m, attitude_q_wxyz)?))
    }

    /// Compose two poses: `b` given relative to `a`, returned in `a`'s
    /// parent frame.
    ///
    /// The resulting orientation is renormalised to bound floating point
    /// drift under repeated composition.
    pub fn compose(a: &Pose, b: &Pose) -> Pose {
        Pose {
            position_m: a.position_m + a.attitude_q.transform_vector(&b.position_m),
            attitude_q: renormalise(a.attitude_q * b.attitude_q),
        }
    }

    /// Invert a pose: the returned pose maps `a`'s frame back to its parent.
    pub fn invert(a: &Pose) -> Pose {
        let inv_q = a.attitude_q.inverse();
        Pose {
            position_m: -inv_q.transform_vector(&a.position_m),
            attitude_q: renormalise(inv_q),
        }
    }

    /// Project a pose in the arm base frame into the world frame.
    pub fn pose_to_world(&self, pose_rb: &Pose) -> Pose {
        Self::compose(&self.w_t_rb, pose_rb)
    }

    /// Project a point in the arm base frame into the world frame.
    pub fn point_to_world(&self, point_m_rb: &Vector3<f64>) -> Vector3<f64> {
        self.w_t_rb.position_m + self.w_t_rb.attitude_q.transform_vector(point_m_rb)
    }

    /// Project a pose in the world frame into the arm base frame.
    pub fn pose_to_base(&self, pose_w: &Pose) -> Pose {
        Self::compose(&Self::invert(&self.w_t_rb), pose_w)
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Renormalise a unit quaternion after a multiply.
fn renormalise(q: UnitQuaternion<f64>) -> UnitQuaternion<f64> {
    UnitQuaternion::new_normalize(q.into_inner())
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use nalgebra::UnitQuaternion;
    use std::f64::consts::PI;

    const TOL: f64 = 1e-9;

    fn test_pose() -> Pose {
        Pose {
            position_m: Vector3::new(0.3, -1.2, 0.8),
            attitude_q: UnitQuaternion::from_euler_angles(0.1, -0.4, 2.0),
        }
    }

    fn poses_close(a: &Pose, b: &Pose) -> bool {
        a.pos_distance_m(b) < TOL && a.att_distance_rad(b) < TOL
    }

    #[test]
    fn test_invert_round_trip() {
        let a = test_pose();
        let a_round_trip = FrameTransform::invert(&FrameTransform::invert(&a));
        assert!(poses_close(&a, &a_round_trip));
    }

    #[test]
    fn test_compose_invert_identity() {
        let a = test_pose();
        let b = Pose {
            position_m: Vector3::new(1.0, 2.0, -0.5),
            attitude_q: UnitQuaternion::from_euler_angles(-0.7, 0.2, 0.3),
        };

        // inv(A) * (A * B) == B
        let ab = FrameTransform::compose(&a, &b);
        let b_again = FrameTransform::compose(&FrameTransform::invert(&a), &ab);
        assert!(poses_close(&b, &b_again));
    }

    #[test]
    fn test_point_to_world() {
        // Arm base at (1, 2, 3) yawed a quarter turn: base X maps to world Y
        let frame = FrameTransform::new(Pose {
            position_m: Vector3::new(1.0, 2.0, 3.0),
            attitude_q: UnitQuaternion::from_euler_angles(0.0, 0.0, PI / 2.0),
        });

        let point_w = frame.point_to_world(&Vector3::new(1.0, 0.0, 0.0));
        assert!((point_w - Vector3::new(1.0, 3.0, 3.0)).norm() < TOL);
    }

    #[test]
    fn test_pose_to_base_inverts_pose_to_world() {
        let frame = FrameTransform::new(test_pose());
        let p_rb = Pose {
            position_m: Vector3::new(0.55, 0.0, 0.4),
            attitude_q: UnitQuaternion::from_euler_angles(0.0, PI, 0.0),
        };

        let p_w = frame.pose_to_world(&p_rb);
        let p_rb_again = frame.pose_to_base(&p_w);
        assert!(poses_close(&p_rb, &p_rb_again));
    }

    #[test]
    fn test_composition_stays_normalised() {
        // Repeated composition must not let the orientation norm drift
        let a = test_pose();
        let mut acc = Pose::identity();
        for _ in 0..10_000 {
            acc = FrameTransform::compose(&acc, &a);
        }
        assert!((acc.attitude_q.into_inner().norm() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_from_raw_rejects_non_unit_quat() {
        assert!(FrameTransform::from_raw([0.0; 3], [0.9, 0.1, 0.0, 0.0]).is_err());
    }
}
