//! Simulated arm plant
//!
//! Bench stand-in for the real manipulator: a 3-DOF arm (base yaw, shoulder,
//! elbow) with first-order joint dynamics toward the last commanded
//! position. Implements both the state sampler and command dispatcher
//! contracts through a shared handle, so the control loop drives it exactly
//! as it would drive real equipment.
//!
//! The plant is stepped from the main cycle *after* the control loop has
//! processed, so the command dispatched in tick N shapes the state sampled
//! in tick N+1.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::{UnitQuaternion, Vector3};
use serde::Deserialize;
use std::cell::RefCell;
use std::rc::Rc;

// Internal
pub use params::*;

use ctrl_if::{
    CommandDispatcher, ControlSpace, DispatchError, JointCommand, Pose, RobotState,
    StateSampleError, StateSampler,
};
use util::maths::clamp;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// The number of joints on the simulated arm.
pub const NUM_ARM_JOINTS: usize = 3;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Kinematic description of the arm, shared with the sampling optimizer so
/// its rollouts use the same forward kinematics as the plant.
#[derive(Debug, Copy, Clone, Deserialize)]
pub struct ArmKinematics {
    /// Lengths of the upper and lower arm links.
    ///
    /// Units: meters
    pub link_lengths_m: [f64; 2],

    /// Height of the shoulder joint above the arm base frame origin.
    ///
    /// Units: meters
    pub base_height_m: f64,
}

/// The simulated arm plant.
pub struct SimArm {
    params: Params,

    /// Joint positions. Units: radians
    pos_rad: Vec<f64>,

    /// Joint velocities. Units: radians/second
    vel_rads: Vec<f64>,

    /// Joint accelerations. Units: radians/second^2
    acc_radss: Vec<f64>,

    /// The last commanded joint positions. Units: radians
    target_rad: Vec<f64>,
}

/// Shared handle onto the simulated arm.
///
/// Cloned handles alias the same plant, letting the control loop hold one as
/// its state sampler and another as its command dispatcher while the main
/// cycle keeps a third for stepping.
#[derive(Clone)]
pub struct SimArmHandle(Rc<RefCell<SimArm>>);

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ArmKinematics {
    /// Forward kinematics: end-effector pose in the arm base frame for the
    /// given joint positions `[yaw, shoulder, elbow]`.
    pub fn ee_pose(&self, q: &[f64]) -> Pose {
        let (l1, l2) = (self.link_lengths_m[0], self.link_lengths_m[1]);
        let (yaw, shoulder, elbow) = (q[0], q[1], q[2]);

        // Reach and height in the vertical plane swept by the yaw axis
        let reach = l1 * shoulder.cos() + l2 * (shoulder + elbow).cos();
        let height = self.base_height_m + l1 * shoulder.sin() + l2 * (shoulder + elbow).sin();

        Pose {
            position_m: Vector3::new(reach * yaw.cos(), reach * yaw.sin(), height),
            attitude_q: UnitQuaternion::from_euler_angles(0.0, 0.0, yaw),
        }
    }
}

impl SimArm {
    /// Create a new plant at the configured initial joint positions.
    pub fn new(params: Params) -> Self {
        let pos_rad = params.initial_pos_rad.to_vec();
        Self {
            target_rad: pos_rad.clone(),
            pos_rad,
            vel_rads: vec![0.0; NUM_ARM_JOINTS],
            acc_radss: vec![0.0; NUM_ARM_JOINTS],
            params,
        }
    }

    /// Step the joint dynamics forward by `dt_s` seconds.
    ///
    /// Each joint moves toward its target with a first-order lag of time
    /// constant `joint_tau_s`, rate limited to `max_joint_rate_rads`.
    pub fn step(&mut self, dt_s: f64) {
        if dt_s <= 0.0 {
            return;
        }

        let max_rate = self.params.max_joint_rate_rads;
        let tau = self.params.joint_tau_s.max(dt_s);

        for i in 0..NUM_ARM_JOINTS {
            let rate = clamp(
                &((self.target_rad[i] - self.pos_rad[i]) / tau),
                &-max_rate,
                &max_rate,
            );

            self.acc_radss[i] = (rate - self.vel_rads[i]) / dt_s;
            self.vel_rads[i] = rate;
            self.pos_rad[i] += rate * dt_s;
        }
    }

    /// Snapshot of the current joint state.
    pub fn state(&self) -> RobotState {
        RobotState {
            pos_rad: self.pos_rad.clone(),
            vel_rads: self.vel_rads.clone(),
            acc_radss: self.acc_radss.clone(),
        }
    }

    /// Current end-effector pose in the arm base frame.
    pub fn ee_pose(&self) -> Pose {
        self.params.kinematics.ee_pose(&self.pos_rad)
    }
}

impl SimArmHandle {
    pub fn new(arm: SimArm) -> Self {
        Self(Rc::new(RefCell::new(arm)))
    }

    /// Step the underlying plant.
    pub fn step(&self, dt_s: f64) {
        self.0.borrow_mut().step(dt_s);
    }

    /// Current end-effector pose in the arm base frame.
    pub fn ee_pose(&self) -> Pose {
        self.0.borrow().ee_pose()
    }
}

impl StateSampler for SimArmHandle {
    /// Sample the plant state. The simulated sensor is immediate so the
    /// timeout can never be exceeded here.
    fn sample(&mut self, _timeout_s: f64) -> Result<RobotState, StateSampleError> {
        Ok(self.0.borrow().state())
    }
}

impl CommandDispatcher for SimArmHandle {
    fn dispatch(&mut self, command: &JointCommand) -> Result<(), DispatchError> {
        if command.dof() != NUM_ARM_JOINTS {
            return Err(DispatchError::DimensionMismatch {
                expected: NUM_ARM_JOINTS,
                got: command.dof(),
            });
        }

        match command.space {
            ControlSpace::Position => {
                self.0.borrow_mut().target_rad = command.demands.clone();
                Ok(())
            }
            space => Err(DispatchError::ActuatorFault(format!(
                "control space {:?} is not supported by the simulated arm",
                space
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_fk_at_zero() {
        let kin = ArmKinematics {
            link_lengths_m: [0.4, 0.4],
            base_height_m: 0.2,
        };

        // All joints at zero: fully extended along base X
        let pose = kin.ee_pose(&[0.0, 0.0, 0.0]);
        assert!((pose.position_m - Vector3::new(0.8, 0.0, 0.2)).norm() < 1e-12);
    }

    #[test]
    fn test_dispatch_dimension_mismatch() {
        let mut handle = SimArmHandle::new(SimArm::new(Params::default()));

        let result = handle.dispatch(&JointCommand {
            space: ControlSpace::Position,
            demands: vec![0.0; 7],
        });

        assert!(matches!(
            result,
            Err(DispatchError::DimensionMismatch {
                expected: NUM_ARM_JOINTS,
                got: 7
            })
        ));
    }

    #[test]
    fn test_plant_converges_to_command() {
        let mut handle = SimArmHandle::new(SimArm::new(Params::default()));

        let target = vec![0.5, -0.3, 0.8];
        handle
            .dispatch(&JointCommand {
                space: ControlSpace::Position,
                demands: target.clone(),
            })
            .unwrap();

        for _ in 0..10_000 {
            handle.step(0.01);
        }

        let state = handle.sample(0.005).unwrap();
        for i in 0..NUM_ARM_JOINTS {
            assert!((state.pos_rad[i] - target[i]).abs() < 1e-3);
        }
    }

    #[test]
    fn test_command_shapes_next_sample_not_current() {
        let mut handle = SimArmHandle::new(SimArm::new(Params::default()));

        let before = handle.sample(0.005).unwrap();
        handle
            .dispatch(&JointCommand {
                space: ControlSpace::Position,
                demands: vec![1.0, 1.0, 1.0],
            })
            .unwrap();

        // No step yet: the state is unchanged by dispatch alone
        let after_dispatch = handle.sample(0.005).unwrap();
        assert_eq!(before.pos_rad, after_dispatch.pos_rad);

        // Stepping moves the joints toward the command
        handle.step(0.01);
        let after_step = handle.sample(0.005).unwrap();
        assert!(after_step.pos_rad[0] > before.pos_rad[0]);
    }
}
