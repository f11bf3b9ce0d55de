//! Sampling trajectory optimizer
//!
//! A randomised shooting optimizer: each solve rolls out a population of
//! candidate joint-step sequences through the arm's forward kinematics,
//! scores each by how close its first waypoint carries the end effector to
//! the goal pose, and recommends the first step of the cheapest candidate.
//!
//! The mean step is warm-started from the previous solve, so consecutive
//! ticks refine rather than restart the search. In `Block` mode extra
//! refinement rounds are run with a shrinking perturbation magnitude, for as
//! long as the solve budget lasts; the first candidate of every round
//! replays the current mean unperturbed, so additional rounds can never
//! return a worse top candidate.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Instant;

// Internal
pub use params::*;

use crate::sim_arm::{ArmKinematics, NUM_ARM_JOINTS};
use ctrl_if::{
    CandidateBundle, CandidateTrajectory, ControlSpace, Goal, JointCommand, OptimError, Pose,
    RobotState, Solution, SolveMode, TrajectoryOptimizer,
};
use util::maths::clamp;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Randomised shooting optimizer over joint-space steps.
pub struct SamplingOptim {
    params: Params,

    /// Forward kinematics used for rollouts, matching the plant's.
    kin: ArmKinematics,

    rng: StdRng,

    /// Warm-start mean joint step carried between solves.
    ///
    /// Units: radians
    mean_step_rad: Vec<f64>,

    shutdown_done: bool,
}

/// A scored rollout, kept alongside the data needed to act on it.
struct Rollout {
    traj: CandidateTrajectory,
    step_rad: Vec<f64>,
    first_q_rad: Vec<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SamplingOptim {
    pub fn new(params: Params, kin: ArmKinematics) -> Self {
        let rng = StdRng::seed_from_u64(params.seed);
        Self {
            params,
            kin,
            rng,
            mean_step_rad: vec![0.0; NUM_ARM_JOINTS],
            shutdown_done: false,
        }
    }

    /// Cost of reaching `pose` when chasing `goal_pose`: terminal position
    /// distance plus a weighted attitude misalignment.
    fn cost(&self, pose: &Pose, goal_pose: &Pose) -> f64 {
        pose.pos_distance_m(goal_pose) + self.params.att_weight * pose.att_distance_rad(goal_pose)
    }

    /// Roll one candidate out from `q0` with the given per-joint step,
    /// returning the scored rollout.
    fn rollout(&self, q0: &[f64], step_rad: Vec<f64>, goal_pose: &Pose) -> Rollout {
        let mut q = q0.to_vec();
        let mut points_m = Vec::with_capacity(self.params.horizon_steps);
        let mut first_q_rad = Vec::new();

        for h in 0..self.params.horizon_steps {
            for i in 0..NUM_ARM_JOINTS {
                q[i] += step_rad[i];
            }
            if h == 0 {
                first_q_rad = q.clone();
            }
            points_m.push(self.kin.ee_pose(&q).position_m);
        }

        // Score on where the very first step lands: it is the only waypoint
        // the loop will actually command before resolving.
        let first_pose = self.kin.ee_pose(&first_q_rad);
        let cost = self.cost(&first_pose, goal_pose);

        Rollout {
            traj: CandidateTrajectory { points_m, cost },
            step_rad,
            first_q_rad,
        }
    }

    /// Draw a perturbed step around the current mean.
    fn perturbed_step(&mut self, mag_rad: f64) -> Vec<f64> {
        let max = self.params.max_step_rad;
        (0..NUM_ARM_JOINTS)
            .map(|i| {
                let step = self.mean_step_rad[i] + self.rng.gen_range(-mag_rad..=mag_rad);
                clamp(&step, &-max, &max)
            })
            .collect()
    }
}

impl TrajectoryOptimizer for SamplingOptim {
    fn solve(
        &mut self,
        state: &RobotState,
        goal: &Goal,
        _dt_s: f64,
        timeout_s: f64,
        mode: SolveMode,
    ) -> Result<Solution, OptimError> {
        let start = Instant::now();

        if self.shutdown_done {
            return Err(OptimError::Internal(
                "Solve requested after shutdown".into(),
            ));
        }
        if state.dof() != NUM_ARM_JOINTS {
            return Err(OptimError::Internal(format!(
                "State has {} joints, expected {}",
                state.dof(),
                NUM_ARM_JOINTS
            )));
        }
        if self.params.num_candidates == 0 {
            return Err(OptimError::NoSolution(
                "Candidate population size is zero".into(),
            ));
        }
        if self.params.horizon_steps == 0 {
            return Err(OptimError::NoSolution("Rollout horizon is zero".into()));
        }

        let rounds = match mode {
            SolveMode::Block => 1 + self.params.block_rounds,
            SolveMode::BestEffort => 1,
        };

        let goal_pose = goal.pose_rb;
        let mut mag_rad = self.params.perturb_mag_rad;
        let mut best_round: Option<Vec<Rollout>> = None;

        for round in 0..rounds {
            // Refinement rounds only run while the solve budget lasts, the
            // first round always completes so a solution is always returned
            if round > 0 && start.elapsed().as_secs_f64() >= timeout_s {
                break;
            }

            let mut rollouts = Vec::with_capacity(self.params.num_candidates);

            // The unperturbed mean is always candidate zero, so a refinement
            // round starts from at least the previous round's best.
            rollouts.push(self.rollout(&state.pos_rad, self.mean_step_rad.clone(), &goal_pose));
            for _ in 1..self.params.num_candidates {
                let step = self.perturbed_step(mag_rad);
                rollouts.push(self.rollout(&state.pos_rad, step, &goal_pose));
            }

            // Stable sort keeps draw order as the tie break
            rollouts.sort_by(|a, b| {
                a.traj
                    .cost
                    .partial_cmp(&b.traj.cost)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

            self.mean_step_rad = rollouts[0].step_rad.clone();

            let improved = match &best_round {
                Some(prev) => rollouts[0].traj.cost <= prev[0].traj.cost,
                None => true,
            };
            if improved {
                best_round = Some(rollouts);
            }

            mag_rad *= self.params.round_shrink;
        }

        // Unreachable with rounds >= 1, but avoid panicking on the unwrap path
        let rollouts = best_round
            .ok_or_else(|| OptimError::Internal("No refinement round completed".into()))?;

        let best = &rollouts[0];
        let ee_pose_rb = self.kin.ee_pose(&best.first_q_rad);
        let command = JointCommand {
            space: ControlSpace::Position,
            demands: best.first_q_rad.clone(),
        };
        let bundle = CandidateBundle {
            trajs: rollouts.into_iter().map(|r| r.traj).collect(),
        };

        Ok(Solution {
            command,
            ee_pose_rb,
            bundle,
            solve_time_s: start.elapsed().as_secs_f64(),
        })
    }

    fn shutdown(&mut self) {
        debug!("Sampling optimizer shutdown");
        self.shutdown_done = true;
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use nalgebra::Vector3;

    fn kin() -> ArmKinematics {
        ArmKinematics {
            link_lengths_m: [0.4, 0.4],
            base_height_m: 0.2,
        }
    }

    fn goal() -> Goal {
        Goal {
            pose_rb: Pose {
                position_m: Vector3::new(0.55, 0.0, 0.4),
                ..Pose::identity()
            },
            sim_time_s: 0.0,
        }
    }

    fn state() -> RobotState {
        RobotState {
            pos_rad: vec![0.0, 0.6, -1.2],
            vel_rads: vec![0.0; 3],
            acc_radss: vec![0.0; 3],
        }
    }

    #[test]
    fn test_solve_is_deterministic_for_a_seed() {
        let mut a = SamplingOptim::new(Params::default(), kin());
        let mut b = SamplingOptim::new(Params::default(), kin());

        let sol_a = a.solve(&state(), &goal(), 0.01, 0.01, SolveMode::BestEffort).unwrap();
        let sol_b = b.solve(&state(), &goal(), 0.01, 0.01, SolveMode::BestEffort).unwrap();

        assert_eq!(sol_a.command.demands, sol_b.command.demands);
        assert_eq!(sol_a.bundle.len(), sol_b.bundle.len());
        for (ta, tb) in sol_a.bundle.trajs.iter().zip(sol_b.bundle.trajs.iter()) {
            assert_eq!(ta.cost, tb.cost);
        }
    }

    #[test]
    fn test_bundle_is_ranked_best_first() {
        let mut optim = SamplingOptim::new(Params::default(), kin());
        let sol = optim
            .solve(&state(), &goal(), 0.01, 0.01, SolveMode::BestEffort)
            .unwrap();

        assert_eq!(sol.bundle.len(), Params::default().num_candidates);
        for pair in sol.bundle.trajs.windows(2) {
            assert!(pair[0].cost <= pair[1].cost);
        }
    }

    #[test]
    fn test_command_matches_arm_dof() {
        let mut optim = SamplingOptim::new(Params::default(), kin());
        let sol = optim
            .solve(&state(), &goal(), 0.01, 0.01, SolveMode::BestEffort)
            .unwrap();

        assert_eq!(sol.command.dof(), NUM_ARM_JOINTS);
        assert!(matches!(sol.command.space, ControlSpace::Position));
        for traj in &sol.bundle.trajs {
            assert_eq!(traj.points_m.len(), Params::default().horizon_steps);
        }
    }

    #[test]
    fn test_block_mode_is_no_worse_than_best_effort() {
        let mut fast = SamplingOptim::new(Params::default(), kin());
        let mut slow = SamplingOptim::new(Params::default(), kin());

        let sol_fast = fast
            .solve(&state(), &goal(), 0.01, 0.01, SolveMode::BestEffort)
            .unwrap();
        let sol_slow = slow
            .solve(&state(), &goal(), 0.01, 0.01, SolveMode::Block)
            .unwrap();

        // Identical seed, so the first round matches and refinement rounds
        // can only keep or improve the top cost
        assert!(sol_slow.bundle.trajs[0].cost <= sol_fast.bundle.trajs[0].cost);
    }

    #[test]
    fn test_solve_after_shutdown_is_rejected() {
        let mut optim = SamplingOptim::new(Params::default(), kin());
        optim.shutdown();

        assert!(matches!(
            optim.solve(&state(), &goal(), 0.01, 0.01, SolveMode::BestEffort),
            Err(OptimError::Internal(_))
        ));
    }

    #[test]
    fn test_zero_horizon_is_no_solution() {
        // A zero-length rollout has no waypoint to command from, reject it
        // rather than index into an empty rollout
        let params = Params {
            horizon_steps: 0,
            ..Params::default()
        };
        let mut optim = SamplingOptim::new(params, kin());

        assert!(matches!(
            optim.solve(&state(), &goal(), 0.01, 0.01, SolveMode::BestEffort),
            Err(OptimError::NoSolution(_))
        ));
    }

    #[test]
    fn test_block_refinement_respects_solve_budget() {
        let mut bounded = SamplingOptim::new(Params::default(), kin());
        let mut single = SamplingOptim::new(Params::default(), kin());

        // A zero budget leaves no time for refinement rounds, so Block mode
        // returns the same first-round result as BestEffort under the same
        // seed
        let sol_bounded = bounded
            .solve(&state(), &goal(), 0.01, 0.0, SolveMode::Block)
            .unwrap();
        let sol_single = single
            .solve(&state(), &goal(), 0.01, 0.01, SolveMode::BestEffort)
            .unwrap();

        assert_eq!(sol_bounded.command.demands, sol_single.command.demands);
        assert_eq!(
            sol_bounded.bundle.trajs[0].cost,
            sol_single.bundle.trajs[0].cost
        );
    }

    #[test]
    fn test_zero_candidates_is_no_solution() {
        let params = Params {
            num_candidates: 0,
            ..Params::default()
        };
        let mut optim = SamplingOptim::new(params, kin());

        assert!(matches!(
            optim.solve(&state(), &goal(), 0.01, 0.01, SolveMode::BestEffort),
            Err(OptimError::NoSolution(_))
        ));
    }
}
