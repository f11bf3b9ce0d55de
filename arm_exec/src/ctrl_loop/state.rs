//! Control loop module state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{error, info, warn};
use std::time::Instant;

// Internal
use super::*;
use crate::frame::FrameTransform;
use ctrl_if::{
    CandidateBundle, CandidateTrajectory, CommandDispatcher, Goal, JointCommand, Pose,
    StateSampleError, StateSampler, TrajectoryOptimizer,
};
use util::{module::State, params, session::Session};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The control loop.
///
/// Owns its three collaborators behind trait objects so alternative
/// implementations can be substituted without touching the loop itself. All
/// per-tick data (state, goal, solution, command) is scoped to a single call
/// of `proc` and dropped before the next tick.
#[derive(Default)]
pub struct ControlLoop {
    params: Params,

    /// World to arm-base transform, fixed for the loop's lifetime.
    frame: Option<FrameTransform>,

    sampler: Option<Box<dyn StateSampler>>,
    optim: Option<Box<dyn TrajectoryOptimizer>>,
    dispatcher: Option<Box<dyn CommandDispatcher>>,

    /// Executing mode
    mode: Mode,

    /// Count of consecutive optimizer failures.
    consec_optim_failures: u64,

    /// Wall-clock instant of the previous tick, for the observed period.
    last_tick: Option<Instant>,

    /// True once the optimizer has been shut down. Guards the
    /// exactly-once shutdown contract.
    shutdown_done: bool,

    output_data: OutputData,
    report: StatusReport,
}

/// Data required to initialise the module.
pub struct InitData {
    /// Path to the parameter file.
    pub params_path: &'static str,

    /// The world to arm-base transform, taken from the arm's spawn pose.
    pub frame: FrameTransform,

    /// The state sensing collaborator.
    pub sampler: Box<dyn StateSampler>,

    /// The trajectory optimisation collaborator.
    pub optim: Box<dyn TrajectoryOptimizer>,

    /// The command dispatch collaborator.
    pub dispatcher: Box<dyn CommandDispatcher>,
}

/// Input data to the module
#[derive(Copy, Clone, Default)]
pub struct InputData {
    /// Elapsed simulated time for this tick.
    ///
    /// Units: seconds
    pub sim_time_s: f64,

    /// The control period the dispatched command will be held for.
    ///
    /// Units: seconds
    pub dt_s: f64,

    /// The goal for this tick.
    pub goal: Goal,

    /// True if a stop has been requested. Checked only here, at the tick
    /// boundary, so in-flight collaborator calls are never interrupted.
    pub stop_requested: bool,
}

/// Output data of the module.
///
/// World-frame projections are owned copies handed out for diagnostics and
/// visualisation, consumers never hold references into the loop's tick data.
#[derive(Clone, Default)]
pub struct OutputData {
    /// The command dispatched this tick, `None` if the tick was skipped or
    /// dispatch failed.
    pub command: Option<JointCommand>,

    /// The goal pose projected into the world frame.
    pub goal_w: Option<Pose>,

    /// The candidate trajectory bundle projected into the world frame,
    /// ranking preserved.
    pub bundle_w: Option<CandidateBundle>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for ControlLoop {
    type InitData = InitData;
    type InitError = InitError;

    type InputData = InputData;
    type OutputData = OutputData;
    type StatusReport = StatusReport;
    type ProcError = ProcError;

    /// Initialise the ControlLoop module.
    fn init(
        &mut self,
        init_data: Self::InitData,
        _session: &Session,
    ) -> Result<(), Self::InitError> {
        // Load the parameters
        let params = match params::load(init_data.params_path) {
            Ok(p) => p,
            Err(e) => return Err(InitError::ParamLoadError(e)),
        };

        self.set_params(params)?;
        self.attach(
            init_data.frame,
            init_data.sampler,
            init_data.optim,
            init_data.dispatcher,
        );

        Ok(())
    }

    /// Process one control tick.
    ///
    /// Recoverable failures are absorbed into the status report; only the
    /// fatal conditions (`FatalOptimExhaustion`, use after stop) escape as
    /// errors.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        // Setup tick data
        self.output_data = OutputData::default();
        self.report = StatusReport::default();
        self.report.sim_time_s = input_data.sim_time_s;

        match self.mode {
            // First tick moves the loop into steady-state ticking
            Mode::Idle => {
                self.mode = Mode::Running;
                self.tick(input_data)?
            }
            Mode::Running => self.tick(input_data)?,
            Mode::Stopped => return Err(ProcError::AlreadyStopped),
        }

        self.report.mode = self.mode;
        self.report.consec_optim_failures = self.consec_optim_failures;

        Ok((self.output_data.clone(), self.report.clone()))
    }
}

impl ControlLoop {
    /// Build a loop directly from parameters and collaborators, without a
    /// parameter file.
    pub fn with_params(
        params: Params,
        frame: FrameTransform,
        sampler: Box<dyn StateSampler>,
        optim: Box<dyn TrajectoryOptimizer>,
        dispatcher: Box<dyn CommandDispatcher>,
    ) -> Result<Self, InitError> {
        let mut ctrl_loop = Self::default();
        ctrl_loop.set_params(params)?;
        ctrl_loop.attach(frame, sampler, optim, dispatcher);
        Ok(ctrl_loop)
    }

    /// The loop's current mode.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    fn set_params(&mut self, params: Params) -> Result<(), InitError> {
        if params.max_consec_optim_failures == 0 {
            return Err(InitError::ZeroFailureLimit);
        }
        self.params = params;
        Ok(())
    }

    fn attach(
        &mut self,
        frame: FrameTransform,
        sampler: Box<dyn StateSampler>,
        optim: Box<dyn TrajectoryOptimizer>,
        dispatcher: Box<dyn CommandDispatcher>,
    ) {
        self.frame = Some(frame);
        self.sampler = Some(sampler);
        self.optim = Some(optim);
        self.dispatcher = Some(dispatcher);
    }

    /// One iteration of the running loop.
    fn tick(&mut self, input: &InputData) -> Result<(), ProcError> {
        // Stop requests are honoured here and only here, the tick boundary
        if input.stop_requested {
            info!("Stop requested, control loop stopping");
            self.stop();
            return Ok(());
        }

        let frame = self.frame.ok_or(ProcError::NotInitialised)?;
        if self.sampler.is_none() || self.optim.is_none() || self.dispatcher.is_none() {
            return Err(ProcError::NotInitialised);
        }

        // Observed period between this tick and the previous one
        let now = Instant::now();
        self.report.observed_period_s = self.last_tick.map(|t| (now - t).as_secs_f64());
        self.last_tick = Some(now);

        let goal = input.goal;

        // Project the goal into the world frame for external consumers.
        // Diagnostic side-channel only, control maths stays in the base
        // frame.
        self.output_data.goal_w = Some(frame.pose_to_world(&goal.pose_rb));

        // Sample the arm state. A timeout or sensor fault misses the tick:
        // no command is issued and the loop stays in Running.
        let state = match self
            .sampler
            .as_mut()
            .unwrap()
            .sample(self.params.state_timeout_s)
        {
            Ok(s) => s,
            Err(StateSampleError::Timeout { timeout_s }) => {
                warn!("State sample timed out after {} s, skipping tick", timeout_s);
                self.report.skip = Some(SkipCause::StateTimeout);
                return Ok(());
            }
            Err(e) => {
                warn!("State sample failed: {}, skipping tick", e);
                self.report.skip = Some(SkipCause::StateFault);
                return Ok(());
            }
        };

        // Ask the optimizer for a fresh solution. Failures are tolerated up
        // to the consecutive limit, then fatal.
        let solve_start = Instant::now();
        let solution = match self.optim.as_mut().unwrap().solve(
            &state,
            &goal,
            input.dt_s,
            self.params.optim_timeout_s,
            self.params.solve_mode,
        ) {
            Ok(s) => {
                self.consec_optim_failures = 0;
                s
            }
            Err(e) => {
                self.consec_optim_failures += 1;
                self.report.skip = Some(SkipCause::OptimFailure);

                let limit = self.params.max_consec_optim_failures;
                warn!(
                    "Optimizer failure ({} of {} consecutive allowed): {}",
                    self.consec_optim_failures, limit, e
                );

                if self.consec_optim_failures >= limit {
                    error!("Optimizer failure limit reached, control loop stopping");
                    self.stop();
                    return Err(ProcError::FatalOptimExhaustion {
                        failures: self.consec_optim_failures,
                        limit,
                    });
                }

                return Ok(());
            }
        };
        self.report.optim_latency_s = solve_start.elapsed().as_secs_f64();

        // Tracking error between the predicted end-effector pose and the
        // goal
        self.report.track_error_m = solution.ee_pose_rb.pos_distance_m(&goal.pose_rb);
        self.report.track_error_rad = solution.ee_pose_rb.att_distance_rad(&goal.pose_rb);

        // Project the candidate bundle into the world frame for
        // visualisation. Read-only: the solution itself is not mutated and
        // the projected copy is owned by the output.
        self.output_data.bundle_w = Some(CandidateBundle {
            trajs: solution
                .bundle
                .trajs
                .iter()
                .map(|traj| CandidateTrajectory {
                    points_m: traj
                        .points_m
                        .iter()
                        .map(|p| frame.point_to_world(p))
                        .collect(),
                    cost: traj.cost,
                })
                .collect(),
        });

        // Dispatch the near-term command. A single failed dispatch is not
        // fatal, the loop keeps ticking.
        match self.dispatcher.as_mut().unwrap().dispatch(&solution.command) {
            Ok(()) => self.output_data.command = Some(solution.command),
            Err(e) => {
                warn!("Command dispatch failed: {}", e);
                self.report.dispatch_failed = true;
            }
        }

        Ok(())
    }

    /// Transition into `Stopped`, releasing the optimizer's resources.
    ///
    /// The optimizer's `shutdown` is called exactly once no matter how the
    /// loop terminates.
    fn stop(&mut self) {
        self.mode = Mode::Stopped;

        if !self.shutdown_done {
            if let Some(optim) = self.optim.as_mut() {
                optim.shutdown();
            }
            self.shutdown_done = true;
            info!("Optimizer shut down");
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use ctrl_if::{ControlSpace, DispatchError, OptimError, RobotState, Solution, SolveMode};
    use nalgebra::Vector3;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    /// Observations shared between the test and the mock collaborators.
    #[derive(Default)]
    struct Shared {
        dispatches: Vec<JointCommand>,
        solve_timeouts: Vec<f64>,
        shutdowns: u32,
    }

    struct MockSampler {
        /// Scripted results, front first; when empty every sample succeeds.
        script: VecDeque<Result<(), StateSampleError>>,
    }

    impl StateSampler for MockSampler {
        fn sample(&mut self, _timeout_s: f64) -> Result<RobotState, StateSampleError> {
            match self.script.pop_front() {
                Some(Ok(())) | None => Ok(RobotState::zeros(3)),
                Some(Err(e)) => Err(e),
            }
        }
    }

    struct MockOptim {
        shared: Rc<RefCell<Shared>>,
        /// Scripted failures, front first; when empty every solve succeeds.
        fail_script: VecDeque<bool>,
        command_dof: usize,
    }

    impl TrajectoryOptimizer for MockOptim {
        fn solve(
            &mut self,
            _state: &RobotState,
            goal: &Goal,
            _dt_s: f64,
            timeout_s: f64,
            _mode: SolveMode,
        ) -> Result<Solution, OptimError> {
            self.shared.borrow_mut().solve_timeouts.push(timeout_s);

            if self.fail_script.pop_front().unwrap_or(false) {
                return Err(OptimError::NoSolution("scripted failure".into()));
            }

            // Predicted pose 0.1 m short of the goal in x
            let mut ee_pose_rb = goal.pose_rb;
            ee_pose_rb.position_m[0] -= 0.1;

            Ok(Solution {
                command: JointCommand {
                    space: ControlSpace::Position,
                    demands: vec![0.1; self.command_dof],
                },
                ee_pose_rb,
                bundle: CandidateBundle {
                    trajs: vec![
                        CandidateTrajectory {
                            points_m: vec![Vector3::zeros(), Vector3::new(0.1, 0.0, 0.0)],
                            cost: 0.5,
                        },
                        CandidateTrajectory {
                            points_m: vec![Vector3::zeros()],
                            cost: 0.9,
                        },
                    ],
                },
                solve_time_s: 0.001,
            })
        }

        fn shutdown(&mut self) {
            self.shared.borrow_mut().shutdowns += 1;
        }
    }

    struct MockDispatcher {
        shared: Rc<RefCell<Shared>>,
        dof: usize,
    }

    impl CommandDispatcher for MockDispatcher {
        fn dispatch(&mut self, command: &JointCommand) -> Result<(), DispatchError> {
            if command.dof() != self.dof {
                return Err(DispatchError::DimensionMismatch {
                    expected: self.dof,
                    got: command.dof(),
                });
            }
            self.shared.borrow_mut().dispatches.push(command.clone());
            Ok(())
        }
    }

    struct TestRig {
        ctrl_loop: ControlLoop,
        shared: Rc<RefCell<Shared>>,
    }

    fn rig(
        max_failures: u64,
        sampler_script: Vec<Result<(), StateSampleError>>,
        fail_script: Vec<bool>,
        command_dof: usize,
    ) -> TestRig {
        let shared = Rc::new(RefCell::new(Shared::default()));

        let frame = FrameTransform::new(Pose {
            position_m: Vector3::new(1.0, 2.0, 3.0),
            attitude_q: nalgebra::UnitQuaternion::identity(),
        });

        let params = Params {
            max_consec_optim_failures: max_failures,
            ..Params::default()
        };

        let ctrl_loop = ControlLoop::with_params(
            params,
            frame,
            Box::new(MockSampler {
                script: sampler_script.into(),
            }),
            Box::new(MockOptim {
                shared: shared.clone(),
                fail_script: fail_script.into(),
                command_dof,
            }),
            Box::new(MockDispatcher {
                shared: shared.clone(),
                dof: 3,
            }),
        )
        .expect("failed to build loop");

        TestRig { ctrl_loop, shared }
    }

    fn input(sim_time_s: f64, stop_requested: bool) -> InputData {
        InputData {
            sim_time_s,
            dt_s: 0.01,
            goal: Goal {
                pose_rb: Pose {
                    position_m: Vector3::new(0.55, 0.0, 0.4),
                    attitude_q: nalgebra::UnitQuaternion::identity(),
                },
                sim_time_s,
            },
            stop_requested,
        }
    }

    #[test]
    fn test_first_tick_runs_and_dispatches() {
        let mut rig = rig(3, vec![], vec![], 3);

        let (out, rpt) = rig.ctrl_loop.proc(&input(0.01, false)).unwrap();

        assert_eq!(rpt.mode, Mode::Running);
        assert!(rpt.skip.is_none());
        assert!(out.command.is_some());
        assert_eq!(rig.shared.borrow().dispatches.len(), 1);
        assert!((rpt.track_error_m - 0.1).abs() < 1e-12);

        // The optimizer is handed the configured solve budget
        assert_eq!(
            rig.shared.borrow().solve_timeouts,
            vec![Params::default().optim_timeout_s]
        );
    }

    #[test]
    fn test_state_timeout_skips_tick() {
        let mut rig = rig(
            3,
            vec![Err(StateSampleError::Timeout { timeout_s: 0.005 })],
            vec![],
            3,
        );

        let (out, rpt) = rig.ctrl_loop.proc(&input(0.01, false)).unwrap();

        // No command issued, loop stays Running
        assert_eq!(rpt.skip, Some(SkipCause::StateTimeout));
        assert_eq!(rpt.mode, Mode::Running);
        assert!(out.command.is_none());
        assert!(rig.shared.borrow().dispatches.is_empty());

        // Next tick recovers
        let (out, rpt) = rig.ctrl_loop.proc(&input(0.02, false)).unwrap();
        assert!(rpt.skip.is_none());
        assert!(out.command.is_some());
    }

    #[test]
    fn test_optim_exhaustion_is_fatal() {
        let mut rig = rig(3, vec![], vec![true, true, true], 3);

        for tick in 0..2 {
            let (_, rpt) = rig
                .ctrl_loop
                .proc(&input(0.01 * (tick + 1) as f64, false))
                .unwrap();
            assert_eq!(rpt.skip, Some(SkipCause::OptimFailure));
            assert_eq!(rpt.mode, Mode::Running);
        }

        // Third consecutive failure hits the limit
        let result = rig.ctrl_loop.proc(&input(0.03, false));
        assert!(matches!(
            result,
            Err(ProcError::FatalOptimExhaustion {
                failures: 3,
                limit: 3
            })
        ));
        assert_eq!(rig.ctrl_loop.mode(), Mode::Stopped);
        assert_eq!(rig.shared.borrow().shutdowns, 1);
        assert!(rig.shared.borrow().dispatches.is_empty());
    }

    #[test]
    fn test_isolated_failure_resets_counter() {
        // fail, succeed, fail, fail: with a limit of 2 the isolated first
        // failure must not contribute to the later pair
        let mut rig = rig(2, vec![], vec![true, false, true, true], 3);

        let (_, rpt) = rig.ctrl_loop.proc(&input(0.01, false)).unwrap();
        assert_eq!(rpt.consec_optim_failures, 1);

        let (_, rpt) = rig.ctrl_loop.proc(&input(0.02, false)).unwrap();
        assert_eq!(rpt.consec_optim_failures, 0);
        assert!(rpt.skip.is_none());

        let (_, rpt) = rig.ctrl_loop.proc(&input(0.03, false)).unwrap();
        assert_eq!(rpt.consec_optim_failures, 1);

        assert!(matches!(
            rig.ctrl_loop.proc(&input(0.04, false)),
            Err(ProcError::FatalOptimExhaustion { failures: 2, .. })
        ));
    }

    #[test]
    fn test_dispatch_dimension_mismatch_non_fatal() {
        // Optimizer produces 5-demand commands against a 3 joint arm
        let mut rig = rig(3, vec![], vec![], 5);

        let (out, rpt) = rig.ctrl_loop.proc(&input(0.01, false)).unwrap();

        assert!(rpt.dispatch_failed);
        assert_eq!(rpt.mode, Mode::Running);
        assert!(out.command.is_none());

        // The loop keeps ticking
        let (_, rpt) = rig.ctrl_loop.proc(&input(0.02, false)).unwrap();
        assert_eq!(rpt.mode, Mode::Running);
        assert!(rpt.dispatch_failed);
    }

    #[test]
    fn test_stop_honoured_at_tick_boundary() {
        let mut rig = rig(3, vec![], vec![], 3);

        // One normal tick first
        rig.ctrl_loop.proc(&input(0.01, false)).unwrap();
        assert_eq!(rig.shared.borrow().dispatches.len(), 1);

        // Stop request: no collaborator is called this tick
        let (out, rpt) = rig.ctrl_loop.proc(&input(0.02, true)).unwrap();
        assert_eq!(rpt.mode, Mode::Stopped);
        assert!(out.command.is_none());
        assert_eq!(rig.shared.borrow().dispatches.len(), 1);
        assert_eq!(rig.shared.borrow().shutdowns, 1);

        // Stopped is terminal, and shutdown is never repeated
        assert!(matches!(
            rig.ctrl_loop.proc(&input(0.03, false)),
            Err(ProcError::AlreadyStopped)
        ));
        assert_eq!(rig.shared.borrow().shutdowns, 1);
    }

    #[test]
    fn test_world_frame_projection() {
        // Frame translates by (1, 2, 3) with identity rotation
        let mut rig = rig(3, vec![], vec![], 3);

        let (out, _) = rig.ctrl_loop.proc(&input(0.01, false)).unwrap();

        let goal_w = out.goal_w.unwrap();
        assert!((goal_w.position_m - Vector3::new(1.55, 2.0, 3.4)).norm() < 1e-12);

        let bundle_w = out.bundle_w.unwrap();
        assert_eq!(bundle_w.len(), 2);
        // Candidate origin point lands at the frame translation, ranking and
        // costs preserved
        assert!((bundle_w.trajs[0].points_m[0] - Vector3::new(1.0, 2.0, 3.0)).norm() < 1e-12);
        assert!(bundle_w.trajs[0].cost <= bundle_w.trajs[1].cost);
    }

    #[test]
    fn test_zero_failure_limit_rejected() {
        let shared = Rc::new(RefCell::new(Shared::default()));
        let result = ControlLoop::with_params(
            Params {
                max_consec_optim_failures: 0,
                ..Params::default()
            },
            FrameTransform::new(Pose::identity()),
            Box::new(MockSampler {
                script: VecDeque::new(),
            }),
            Box::new(MockOptim {
                shared: shared.clone(),
                fail_script: VecDeque::new(),
                command_dof: 3,
            }),
            Box::new(MockDispatcher { shared, dof: 3 }),
        );

        assert!(matches!(result, Err(InitError::ZeroFailureLimit)));
    }
}
