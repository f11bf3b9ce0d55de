//! Goal generator module state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::{Quaternion, UnitQuaternion, Vector3};
use serde::Serialize;

// Internal
use super::*;
use ctrl_if::{Goal, Pose};
use util::{module::State, params, session::Session};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The goal trajectory generator.
///
/// `proc` is a pure function of the input simulated time and the fixed
/// parameters: calling it twice with the same time yields identical goals,
/// there are no hidden counters.
pub struct GoalGen {
    params: Params,

    /// The fixed target attitude, normalised from the raw parameter.
    attitude_q_rb: UnitQuaternion<f64>,

    output_data: OutputData,
    report: StatusReport,
}

/// Input data to the module
#[derive(Copy, Clone, Default)]
pub struct InputData {
    /// Elapsed simulated time.
    ///
    /// Units: seconds
    pub sim_time_s: f64,
}

/// Output data of the module
#[derive(Copy, Clone, Default)]
pub struct OutputData {
    /// The goal for this tick.
    pub goal: Goal,
}

/// The status report containing monitoring quantities.
#[derive(Debug, Default, Copy, Clone, Serialize)]
pub struct StatusReport {
    /// Index of the lobe the pattern is currently sweeping.
    pub lobe_index: u64,

    /// Phase within the current period.
    ///
    /// Units: radians
    pub phase_rad: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for GoalGen {
    type InitData = &'static str;
    type InitError = InitError;

    type InputData = InputData;
    type OutputData = OutputData;
    type StatusReport = StatusReport;
    type ProcError = ProcError;

    /// Initialise the GoalGen module.
    ///
    /// Expected init data is a path to the parameter file.
    fn init(
        &mut self,
        init_data: Self::InitData,
        _session: &Session,
    ) -> Result<(), Self::InitError> {
        // Load the parameters
        self.params = match params::load(init_data) {
            Ok(p) => p,
            Err(e) => return Err(InitError::ParamLoadError(e)),
        };

        if self.params.period_s <= 0.0 {
            return Err(InitError::NonPositivePeriod(self.params.period_s));
        }

        // Normalise the configured attitude once, rejecting degenerate
        // quaternions which cannot be normalised.
        let raw = self.params.attitude_q_rb_wxyz;
        let q = Quaternion::new(raw[0], raw[1], raw[2], raw[3]);
        if q.norm() < 1e-9 {
            return Err(InitError::DegenerateAttitude(q.norm()));
        }
        self.attitude_q_rb = UnitQuaternion::from_quaternion(q);

        Ok(())
    }

    /// Generate the goal for the given simulated time.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        let t = input_data.sim_time_s;
        if !t.is_finite() {
            return Err(ProcError::NonFiniteTime(t));
        }

        self.output_data = OutputData {
            goal: self.goal_at(t),
        };

        let period = self.params.period_s;
        self.report = StatusReport {
            lobe_index: (t / period).floor().max(0.0) as u64 % self.params.num_lobes as u64,
            phase_rad: (t % period) / period * std::f64::consts::TAU,
        };

        Ok((self.output_data, self.report))
    }
}

impl GoalGen {
    /// Build a generator directly from parameters.
    ///
    /// The configured attitude is normalised as in `init`.
    pub fn with_params(params: Params) -> Self {
        let raw = params.attitude_q_rb_wxyz;
        let q = Quaternion::new(raw[0], raw[1], raw[2], raw[3]);

        Self {
            attitude_q_rb: UnitQuaternion::from_quaternion(q),
            params,
            output_data: OutputData::default(),
            report: StatusReport::default(),
        }
    }

    /// The goal pose at the given simulated time.
    ///
    /// The pattern is the reacher bench's multi-lobe sinusoid: the target
    /// oscillates through the centre point in a vertical plane, and the
    /// plane's azimuth advances by one lobe each period.
    pub fn goal_at(&self, sim_time_s: f64) -> Goal {
        let t = sim_time_s;
        let period = self.params.period_s;
        let amp = self.params.amplitude_m;
        let centre = self.params.centre_m_rb;

        let lobe_ang = (t / period).floor() * std::f64::consts::TAU / self.params.num_lobes as f64;
        let swing = (std::f64::consts::TAU / period * t).sin();

        let position_m = Vector3::new(
            centre[0] + lobe_ang.sin() * 2.0 * amp * swing,
            centre[1] + lobe_ang.cos() * 2.0 * amp * swing,
            centre[2] + amp * (2.0 * std::f64::consts::TAU / period * t).sin(),
        );

        Goal {
            pose_rb: Pose {
                position_m,
                attitude_q: self.attitude_q_rb,
            },
            sim_time_s: t,
        }
    }
}

impl Default for GoalGen {
    fn default() -> Self {
        Self::with_params(Params::default())
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_deterministic() {
        let gen = GoalGen::with_params(Params::default());

        for &t in &[0.0, 0.737, 2.0, 7.999, 8.0, 123.456] {
            let a = gen.goal_at(t);
            let b = gen.goal_at(t);
            assert_eq!(a.pose_rb.position_m, b.pose_rb.position_m);
            assert_eq!(a.pose_rb.attitude_q, b.pose_rb.attitude_q);
            assert_eq!(a.sim_time_s, b.sim_time_s);
        }
    }

    #[test]
    fn test_restartable() {
        // Two independent generators with the same parameters agree, there
        // is no hidden internal state accumulated by calling goal_at.
        let gen_a = GoalGen::with_params(Params::default());
        let gen_b = GoalGen::with_params(Params::default());

        let _ = gen_a.goal_at(1.0);
        let _ = gen_a.goal_at(5.0);

        assert_eq!(
            gen_a.goal_at(3.3).pose_rb.position_m,
            gen_b.goal_at(3.3).pose_rb.position_m
        );
    }

    #[test]
    fn test_z_waveform() {
        // At t = 2 s with the bench configuration the z coordinate is
        // centre_z + amp * sin(2 * 2*pi/8 * 2)
        let gen = GoalGen::with_params(Params::default());
        let goal = gen.goal_at(2.0);

        let expected_z = 0.4 + 0.25 * (2.0 * 2.0 * std::f64::consts::PI / 8.0 * 2.0).sin();
        assert!((goal.pose_rb.position_m[2] - expected_z).abs() < 1e-6);
    }

    #[test]
    fn test_attitude_normalised() {
        // The bench attitude parameter is not unit, the generator must
        // normalise it
        let gen = GoalGen::with_params(Params::default());
        let goal = gen.goal_at(0.0);

        assert!((goal.pose_rb.attitude_q.into_inner().norm() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_proc_matches_goal_at() {
        let mut gen = GoalGen::with_params(Params::default());
        let (out, _) = gen
            .proc(&InputData { sim_time_s: 2.0 })
            .expect("proc failed");

        assert_eq!(
            out.goal.pose_rb.position_m,
            gen.goal_at(2.0).pose_rb.position_m
        );
    }
}
