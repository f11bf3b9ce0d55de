//! Parameters for the sampling trajectory optimizer.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct Params {
    /// Number of candidate rollouts sampled per round.
    pub num_candidates: usize,

    /// Number of waypoints in each rollout.
    pub horizon_steps: usize,

    /// Magnitude of the uniform perturbation applied around the mean step in
    /// the first round.
    ///
    /// Units: radians
    pub perturb_mag_rad: f64,

    /// Per-joint limit on a single rollout step.
    ///
    /// Units: radians
    pub max_step_rad: f64,

    /// Extra refinement rounds run in `Block` mode.
    pub block_rounds: usize,

    /// Multiplier applied to the perturbation magnitude after each round.
    pub round_shrink: f64,

    /// Weight of attitude misalignment in the candidate cost, relative to
    /// position distance.
    ///
    /// Units: meters/radian
    pub att_weight: f64,

    /// Seed for the candidate sampler.
    pub seed: u64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            num_candidates: 32,
            horizon_steps: 10,
            perturb_mag_rad: 0.1,
            max_step_rad: 0.05,
            block_rounds: 3,
            round_shrink: 0.5,
            att_weight: 0.1,
            seed: 42,
        }
    }
}
