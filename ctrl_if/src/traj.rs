//! # Candidate trajectory bundle definitions

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// One sampled predicted end-effector path considered by the optimizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateTrajectory {
    /// The predicted end-effector positions along the path, ordered in time.
    ///
    /// Units: meters. The frame is given by the owning bundle.
    pub points_m: Vec<Vector3<f64>>,

    /// The optimizer's cost for this candidate, lower is better.
    pub cost: f64,
}

/// A bundle of candidate trajectories, ranked best-first by the optimizer.
///
/// The bundle is read-only once produced, consumed for diagnostics and
/// visualisation, and discarded at the end of the tick.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CandidateBundle {
    pub trajs: Vec<CandidateTrajectory>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl CandidateBundle {
    pub fn len(&self) -> usize {
        self.trajs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trajs.is_empty()
    }

    /// The top-ranked candidate.
    ///
    /// When multiple candidates carry the same cost the first in the
    /// optimizer's returned order wins, no re-ranking is performed here.
    pub fn top(&self) -> Option<&CandidateTrajectory> {
        self.trajs.first()
    }
}
