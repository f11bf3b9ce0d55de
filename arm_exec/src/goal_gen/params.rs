//! Parameters structure for GoalGen

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the goal trajectory generator.
#[derive(Debug, Clone, Deserialize)]
pub struct Params {
    /// Period of one full oscillation of the goal pattern.
    ///
    /// Units: seconds
    pub period_s: f64,

    /// Amplitude of the goal pattern about the centre point.
    ///
    /// Units: meters
    pub amplitude_m: f64,

    /// Centre point of the goal pattern.
    ///
    /// Units: meters,
    /// Frame: Arm base
    pub centre_m_rb: [f64; 3],

    /// Number of lobes in the pattern. At the end of each period the plane
    /// of oscillation rotates by `2*pi/num_lobes` about the vertical.
    pub num_lobes: u32,

    /// The fixed target end-effector attitude, scalar-first `[w, x, y, z]`.
    ///
    /// Normalised once at initialisation, so it need not be exactly unit in
    /// the parameter file.
    ///
    /// Frame: Arm base
    pub attitude_q_rb_wxyz: [f64; 4],
}

impl Default for Params {
    fn default() -> Self {
        // Defaults match the reacher bench configuration
        Self {
            period_s: 8.0,
            amplitude_m: 0.25,
            centre_m_rb: [0.55, 0.0, 0.4],
            num_lobes: 8,
            attitude_q_rb_wxyz: [0.0, 0.99, -0.01, -0.01],
        }
    }
}
