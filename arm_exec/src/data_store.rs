//! # Data Store

use crate::{ctrl_loop, goal_gen};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Global data store for the executable.
#[derive(Default)]
pub struct DataStore {
    // Cycle management
    /// Number of cycles already executed
    pub num_cycles: u128,

    /// True if this cycle falls on a 1Hz boundary
    pub is_1_hz_cycle: bool,

    /// Elapsed simulated time, advanced by one control period per cycle
    pub sim_time_s: f64,

    // GoalGen
    pub goal_gen: goal_gen::GoalGen,
    pub goal_gen_input: goal_gen::InputData,
    pub goal_gen_output: goal_gen::OutputData,
    pub goal_gen_status_rpt: goal_gen::StatusReport,

    // ControlLoop
    pub ctrl_loop: ctrl_loop::ControlLoop,
    pub ctrl_loop_input: ctrl_loop::InputData,
    pub ctrl_loop_output: ctrl_loop::OutputData,
    pub ctrl_loop_status_rpt: ctrl_loop::StatusReport,

    // Monitoring Counters
    /// Number of consecutive cycle overruns
    pub num_consec_cycle_overruns: u64,
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl DataStore {
    /// Perform actions required at the start of a cycle.
    ///
    /// Clears those items that need clearing at the start of a cycle,
    /// advances the simulated clock by one period, and sets the 1Hz cycle
    /// flag.
    pub fn cycle_start(&mut self, cycle_frequency_hz: f64) {
        if self.num_cycles % (cycle_frequency_hz as u128) == 0 {
            self.is_1_hz_cycle = true;
        } else {
            self.is_1_hz_cycle = false;
        }

        self.goal_gen_input = goal_gen::InputData::default();
        self.goal_gen_output = goal_gen::OutputData::default();
        self.goal_gen_status_rpt = goal_gen::StatusReport::default();

        self.ctrl_loop_input = ctrl_loop::InputData::default();
        self.ctrl_loop_output = ctrl_loop::OutputData::default();
        self.ctrl_loop_status_rpt = ctrl_loop::StatusReport::default();

        self.sim_time_s += 1.0 / cycle_frequency_hz;
    }
}
