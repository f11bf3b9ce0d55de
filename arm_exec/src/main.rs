//! Main arm-side executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise the plant, collaborators and all modules
//!     - Main loop:
//!         - Advance the simulated clock
//!         - Goal generation processing
//!         - Control loop processing:
//!             - State sampling
//!             - Trajectory optimisation
//!             - Command dispatch
//!         - Plant propagation
//!         - Telemetry output
//!
//! # Modules
//!
//! All modules (e.g. `ctrl_loop`) shall meet the following requirements:
//!     1. Provide a public struct implementing the `util::module::State` trait.
//!

// ---------------------------------------------------------------------------
// USE MODULES FROM LIBRARY
// ---------------------------------------------------------------------------

use arm_lib::{
    ctrl_loop, goal_gen,
    data_store::DataStore,
    frame::FrameTransform,
    sampling_optim::SamplingOptim,
    sim_arm::{SimArm, SimArmHandle},
};

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Report};
use log::{info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

// Internal
use util::{
    logger::{logger_init, LevelFilter},
    module::State,
    raise_error,
    session::Session,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Target period of one cycle.
const CYCLE_PERIOD_S: f64 = 0.01;

/// Number of cycles per second
const CYCLE_FREQUENCY_HZ: f64 = 1.0 / CYCLE_PERIOD_S;

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("arm_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Trace, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Deimos Arm Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let sim_arm_params: arm_lib::sim_arm::Params =
        util::params::load("sim_arm.toml").wrap_err("Could not load sim_arm params")?;

    let optim_params: arm_lib::sampling_optim::Params =
        util::params::load("sampling_optim.toml").wrap_err("Could not load sampling_optim params")?;

    info!("Exec parameters loaded");

    // ---- INITIALISE PLANT AND COLLABORATORS ----

    // The world to arm-base transform comes from the arm's spawn pose, fixed
    // for the lifetime of the run.
    let frame = FrameTransform::from_raw(
        sim_arm_params.spawn_pos_m_w,
        sim_arm_params.spawn_att_q_w_wxyz,
    )
    .wrap_err("Invalid arm spawn pose")?;

    let kinematics = sim_arm_params.kinematics;
    let arm = SimArmHandle::new(SimArm::new(sim_arm_params));
    let optim = SamplingOptim::new(optim_params, kinematics);

    info!("Simulated arm and optimizer initialised");

    // ---- INITIALISE DATASTORE ----

    info!("Initialising modules...");

    let mut ds = DataStore::default();

    // ---- INITIALISE MODULES ----

    ds.goal_gen
        .init("goal_gen.toml", &session)
        .wrap_err("Failed to initialise GoalGen")?;
    info!("GoalGen init complete");

    ds.ctrl_loop
        .init(
            ctrl_loop::InitData {
                params_path: "ctrl_loop.toml",
                frame,
                sampler: Box::new(arm.clone()),
                optim: Box::new(optim),
                dispatcher: Box::new(arm.clone()),
            },
            &session,
        )
        .wrap_err("Failed to initialise ControlLoop")?;
    info!("ControlLoop init complete");

    info!("Module initialisation complete\n");

    // ---- STOP SIGNAL ----

    // Ctrl-C sets a flag which the control loop honours at the next tick
    // boundary, in-flight processing always completes first.
    let stop_flag = Arc::new(AtomicBool::new(false));
    {
        let flag = stop_flag.clone();
        ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed))
            .wrap_err("Failed to set the stop signal handler")?;
    }

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    loop {
        // Get cycle start time
        let cycle_start_instant = Instant::now();

        // Clear items that need wiping at the start of the cycle and advance
        // the simulated clock
        ds.cycle_start(CYCLE_FREQUENCY_HZ);

        // ---- GOAL PROCESSING ----

        ds.goal_gen_input = goal_gen::InputData {
            sim_time_s: ds.sim_time_s,
        };

        match ds.goal_gen.proc(&ds.goal_gen_input) {
            Ok((o, r)) => {
                ds.goal_gen_output = o;
                ds.goal_gen_status_rpt = r;
            }
            // The generator is a pure function of a clock this exec controls,
            // a failure here means the clock itself is broken.
            Err(e) => raise_error!("Error during GoalGen processing: {}", e),
        };

        // ---- CONTROL ALGORITHM PROCESSING ----

        ds.ctrl_loop_input = ctrl_loop::InputData {
            sim_time_s: ds.sim_time_s,
            dt_s: CYCLE_PERIOD_S,
            goal: ds.goal_gen_output.goal,
            stop_requested: stop_flag.load(Ordering::Relaxed),
        };

        match ds.ctrl_loop.proc(&ds.ctrl_loop_input) {
            Ok((o, r)) => {
                ds.ctrl_loop_output = o;
                ds.ctrl_loop_status_rpt = r;
            }
            // ControlLoop proc errors are fatal, recoverable tick failures
            // are absorbed into the status report. Flush the session so
            // diagnostics queued in the final ticks reach disk.
            Err(e) => {
                session.exit();
                return Err(e).wrap_err("Error during ControlLoop processing");
            }
        };

        // A stop request lands here as a clean transition into Stopped
        if ds.ctrl_loop_status_rpt.mode == ctrl_loop::Mode::Stopped {
            info!("Control loop stopped, ending execution");
            break;
        }

        // ---- PLANT PROPAGATION ----

        // Stepped after control processing, so the command dispatched this
        // cycle shapes the state sampled next cycle.
        arm.step(CYCLE_PERIOD_S);

        // ---- TELEMETRY ----

        if ds.is_1_hz_cycle {
            info!(
                "t = {:8.2} s, track err = {:.4} m / {:.4} rad, optim = {:.2} ms, lobe {}",
                ds.sim_time_s,
                ds.ctrl_loop_status_rpt.track_error_m,
                ds.ctrl_loop_status_rpt.track_error_rad,
                ds.ctrl_loop_status_rpt.optim_latency_s * 1000.0,
                ds.goal_gen_status_rpt.lobe_index
            );

            session.save(
                format!("ctrl_loop_rpt_{:010}.json", ds.num_cycles),
                ds.ctrl_loop_status_rpt.clone(),
            );

            if let Some(bundle_w) = ds.ctrl_loop_output.bundle_w.clone() {
                session.save(format!("bundle_w_{:010}.json", ds.num_cycles), bundle_w);
            }
        }

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;

        // Get sleep duration
        match Duration::from_secs_f64(CYCLE_PERIOD_S).checked_sub(cycle_dur) {
            Some(d) => {
                ds.num_consec_cycle_overruns = 0;
                thread::sleep(d);
            }
            None => {
                warn!(
                    "Cycle overran by {:.06} s",
                    cycle_dur.as_secs_f64() - CYCLE_PERIOD_S
                );
                ds.num_consec_cycle_overruns += 1;
            }
        }

        // Increment cycle counter
        ds.num_cycles += 1;
    }

    // ---- SHUTDOWN ----

    info!("End of execution");

    session.exit();

    Ok(())
}
