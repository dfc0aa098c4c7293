//! Main swerve drivetrain executable entry point.
//!
//! # Architecture
//!
//! The executable runs a simulated drivetrain from a drive script. The general execution
//! methodology consists of:
//!
//!     - Initialise all modules
//!     - Main loop:
//!         - Telecommand processing from the script, by simulation time
//!         - Autonomy processing (trajectory following, go-to-pose)
//!         - Drivetrain processing:
//!             - Module actuation
//!             - Simulation step
//!             - Pose estimation
//!         - Telemetry archiving
//!
//! By default cycles run back to back. With `--realtime` each cycle is padded to the control
//! period, so the simulation runs at wall clock speed.

// ---------------------------------------------------------------------------
// USE MODULES FROM LIBRARY
// ---------------------------------------------------------------------------

use comms_if::tm::DrivetrainTm;
use swerve_lib::{
    data_store::DataStore,
    drivetrain::{Drivetrain, DrivetrainParams},
    geom::Pose2,
    params::SwerveExecParams,
    sim::SimParams,
};

mod tc_processor;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Report};
use log::{debug, info, warn};
use serde::Serialize;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};
use structopt::StructOpt;

// Internal
use util::{
    archive::Archiver,
    host,
    logger::{logger_init, LevelFilter},
    raise_error,
    script_interpreter::{PendingTcs, ScriptInterpreter},
    session::Session,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Command line options.
#[derive(Debug, StructOpt)]
#[structopt(name = "swerve_exec", about = "Simulated swerve drivetrain")]
struct Opts {
    /// Path to the drive script to execute.
    #[structopt(parse(from_os_str))]
    script: PathBuf,

    /// Pad each cycle to the control period.
    #[structopt(long)]
    realtime: bool,

    /// Minimum log level, `info`, `debug` or `trace`.
    #[structopt(long, default_value = "debug")]
    log_level: LevelFilter,
}

/// Summary of the run, saved into the session directory at exit.
#[derive(Debug, Serialize)]
struct RunSummary {
    num_cycles: u64,
    sim_time_s: f64,
    est_pose: Pose2,
    actual_pose: Option<Pose2>,

    /// Distance between the estimated and actual poses at exit.
    ///
    /// Units: meters
    est_error_m: Option<f64>,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {

    color_eyre::install()?;

    let opts = Opts::from_args();

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new(
        "swerve_exec",
        "sessions"
    ).wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(opts.log_level, &session)
        .wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Swerve Drivetrain Executable\n");
    info!(
        "Software root: {:?}",
        host::get_sw_root().wrap_err("Failed to get the software root")?
    );
    info!("Session directory: {:?}\n", session.session_root);

    debug!("CLI options: {:?}", opts);

    // ---- LOAD PARAMETERS ----

    let exec_params: SwerveExecParams = util::params::load("swerve_exec.toml")
        .wrap_err("Could not load exec params")?;
    let dt_params: DrivetrainParams = util::params::load("drivetrain.toml")
        .wrap_err("Could not load drivetrain params")?;
    let sim_params: SimParams = util::params::load("sim.toml")
        .wrap_err("Could not load simulation params")?;

    info!("Exec parameters loaded");

    let cycle_period_s = dt_params.ctrl_period_s;
    let cycle_frequency_hz = 1.0 / cycle_period_s;

    // ---- INITIALISE TC SOURCE ----

    info!("Loading script from {:?}", opts.script);

    let mut si = ScriptInterpreter::new(&opts.script)
        .wrap_err("Failed to load script")?;

    info!(
        "Loaded script lasts {:.02} s and contains {} TCs\n",
        si.get_duration(),
        si.get_num_tcs()
    );

    // ---- INITIALISE MODULES ----

    info!("Initialising modules...");

    let drivetrain = Drivetrain::new_sim(dt_params, &sim_params)
        .wrap_err("Failed to initialise the drivetrain")?;
    info!("Drivetrain init complete");

    let mut ds = DataStore::new(drivetrain);
    ds.drivetrain_input.battery_voltage_v = exec_params.battery_voltage_v;

    let mut tm_archiver = match exec_params.archive_tm {
        true => Some(
            Archiver::from_path(&session, "drivetrain_tm.csv")
                .wrap_err("Failed to initialise the telemetry archive")?
        ),
        false => None
    };

    info!("Module initialisation complete\n");

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    let mut end_of_script_time_s: Option<f64> = None;

    loop {

        // Get cycle start time
        let cycle_start_instant = Instant::now();

        // Clear items that need wiping at the start of the cycle
        ds.cycle_start(cycle_frequency_hz);

        // ---- TELECOMMAND PROCESSING ----

        match si.get_pending_tcs(ds.sim_time_s) {
            PendingTcs::None => (),
            PendingTcs::Some(tc_vec) => {
                for tc in tc_vec.iter() {
                    debug!("Executing TC at {:.2} s: {:?}", ds.sim_time_s, tc);
                    tc_processor::exec(&mut ds, tc);
                }
            },
            PendingTcs::EndOfScript => {
                let end_s = *end_of_script_time_s.get_or_insert_with(|| {
                    info!("End of TC script reached");
                    ds.sim_time_s
                });

                if ds.sim_time_s - end_s >= exec_params.end_of_script_linger_s {
                    info!("Linger time elapsed, stopping");
                    break
                }
            }
        }

        // ---- AUTONOMY PROCESSING ----

        ds.auto_proc();

        // ---- CONTROL ALGORITHM PROCESSING ----

        ds.drivetrain_proc();

        if ds.drivetrain_status_rpt.missing_feedback {
            warn!("Drivetrain is missing wheel feedback, pose estimate not updated");
        }

        // ---- TELEMETRY ----

        let tm: DrivetrainTm = ds.drivetrain.telemetry();

        if let Some(ref mut archiver) = tm_archiver {
            if let Err(e) = archiver.serialise(tm) {
                warn!("Could not archive drivetrain telemetry: {}", e);
            }
        }

        if ds.is_1_hz_cycle {
            info!(
                "t = {:6.2} s: est ({:.3}, {:.3}) m {:.1} deg, {:.2} m/s{}",
                tm.time_s,
                tm.est_x_m,
                tm.est_y_m,
                tm.est_heading_rad.to_degrees(),
                tm.speed_ms,
                match tm.downfield {
                    true => ", downfield",
                    false => ""
                }
            );
        }

        // ---- CYCLE MANAGEMENT ----

        if opts.realtime {
            let cycle_dur = Instant::now() - cycle_start_instant;

            match Duration::from_secs_f64(cycle_period_s).checked_sub(cycle_dur) {
                Some(d) => {
                    ds.num_consec_cycle_overruns = 0;
                    thread::sleep(d);
                },
                None => {
                    warn!(
                        "Cycle overran by {:.06} s",
                        cycle_dur.as_secs_f64() - cycle_period_s
                    );
                    ds.num_consec_cycle_overruns += 1;

                    if ds.num_consec_cycle_overruns > exec_params.max_consec_cycle_overruns {
                        raise_error!(
                            "More than {} consecutive cycle overruns!",
                            exec_params.max_consec_cycle_overruns
                        );
                    }
                }
            }
        }
    }

    // ---- SHUTDOWN ----

    let est_pose = ds.drivetrain.est_pose();
    let actual_pose = ds.drivetrain.actual_pose();
    let summary = RunSummary {
        num_cycles: ds.num_cycles,
        sim_time_s: ds.drivetrain.time_s(),
        est_pose,
        actual_pose,
        est_error_m: actual_pose.map(|p| p.distance(&est_pose)),
    };

    info!("Run summary: {:#?}", summary);
    session.save("summary.json", summary);

    info!("End of execution");

    session.exit();

    Ok(())
}
