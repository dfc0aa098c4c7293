//! # Telecommand processor module
//!
//! The telecommand processor handles various TCs coming from any source.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::eyre::{Result, WrapErr};
use log::{debug, info, warn};

// Internal
use comms_if::tc::{DriveCmd, Tc};
use swerve_lib::{
    data_store::{AutoMode, DataStore},
    drivetrain::{OrientationMode, SwerveInput},
    geom::{ChassisVel, Pose2, WheelState, NUM_MODULES},
    traj_ctrl::Trajectory,
};

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Execute a telecommand.
///
/// Mutates the datastore to send commands to different modules.
pub(crate) fn exec(ds: &mut DataStore, tc: &Tc) {

    // Handle different Tcs
    match tc {
        Tc::Heartbeat => (),
        Tc::Enable => {
            debug!("Recieved Enable command");
            ds.drivetrain_input.enabled = true;
        },
        Tc::Disable => {
            debug!("Recieved Disable command");
            ds.drivetrain_input.enabled = false;
        },
        Tc::Drive(cmd) => {
            // Manual driving overrides any autonomous manouvre
            if !matches!(ds.auto_mode, AutoMode::Off) {
                warn!("Drive command recieved during an autonomous manouvre, aborting the manouvre");
                ds.abort_auto();
            }
            exec_drive(ds, cmd);
        },
        Tc::SetOrientation { field_oriented } => {
            ds.drivetrain.set_orientation_mode(match *field_oriented {
                true => OrientationMode::FieldOriented,
                false => OrientationMode::RobotOriented
            });
        },
        Tc::SetKnownPose { x_m, y_m, heading_deg } => {
            info!("Setting known pose to ({}, {}) m {} deg", x_m, y_m, heading_deg);
            ds.drivetrain.set_known_pose(Pose2::from_degrees(*x_m, *y_m, *heading_deg));
        },
        Tc::ModelReset { x_m, y_m, heading_deg } => {
            info!("Resetting the model to ({}, {}) m {} deg", x_m, y_m, heading_deg);
            ds.drivetrain.model_reset(Pose2::from_degrees(*x_m, *y_m, *heading_deg));
        },
        Tc::PoseMeasurement { x_m, y_m, heading_deg } => {
            debug!("Pose measurement ({}, {}) m {} deg", x_m, y_m, heading_deg);
            ds.drivetrain.add_pose_measurement(Pose2::from_degrees(*x_m, *y_m, *heading_deg));
        },
        Tc::ZeroGyro => {
            ds.drivetrain.zero_gyro();
        },
        Tc::GoToPose { x_m, y_m, heading_deg, max_speed_ms } => {
            info!(
                "Going to ({}, {}) m {} deg at up to {} m/s",
                x_m, y_m, heading_deg, max_speed_ms
            );
            ds.drivetrain.reset_go_to_pose();
            ds.auto_mode = AutoMode::GoToPose {
                target: Pose2::from_degrees(*x_m, *y_m, *heading_deg),
                heading_deg: *heading_deg,
                max_speed_ms: *max_speed_ms
            };
        },
        Tc::FollowTrajectory { path } => {
            match load_trajectory(path) {
                Ok(traj) => {
                    info!("Loaded trajectory from \"{}\"", path);
                    ds.auto_mode = AutoMode::Follow {
                        follower: ds.drivetrain.follower(traj),
                        start_time_s: ds.sim_time_s
                    };
                },
                Err(e) => warn!("Cannot follow trajectory: {:#}", e)
            }
        },
        Tc::Abort => {
            debug!("Recieved Abort command");
            ds.abort_auto();
        }
    }

}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn exec_drive(ds: &mut DataStore, cmd: &DriveCmd) {
    match *cmd {
        DriveCmd::Stop => ds.drivetrain.stop(),
        DriveCmd::Joystick { translate_x, translate_y, rotate } => {
            ds.drivetrain.set_input(SwerveInput::new(translate_x, translate_y, rotate))
        },
        DriveCmd::Chassis { vx_ms, vy_ms, omega_rads, field_rel } => {
            ds.drivetrain.set_chassis_vel(match field_rel {
                true => ChassisVel::field(vx_ms, vy_ms, omega_rads),
                false => ChassisVel::robot(vx_ms, vy_ms, omega_rads)
            })
        },
        DriveCmd::Wheels { speeds_ms, angles_rad } => {
            let mut states = [WheelState::default(); NUM_MODULES];
            for (i, state) in states.iter_mut().enumerate() {
                *state = WheelState::new(speeds_ms[i], angles_rad[i]);
            }
            ds.drivetrain.set_wheel_states(states)
        }
    }
}

/// Load a trajectory from a path relative to the software root.
fn load_trajectory(path: &str) -> Result<Trajectory> {
    let mut full_path = util::host::get_sw_root()
        .wrap_err("Software root is not set")?;
    full_path.push(path);

    Trajectory::load(&full_path)
        .wrap_err_with(|| format!("Could not load trajectory from {:?}", full_path))
}

#[cfg(test)]
mod test {
    use super::*;
    use swerve_lib::{drivetrain::{Drivetrain, DrivetrainParams}, sim::SimParams};

    fn data_store() -> DataStore {
        let params: DrivetrainParams =
            util::params::from_str(include_str!("../../params/drivetrain.toml")).unwrap();
        let sim_params: SimParams =
            util::params::from_str(include_str!("../../params/sim.toml")).unwrap();

        DataStore::new(Drivetrain::new_sim(params, &sim_params).unwrap())
    }

    #[test]
    fn test_enable_disable() {
        let mut ds = data_store();
        assert!(!ds.drivetrain_input.enabled);

        exec(&mut ds, &Tc::Enable);
        assert!(ds.drivetrain_input.enabled);

        exec(&mut ds, &Tc::Disable);
        assert!(!ds.drivetrain_input.enabled);
    }

    #[test]
    fn test_pose_tcs() {
        let mut ds = data_store();

        exec(&mut ds, &Tc::SetKnownPose { x_m: 1.0, y_m: 2.0, heading_deg: 90.0 });
        let pose = ds.drivetrain.est_pose();
        assert_eq!(pose.position_m, Pose2::new(1.0, 2.0, 0.0).position_m);
        assert!((pose.heading_deg() - 90.0).abs() < 1e-9);

        exec(&mut ds, &Tc::SetOrientation { field_oriented: false });
        assert_eq!(ds.drivetrain.orientation_mode(), OrientationMode::RobotOriented);
    }

    #[test]
    fn test_drive_aborts_auto() {
        let mut ds = data_store();

        exec(&mut ds, &Tc::GoToPose { x_m: 1.0, y_m: 0.0, heading_deg: 0.0, max_speed_ms: 1.0 });
        assert!(matches!(ds.auto_mode, AutoMode::GoToPose { .. }));

        exec(&mut ds, &Tc::Drive(DriveCmd::Stop));
        assert!(matches!(ds.auto_mode, AutoMode::Off));
    }

    #[test]
    fn test_missing_trajectory() {
        let mut ds = data_store();

        exec(&mut ds, &Tc::FollowTrajectory { path: String::from("no/such/trajectory.json") });
        assert!(matches!(ds.auto_mode, AutoMode::Off));

        // Whether or not the root is set, the failure names what was missing
        let err = format!("{:#}", load_trajectory("no/such/trajectory.json").unwrap_err());
        assert!(
            err.contains("no/such/trajectory.json") || err.contains("Software root"),
            "{}",
            err
        );
    }

    #[test]
    fn test_follow_shipped_trajectory() {
        std::env::set_var(util::host::SW_ROOT_ENV_VAR, concat!(env!("CARGO_MANIFEST_DIR"), "/.."));

        let mut ds = data_store();
        exec(&mut ds, &Tc::FollowTrajectory { path: String::from("trajectories/s_curve.json") });

        match ds.auto_mode {
            AutoMode::Follow { ref follower, start_time_s } => {
                assert_eq!(follower.trajectory().samples().len(), 21);
                assert_eq!(start_time_s, ds.sim_time_s);
            },
            ref m => panic!("Expected to be following, found {:?}", m)
        }
    }
}
