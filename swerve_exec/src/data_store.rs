//! # Data Store

use log::info;

use crate::{
    drivetrain::{self, Drivetrain},
    geom::Pose2,
    traj_ctrl::{self, TrajFollower},
};

// ---------------------------------------------------------------------------
// ENUMS
// ---------------------------------------------------------------------------

/// The autonomous behaviour currently driving the drivetrain, if any.
#[derive(Debug, Clone)]
pub enum AutoMode {
    Off,

    /// Following a trajectory which began at `start_time_s`.
    Follow {
        follower: TrajFollower,
        start_time_s: f64,
    },

    /// Heading for a single pose.
    GoToPose {
        target: Pose2,
        heading_deg: f64,
        max_speed_ms: f64,
    },
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Global data store for the executable.
pub struct DataStore {
    // Cycle management
    /// Number of cycles already executed
    pub num_cycles: u64,

    /// True if this cycle falls on a 1Hz boundary
    pub is_1_hz_cycle: bool,

    /// Simulation elapsed time
    pub sim_time_s: f64,

    // Drivetrain
    pub drivetrain: Drivetrain,
    pub drivetrain_input: drivetrain::InputData,
    pub drivetrain_output: drivetrain::OutputData,
    pub drivetrain_status_rpt: drivetrain::StatusReport,

    // Autonomy
    pub auto_mode: AutoMode,
    pub traj_ctrl_status_rpt: Option<traj_ctrl::StatusReport>,

    // Monitoring Counters
    /// Number of consecutive cycle overruns
    pub num_consec_cycle_overruns: u64,
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl Default for AutoMode {
    fn default() -> Self {
        AutoMode::Off
    }
}

impl DataStore {
    pub fn new(drivetrain: Drivetrain) -> Self {
        Self {
            num_cycles: 0,
            is_1_hz_cycle: false,
            sim_time_s: drivetrain.time_s(),
            drivetrain,
            drivetrain_input: drivetrain::InputData::default(),
            drivetrain_output: drivetrain::OutputData::default(),
            drivetrain_status_rpt: drivetrain::StatusReport::default(),
            auto_mode: AutoMode::Off,
            traj_ctrl_status_rpt: None,
            num_consec_cycle_overruns: 0,
        }
    }

    /// Perform actions required at the start of a cycle.
    ///
    /// Clears those items that need clearing at the start of a cycle, and sets the 1Hz cycle flag.
    pub fn cycle_start(&mut self, cycle_frequency_hz: f64) {
        let cycles_per_second = util::time::cycles_in(1.0, 1.0 / cycle_frequency_hz).max(1);
        self.is_1_hz_cycle = self.num_cycles % cycles_per_second == 0;

        self.drivetrain_status_rpt = drivetrain::StatusReport::default();
        self.traj_ctrl_status_rpt = None;

        self.sim_time_s = self.drivetrain.time_s();
    }

    /// Step the active autonomous behaviour, setting the drivetrain's demand.
    ///
    /// Once the behaviour completes the drivetrain is stopped and the mode returns to `Off`.
    pub fn auto_proc(&mut self) {
        let est_pose = self.drivetrain.est_pose();

        let complete = match self.auto_mode {
            AutoMode::Off => return,
            AutoMode::Follow {
                ref mut follower,
                start_time_s,
            } => {
                let out = follower.step(self.sim_time_s - start_time_s, &est_pose);
                self.traj_ctrl_status_rpt = Some(follower.report());
                self.drivetrain.set_chassis_vel(out.vel);
                out.complete
            }
            AutoMode::GoToPose {
                target,
                heading_deg,
                max_speed_ms,
            } => self.drivetrain.go_to_pose(target, heading_deg, max_speed_ms),
        };

        if complete {
            info!(
                "Autonomous manouvre complete at ({:.3}, {:.3}) m {:.1} deg",
                est_pose.x(),
                est_pose.y(),
                est_pose.heading_deg()
            );
            self.drivetrain.stop();
            self.auto_mode = AutoMode::Off;
        }
    }

    /// Abandon any autonomous behaviour and stop.
    pub fn abort_auto(&mut self) {
        if !matches!(self.auto_mode, AutoMode::Off) {
            info!("Autonomous manouvre aborted");
        }
        self.auto_mode = AutoMode::Off;
        self.drivetrain.stop();
    }

    /// Run the drivetrain for one cycle, storing its output and status.
    pub fn drivetrain_proc(&mut self) {
        let (output, report) = self.drivetrain.proc(&self.drivetrain_input);
        self.drivetrain_output = output;
        self.drivetrain_status_rpt = report;
        self.num_cycles += 1;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        drivetrain::DrivetrainParams,
        sim::SimParams,
        traj_ctrl::{Trajectory, TrajectorySample},
    };

    fn data_store() -> DataStore {
        let params: DrivetrainParams =
            util::params::from_str(include_str!("../../params/drivetrain.toml")).unwrap();
        let sim_params: SimParams =
            util::params::from_str(include_str!("../../params/sim.toml")).unwrap();

        let mut ds = DataStore::new(Drivetrain::new_sim(params, &sim_params).unwrap());
        ds.drivetrain_input.enabled = true;
        ds
    }

    fn cycle(ds: &mut DataStore) {
        ds.cycle_start(50.0);
        ds.auto_proc();
        ds.drivetrain_proc();
    }

    #[test]
    fn test_1_hz_cycle() {
        let mut ds = data_store();

        let mut flags = vec![];
        for _ in 0..101 {
            ds.cycle_start(50.0);
            flags.push(ds.is_1_hz_cycle);
            ds.drivetrain_proc();
        }

        assert!(flags[0] && flags[50] && flags[100]);
        assert_eq!(flags.iter().filter(|f| **f).count(), 3);
        assert!((ds.sim_time_s - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_go_to_pose_completes() {
        let mut ds = data_store();
        let target = Pose2::new(1.0, 0.5, 0.0);

        ds.auto_mode = AutoMode::GoToPose {
            target,
            heading_deg: 45.0,
            max_speed_ms: 1.5,
        };

        for _ in 0..250 {
            cycle(&mut ds);
            if matches!(ds.auto_mode, AutoMode::Off) {
                break;
            }
        }

        assert!(matches!(ds.auto_mode, AutoMode::Off));
        assert!(ds.drivetrain.est_pose().distance(&target) < 0.1);

        // The drivetrain was stopped on completion
        for _ in 0..50 {
            cycle(&mut ds);
        }
        assert!(ds.drivetrain.speed_ms() < 0.05);
    }

    #[test]
    fn test_follow_and_abort() {
        let mut ds = data_store();

        let sample = |t: f64| TrajectorySample {
            time_s: t,
            pose: Pose2::new(0.5 * t, 0.0, 0.0),
            velocity_ms: 0.5,
            heading_rad: 0.0,
        };
        let traj = Trajectory::new((0..=8).map(|i| sample(i as f64 * 0.5)).collect()).unwrap();

        ds.auto_mode = AutoMode::Follow {
            follower: ds.drivetrain.follower(traj),
            start_time_s: ds.sim_time_s,
        };

        for _ in 0..50 {
            cycle(&mut ds);
        }

        assert!(ds.traj_ctrl_status_rpt.is_some());
        assert!(ds.drivetrain.speed_ms() > 0.3);

        ds.abort_auto();
        for _ in 0..50 {
            cycle(&mut ds);
        }

        assert!(matches!(ds.auto_mode, AutoMode::Off));
        assert!(ds.traj_ctrl_status_rpt.is_none());
        assert!(ds.drivetrain.speed_ms() < 0.05);
    }
}
