//! Trajectory follower state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info};
use serde::Serialize;

// Internal
use super::*;
use crate::geom::{ChassisVel, Pose2};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Follows a single trajectory, one correction per call to `step`.
#[derive(Debug, Clone)]
pub struct TrajFollower {
    trajectory: Trajectory,

    controller: HolonomicController,

    /// Executing mode
    mode: TrajCtrlMode,

    report: StatusReport,
}

/// Output of a single follower step.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FollowOutput {
    /// Velocity demand, field relative while following and zero once
    /// complete.
    pub vel: ChassisVel,

    /// True once the end of the trajectory has been reached.
    pub complete: bool,
}

/// The status report containing monitoring quantities.
#[derive(Debug, Default, Copy, Clone, Serialize)]
pub struct StatusReport {
    /// Field X error to the reference
    pub x_error_m: f64,

    /// Field Y error to the reference
    pub y_error_m: f64,

    /// Heading error to the reference
    pub head_error_rad: f64,

    /// True if the last step was within tolerance of the reference
    pub at_reference: bool,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The possible modes of execution of the follower.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum TrajCtrlMode {
    NotStarted,
    Following,
    Finished,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TrajFollower {
    pub fn new(trajectory: Trajectory, controller: HolonomicController) -> Self {
        Self {
            trajectory,
            controller,
            mode: TrajCtrlMode::NotStarted,
            report: StatusReport::default(),
        }
    }

    /// Compute the velocity demand `elapsed_s` seconds into the trajectory.
    pub fn step(&mut self, elapsed_s: f64, current: &Pose2) -> FollowOutput {
        if elapsed_s >= self.trajectory.total_time_s() {
            if self.mode != TrajCtrlMode::Finished {
                info!("Trajectory complete after {:.2} s", elapsed_s);
                self.mode = TrajCtrlMode::Finished;
            }

            return FollowOutput {
                vel: ChassisVel::zero(),
                complete: true,
            };
        }

        if self.mode == TrajCtrlMode::NotStarted {
            info!(
                "Following trajectory of {} samples over {:.2} s",
                self.trajectory.samples().len(),
                self.trajectory.total_time_s()
            );
            self.mode = TrajCtrlMode::Following;
        }

        let reference = self.trajectory.sample(elapsed_s);
        let vel = self.controller.calculate(
            current,
            &reference.pose,
            reference.velocity_ms,
            reference.heading_rad,
        );

        let [x_error_m, y_error_m, head_error_rad] = self.controller.error();
        self.report = StatusReport {
            x_error_m,
            y_error_m,
            head_error_rad,
            at_reference: self.controller.at_reference(),
        };

        debug!(
            "TrajCtrl at {:.2} s: error ({:.3}, {:.3}) m, {:.2} deg",
            elapsed_s,
            x_error_m,
            y_error_m,
            head_error_rad.to_degrees()
        );

        FollowOutput {
            vel,
            complete: false,
        }
    }

    pub fn mode(&self) -> TrajCtrlMode {
        self.mode
    }

    pub fn report(&self) -> StatusReport {
        self.report
    }

    pub fn trajectory(&self) -> &Trajectory {
        &self.trajectory
    }
}
