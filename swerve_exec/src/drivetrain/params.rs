//! Parameters structure for the drivetrain

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

use crate::{
    geom::Pose2,
    pose_est::EstimatorParams,
    traj_ctrl::TrajCtrlParams,
    wheel_module::ModuleCtrlParams,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the drivetrain.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DrivetrainParams {

    // ---- GEOMETRY ----

    /// Distance between the left and right wheels.
    ///
    /// Units: meters
    pub track_width_m: f64,

    /// Distance between the front and rear wheels.
    ///
    /// Units: meters
    pub wheelbase_m: f64,

    /// Units: meters
    pub wheel_radius_m: f64,

    // ---- CAPABILITIES ----

    /// Speed demanded by a full forwards joystick input.
    ///
    /// Units: meters/second
    pub max_fwd_rev_speed_ms: f64,

    /// Speed demanded by a full sideways joystick input.
    ///
    /// Units: meters/second
    pub max_strafe_speed_ms: f64,

    /// Rate demanded by a full rotate joystick input.
    ///
    /// Units: radians/second
    pub max_rotate_speed_rads: f64,

    /// No wheel is ever asked to go faster than this.
    ///
    /// Units: meters/second
    pub max_module_speed_ms: f64,

    /// Normalised joystick inputs smaller than this are treated as zero.
    pub input_deadband: f64,

    // ---- TIMING ----

    /// Period of the control loop.
    ///
    /// Units: seconds
    pub ctrl_period_s: f64,

    // ---- START POSE ----

    pub start_x_m: f64,
    pub start_y_m: f64,
    pub start_heading_deg: f64,

    // ---- SUBSYSTEMS ----

    pub module_ctrl: ModuleCtrlParams,

    pub estimator: EstimatorParams,

    pub traj_ctrl: TrajCtrlParams,
}

impl DrivetrainParams {
    /// The pose the vehicle is assumed to start in.
    pub fn start_pose(&self) -> Pose2 {
        Pose2::from_degrees(self.start_x_m, self.start_y_m, self.start_heading_deg)
    }
}
