//! # Drivetrain telemetry

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Serialize, Deserialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Telemetry published once per cycle.
///
/// The struct is kept flat so each instance is a single CSV row. Wheel fields
/// are prefixed by module: `fl` front-left, `fr` front-right, `bl` back-left,
/// `br` back-right.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DrivetrainTm {
    /// Time of the cycle.
    ///
    /// Units: seconds
    pub time_s: f64,

    pub enabled: bool,

    /// True if joystick inputs are field oriented.
    pub field_oriented: bool,

    // ---- POSES ----

    pub est_x_m: f64,
    pub est_y_m: f64,
    pub est_heading_rad: f64,

    /// The simulated "actual" pose, empty when running on hardware.
    pub act_x_m: Option<f64>,
    pub act_y_m: Option<f64>,
    pub act_heading_rad: Option<f64>,

    // ---- DERIVED ----

    /// Speed over ground derived from successive estimates.
    ///
    /// Units: meters/second
    pub speed_ms: f64,

    /// True if the estimated heading points downfield.
    pub downfield: bool,

    // ---- MEASURED WHEEL STATES ----

    pub fl_speed_ms: f64,
    pub fl_angle_rad: f64,
    pub fr_speed_ms: f64,
    pub fr_angle_rad: f64,
    pub bl_speed_ms: f64,
    pub bl_angle_rad: f64,
    pub br_speed_ms: f64,
    pub br_angle_rad: f64,

    // ---- ACTUATION ----

    pub fl_drive_v: f64,
    pub fl_steer_v: f64,
    pub fr_drive_v: f64,
    pub fr_steer_v: f64,
    pub bl_drive_v: f64,
    pub bl_steer_v: f64,
    pub br_drive_v: f64,
    pub br_steer_v: f64,
}
