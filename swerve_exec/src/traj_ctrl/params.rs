//! Parameters structure for trajectory control

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Gains and tolerances for the holonomic trajectory controller.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrajCtrlParams {

    // ---- TRANSLATION ----

    /// Proportional gain on field X error.
    ///
    /// Units: (meters/second)/meter
    pub x_k_p: f64,

    /// Proportional gain on field Y error.
    ///
    /// Units: (meters/second)/meter
    pub y_k_p: f64,

    // ---- HEADING ----

    pub theta_k_p: f64,
    pub theta_k_i: f64,
    pub theta_k_d: f64,

    /// Maximum rate of the heading profile.
    ///
    /// Units: radians/second
    pub theta_max_vel_rads: f64,

    /// Maximum acceleration of the heading profile.
    ///
    /// Units: radians/second^2
    pub theta_max_acc_rads2: f64,

    // ---- TOLERANCES ----

    /// Units: meters
    pub tol_x_m: f64,

    /// Units: meters
    pub tol_y_m: f64,

    /// Units: degrees
    pub tol_heading_deg: f64,
}
