//! Parameters structure for the drivetrain simulation

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

use super::MotorKind;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the simulated drivetrain.
#[derive(Debug, Clone, Deserialize)]
pub struct SimParams {

    // ---- CHASSIS ----

    /// Mass of the whole vehicle.
    ///
    /// Units: kilograms
    pub mass_kg: f64,

    /// Moment of inertia of the whole vehicle about the vertical axis through
    /// its centre.
    ///
    /// Units: kilogram meters^2
    pub moi_kgm2: f64,

    // ---- DRIVE AXES ----

    pub drive_motor: MotorKind,

    /// Motor turns per wheel turn.
    pub drive_gear_ratio: f64,

    /// Inertia of the wheel and drive train about the wheel axle.
    ///
    /// Units: kilogram meters^2
    pub wheel_inertia_kgm2: f64,

    /// Units: Newton meters/(radians/second)
    pub drive_viscous_nm_per_rads: f64,

    /// Units: Newton meters
    pub drive_coulomb_nm: f64,

    // ---- STEER AXES ----

    pub steer_motor: MotorKind,

    /// Motor turns per module turn.
    pub steer_gear_ratio: f64,

    /// Inertia of the module about its steer axis.
    ///
    /// Units: kilogram meters^2
    pub steer_inertia_kgm2: f64,

    /// Units: Newton meters/(radians/second)
    pub steer_viscous_nm_per_rads: f64,

    /// Units: Newton meters
    pub steer_coulomb_nm: f64,

    // ---- INTEGRATION ----

    /// Longest internal integration step. Each call to `update` is split into
    /// equal sub-steps no longer than this.
    ///
    /// Units: seconds
    pub max_substep_s: f64,
}
