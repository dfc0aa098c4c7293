//! # Swerve Executable Parameters
//!
//! This module provide parameters for the swerve executable.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Serialize, Deserialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwerveExecParams {

    /// Battery voltage given to the drivetrain every cycle.
    ///
    /// Units: volts
    pub battery_voltage_v: f64,

    /// Time to keep running after the last TC of a script has executed, so that the effects of
    /// that TC can be seen.
    ///
    /// Units: seconds
    pub end_of_script_linger_s: f64,

    /// If true the drivetrain telemetry is written to a CSV archive in the session directory.
    pub archive_tm: bool,

    /// Number of consecutive cycle overruns after which the executable gives up. Only checked
    /// when running in real time.
    pub max_consec_cycle_overruns: u64
}
