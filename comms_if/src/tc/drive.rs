//! # Drive telecommands

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Serialize, Deserialize};

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A motion demand for the drivetrain. The last demand is held until a new one
/// arrives, so `Stop` must be sent to halt the vehicle.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub enum DriveCmd {
    /// Zero all wheel speeds, holding the current wheel angles.
    Stop,

    /// Normalised joystick-style input, each axis in [-1, 1].
    ///
    /// Scaled by the drivetrain's maximum speeds and interpreted in the
    /// currently selected orientation mode.
    Joystick {
        /// Forwards (+) / backwards (-) demand.
        translate_x: f64,

        /// Left (+) / right (-) demand.
        translate_y: f64,

        /// Anticlockwise (+) / clockwise (-) rotation demand.
        rotate: f64
    },

    /// A chassis velocity in meters/second and radians/second.
    Chassis {
        vx_ms: f64,
        vy_ms: f64,
        omega_rads: f64,

        /// If true the velocity is in the field frame, otherwise the robot
        /// frame.
        field_rel: bool
    },

    /// Direct per-wheel demands, ordered front-left, front-right, back-left,
    /// back-right.
    Wheels {
        speeds_ms: [f64; 4],
        angles_rad: [f64; 4]
    }
}
