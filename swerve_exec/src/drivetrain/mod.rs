//! # Drivetrain module
//!
//! The drivetrain owns the four wheel modules, the heading sensor and the
//! pose estimator, and runs them once per control cycle:
//!
//! 1. Turn the held velocity demand into a target state for each wheel and
//!    compute the voltages to apply (zero while disabled).
//! 2. If simulated, advance the simulation by one period and write the
//!    resulting encoder and heading readings back.
//! 3. Read the measured wheel states and heading.
//! 4. Update the pose estimate, and from it the speed over ground and the
//!    downfield flag.
//!
//! Demands are held until replaced, so a velocity keeps being applied until
//! `stop` is called.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::{kinematics::KinematicsError, sim::SimError};
use util::maths::wrap_pi;

pub use params::*;
pub use state::*;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Battery voltage assumed when none is given.
///
/// Units: volts
pub const NOMINAL_BATTERY_VOLTAGE_V: f64 = 12.0;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Normalised joystick-style demand, each axis in `[-1, 1]`.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SwerveInput {
    /// Forwards (+) / backwards (-).
    pub translate_x: f64,

    /// Left (+) / right (-).
    pub translate_y: f64,

    /// Anticlockwise (+) / clockwise (-).
    pub rotate: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// How joystick-style inputs are interpreted.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrientationMode {
    /// Forwards on the stick is forwards along the field, whichever way the
    /// chassis faces.
    FieldOriented,

    /// Forwards on the stick is forwards for the chassis.
    RobotOriented,
}

/// Possible errors when creating a drivetrain.
#[derive(Debug, thiserror::Error)]
pub enum DrivetrainError {
    #[error("Invalid drivetrain geometry: {0}")]
    InvalidGeometry(KinematicsError),

    #[error("Wheel radius must be finite and positive, found {0} m")]
    InvalidWheelRadius(f64),

    #[error("Control period must be finite and positive, found {0} s")]
    InvalidPeriod(f64),

    #[error("Could not create the simulation: {0}")]
    SimError(SimError),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SwerveInput {
    pub fn new(translate_x: f64, translate_y: f64, rotate: f64) -> Self {
        Self {
            translate_x,
            translate_y,
            rotate,
        }
    }

    /// Limit every axis to `[-1, 1]`. Non-finite values become zero.
    pub fn clamped(&self) -> Self {
        let clamp = |v: f64| if v.is_finite() { v.max(-1.0).min(1.0) } else { 0.0 };

        Self {
            translate_x: clamp(self.translate_x),
            translate_y: clamp(self.translate_y),
            rotate: clamp(self.rotate),
        }
    }
}

impl Default for OrientationMode {
    fn default() -> Self {
        OrientationMode::FieldOriented
    }
}

/// True if `heading_rad` faces downfield, i.e. strictly within a quarter turn
/// of the field +X axis.
pub fn is_heading_downfield(heading_rad: f64) -> bool {
    let deg = wrap_pi(heading_rad).to_degrees();
    deg > -90.0 && deg < 90.0
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_downfield() {
        let check = |deg: f64| is_heading_downfield(deg.to_radians());

        assert!(check(0.0));
        assert!(check(89.999));
        assert!(check(-89.999));
        assert!(!check(91.0));
        assert!(!check(-91.0));
        assert!(!check(180.0));

        // Boundaries are not downfield
        assert!(!check(90.0));
        assert!(!check(-90.0));

        // Continuous headings are wrapped first
        assert!(check(360.0 + 45.0));
        assert!(!check(-360.0 - 135.0));
    }

    #[test]
    fn test_input_clamp() {
        let i = SwerveInput::new(2.0, -3.0, f64::NAN).clamped();
        assert_eq!(i, SwerveInput::new(1.0, -1.0, 0.0));
    }
}
