//! # Telecommand module
//!
//! This module provides telecommand functionality to the communications
//! interface. Telecommands are instructions to the drivetrain from an operator
//! or a script, serialised as JSON.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod drive;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Serialize, Deserialize};
use thiserror::Error;

pub use drive::DriveCmd;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A telecommand, i.e. an instruction sent to the drivetrain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Tc {
    /// Do nothing, used to keep a link alive.
    Heartbeat,

    /// Enable the drivetrain, actuation follows the commanded velocity.
    Enable,

    /// Disable the drivetrain, all actuation is zeroed.
    Disable,

    /// A drive command.
    Drive(DriveCmd),

    /// Select how joystick inputs are interpreted.
    SetOrientation {
        /// True for field oriented driving, false for robot oriented.
        field_oriented: bool
    },

    /// Force the pose estimate to a known pose, for example at the start of
    /// an autonomous routine.
    SetKnownPose {
        x_m: f64,
        y_m: f64,
        heading_deg: f64
    },

    /// Teleport the simulated "actual" pose. Has no effect on hardware.
    ModelReset {
        x_m: f64,
        y_m: f64,
        heading_deg: f64
    },

    /// Inject an external, high confidence pose measurement (e.g. vision).
    PoseMeasurement {
        x_m: f64,
        y_m: f64,
        heading_deg: f64
    },

    /// Set the current heading sensor reading as zero.
    ZeroGyro,

    /// Drive towards a pose with a single correction per cycle.
    GoToPose {
        x_m: f64,
        y_m: f64,
        heading_deg: f64,
        max_speed_ms: f64
    },

    /// Follow the trajectory stored in the given JSON file, relative to the
    /// software root.
    FollowTrajectory {
        path: String
    },

    /// Abandon any trajectory or go-to-pose in progress and stop.
    Abort
}

/// Possible parsing errors.
#[derive(Debug, Error)]
pub enum TcParseError {
    #[error("TC contains invalid JSON: {0}")]
    InvalidJson(serde_json::Error),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Tc {
    /// Parse a new TC from a JSON packet
    pub fn from_json(json_str: &str) -> Result<Self, TcParseError> {
        serde_json::from_str(json_str).map_err(TcParseError::InvalidJson)
    }

    /// Serialise the TC into a JSON packet
    pub fn to_json(&self) -> Result<String, TcParseError> {
        serde_json::to_string(self).map_err(TcParseError::InvalidJson)
    }
}
