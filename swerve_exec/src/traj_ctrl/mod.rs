//! # Trajectory control module
//!
//! Trajectory control keeps the vehicle on a pre-computed trajectory. A
//! trajectory is a time ordered list of samples, each giving the reference
//! pose, the speed along the path and the heading the chassis should face.
//! Being holonomic, the direction of travel and the heading are independent.
//!
//! Each control cycle the follower samples the trajectory at the elapsed time
//! and the holonomic controller produces a field relative chassis velocity:
//! feedforward along the path plus corrections on the position and heading
//! errors. Following is complete once the elapsed time reaches the end of the
//! trajectory.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod controllers;
pub mod params;
pub mod state;
pub mod trajectory;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use controllers::*;
pub use params::TrajCtrlParams;
pub use state::*;
pub use trajectory::*;
