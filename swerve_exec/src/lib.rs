//! # Swerve library.
//!
//! This library allows other crates in the workspace (and the benches) to access items defined
//! inside the swerve crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Geometric primitives - poses, chassis velocities and wheel states
pub mod geom;

/// Kinematics - converts between chassis velocities and individual wheel states
pub mod kinematics;

/// Wheel module abstraction - per-module voltage control and encoder feedback
pub mod wheel_module;

/// Heading sensor abstraction
pub mod gyro;

/// Physics simulation of a four module swerve chassis
pub mod sim;

/// Pose estimator - fuses wheel odometry with the heading sensor
pub mod pose_est;

/// Trajectory control module - keeps the chassis on the given trajectory
pub mod traj_ctrl;

/// Drivetrain - orchestrates the other modules once per control cycle
pub mod drivetrain;

/// Global data store for the executable
pub mod data_store;

/// Executable parameters
pub mod params;
