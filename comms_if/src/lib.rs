//! # Communications interface crate.
//!
//! Provides the data types which cross the boundary of the drivetrain core:
//! telecommands going in and telemetry coming out.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

pub mod tc;

/// Telemetry published by the drivetrain once per cycle
pub mod tm;
