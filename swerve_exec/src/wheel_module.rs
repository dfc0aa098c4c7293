//! # Wheel module abstraction
//!
//! A swerve module is a wheel with two actuated axes: drive, which spins the
//! wheel, and steer, which rotates the wheel about the vertical. The
//! [`WheelModule`] trait is the contract every module implementation meets,
//! whether it is backed by a motor controller or by the simulator.
//!
//! The closed loop control of each axis lives in [`ModuleController`], which
//! turns a target [`WheelState`] into a pair of voltages so that real and
//! simulated modules are driven by identical code.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::geom::WheelState;
use util::maths::ang_dist;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Demands below this speed get no static friction compensation.
const KS_SPEED_THRESHOLD_MS: f64 = 1e-3;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Contract for a single swerve module.
pub trait WheelModule {
    /// Apply an actuation target to both axes.
    fn apply(&mut self, target: ActuationTarget);

    /// Voltage currently being output on the given axis.
    fn output_voltage(&self, axis: Axis) -> f64;

    /// Write encoder feedback for an axis.
    ///
    /// Only meaningful for simulated modules, hardware implementations read
    /// their own encoders and may ignore this.
    ///
    /// Units: radians, radians/second at the wheel (drive) or at the steer
    ///        shaft (steer)
    fn set_encoder_feedback(&mut self, axis: Axis, position_rad: f64, velocity_rads: f64);

    /// Absolute angle of the wheel relative to the robot +X axis.
    ///
    /// For callers outside the control loop, such as seeding a relative
    /// steer encoder at start up or display. The drivetrain's closed loop
    /// reads the angle through `measured_state` instead.
    ///
    /// Units: radians
    fn absolute_angle(&self) -> f64;

    /// Measured speed and angle of the wheel, or `None` if no feedback has
    /// been received yet.
    fn measured_state(&self) -> Option<WheelState>;

    /// Distance rolled by the wheel since the drive encoder was last reset.
    ///
    /// Units: meters
    fn drive_distance_m(&self) -> Option<f64>;

    /// Zero the drive encoder.
    fn reset_drive_encoder(&mut self);
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Voltages to apply to the two axes of a module.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize)]
pub struct ActuationTarget {
    /// Units: volts
    pub drive_v: f64,

    /// Units: volts
    pub steer_v: f64,
}

/// Gains for the per-module axis controllers.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModuleCtrlParams {
    /// Drive velocity feedforward.
    ///
    /// Units: volts/(meters/second)
    pub drive_kv_v_per_ms: f64,

    /// Drive static friction feedforward.
    ///
    /// Units: volts
    pub drive_ks_v: f64,

    /// Drive proportional gain on speed error.
    ///
    /// Units: volts/(meters/second)
    pub drive_kp_v_per_ms: f64,

    /// Steer proportional gain on angle error.
    ///
    /// Units: volts/radian
    pub steer_kp_v_per_rad: f64,
}

/// Computes axis voltages from a target wheel state and module feedback.
#[derive(Debug, Clone)]
pub struct ModuleController {
    params: ModuleCtrlParams,
}

/// A module driven by the simulator.
///
/// Holds the last voltages applied and the encoder feedback written back by
/// the simulator after each step.
#[derive(Debug, Clone)]
pub struct SimWheelModule {
    wheel_radius_m: f64,

    applied: ActuationTarget,

    /// Raw drive encoder (position, velocity), at the wheel.
    drive: Option<(f64, f64)>,

    /// Steer encoder (position, velocity).
    steer: Option<(f64, f64)>,

    /// Raw drive position at the last encoder reset.
    drive_zero_rad: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The actuated axes of a module.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum Axis {
    Drive,
    Steer,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ModuleController {
    pub fn new(params: ModuleCtrlParams) -> Self {
        Self { params }
    }

    /// Voltages which move the module toward `target`.
    ///
    /// If the wheel would need to turn more than a quarter turn the target is
    /// flipped by half a turn and the speed reversed. Drive speed is scaled
    /// by the cosine of the remaining steer error so the wheel does not push
    /// sideways while it turns. Both outputs are limited to the battery
    /// voltage.
    pub fn calc(
        &self,
        target: WheelState,
        measured: Option<WheelState>,
        battery_voltage_v: f64,
    ) -> ActuationTarget {
        // With no feedback assume the wheel is already where it is asked to be
        let measured = measured.unwrap_or(WheelState::new(0.0, target.angle_rad));

        let mut speed_ms = target.speed_ms;
        let mut steer_err_rad = ang_dist(measured.angle_rad, target.angle_rad);

        if steer_err_rad.abs() > std::f64::consts::FRAC_PI_2 {
            speed_ms = -speed_ms;
            steer_err_rad = ang_dist(
                measured.angle_rad,
                target.angle_rad + std::f64::consts::PI,
            );
        }

        let speed_ms = speed_ms * steer_err_rad.cos();

        let ks = if speed_ms.abs() > KS_SPEED_THRESHOLD_MS {
            self.params.drive_ks_v * speed_ms.signum()
        } else {
            0.0
        };

        let drive_v = self.params.drive_kv_v_per_ms * speed_ms
            + ks
            + self.params.drive_kp_v_per_ms * (speed_ms - measured.speed_ms);
        let steer_v = self.params.steer_kp_v_per_rad * steer_err_rad;

        let limit = battery_voltage_v.abs();

        ActuationTarget {
            drive_v: drive_v.max(-limit).min(limit),
            steer_v: steer_v.max(-limit).min(limit),
        }
    }
}

impl SimWheelModule {
    pub fn new(wheel_radius_m: f64) -> Self {
        Self {
            wheel_radius_m,
            applied: ActuationTarget::default(),
            drive: None,
            steer: None,
            drive_zero_rad: 0.0,
        }
    }
}

impl WheelModule for SimWheelModule {
    fn apply(&mut self, target: ActuationTarget) {
        self.applied = target;
    }

    fn output_voltage(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Drive => self.applied.drive_v,
            Axis::Steer => self.applied.steer_v,
        }
    }

    fn set_encoder_feedback(&mut self, axis: Axis, position_rad: f64, velocity_rads: f64) {
        match axis {
            Axis::Drive => self.drive = Some((position_rad, velocity_rads)),
            Axis::Steer => self.steer = Some((position_rad, velocity_rads)),
        }
    }

    fn absolute_angle(&self) -> f64 {
        self.steer.map(|(p, _)| p).unwrap_or(0.0)
    }

    fn measured_state(&self) -> Option<WheelState> {
        match (self.drive, self.steer) {
            (Some((_, drive_vel)), Some((steer_pos, _))) => Some(WheelState::new(
                drive_vel * self.wheel_radius_m,
                steer_pos,
            )),
            _ => None,
        }
    }

    fn drive_distance_m(&self) -> Option<f64> {
        self.drive
            .map(|(p, _)| (p - self.drive_zero_rad) * self.wheel_radius_m)
    }

    fn reset_drive_encoder(&mut self) {
        if let Some((p, _)) = self.drive {
            self.drive_zero_rad = p;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn ctrl() -> ModuleController {
        ModuleController::new(ModuleCtrlParams {
            drive_kv_v_per_ms: 2.0,
            drive_ks_v: 0.1,
            drive_kp_v_per_ms: 1.0,
            steer_kp_v_per_rad: 5.0,
        })
    }

    #[test]
    fn test_aligned_wheel() {
        let out = ctrl().calc(
            WheelState::new(1.0, 0.5),
            Some(WheelState::new(1.0, 0.5)),
            12.0,
        );

        assert!((out.drive_v - 2.1).abs() < 1e-12);
        assert!(out.steer_v.abs() < 1e-12);
    }

    #[test]
    fn test_flip_optimisation() {
        // Target is behind the wheel, so reverse rather than turn around
        let out = ctrl().calc(
            WheelState::new(1.0, PI - 0.1),
            Some(WheelState::new(0.0, 0.0)),
            12.0,
        );

        assert!(out.drive_v < 0.0);
        assert!((out.steer_v - (-0.5)).abs() < 1e-9);
    }

    #[test]
    fn test_cosine_scaling() {
        // A wheel a quarter turn out should not drive at all
        let out = ctrl().calc(
            WheelState::new(2.0, FRAC_PI_2),
            Some(WheelState::new(0.0, 0.0)),
            12.0,
        );

        assert!(out.drive_v.abs() < 1e-9);
        assert!(out.steer_v > 0.0);
    }

    #[test]
    fn test_voltage_limit() {
        let out = ctrl().calc(
            WheelState::new(20.0, 0.0),
            Some(WheelState::new(0.0, 0.0)),
            10.0,
        );

        assert_eq!(out.drive_v, 10.0);
    }

    #[test]
    fn test_sim_module_feedback() {
        let mut m = SimWheelModule::new(0.05);
        assert!(m.measured_state().is_none());
        assert!(m.drive_distance_m().is_none());

        m.set_encoder_feedback(Axis::Drive, 40.0, 20.0);
        assert!(m.measured_state().is_none());

        m.set_encoder_feedback(Axis::Steer, 0.25, 0.0);
        let state = m.measured_state().unwrap();
        assert!((state.speed_ms - 1.0).abs() < 1e-12);
        assert_eq!(state.angle_rad, 0.25);
        assert_eq!(m.absolute_angle(), 0.25);
        assert!((m.drive_distance_m().unwrap() - 2.0).abs() < 1e-12);

        m.reset_drive_encoder();
        assert_eq!(m.drive_distance_m(), Some(0.0));

        m.apply(ActuationTarget {
            drive_v: 3.0,
            steer_v: -1.0,
        });
        assert_eq!(m.output_voltage(Axis::Drive), 3.0);
        assert_eq!(m.output_voltage(Axis::Steer), -1.0);
    }
}
