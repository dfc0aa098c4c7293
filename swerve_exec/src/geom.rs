//! # Planar geometry types
//!
//! Poses, velocities and wheel states shared by every part of the drivetrain.
//!
//! Frames used throughout:
//! - Field: fixed to the playing area, origin set at the start of the session.
//! - Robot: fixed to the chassis centre, +X forwards, +Y to the left, rotations
//!   anticlockwise positive.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::{Rotation2, Vector2};
use serde::{Deserialize, Serialize};

use util::maths::wrap_pi;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// The number of swerve modules on the chassis.
pub const NUM_MODULES: usize = 4;

/// Below this magnitude a rotation is treated as zero when integrating twists.
const SMALL_ANGLE_RAD: f64 = 1e-9;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A position and heading in the field frame.
///
/// The heading is continuous: a chassis that has turned twice anticlockwise
/// has a heading of `4 pi`. Use `wrapped_heading_rad` for display and
/// comparisons.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose2 {
    /// Position of the chassis centre.
    ///
    /// Units: meters,
    /// Frame: Field
    pub position_m: Vector2<f64>,

    /// Angle from the field +X axis to the robot +X axis.
    ///
    /// Units: radians
    pub heading_rad: f64,
}

/// A small motion expressed in the robot frame at the start of the motion.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Twist2 {
    pub dx_m: f64,
    pub dy_m: f64,
    pub dtheta_rad: f64,
}

/// The frame a `ChassisVel` is expressed in.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VelFrame {
    Field,
    Robot,
}

/// Linear and angular velocity of the chassis.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChassisVel {
    /// Units: meters/second
    pub vx_ms: f64,

    /// Units: meters/second
    pub vy_ms: f64,

    /// Units: radians/second
    pub omega_rads: f64,

    /// Frame of the linear components. The angular rate is the same in both.
    pub frame: VelFrame,
}

/// Speed and direction of a single wheel.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WheelState {
    /// Signed ground speed of the wheel, positive when rolling in the
    /// direction given by `angle_rad`.
    ///
    /// Units: meters/second
    pub speed_ms: f64,

    /// Angle of the wheel relative to the robot +X axis, continuous.
    ///
    /// Units: radians
    pub angle_rad: f64,
}

/// One state per module, indexed by `ModuleId`.
pub type WheelStates = [WheelState; NUM_MODULES];

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Identifies a module. The discriminant is the module's index in every
/// per-module array.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ModuleId {
    FrontLeft = 0,
    FrontRight = 1,
    BackLeft = 2,
    BackRight = 3,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Pose2 {
    pub fn new(x_m: f64, y_m: f64, heading_rad: f64) -> Self {
        Self {
            position_m: Vector2::new(x_m, y_m),
            heading_rad,
        }
    }

    /// Build a pose with the heading given in degrees.
    pub fn from_degrees(x_m: f64, y_m: f64, heading_deg: f64) -> Self {
        Self::new(x_m, y_m, heading_deg.to_radians())
    }

    pub fn x(&self) -> f64 {
        self.position_m[0]
    }

    pub fn y(&self) -> f64 {
        self.position_m[1]
    }

    /// Heading wrapped into `(-pi, pi]`.
    pub fn wrapped_heading_rad(&self) -> f64 {
        wrap_pi(self.heading_rad)
    }

    /// Heading wrapped into `(-180, 180]` degrees.
    pub fn heading_deg(&self) -> f64 {
        self.wrapped_heading_rad().to_degrees()
    }

    /// Straight line distance between two poses, ignoring heading.
    pub fn distance(&self, other: &Pose2) -> f64 {
        (other.position_m - self.position_m).norm()
    }

    /// Apply a robot-frame twist to this pose using the SE(2) exponential map.
    ///
    /// The twist is treated as constant curvature motion, so a twist with
    /// both translation and rotation traces an arc rather than a chord.
    pub fn exp(&self, twist: &Twist2) -> Pose2 {
        let dtheta = twist.dtheta_rad;

        let (s, c) = if dtheta.abs() < SMALL_ANGLE_RAD {
            (1.0 - dtheta * dtheta / 6.0, 0.5 * dtheta)
        } else {
            (dtheta.sin() / dtheta, (1.0 - dtheta.cos()) / dtheta)
        };

        let local = Vector2::new(
            twist.dx_m * s - twist.dy_m * c,
            twist.dx_m * c + twist.dy_m * s,
        );

        Pose2 {
            position_m: self.position_m + Rotation2::new(self.heading_rad) * local,
            heading_rad: self.heading_rad + dtheta,
        }
    }
}

impl Twist2 {
    /// The motion produced by holding a robot-frame velocity for `dt_s`.
    pub fn from_vel(vel: &ChassisVel, dt_s: f64) -> Self {
        Self {
            dx_m: vel.vx_ms * dt_s,
            dy_m: vel.vy_ms * dt_s,
            dtheta_rad: vel.omega_rads * dt_s,
        }
    }
}

impl ChassisVel {
    pub fn robot(vx_ms: f64, vy_ms: f64, omega_rads: f64) -> Self {
        Self {
            vx_ms,
            vy_ms,
            omega_rads,
            frame: VelFrame::Robot,
        }
    }

    pub fn field(vx_ms: f64, vy_ms: f64, omega_rads: f64) -> Self {
        Self {
            vx_ms,
            vy_ms,
            omega_rads,
            frame: VelFrame::Field,
        }
    }

    /// A robot-frame zero velocity.
    pub fn zero() -> Self {
        Self::robot(0.0, 0.0, 0.0)
    }

    /// Express this velocity in the robot frame given the current heading.
    pub fn to_robot(self, heading_rad: f64) -> Self {
        match self.frame {
            VelFrame::Robot => self,
            VelFrame::Field => {
                let (vx, vy) = crate::kinematics::field_to_robot(self.vx_ms, self.vy_ms, heading_rad);
                Self::robot(vx, vy, self.omega_rads)
            }
        }
    }

    /// Express this velocity in the field frame given the current heading.
    pub fn to_field(self, heading_rad: f64) -> Self {
        match self.frame {
            VelFrame::Field => self,
            VelFrame::Robot => {
                let (vx, vy) = crate::kinematics::robot_to_field(self.vx_ms, self.vy_ms, heading_rad);
                Self::field(vx, vy, self.omega_rads)
            }
        }
    }

    /// Magnitude of the linear velocity.
    pub fn linear_speed_ms(&self) -> f64 {
        self.vx_ms.hypot(self.vy_ms)
    }
}

impl WheelState {
    pub fn new(speed_ms: f64, angle_rad: f64) -> Self {
        Self { speed_ms, angle_rad }
    }

    /// Velocity vector of the wheel contact point in the robot frame.
    pub fn velocity(&self) -> Vector2<f64> {
        Vector2::new(
            self.speed_ms * self.angle_rad.cos(),
            self.speed_ms * self.angle_rad.sin(),
        )
    }
}

impl ModuleId {
    /// All modules in index order.
    pub const ALL: [ModuleId; NUM_MODULES] = [
        ModuleId::FrontLeft,
        ModuleId::FrontRight,
        ModuleId::BackLeft,
        ModuleId::BackRight,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    const EPS: f64 = 1e-9;

    #[test]
    fn test_exp_straight() {
        let pose = Pose2::new(1.0, 1.0, FRAC_PI_2);
        let next = pose.exp(&Twist2 {
            dx_m: 2.0,
            dy_m: 0.0,
            dtheta_rad: 0.0,
        });

        // Facing +Y so moving forwards moves along field +Y
        assert!((next.x() - 1.0).abs() < EPS);
        assert!((next.y() - 3.0).abs() < EPS);
        assert!((next.heading_rad - FRAC_PI_2).abs() < EPS);
    }

    #[test]
    fn test_exp_arc() {
        // Quarter circle of radius 1 to the left
        let next = Pose2::default().exp(&Twist2 {
            dx_m: FRAC_PI_2,
            dy_m: 0.0,
            dtheta_rad: FRAC_PI_2,
        });

        assert!((next.x() - 1.0).abs() < EPS);
        assert!((next.y() - 1.0).abs() < EPS);
        assert!((next.heading_rad - FRAC_PI_2).abs() < EPS);
    }

    #[test]
    fn test_heading_continuous() {
        let mut pose = Pose2::default();
        for _ in 0..4 {
            pose = pose.exp(&Twist2 {
                dx_m: 0.0,
                dy_m: 0.0,
                dtheta_rad: PI,
            });
        }

        // Two full turns are stored, not clamped
        assert!((pose.heading_rad - 4.0 * PI).abs() < EPS);
        assert!(pose.wrapped_heading_rad().abs() < 1e-6);
    }
}
