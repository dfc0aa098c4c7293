//! # Swerve kinematics
//!
//! Converts between chassis velocities and the speed and angle of each of the
//! four wheels, and rotates velocities between the field and robot frames.
//!
//! Each wheel at offset `r = (rx, ry)` from the chassis centre moves with
//! velocity `(vx - omega * ry, vy + omega * rx)`. Stacking this relation for
//! all four wheels gives an 8x3 system `A x = b`, which the forward transform
//! solves in the least squares sense.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::warn;
use nalgebra::{Matrix3, Rotation2, Vector2, Vector3};

use crate::geom::{ChassisVel, ModuleId, WheelState, WheelStates, NUM_MODULES};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Wheel speeds below this magnitude are treated as stationary and the wheel
/// holds its previous angle.
///
/// Units: meters/second
pub const ZERO_SPEED_EPSILON_MS: f64 = 1e-6;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Placement of the wheels on the chassis.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleGeometry {
    /// Distance between the left and right wheels.
    ///
    /// Units: meters
    pub track_width_m: f64,

    /// Distance between the front and rear wheels.
    ///
    /// Units: meters
    pub wheelbase_m: f64,

    /// Position of each wheel relative to the chassis centre, indexed by
    /// `ModuleId`.
    ///
    /// Units: meters,
    /// Frame: Robot
    pub offsets_m: [Vector2<f64>; NUM_MODULES],
}

/// Inverse and forward kinematics for a four wheel swerve chassis.
///
/// Immutable once built.
#[derive(Debug, Clone)]
pub struct SwerveKinematics {
    geometry: ModuleGeometry,

    /// `(A^T A)^-1`, used to solve the forward transform.
    normal_inv: Matrix3<f64>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum KinematicsError {
    #[error(
        "Track width ({0} m) and wheelbase ({1} m) must be finite and positive"
    )]
    InvalidDimensions(f64, f64),

    #[error("Offset of the {0:?} wheel is not finite: {1:?}")]
    InvalidOffset(ModuleId, [f64; 2]),

    #[error("The wheel layout is degenerate, chassis velocity cannot be recovered")]
    DegenerateLayout,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ModuleGeometry {
    /// Build a rectangular layout centred on the chassis.
    pub fn rectangular(track_width_m: f64, wheelbase_m: f64) -> Result<Self, KinematicsError> {
        if !(track_width_m.is_finite()
            && wheelbase_m.is_finite()
            && track_width_m > 0.0
            && wheelbase_m > 0.0)
        {
            return Err(KinematicsError::InvalidDimensions(track_width_m, wheelbase_m));
        }

        let hx = wheelbase_m / 2.0;
        let hy = track_width_m / 2.0;

        Ok(Self {
            track_width_m,
            wheelbase_m,
            offsets_m: [
                Vector2::new(hx, hy),
                Vector2::new(hx, -hy),
                Vector2::new(-hx, hy),
                Vector2::new(-hx, -hy),
            ],
        })
    }

    /// Distance from the chassis centre to the given wheel.
    pub fn radius_m(&self, id: ModuleId) -> f64 {
        self.offsets_m[id.index()].norm()
    }
}

impl SwerveKinematics {
    /// Create the kinematics for the given layout.
    ///
    /// Fails if any offset is not finite or if the layout does not allow the
    /// chassis velocity to be recovered from the wheel states (e.g. every
    /// wheel at the same point).
    pub fn new(geometry: ModuleGeometry) -> Result<Self, KinematicsError> {
        for id in ModuleId::ALL.iter() {
            let r = geometry.offsets_m[id.index()];
            if !(r[0].is_finite() && r[1].is_finite()) {
                return Err(KinematicsError::InvalidOffset(*id, [r[0], r[1]]));
            }
        }

        // Each wheel contributes rows [1, 0, -ry] and [0, 1, rx] to A.
        let mut normal = Matrix3::zeros();
        for r in geometry.offsets_m.iter() {
            let (rx, ry) = (r[0], r[1]);
            normal += Matrix3::new(
                1.0, 0.0, -ry,
                0.0, 1.0, rx,
                -ry, rx, rx * rx + ry * ry,
            );
        }

        let normal_inv = normal
            .try_inverse()
            .ok_or(KinematicsError::DegenerateLayout)?;

        if normal_inv.iter().any(|v| !v.is_finite()) {
            return Err(KinematicsError::DegenerateLayout);
        }

        Ok(Self {
            geometry,
            normal_inv,
        })
    }

    pub fn geometry(&self) -> &ModuleGeometry {
        &self.geometry
    }

    /// Inverse kinematics: the wheel states that realise `vel`.
    ///
    /// Field relative velocities are rotated into the robot frame by
    /// `heading_rad` first. Wheels whose speed would be below
    /// `ZERO_SPEED_EPSILON_MS` keep their angle from `prev` and are given zero
    /// speed, so a stationary chassis does not snap its wheels to zero.
    pub fn to_wheel_states(
        &self,
        vel: ChassisVel,
        heading_rad: f64,
        prev: &WheelStates,
    ) -> WheelStates {
        let vel = vel.to_robot(heading_rad);
        let mut states = [WheelState::default(); NUM_MODULES];

        for (i, r) in self.geometry.offsets_m.iter().enumerate() {
            let wx = vel.vx_ms - vel.omega_rads * r[1];
            let wy = vel.vy_ms + vel.omega_rads * r[0];
            let speed = wx.hypot(wy);

            states[i] = if speed < ZERO_SPEED_EPSILON_MS {
                WheelState::new(0.0, prev[i].angle_rad)
            } else {
                WheelState::new(speed, wy.atan2(wx))
            };
        }

        states
    }

    /// Forward kinematics: the robot frame chassis velocity that best fits the
    /// given wheel states.
    pub fn to_chassis_vel(&self, states: &WheelStates) -> ChassisVel {
        let mut atb = Vector3::zeros();

        for (state, r) in states.iter().zip(self.geometry.offsets_m.iter()) {
            let v = state.velocity();
            atb += Vector3::new(v[0], v[1], -r[1] * v[0] + r[0] * v[1]);
        }

        let x = self.normal_inv * atb;

        ChassisVel::robot(x[0], x[1], x[2])
    }

    /// Scale all wheel speeds down so that none exceeds `max_speed_ms`.
    ///
    /// The ratio between wheel speeds is kept so the chassis follows the same
    /// path, just slower. Returns true if the states were scaled.
    pub fn desaturate(states: &mut WheelStates, max_speed_ms: f64) -> bool {
        let fastest = states
            .iter()
            .map(|s| s.speed_ms.abs())
            .fold(0.0f64, f64::max);

        if max_speed_ms <= 0.0 {
            warn!("Cannot desaturate wheel states to a non-positive limit of {} m/s", max_speed_ms);
            return false;
        }

        if fastest <= max_speed_ms {
            return false;
        }

        let scale = max_speed_ms / fastest;
        for s in states.iter_mut() {
            s.speed_ms *= scale;
        }

        true
    }
}

/// Rotate a field frame linear velocity into the robot frame.
pub fn field_to_robot(vx: f64, vy: f64, heading_rad: f64) -> (f64, f64) {
    let v = Rotation2::new(-heading_rad) * Vector2::new(vx, vy);
    (v[0], v[1])
}

/// Rotate a robot frame linear velocity into the field frame.
pub fn robot_to_field(vx: f64, vy: f64, heading_rad: f64) -> (f64, f64) {
    let v = Rotation2::new(heading_rad) * Vector2::new(vx, vy);
    (v[0], v[1])
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

    fn kin() -> SwerveKinematics {
        SwerveKinematics::new(ModuleGeometry::rectangular(0.5, 0.6).unwrap()).unwrap()
    }

    fn assert_vel_eq(a: &ChassisVel, b: &ChassisVel, tol: f64) {
        assert!(
            (a.vx_ms - b.vx_ms).abs() < tol
                && (a.vy_ms - b.vy_ms).abs() < tol
                && (a.omega_rads - b.omega_rads).abs() < tol,
            "{:?} != {:?}",
            a,
            b
        );
    }

    #[test]
    fn test_round_trip() {
        let k = kin();
        let prev = [WheelState::default(); NUM_MODULES];

        // Sweep the operating range of the shipped drivetrain, in both frames
        let linear = [-4.0, -2.5, -1.0, -0.1, 0.0, 0.1, 1.0, 2.5, 4.0];
        let angular = [-6.0, -3.0, -0.5, 0.0, 0.5, 3.0, 6.0];
        let headings = [0.0, 0.7, -2.5, 4.0];

        for vx in linear.iter() {
            for vy in linear.iter() {
                for omega in angular.iter() {
                    let v = ChassisVel::robot(*vx, *vy, *omega);
                    let states = k.to_wheel_states(v, 0.0, &prev);
                    assert_vel_eq(&k.to_chassis_vel(&states), &v, 1e-6);

                    for heading in headings.iter() {
                        let v = ChassisVel::field(*vx, *vy, *omega);
                        let states = k.to_wheel_states(v, *heading, &prev);
                        assert_vel_eq(&k.to_chassis_vel(&states), &v.to_robot(*heading), 1e-6);
                    }
                }
            }
        }
    }

    #[test]
    fn test_pure_rotation() {
        let k = SwerveKinematics::new(ModuleGeometry::rectangular(0.5, 0.5).unwrap()).unwrap();
        let states = k.to_wheel_states(
            ChassisVel::robot(0.0, 0.0, 1.0),
            0.0,
            &[WheelState::default(); NUM_MODULES],
        );

        // Wheels are tangent to the circle through them
        let expected_angles = [
            3.0 * FRAC_PI_4,
            FRAC_PI_4,
            -3.0 * FRAC_PI_4,
            -FRAC_PI_4,
        ];
        let r = 0.25f64.hypot(0.25);

        for (s, a) in states.iter().zip(expected_angles.iter()) {
            assert!((s.speed_ms - r).abs() < 1e-9);
            assert!((s.angle_rad - a).abs() < 1e-9, "{} != {}", s.angle_rad, a);
        }
    }

    #[test]
    fn test_zero_speed_holds_angle() {
        let k = kin();
        let prev = [
            WheelState::new(1.0, 0.3),
            WheelState::new(1.0, -0.2),
            WheelState::new(1.0, 1.0),
            WheelState::new(1.0, 7.0),
        ];

        let states = k.to_wheel_states(ChassisVel::zero(), 0.0, &prev);

        for (s, p) in states.iter().zip(prev.iter()) {
            assert_eq!(s.speed_ms, 0.0);
            assert_eq!(s.angle_rad, p.angle_rad);
        }
    }

    #[test]
    fn test_field_relative() {
        let k = kin();
        let prev = [WheelState::default(); NUM_MODULES];

        // Facing +Y, a field +Y demand is straight ahead
        let states = k.to_wheel_states(ChassisVel::field(0.0, 1.0, 0.0), FRAC_PI_2, &prev);
        for s in states.iter() {
            assert!((s.speed_ms - 1.0).abs() < 1e-9);
            assert!(s.angle_rad.abs() < 1e-9);
        }
    }

    #[test]
    fn test_frame_rotation() {
        for heading in [-3.0 * PI, -1.0, 0.0, 0.5, FRAC_PI_2, 2.5, 7.0].iter() {
            let (rx, ry) = field_to_robot(0.8, -1.3, *heading);
            let (fx, fy) = robot_to_field(rx, ry, *heading);
            assert!((fx - 0.8).abs() < 1e-12);
            assert!((fy + 1.3).abs() < 1e-12);

            // Rotation preserves speed
            assert!((rx.hypot(ry) - 0.8f64.hypot(1.3)).abs() < 1e-12);
        }
    }

    #[test]
    fn test_desaturate() {
        let mut states = [
            WheelState::new(6.0, 0.0),
            WheelState::new(3.0, 0.0),
            WheelState::new(-2.0, 0.0),
            WheelState::new(1.0, 0.0),
        ];

        assert!(SwerveKinematics::desaturate(&mut states, 4.0));
        assert!((states[0].speed_ms - 4.0).abs() < 1e-12);
        assert!((states[1].speed_ms - 2.0).abs() < 1e-12);
        assert!((states[2].speed_ms + 4.0 / 3.0).abs() < 1e-12);

        assert!(!SwerveKinematics::desaturate(&mut states, 4.0));
    }

    #[test]
    fn test_invalid_geometry() {
        assert!(matches!(
            ModuleGeometry::rectangular(f64::NAN, 0.5),
            Err(KinematicsError::InvalidDimensions(_, _))
        ));
        assert!(ModuleGeometry::rectangular(0.5, 0.0).is_err());

        let mut geom = ModuleGeometry::rectangular(0.5, 0.5).unwrap();
        geom.offsets_m[1] = Vector2::new(f64::INFINITY, 0.0);
        assert!(matches!(
            SwerveKinematics::new(geom),
            Err(KinematicsError::InvalidOffset(ModuleId::FrontRight, _))
        ));

        // All wheels on one point cannot observe rotation
        let geom = ModuleGeometry {
            track_width_m: 0.5,
            wheelbase_m: 0.5,
            offsets_m: [Vector2::zeros(); NUM_MODULES],
        };
        assert!(matches!(
            SwerveKinematics::new(geom),
            Err(KinematicsError::DegenerateLayout)
        ));
    }
}
