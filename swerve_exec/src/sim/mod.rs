//! # Drivetrain simulation
//!
//! Advances a physics model of the four modules and the chassis so that the
//! control code can run without hardware.
//!
//! Each module axis is a DC motor driving an inertia through a gearbox,
//! resisted by viscous and Coulomb friction. The chassis is not simulated as a
//! free rigid body: each drive axis sees a share of the chassis mass and
//! moment of inertia reflected through the wheel radius, and the chassis
//! moves with the velocity which best fits the wheel velocities, as found by
//! forward kinematics. This assumes the wheels never slip.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod motor;
mod params;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{debug, info, warn};

use crate::{
    geom::{ModuleId, Pose2, Twist2, WheelState, WheelStates, NUM_MODULES},
    kinematics::SwerveKinematics,
};

pub use motor::*;
pub use params::*;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Axes turning slower than this are considered stationary for the purposes
/// of static friction.
///
/// Units: radians/second
const STICTION_VEL_RADS: f64 = 1e-4;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Simulated four module swerve drivetrain.
#[derive(Debug, Clone)]
pub struct QuadSwerveSim {
    params: SimParams,

    kinematics: SwerveKinematics,

    drive_motor: DcMotor,
    steer_motor: DcMotor,

    wheel_radius_m: f64,

    /// Total inertia seen by each drive axis, at the wheel.
    drive_inertia_kgm2: [f64; NUM_MODULES],

    wheels: [AxisPair; NUM_MODULES],

    /// The "actual" pose of the simulated vehicle.
    pose: Pose2,

    time_s: f64,
}

/// Encoder readings for one module.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct WheelFeedback {
    /// Units: radians, at the wheel
    pub drive_pos_rad: f64,

    /// Units: radians/second, at the wheel
    pub drive_vel_rads: f64,

    /// Absolute module angle, continuous.
    ///
    /// Units: radians
    pub steer_pos_rad: f64,

    /// Units: radians/second
    pub steer_vel_rads: f64,
}

#[derive(Debug, Copy, Clone, Default)]
struct AxisPair {
    drive_v: f64,
    steer_v: f64,
    feedback: WheelFeedback,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error("Simulation parameter {0} must be finite and positive, found {1}")]
    InvalidParam(&'static str, f64),

    #[error("Simulation parameter {0} must be finite and not negative, found {1}")]
    NegativeParam(&'static str, f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl QuadSwerveSim {
    /// Create a new simulation with the vehicle at rest at `start_pose`.
    pub fn new(
        params: &SimParams,
        kinematics: SwerveKinematics,
        wheel_radius_m: f64,
        start_pose: Pose2,
    ) -> Result<Self, SimError> {
        let positive = [
            ("mass_kg", params.mass_kg),
            ("moi_kgm2", params.moi_kgm2),
            ("drive_gear_ratio", params.drive_gear_ratio),
            ("steer_gear_ratio", params.steer_gear_ratio),
            ("steer_inertia_kgm2", params.steer_inertia_kgm2),
            ("max_substep_s", params.max_substep_s),
            ("wheel_radius_m", wheel_radius_m),
        ];
        for (name, value) in positive.iter() {
            if !(value.is_finite() && *value > 0.0) {
                return Err(SimError::InvalidParam(name, *value));
            }
        }

        let non_negative = [
            ("wheel_inertia_kgm2", params.wheel_inertia_kgm2),
            ("drive_viscous_nm_per_rads", params.drive_viscous_nm_per_rads),
            ("drive_coulomb_nm", params.drive_coulomb_nm),
            ("steer_viscous_nm_per_rads", params.steer_viscous_nm_per_rads),
            ("steer_coulomb_nm", params.steer_coulomb_nm),
        ];
        for (name, value) in non_negative.iter() {
            if !(value.is_finite() && *value >= 0.0) {
                return Err(SimError::NegativeParam(name, *value));
            }
        }

        // Half the chassis mass is shared equally between the wheels, the
        // other half is the moment of inertia reflected through each wheel's
        // lever arm.
        let mut drive_inertia_kgm2 = [0.0; NUM_MODULES];
        for id in ModuleId::ALL.iter() {
            let lever_m2 = kinematics.geometry().radius_m(*id).powi(2).max(1e-6);
            let mass_share_kg = 0.5 * params.mass_kg / NUM_MODULES as f64
                + 0.5 * params.moi_kgm2 / (NUM_MODULES as f64 * lever_m2);

            drive_inertia_kgm2[id.index()] =
                params.wheel_inertia_kgm2 + wheel_radius_m.powi(2) * mass_share_kg;
        }

        debug!("Reflected drive inertia: {:?} kg m^2", drive_inertia_kgm2);

        Ok(Self {
            params: params.clone(),
            kinematics,
            drive_motor: params.drive_motor.into(),
            steer_motor: params.steer_motor.into(),
            wheel_radius_m,
            drive_inertia_kgm2,
            wheels: [AxisPair::default(); NUM_MODULES],
            pose: start_pose,
            time_s: 0.0,
        })
    }

    /// Set the voltages applied to a module until the next call.
    pub fn set_input_voltages(&mut self, id: ModuleId, drive_v: f64, steer_v: f64) {
        let w = &mut self.wheels[id.index()];
        w.drive_v = drive_v;
        w.steer_v = steer_v;
    }

    /// Advance the simulation by `dt_s`, holding the input voltages constant.
    pub fn update(&mut self, dt_s: f64) {
        if !(dt_s.is_finite() && dt_s > 0.0) {
            warn!("Ignoring simulation step of {} s", dt_s);
            return;
        }

        let num_substeps = (dt_s / self.params.max_substep_s).ceil().max(1.0) as usize;
        let h = dt_s / num_substeps as f64;

        for _ in 0..num_substeps {
            for (i, w) in self.wheels.iter_mut().enumerate() {
                let fb = &mut w.feedback;

                // Drive
                let g = self.params.drive_gear_ratio;
                let torque_nm = self
                    .drive_motor
                    .torque_nm(w.drive_v, fb.drive_vel_rads * g) * g;
                fb.drive_vel_rads = step_axis(
                    fb.drive_vel_rads,
                    torque_nm,
                    self.drive_inertia_kgm2[i],
                    self.params.drive_viscous_nm_per_rads,
                    self.params.drive_coulomb_nm,
                    h,
                );
                fb.drive_pos_rad += fb.drive_vel_rads * h;

                // Steer
                let g = self.params.steer_gear_ratio;
                let torque_nm = self
                    .steer_motor
                    .torque_nm(w.steer_v, fb.steer_vel_rads * g) * g;
                fb.steer_vel_rads = step_axis(
                    fb.steer_vel_rads,
                    torque_nm,
                    self.params.steer_inertia_kgm2,
                    self.params.steer_viscous_nm_per_rads,
                    self.params.steer_coulomb_nm,
                    h,
                );
                fb.steer_pos_rad += fb.steer_vel_rads * h;
            }

            let vel = self.kinematics.to_chassis_vel(&self.wheel_states());
            self.pose = self.pose.exp(&Twist2::from_vel(&vel, h));
        }

        self.time_s += dt_s;
    }

    /// Encoder readings of the given module.
    pub fn feedback(&self, id: ModuleId) -> WheelFeedback {
        self.wheels[id.index()].feedback
    }

    /// True speed and angle of every wheel.
    pub fn wheel_states(&self) -> WheelStates {
        let mut states = [WheelState::default(); NUM_MODULES];
        for (s, w) in states.iter_mut().zip(self.wheels.iter()) {
            *s = WheelState::new(
                w.feedback.drive_vel_rads * self.wheel_radius_m,
                w.feedback.steer_pos_rad,
            );
        }
        states
    }

    /// The "actual" pose of the simulated vehicle.
    pub fn actual_pose(&self) -> Pose2 {
        self.pose
    }

    /// Time simulated since creation.
    pub fn time_s(&self) -> f64 {
        self.time_s
    }

    /// Teleport the vehicle to `pose`.
    ///
    /// Wheel speeds and angles are kept so a moving vehicle keeps moving.
    pub fn model_reset(&mut self, pose: Pose2) {
        info!(
            "Simulated pose reset to ({:.3}, {:.3}) m, {:.1} deg",
            pose.x(),
            pose.y(),
            pose.heading_deg()
        );
        self.pose = pose;
    }
}

/// Integrate the velocity of one axis over `h` seconds.
fn step_axis(
    vel_rads: f64,
    applied_nm: f64,
    inertia_kgm2: f64,
    viscous_nm_per_rads: f64,
    coulomb_nm: f64,
    h: f64,
) -> f64 {
    let moving = vel_rads.abs() >= STICTION_VEL_RADS;

    // Static friction holds the axis until the applied torque overcomes it
    if !moving && applied_nm.abs() <= coulomb_nm {
        return 0.0;
    }

    let direction = if moving {
        vel_rads.signum()
    } else {
        applied_nm.signum()
    };
    let friction_nm = -viscous_nm_per_rads * vel_rads - coulomb_nm * direction;

    let new_vel_rads = vel_rads + (applied_nm + friction_nm) / inertia_kgm2 * h;

    // Friction alone cannot reverse the direction of motion
    if new_vel_rads * vel_rads < 0.0 && applied_nm.abs() <= coulomb_nm {
        0.0
    } else {
        new_vel_rads
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::kinematics::ModuleGeometry;

    fn sim() -> QuadSwerveSim {
        let params: SimParams =
            util::params::from_str(include_str!("../../../params/sim.toml")).unwrap();
        let kin = SwerveKinematics::new(ModuleGeometry::rectangular(0.5, 0.5).unwrap()).unwrap();

        QuadSwerveSim::new(&params, kin, 0.05, Pose2::default()).unwrap()
    }

    #[test]
    fn test_coasts_at_rest() {
        let mut s = sim();
        for _ in 0..50 {
            s.update(0.02);
        }

        assert_eq!(s.actual_pose(), Pose2::default());
        assert!((s.time_s() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_drive_forwards() {
        let mut s = sim();
        for id in ModuleId::ALL.iter() {
            s.set_input_voltages(*id, 6.0, 0.0);
        }
        for _ in 0..50 {
            s.update(0.02);
        }

        let pose = s.actual_pose();
        assert!(pose.x() > 0.5, "x = {}", pose.x());
        assert!(pose.y().abs() < 1e-9);
        assert!(pose.heading_rad.abs() < 1e-9);

        for id in ModuleId::ALL.iter() {
            assert!(s.feedback(*id).drive_vel_rads > 0.0);
        }

        // With no voltage the vehicle slows down but keeps the same heading
        let speed_before = s.wheel_states()[0].speed_ms;
        for id in ModuleId::ALL.iter() {
            s.set_input_voltages(*id, 0.0, 0.0);
        }
        s.update(0.1);
        assert!(s.wheel_states()[0].speed_ms < speed_before);
    }

    #[test]
    fn test_steer_moves() {
        let mut s = sim();
        s.set_input_voltages(ModuleId::BackRight, 0.0, 2.0);
        s.update(0.02);

        assert!(s.feedback(ModuleId::BackRight).steer_pos_rad > 0.0);
        assert_eq!(s.feedback(ModuleId::FrontLeft).steer_pos_rad, 0.0);

        // Turning a wheel on the spot does not move the chassis
        assert_eq!(s.actual_pose(), Pose2::default());
    }

    #[test]
    fn test_model_reset() {
        let mut s = sim();
        let target = Pose2::new(3.0, -1.0, 2.0);
        s.model_reset(target);
        assert_eq!(s.actual_pose(), target);
    }

    #[test]
    fn test_static_friction() {
        assert_eq!(step_axis(0.0, 0.01, 1.0, 0.1, 0.02, 0.001), 0.0);
        assert!(step_axis(0.0, 0.5, 1.0, 0.1, 0.02, 0.001) > 0.0);

        // A slowly coasting axis stops rather than reversing
        assert_eq!(step_axis(1e-3, 0.0, 1e-3, 0.0, 1.0, 0.01), 0.0);
    }
}
