//! # DC motor model
//!
//! Steady state brushed DC motor model, which is also a good approximation
//! for the brushless motors used on swerve modules when driven in voltage
//! mode. Inductance is neglected since the electrical time constant is far
//! below the simulation step.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

const RPM_TO_RADS: f64 = std::f64::consts::PI / 30.0;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Electrical and mechanical constants of a DC motor.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DcMotor {
    /// Voltage the datasheet figures are quoted at.
    ///
    /// Units: volts
    pub nominal_voltage_v: f64,

    /// Units: Newton meters
    pub stall_torque_nm: f64,

    /// Units: amps
    pub stall_current_a: f64,

    /// Units: amps
    pub free_current_a: f64,

    /// Units: radians/second
    pub free_speed_rads: f64,

    /// Winding resistance.
    ///
    /// Units: ohms
    pub resistance_ohm: f64,

    /// Speed constant.
    ///
    /// Units: (radians/second)/volt
    pub kv_rads_per_v: f64,

    /// Torque constant.
    ///
    /// Units: Newton meters/amp
    pub kt_nm_per_a: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Motors which can be selected in the simulation parameters.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
pub enum MotorKind {
    Falcon500,
    KrakenX60,
    Neo,
    Neo550,
    Cim,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl DcMotor {
    pub fn new(
        nominal_voltage_v: f64,
        stall_torque_nm: f64,
        stall_current_a: f64,
        free_current_a: f64,
        free_speed_rads: f64,
    ) -> Self {
        let resistance_ohm = nominal_voltage_v / stall_current_a;

        Self {
            nominal_voltage_v,
            stall_torque_nm,
            stall_current_a,
            free_current_a,
            free_speed_rads,
            resistance_ohm,
            kv_rads_per_v: free_speed_rads / (nominal_voltage_v - resistance_ohm * free_current_a),
            kt_nm_per_a: stall_torque_nm / stall_current_a,
        }
    }

    pub fn falcon500() -> Self {
        Self::new(12.0, 4.69, 257.0, 1.5, 6380.0 * RPM_TO_RADS)
    }

    pub fn kraken_x60() -> Self {
        Self::new(12.0, 7.09, 366.0, 2.0, 6000.0 * RPM_TO_RADS)
    }

    pub fn neo() -> Self {
        Self::new(12.0, 2.6, 105.0, 1.8, 5676.0 * RPM_TO_RADS)
    }

    pub fn neo550() -> Self {
        Self::new(12.0, 0.97, 100.0, 1.4, 11000.0 * RPM_TO_RADS)
    }

    pub fn cim() -> Self {
        Self::new(12.0, 2.42, 133.0, 2.7, 5310.0 * RPM_TO_RADS)
    }

    /// Current drawn with `voltage_v` applied while turning at `speed_rads`.
    pub fn current_a(&self, voltage_v: f64, speed_rads: f64) -> f64 {
        (voltage_v - speed_rads / self.kv_rads_per_v) / self.resistance_ohm
    }

    /// Shaft torque with `voltage_v` applied while turning at `speed_rads`.
    pub fn torque_nm(&self, voltage_v: f64, speed_rads: f64) -> f64 {
        self.kt_nm_per_a * self.current_a(voltage_v, speed_rads)
    }
}

impl From<MotorKind> for DcMotor {
    fn from(kind: MotorKind) -> Self {
        match kind {
            MotorKind::Falcon500 => DcMotor::falcon500(),
            MotorKind::KrakenX60 => DcMotor::kraken_x60(),
            MotorKind::Neo => DcMotor::neo(),
            MotorKind::Neo550 => DcMotor::neo550(),
            MotorKind::Cim => DcMotor::cim(),
        }
    }
}
