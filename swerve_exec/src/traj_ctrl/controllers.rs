//! # Trajectory controllers module
//!
//! This module provides the feedback controllers used for trajectory control:
//! a fixed period PID controller, a PID controller which tracks a trapezoidal
//! motion profile, and the holonomic controller combining them to steer the
//! chassis toward a reference pose.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Serialize;
use std::f64::consts::PI;

// Internal
use super::TrajCtrlParams;
use crate::geom::{ChassisVel, Pose2};
use util::maths::{ang_dist, input_modulus};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A PID controller running at a fixed period.
#[derive(Debug, Serialize, Clone)]
pub struct PidController {
    /// Proportional gain
    k_p: f64,

    /// Integral gain
    k_i: f64,

    /// Dervative gain
    k_d: f64,

    /// Time between calls to `calculate`
    period_s: f64,

    /// If set the input wraps around this (min, max) range.
    continuous_range: Option<(f64, f64)>,

    /// Previous error
    prev_error: Option<f64>,

    /// The integral accumulation
    integral: f64,
}

/// Position and velocity along a one dimensional motion profile.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize)]
pub struct ProfileState {
    pub position: f64,
    pub velocity: f64,
}

/// Trapezoidal motion profile limits.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct ProfileConstraints {
    pub max_velocity: f64,
    pub max_acceleration: f64,
}

/// A PID controller whose setpoint moves toward the goal along a trapezoidal
/// profile, rather than jumping straight to it.
#[derive(Debug, Serialize, Clone)]
pub struct ProfiledPidController {
    pid: PidController,
    constraints: ProfileConstraints,
    setpoint: ProfileState,
}

/// Controller for a holonomic chassis following a reference pose.
///
/// Translation is corrected by independent P controllers on the field x and
/// y errors, added to a feedforward velocity along the reference direction.
/// Heading is corrected by a profiled controller so that large heading
/// changes are made smoothly.
#[derive(Debug, Serialize, Clone)]
pub struct HolonomicController {
    x_ctrl: PidController,
    y_ctrl: PidController,
    theta_ctrl: ProfiledPidController,

    /// Tolerance on (x, y, heading) used by `at_reference`.
    tolerance: [f64; 3],

    /// Last (x, y, heading) error.
    error: [f64; 3],

    first_run: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PidController {

    /// Create a new controller with the given gains.
    pub fn new(k_p: f64, k_i: f64, k_d: f64, period_s: f64) -> Self {
        Self {
            k_p, k_i, k_d,
            period_s,
            continuous_range: None,
            integral: 0f64,
            prev_error: None
        }
    }

    /// Treat `min` and `max` as the same point, so the error is always taken
    /// the shortest way around.
    pub fn enable_continuous_input(&mut self, min: f64, max: f64) {
        self.continuous_range = Some((min, max));
    }

    /// Get the output of the controller for the given measurement and
    /// setpoint.
    pub fn calculate(&mut self, measurement: f64, setpoint: f64) -> f64 {
        let error = match self.continuous_range {
            Some((min, max)) => {
                let half_span = (max - min) / 2.0;
                input_modulus(setpoint - measurement, -half_span, half_span)
            },
            None => setpoint - measurement
        };

        self.integral += error * self.period_s;

        // No derivative on the first call, there's nothing to difference
        // against and using the raw error would kick the output.
        let deriv = match self.prev_error {
            Some(e) => (error - e) / self.period_s,
            None => 0f64
        };

        self.prev_error = Some(error);

        self.k_p * error
            + self.k_i * self.integral
            + self.k_d * deriv
    }

    /// The error from the last call to `calculate`.
    pub fn error(&self) -> f64 {
        self.prev_error.unwrap_or(0f64)
    }

    /// Clear the integral and derivative history.
    pub fn reset(&mut self) {
        self.integral = 0f64;
        self.prev_error = None;
    }
}

impl ProfileConstraints {

    /// Advance `current` toward `goal` by `dt_s`, accelerating and
    /// decelerating at the maximum rate without exceeding the maximum
    /// velocity. The goal is assumed to be at rest.
    pub fn step(&self, current: ProfileState, goal: ProfileState, dt_s: f64) -> ProfileState {
        let to_go = goal.position - current.position;
        let dir = to_go.signum();

        // Fastest speed from which the goal can still be reached without
        // overshooting
        let stop_speed = (2.0 * self.max_acceleration * to_go.abs()).sqrt();
        let target_vel = dir * stop_speed.min(self.max_velocity);

        let max_dv = self.max_acceleration * dt_s;
        let dv = (target_vel - current.velocity).max(-max_dv).min(max_dv);
        let velocity = current.velocity + dv;
        let position = current.position + 0.5 * (current.velocity + velocity) * dt_s;

        // Snap onto the goal when it would be reached or passed this step
        if (goal.position - position) * dir <= 0.0 {
            goal
        }
        else {
            ProfileState { position, velocity }
        }
    }
}

impl ProfiledPidController {
    pub fn new(
        k_p: f64,
        k_i: f64,
        k_d: f64,
        constraints: ProfileConstraints,
        period_s: f64
    ) -> Self {
        Self {
            pid: PidController::new(k_p, k_i, k_d, period_s),
            constraints,
            setpoint: ProfileState::default()
        }
    }

    pub fn enable_continuous_input(&mut self, min: f64, max: f64) {
        self.pid.enable_continuous_input(min, max);
    }

    /// Restart the profile from `measurement`, at rest.
    pub fn reset(&mut self, measurement: f64) {
        self.pid.reset();
        self.setpoint = ProfileState {
            position: measurement,
            velocity: 0f64
        };
    }

    pub fn setpoint(&self) -> ProfileState {
        self.setpoint
    }

    /// Step the profile toward `goal` and return the controller output for
    /// the new setpoint.
    pub fn calculate(&mut self, measurement: f64, goal: f64) -> f64 {
        let mut goal = ProfileState { position: goal, velocity: 0f64 };

        // With continuous input both the goal and the setpoint are moved to
        // within half a span of the measurement, so the profile takes the
        // short way round.
        if let Some((min, max)) = self.pid.continuous_range {
            let half_span = (max - min) / 2.0;
            goal.position = measurement
                + input_modulus(goal.position - measurement, -half_span, half_span);
            self.setpoint.position = measurement
                + input_modulus(self.setpoint.position - measurement, -half_span, half_span);
        }

        self.setpoint = self.constraints.step(self.setpoint, goal, self.pid.period_s);

        self.pid.calculate(measurement, self.setpoint.position)
    }
}

impl HolonomicController {

    /// Create the controller from the trajectory control parameters.
    pub fn new(params: &TrajCtrlParams, period_s: f64) -> Self {
        let mut theta_ctrl = ProfiledPidController::new(
            params.theta_k_p,
            params.theta_k_i,
            params.theta_k_d,
            ProfileConstraints {
                max_velocity: params.theta_max_vel_rads,
                max_acceleration: params.theta_max_acc_rads2
            },
            period_s
        );
        theta_ctrl.enable_continuous_input(-PI, PI);

        Self {
            x_ctrl: PidController::new(params.x_k_p, 0.0, 0.0, period_s),
            y_ctrl: PidController::new(params.y_k_p, 0.0, 0.0, period_s),
            theta_ctrl,
            tolerance: [
                params.tol_x_m,
                params.tol_y_m,
                params.tol_heading_deg.to_radians()
            ],
            error: [0f64; 3],
            first_run: true
        }
    }

    /// Get the field relative velocity which moves `current` toward
    /// `pose_ref`.
    ///
    /// `linear_vel_ref_ms` is the feedforward speed along the direction of
    /// `pose_ref`'s heading, while `heading_ref_rad` is the heading the
    /// chassis should face.
    pub fn calculate(
        &mut self,
        current: &Pose2,
        pose_ref: &Pose2,
        linear_vel_ref_ms: f64,
        heading_ref_rad: f64
    ) -> ChassisVel {
        if self.first_run {
            self.theta_ctrl.reset(current.heading_rad);
            self.first_run = false;
        }

        let vx_ff = linear_vel_ref_ms * pose_ref.heading_rad.cos();
        let vy_ff = linear_vel_ref_ms * pose_ref.heading_rad.sin();

        let omega = self.theta_ctrl.calculate(current.heading_rad, heading_ref_rad);

        self.error = [
            pose_ref.x() - current.x(),
            pose_ref.y() - current.y(),
            ang_dist(current.heading_rad, heading_ref_rad)
        ];

        let vx_fb = self.x_ctrl.calculate(current.x(), pose_ref.x());
        let vy_fb = self.y_ctrl.calculate(current.y(), pose_ref.y());

        ChassisVel::field(vx_ff + vx_fb, vy_ff + vy_fb, omega)
    }

    /// True if the last error was within tolerance on every axis.
    pub fn at_reference(&self) -> bool {
        self.error
            .iter()
            .zip(self.tolerance.iter())
            .all(|(e, t)| e.abs() < *t)
    }

    /// The last (x, y, heading) error.
    pub fn error(&self) -> [f64; 3] {
        self.error
    }

    /// Forget all controller history. The heading profile restarts from the
    /// measured heading on the next call.
    pub fn reset(&mut self) {
        self.x_ctrl.reset();
        self.y_ctrl.reset();
        self.first_run = true;
        self.error = [0f64; 3];
    }
}
