//! # Pose estimator
//!
//! Fuses wheel odometry with the heading sensor into a running estimate of the
//! vehicle's pose in the field frame.
//!
//! Odometry drives the estimate forward each tick. The heading sensor is far
//! more trustworthy than heading derived from the wheels, so the odometry
//! heading is pulled toward it by a steady state Kalman gain computed from the
//! configured standard deviations. Occasional external pose measurements
//! (e.g. vision) can be blended in with their own gains.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{debug, info, trace};

use crate::{
    geom::{Pose2, Twist2, WheelStates},
    kinematics::SwerveKinematics,
};
use util::maths::ang_dist;

pub use params::*;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Estimates the pose of the vehicle from odometry and a heading sensor.
#[derive(Debug, Clone)]
pub struct PoseEstimator {
    kinematics: SwerveKinematics,

    /// Time between odometry updates.
    ///
    /// Units: seconds
    period_s: f64,

    pose: Pose2,

    /// Added to the heading sensor reading to get a heading in the estimate's
    /// frame.
    ///
    /// Units: radians
    gyro_offset_rad: f64,

    /// Time of the last accepted update, `None` until the first update after
    /// construction or reset.
    last_time_s: Option<f64>,

    heading_gain: f64,

    /// Gains for (x, y, heading) of external pose measurements.
    vision_gains: [f64; 3],
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PoseEstimator {
    pub fn new(
        kinematics: SwerveKinematics,
        period_s: f64,
        start_pose: Pose2,
        gyro_heading_rad: f64,
        params: &EstimatorParams,
    ) -> Self {
        let heading_gain = steady_state_gain(
            params.state_std_dev_heading_deg.to_radians(),
            params.gyro_std_dev_deg.to_radians(),
        );
        let vision_gains = [
            steady_state_gain(params.state_std_dev_x_m, params.vision_std_dev_x_m),
            steady_state_gain(params.state_std_dev_y_m, params.vision_std_dev_y_m),
            steady_state_gain(
                params.state_std_dev_heading_deg.to_radians(),
                params.vision_std_dev_heading_deg.to_radians(),
            ),
        ];

        debug!(
            "Pose estimator gains: heading {:.4}, vision {:.4?}",
            heading_gain, vision_gains
        );

        Self {
            kinematics,
            period_s,
            pose: start_pose,
            gyro_offset_rad: start_pose.heading_rad - gyro_heading_rad,
            last_time_s: None,
            heading_gain,
            vision_gains,
        }
    }

    /// Current pose estimate.
    pub fn pose(&self) -> Pose2 {
        self.pose
    }

    /// Update the estimate with a new sample.
    ///
    /// Returns the new pose, or `None` if the sample was not used and the
    /// estimate is unchanged. Samples are not used if no wheel states are
    /// available, or if `time_s` is not after the last accepted sample.
    pub fn update(
        &mut self,
        time_s: f64,
        gyro_heading_rad: f64,
        wheel_states: Option<&WheelStates>,
    ) -> Option<Pose2> {
        let states = match wheel_states {
            Some(s) => s,
            None => {
                trace!("No wheel states at {:.3} s, holding estimate", time_s);
                return None;
            }
        };

        if let Some(last) = self.last_time_s {
            if !(time_s > last) {
                debug!(
                    "Rejecting stale estimator sample at {:.3} s (last was {:.3} s)",
                    time_s, last
                );
                return None;
            }
        }
        self.last_time_s = Some(time_s);

        let vel = self.kinematics.to_chassis_vel(states);
        let mut twist = Twist2::from_vel(&vel, self.period_s);

        // Correct the odometry heading toward the sensor along the shortest
        // path, so sensors which wrap do not cause a full turn
        let predicted_rad = self.pose.heading_rad + twist.dtheta_rad;
        let measured_rad = gyro_heading_rad + self.gyro_offset_rad;
        let fused_rad = predicted_rad + self.heading_gain * ang_dist(predicted_rad, measured_rad);

        twist.dtheta_rad = fused_rad - self.pose.heading_rad;
        self.pose = self.pose.exp(&twist);

        trace!(
            "Estimate at {:.3} s: ({:.3}, {:.3}) m, {:.2} deg",
            time_s,
            self.pose.x(),
            self.pose.y(),
            self.pose.heading_deg()
        );

        Some(self.pose)
    }

    /// Replace the estimate with `pose`.
    ///
    /// History is discarded and the heading sensor is re-based so that its
    /// current reading corresponds to `pose`'s heading. Callers should also
    /// zero the wheel drive encoders.
    pub fn reset(&mut self, pose: Pose2, gyro_heading_rad: f64) {
        info!(
            "Pose estimate reset to ({:.3}, {:.3}) m, {:.1} deg",
            pose.x(),
            pose.y(),
            pose.heading_deg()
        );

        self.pose = pose;
        self.gyro_offset_rad = pose.heading_rad - gyro_heading_rad;
        self.last_time_s = None;
    }

    /// Blend an external pose measurement into the estimate.
    pub fn add_vision_measurement(&mut self, measured: Pose2) {
        let [gx, gy, gh] = self.vision_gains;

        let dx = gx * (measured.x() - self.pose.x());
        let dy = gy * (measured.y() - self.pose.y());
        let dh = gh * ang_dist(self.pose.heading_rad, measured.heading_rad);

        self.pose = Pose2::new(self.pose.x() + dx, self.pose.y() + dy, self.pose.heading_rad + dh);

        // Keep the heading sensor in agreement with the corrected heading
        self.gyro_offset_rad += dh;

        debug!(
            "Vision correction of ({:.3}, {:.3}) m, {:.2} deg",
            dx,
            dy,
            dh.to_degrees()
        );
    }
}

/// Kalman gain for a model with standard deviation `state_std` observed by a
/// sensor with standard deviation `meas_std`.
fn steady_state_gain(state_std: f64, meas_std: f64) -> f64 {
    let q = state_std * state_std;
    let r = meas_std * meas_std;

    if q + r > 0.0 {
        q / (q + r)
    } else {
        0.5
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        geom::{WheelState, NUM_MODULES},
        kinematics::ModuleGeometry,
    };

    fn params() -> EstimatorParams {
        EstimatorParams {
            state_std_dev_x_m: 0.05,
            state_std_dev_y_m: 0.05,
            state_std_dev_heading_deg: 5.0,
            gyro_std_dev_deg: 0.1,
            vision_std_dev_x_m: 0.01,
            vision_std_dev_y_m: 0.01,
            vision_std_dev_heading_deg: 0.1,
        }
    }

    fn estimator(start: Pose2, gyro: f64) -> PoseEstimator {
        let kin = SwerveKinematics::new(ModuleGeometry::rectangular(0.5, 0.5).unwrap()).unwrap();
        PoseEstimator::new(kin, 0.02, start, gyro, &params())
    }

    fn forwards(speed_ms: f64) -> WheelStates {
        [WheelState::new(speed_ms, 0.0); NUM_MODULES]
    }

    #[test]
    fn test_cold_start() {
        let mut e = estimator(Pose2::new(1.0, 2.0, 0.5), 0.0);
        assert!(e.update(0.02, 0.0, None).is_none());
        assert_eq!(e.pose(), Pose2::new(1.0, 2.0, 0.5));
    }

    #[test]
    fn test_stale_samples() {
        let mut e = estimator(Pose2::default(), 0.0);
        let states = forwards(1.0);

        assert!(e.update(0.02, 0.0, Some(&states)).is_some());
        let pose = e.pose();

        assert!(e.update(0.02, 0.0, Some(&states)).is_none());
        assert!(e.update(0.01, 0.0, Some(&states)).is_none());
        assert_eq!(e.pose(), pose);

        assert!(e.update(0.04, 0.0, Some(&states)).is_some());
    }

    #[test]
    fn test_straight_odometry() {
        let mut e = estimator(Pose2::default(), 0.0);
        let states = forwards(1.0);

        for i in 1..=50 {
            e.update(i as f64 * 0.02, 0.0, Some(&states));
        }

        let pose = e.pose();
        assert!((pose.x() - 1.0).abs() < 1e-9);
        assert!(pose.y().abs() < 1e-9);
        assert!(pose.heading_rad.abs() < 1e-9);
    }

    #[test]
    fn test_gyro_dominates_heading() {
        let mut e = estimator(Pose2::default(), 0.0);

        // Wheels report no rotation but the sensor has turned
        e.update(0.02, 0.1, Some(&forwards(0.0)));
        assert!((e.pose().heading_rad - 0.1).abs() < 1e-3);
    }

    #[test]
    fn test_gyro_wrap() {
        // Sensor which reports wrapped angles, crossing from +pi to -pi
        let mut e = estimator(Pose2::new(0.0, 0.0, 3.1), 3.1);
        e.update(0.02, -3.1, Some(&forwards(0.0)));

        let expected = 2.0 * std::f64::consts::PI - 3.1;
        assert!((e.pose().heading_rad - expected).abs() < 1e-3, "{}", e.pose().heading_rad);
    }

    #[test]
    fn test_reset_exact() {
        let mut e = estimator(Pose2::default(), 0.0);
        let states = forwards(1.0);
        for i in 1..=10 {
            e.update(i as f64 * 0.02, 0.3, Some(&states));
        }

        let target = Pose2::new(4.0, -2.0, 1.2);
        e.reset(target, 0.3);
        assert_eq!(e.pose(), target);

        // History was discarded, so an earlier time is accepted, and the
        // sensor reading from the reset maps to the reset heading
        assert!(e.update(0.02, 0.3, Some(&forwards(0.0))).is_some());
        assert!((e.pose().heading_rad - 1.2).abs() < 1e-9);
        assert!((e.pose().x() - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_vision_measurement() {
        let mut e = estimator(Pose2::default(), 0.0);
        e.add_vision_measurement(Pose2::new(1.0, -1.0, 0.2));

        let pose = e.pose();
        let g = 0.05f64.powi(2) / (0.05f64.powi(2) + 0.01f64.powi(2));
        assert!((pose.x() - g).abs() < 1e-9);
        assert!((pose.y() + g).abs() < 1e-9);
        assert!(pose.heading_rad > 0.19);

        // The heading correction survives the next sensor update
        e.update(0.02, 0.0, Some(&forwards(0.0)));
        assert!((e.pose().heading_rad - pose.heading_rad).abs() < 1e-9);
    }
}
