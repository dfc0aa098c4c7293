//! # Heading sensor

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A sensor measuring the heading of the chassis.
pub trait Gyro {
    /// Current heading, continuous, anticlockwise positive.
    ///
    /// Units: radians
    fn heading_rad(&self) -> f64;

    /// Make the current heading read as zero.
    fn zero(&mut self);

    /// Force the raw sensor angle. Only simulated sensors support this, real
    /// sensors ignore it.
    fn set_angle(&mut self, _angle_rad: f64) {}
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A heading sensor whose raw angle is written by the simulator.
#[derive(Debug, Clone, Default)]
pub struct SimGyro {
    angle_rad: f64,
    zero_offset_rad: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Gyro for SimGyro {
    fn heading_rad(&self) -> f64 {
        self.angle_rad - self.zero_offset_rad
    }

    fn zero(&mut self) {
        self.zero_offset_rad = self.angle_rad;
    }

    fn set_angle(&mut self, angle_rad: f64) {
        self.angle_rad = angle_rad;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_sim_gyro() {
        let mut g = SimGyro::default();
        g.set_angle(1.0);
        assert_eq!(g.heading_rad(), 1.0);

        g.zero();
        assert_eq!(g.heading_rad(), 0.0);

        g.set_angle(1.5);
        assert!((g.heading_rad() - 0.5).abs() < 1e-12);
    }
}
