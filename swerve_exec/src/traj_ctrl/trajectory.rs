//! # Trajectories
//!
//! Time parameterised references for the follower. Trajectories are produced
//! elsewhere, this module only stores and samples them.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::geom::Pose2;
use util::maths::ang_dist;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A single point along a trajectory.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectorySample {
    /// Time since the start of the trajectory.
    ///
    /// Units: seconds
    pub time_s: f64,

    /// Reference pose. The heading of this pose is the direction of travel.
    pub pose: Pose2,

    /// Speed along the direction of travel.
    ///
    /// Units: meters/second
    pub velocity_ms: f64,

    /// Heading the chassis should face, independent of the direction of
    /// travel.
    ///
    /// Units: radians
    pub heading_rad: f64,
}

/// An ordered list of trajectory samples.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trajectory {
    samples: Vec<TrajectorySample>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum TrajError {
    #[error("A trajectory must contain at least one sample")]
    Empty,

    #[error("Could not read the trajectory file: {0}")]
    FileError(std::io::Error),

    #[error("Could not parse the trajectory file: {0}")]
    ParseError(serde_json::Error),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Trajectory {
    /// Build a trajectory from samples in time order.
    pub fn new(samples: Vec<TrajectorySample>) -> Result<Self, TrajError> {
        if samples.is_empty() {
            return Err(TrajError::Empty);
        }

        Ok(Self { samples })
    }

    /// Load a trajectory from a JSON array of samples.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, TrajError> {
        let s = std::fs::read_to_string(path).map_err(TrajError::FileError)?;
        Self::from_json(&s)
    }

    pub fn from_json(json: &str) -> Result<Self, TrajError> {
        let samples: Vec<TrajectorySample> =
            serde_json::from_str(json).map_err(TrajError::ParseError)?;
        Self::new(samples)
    }

    pub fn samples(&self) -> &[TrajectorySample] {
        &self.samples
    }

    /// Time of the final sample.
    pub fn total_time_s(&self) -> f64 {
        self.samples[self.samples.len() - 1].time_s
    }

    /// The reference at `time_s`, linearly interpolated between the
    /// neighbouring samples and clamped to the first and last sample.
    pub fn sample(&self, time_s: f64) -> TrajectorySample {
        let first = self.samples[0];
        let last = self.samples[self.samples.len() - 1];

        if time_s <= first.time_s {
            return first;
        }
        if time_s >= last.time_s {
            return last;
        }

        let upper_idx = self
            .samples
            .iter()
            .position(|s| s.time_s > time_s)
            .unwrap_or(self.samples.len() - 1);
        let lower = &self.samples[upper_idx.saturating_sub(1)];
        let upper = &self.samples[upper_idx];

        let span_s = upper.time_s - lower.time_s;
        let t = if span_s > 0.0 {
            (time_s - lower.time_s) / span_s
        } else {
            1.0
        };

        let lerp = |a: f64, b: f64| a + (b - a) * t;

        TrajectorySample {
            time_s,
            pose: Pose2 {
                position_m: lower.pose.position_m
                    + (upper.pose.position_m - lower.pose.position_m) * t,
                heading_rad: lower.pose.heading_rad
                    + ang_dist(lower.pose.heading_rad, upper.pose.heading_rad) * t,
            },
            velocity_ms: lerp(lower.velocity_ms, upper.velocity_ms),
            heading_rad: lower.heading_rad + ang_dist(lower.heading_rad, upper.heading_rad) * t,
        }
    }
}
