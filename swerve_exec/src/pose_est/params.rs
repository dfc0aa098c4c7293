//! Parameters structure for the pose estimator

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Standard deviations describing how far each source of pose information is
/// trusted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EstimatorParams {

    // ---- MODEL (ODOMETRY) ----

    /// Units: meters
    pub state_std_dev_x_m: f64,

    /// Units: meters
    pub state_std_dev_y_m: f64,

    /// Units: degrees
    pub state_std_dev_heading_deg: f64,

    // ---- LOCAL MEASUREMENTS ----

    /// Units: degrees
    pub gyro_std_dev_deg: f64,

    // ---- GLOBAL MEASUREMENTS ----

    /// Units: meters
    pub vision_std_dev_x_m: f64,

    /// Units: meters
    pub vision_std_dev_y_m: f64,

    /// Units: degrees
    pub vision_std_dev_heading_deg: f64,
}
