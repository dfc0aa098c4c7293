//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
///
/// This function is taken from the std library as num is missing it.
///
/// In particular, the return value `r` satisfies `0.0 <= r < rhs.abs()` in
/// most cases. However, due to a floating point round-off error it can
/// result in `r == rhs.abs()`, violating the mathematical definition, if
/// `self` is much smaller than `rhs.abs()` in magnitude and `self < 0.0`.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float
{
    let r = lhs % rhs;
    if r < T::zero() { r + rhs.abs() } else { r }
}

/// Wrap `value` into the half-open range `(min, max]`.
///
/// Used for continuous inputs (angles) where `min` and `max` describe the same
/// physical point.
pub fn input_modulus<T>(value: T, min: T, max: T) -> T
where
    T: Float
{
    let span = max - min;
    let wrapped = max - rem_euclid(max - value, span);

    // rem_euclid can round up to exactly `span`, which would land on `min`
    if wrapped <= min {
        wrapped + span
    }
    else {
        wrapped
    }
}

/// Wrap an angle into the range `(-pi, pi]`.
pub fn wrap_pi<T>(angle_rad: T) -> T
where
    T: Float
{
    let pi = T::from(std::f64::consts::PI).unwrap();
    input_modulus(angle_rad, -pi, pi)
}

/// Get the signed shortest angular distance to travel from `from` to `to`.
///
/// The result lies in `(-pi, pi]`, so targets which differ by a whole number
/// of turns give zero distance.
pub fn ang_dist<T>(from: T, to: T) -> T
where
    T: Float
{
    wrap_pi(to - from)
}

/// Apply a symmetric deadband to a normalised input, rescaling the remainder
/// so the output still spans `[-1, 1]`.
pub fn deadband<T>(value: T, band: T) -> T
where
    T: Float
{
    let one = T::one();

    if value.abs() <= band {
        return T::zero()
    }

    let scaled = (value.abs() - band) / (one - band);
    scaled.min(one) * value.signum()
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::{PI, TAU};

    const EPS: f64 = 1e-12;

    #[test]
    fn test_wrap_pi() {
        assert!((wrap_pi(0f64)).abs() < EPS);
        assert!((wrap_pi(PI) - PI).abs() < EPS);
        assert!((wrap_pi(-PI) - PI).abs() < EPS);
        assert!((wrap_pi(TAU + 1.0) - 1.0).abs() < EPS);
        assert!((wrap_pi(-TAU - 1.0) + 1.0).abs() < EPS);
        assert!((wrap_pi(3.0 * PI / 2.0) + PI / 2.0).abs() < EPS);
    }

    #[test]
    fn test_ang_dist() {
        let one_deg = 1f64.to_radians();

        assert!((ang_dist(1f64, 2f64) - 1.0).abs() < EPS);
        assert!((ang_dist(2f64, 1f64) + 1.0).abs() < EPS);
        assert!(ang_dist(0f64, TAU).abs() < EPS);

        // A target 359 degrees away is reached by turning 1 degree the other
        // way
        assert!((ang_dist(0f64, 359f64.to_radians()) + one_deg).abs() < 1e-9);
        assert!((ang_dist(0f64, one_deg) - one_deg).abs() < 1e-9);
        assert!((ang_dist(359f64.to_radians(), 0f64) - one_deg).abs() < 1e-9);
    }

    #[test]
    fn test_deadband() {
        assert_eq!(deadband(0.05f64, 0.1), 0.0);
        assert_eq!(deadband(1f64, 0.1), 1.0);
        assert_eq!(deadband(-1f64, 0.1), -1.0);
        assert!((deadband(0.55f64, 0.1) - 0.5).abs() < EPS);
    }
}
