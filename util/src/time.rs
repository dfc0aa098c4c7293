//! General time utility functions

use chrono;

/// Number of nanoseconds in a second
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Convert a duration into a number of seconds, or `None` if the nanosecond
/// count overflows.
pub fn duration_to_seconds(duration: chrono::Duration) -> Option<f64> {
    duration
        .num_nanoseconds()
        .map(|ns| ns as f64 / NANOS_PER_SECOND as f64)
}

/// Number of whole cycles of `period_s` contained in `time_s`, rounded to the
/// nearest cycle to absorb floating point error in accumulated times.
pub fn cycles_in(time_s: f64, period_s: f64) -> u64 {
    (time_s / period_s).round().max(0.0) as u64
}
