//! Angle arithmetic shared by the motion model, rays and pose averaging.
//!
//! Every angle that is stored on a pose goes through [`wrap_angle`], so the
//! whole crate agrees on a single half-open range `[-π, π)`.

use std::f32::consts::{PI, TAU};

/// Wrap an angle into `[-π, π)`.
///
/// # Example
/// ```
/// use drishti_slam::core::math::wrap_angle;
/// use std::f32::consts::PI;
///
/// assert!((wrap_angle(3.0 * PI) + PI).abs() < 1e-5);
/// assert!((wrap_angle(PI / 2.0) - PI / 2.0).abs() < 1e-6);
/// ```
#[inline]
pub fn wrap_angle(angle: f32) -> f32 {
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    // rem_euclid can round up to exactly TAU for tiny negative inputs
    if wrapped >= PI { wrapped - TAU } else { wrapped }
}

/// Shortest signed angular difference from `a` to `b`.
///
/// # Example
/// ```
/// use drishti_slam::core::math::angle_diff;
/// use std::f32::consts::PI;
///
/// let diff = angle_diff(PI - 0.1, -PI + 0.1);
/// assert!((diff - 0.2).abs() < 1e-5);
/// ```
#[inline]
pub fn angle_diff(a: f32, b: f32) -> f32 {
    wrap_angle(b - a)
}

/// Circular mean of a set of angles.
///
/// Returns `None` for an empty input or when the angles cancel out exactly.
pub fn circular_mean<I>(angles: I) -> Option<f32>
where
    I: IntoIterator<Item = f32>,
{
    let mut sum_sin = 0.0f32;
    let mut sum_cos = 0.0f32;
    let mut n = 0usize;
    for angle in angles {
        let (s, c) = angle.sin_cos();
        sum_sin += s;
        sum_cos += c;
        n += 1;
    }
    if n == 0 || (sum_sin.abs() < 1e-9 && sum_cos.abs() < 1e-9) {
        return None;
    }
    Some(wrap_angle(sum_sin.atan2(sum_cos)))
}

/// Logistic function: log-odds to probability.
#[inline]
pub fn log_odds_to_probability(log_odds: f32) -> f32 {
    1.0 / (1.0 + (-log_odds).exp())
}

/// Probability to log-odds, clamped away from 0 and 1.
#[inline]
pub fn probability_to_log_odds(probability: f32) -> f32 {
    let p = probability.clamp(PROBABILITY_FLOOR, 1.0 - PROBABILITY_FLOOR);
    (p / (1.0 - p)).ln()
}

/// Smallest probability allowed into a log-odds conversion.
pub const PROBABILITY_FLOOR: f32 = 0.01;
