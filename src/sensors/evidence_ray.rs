//! Evidence rays: the inverse sensor model unit.
//!
//! One ray is built per stereo correspondence. Along its length the chance
//! of occupancy rises from "probably free" near the camera to a peak at the
//! fattest point, where the matched feature most likely sits, and falls off
//! again behind it.
//!
//! Rays arrive in the robot-local frame (observer at the origin, facing +Y)
//! and are projected into each candidate pose with [`EvidenceRay::trial_pose`],
//! which never mutates the observed ray.

use std::f32::consts::{PI, TAU};

use crate::core::math::wrap_angle;
use crate::core::types::{Point3D, Pose3D};

use super::ray_model::RayModelLookup;

/// Number of angular bins used to quantise a ray's heading.
pub const PAN_STEPS: usize = 25;

/// Width of the Gaussian applied to the deviation from the fattest point.
///
/// Deviation is measured in ramp units (0 at the peak, 1 at either end).
pub const RAY_GAUSSIAN_SIGMA: f32 = 0.4;

/// Probabilistic line segment derived from one stereo match.
#[derive(Debug, Clone, PartialEq)]
pub struct EvidenceRay {
    /// Index of the stereo camera pair that produced the ray
    pub camera_id: usize,
    /// Start (near) and end (far) vertices
    pub vertices: [Point3D; 2],
    /// Colour of the matched feature
    pub colour: [u8; 3],
    /// Maximum fatness of the ray in millimetres
    pub width: f32,
    /// Length of the ray in the floor plane, millimetres
    pub length: f32,
    /// Fraction along the ray where occupancy peaks (0..1)
    pub fattest_point: f32,
    /// Relative uncertainty of the match (0 = certain)
    pub uncertainty: f32,
    /// Stereo disparity in pixels
    pub disparity: f32,
    /// Depth standard deviation in millimetres
    pub sigma: f32,
    /// Position of the observer when the ray was placed
    pub observed_from: Point3D,
    /// Heading of the ray in the floor plane
    pub pan_angle: f32,
    /// Elevation of the ray
    pub tilt_angle: f32,
    /// Accumulated roll of the observer
    pub roll_angle: f32,
    /// Heading bin in `0..PAN_STEPS`
    pub pan_index: usize,
    /// Floor-plane distance from the observer to the start vertex
    pub start_dist: f32,
}

impl EvidenceRay {
    /// Create a ray between two points observed from the origin.
    pub fn new(
        camera_id: usize,
        start: Point3D,
        end: Point3D,
        fattest_point: f32,
        width: f32,
        disparity: f32,
    ) -> Self {
        let mut ray = Self {
            camera_id,
            vertices: [start, end],
            colour: [0, 0, 0],
            width,
            length: 0.0,
            fattest_point: fattest_point.clamp(0.0, 1.0),
            uncertainty: 0.0,
            disparity,
            sigma: 0.0,
            observed_from: Point3D::default(),
            pan_angle: 0.0,
            tilt_angle: 0.0,
            roll_angle: 0.0,
            pan_index: 0,
            start_dist: 0.0,
        };
        ray.update_geometry();
        ray
    }

    /// Build a robot-local ray from the ray model row of `disparity`.
    ///
    /// `pan` and `tilt` give the direction of the matched feature relative
    /// to the robot. Returns `None` when the lookup has no usable row.
    pub fn from_ray_model(
        lookup: &RayModelLookup,
        camera_id: usize,
        disparity: f32,
        pan: f32,
        tilt: f32,
        colour: [u8; 3],
    ) -> Option<Self> {
        let shape = lookup.ray_shape(disparity)?;
        let start = Point3D::new(0.0, shape.start_dist_mm, 0.0).rotate(pan, tilt, 0.0);
        let end =
            Point3D::new(0.0, shape.start_dist_mm + shape.length_mm, 0.0).rotate(pan, tilt, 0.0);

        let mut ray = Self::new(
            camera_id,
            start,
            end,
            shape.fattest_point,
            lookup.distance_step_mm(),
            disparity,
        );
        ray.colour = colour;
        ray.sigma = shape.sigma_mm;
        ray.uncertainty = (1.0 - shape.peak_probability).clamp(0.0, 1.0);
        Some(ray)
    }

    /// Recompute heading, distances and bins from the vertices.
    fn update_geometry(&mut self) {
        let [start, end] = self.vertices;
        let dx = end.x - start.x;
        let dy = end.y - start.y;
        let dz = end.z - start.z;
        let dxy = (dx * dx + dy * dy).sqrt();

        self.length = dxy;
        self.start_dist = self.observed_from.distance_xy(&start);
        self.pan_angle = wrap_angle(dx.atan2(dy));
        self.tilt_angle = dz.atan2(dxy);
        self.pan_index = pan_bin(self.pan_angle);
    }

    /// Rotate then translate the ray into the frame of `pose`.
    pub fn translate_rotate(&mut self, pose: &Pose3D) {
        for v in &mut self.vertices {
            *v = v
                .rotate(pose.pan, pose.tilt, pose.roll)
                .translate(pose.x, pose.y, pose.z);
        }
        self.observed_from = pose.position();
        self.roll_angle = wrap_angle(self.roll_angle + pose.roll);
        self.update_geometry();
    }

    /// How this ray would look if it had been observed from another pose.
    ///
    /// The ray is rotated about its observer by the extra angles and the
    /// observer is moved to `(tx, ty, tz)`. `self` is left untouched.
    pub fn trial_pose(
        &self,
        extra_pan: f32,
        extra_tilt: f32,
        extra_roll: f32,
        tx: f32,
        ty: f32,
        tz: f32,
    ) -> EvidenceRay {
        let origin = self.observed_from;
        let place = |v: &Point3D| {
            Point3D::new(v.x - origin.x, v.y - origin.y, v.z - origin.z)
                .rotate(extra_pan, extra_tilt, extra_roll)
                .translate(tx, ty, tz)
        };

        let mut trial = self.clone();
        trial.vertices = [place(&self.vertices[0]), place(&self.vertices[1])];
        trial.observed_from = Point3D::new(tx, ty, tz);
        trial.roll_angle = wrap_angle(self.roll_angle + extra_roll);
        trial.update_geometry();
        trial
    }

    /// Convenience wrapper of [`trial_pose`](Self::trial_pose) for a full pose.
    pub fn observed_from_pose(&self, pose: &Pose3D) -> EvidenceRay {
        self.trial_pose(pose.pan, pose.tilt, pose.roll, pose.x, pose.y, pose.z)
    }

    /// Fraction along the ray for a query point, or `None` outside the ray.
    #[inline]
    fn fraction_at(&self, x: f32, y: f32) -> Option<f32> {
        if self.length <= 0.0 {
            return None;
        }
        let dx = x - self.observed_from.x;
        let dy = y - self.observed_from.y;
        let dist = (dx * dx + dy * dy).sqrt();
        if dist < self.start_dist || dist >= self.start_dist + self.length {
            return None;
        }
        Some((dist - self.start_dist) / self.length)
    }

    /// Occupancy probability at a point in the floor plane.
    ///
    /// Returns `None` when the point is not covered by the ray.
    pub fn probability(&self, x: f32, y: f32) -> Option<f32> {
        let fraction = self.fraction_at(x, y)?;
        let deviation = ramp_deviation(fraction, self.fattest_point);
        Some(gaussian(deviation))
    }

    /// Occupancy probability using a precomputed Gaussian table.
    ///
    /// `forward_bias` in 0..1 moves the peak towards the far end of the ray.
    /// The table comes from [`gaussian_lookup`].
    pub fn probability_lookup(
        &self,
        x: f32,
        y: f32,
        lookup: &[f32],
        forward_bias: f32,
    ) -> Option<f32> {
        let fraction = self.fraction_at(x, y)?;
        let peak =
            (self.fattest_point + forward_bias * (1.0 - self.fattest_point)).clamp(0.0, 1.0);
        let deviation = ramp_deviation(fraction, peak);

        if lookup.is_empty() {
            return Some(gaussian(deviation));
        }
        let idx = (deviation * (lookup.len() - 1) as f32).round() as usize;
        Some(lookup[idx.min(lookup.len() - 1)])
    }

    /// Point at a fraction along the ray.
    pub fn point_at(&self, fraction: f32) -> Point3D {
        let [start, end] = self.vertices;
        Point3D::new(
            start.x + (end.x - start.x) * fraction,
            start.y + (end.y - start.y) * fraction,
            start.z + (end.z - start.z) * fraction,
        )
    }
}

/// Build a table of `exp(-d^2 / 2σ^2)` for deviations evenly spaced in 0..=1.
pub fn gaussian_lookup(entries: usize) -> Vec<f32> {
    match entries {
        0 => Vec::new(),
        1 => vec![1.0],
        n => (0..n)
            .map(|i| gaussian(i as f32 / (n - 1) as f32))
            .collect(),
    }
}

/// Piecewise-linear distance from the peak: 0 at `peak`, 1 at either end.
#[inline]
fn ramp_deviation(fraction: f32, peak: f32) -> f32 {
    const EPS: f32 = 1e-6;
    if fraction < peak {
        if peak > EPS { (peak - fraction) / peak } else { 0.0 }
    } else if 1.0 - peak > EPS {
        (fraction - peak) / (1.0 - peak)
    } else {
        0.0
    }
}

#[inline]
fn gaussian(deviation: f32) -> f32 {
    (-(deviation * deviation) / (2.0 * RAY_GAUSSIAN_SIGMA * RAY_GAUSSIAN_SIGMA)).exp()
}

#[inline]
fn pan_bin(pan_angle: f32) -> usize {
    let bin = ((pan_angle + PI) / TAU * PAN_STEPS as f32).floor();
    (bin.max(0.0) as usize).min(PAN_STEPS - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_2;

    /// Ray along +Y from 10mm to 30mm, peaking half way.
    fn forward_ray() -> EvidenceRay {
        EvidenceRay::new(
            0,
            Point3D::new(0.0, 10.0, 0.0),
            Point3D::new(0.0, 30.0, 0.0),
            0.5,
            4.0,
            12.0,
        )
    }

    #[test]
    fn test_geometry_of_new_ray() {
        let ray = forward_ray();
        assert_relative_eq!(ray.start_dist, 10.0);
        assert_relative_eq!(ray.length, 20.0);
        assert_relative_eq!(ray.pan_angle, 0.0);
        assert_eq!(ray.pan_index, PAN_STEPS / 2);
    }

    #[test]
    fn test_probability_peaks_at_fattest_point() {
        let ray = forward_ray();
        let p = ray.probability(0.0, 20.0).unwrap();
        assert_relative_eq!(p, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_probability_outside_ray() {
        let ray = forward_ray();
        assert!(ray.probability(0.0, 5.0).is_none());
        assert!(ray.probability(0.0, 30.0).is_none());
        assert!(ray.probability(0.0, 29.9).is_some());
    }

    #[test]
    fn test_probability_falls_away_from_peak() {
        let ray = forward_ray();
        let near = ray.probability(0.0, 11.0).unwrap();
        let mid = ray.probability(0.0, 16.0).unwrap();
        let peak = ray.probability(0.0, 20.0).unwrap();
        assert!(near < mid && mid < peak);
    }

    #[test]
    fn test_zero_fattest_point_is_guarded() {
        let mut ray = forward_ray();
        ray.fattest_point = 0.0;
        let p = ray.probability(0.0, 10.0).unwrap();
        assert!(p.is_finite());
        assert_relative_eq!(p, 1.0, epsilon = 1e-6);

        ray.fattest_point = 1.0;
        assert!(ray.probability(0.0, 29.0).unwrap().is_finite());
    }

    #[test]
    fn test_lookup_matches_direct_evaluation() {
        let ray = forward_ray();
        let table = gaussian_lookup(1001);
        for y in [10.5, 14.0, 20.0, 27.0] {
            let direct = ray.probability(0.0, y).unwrap();
            let fast = ray.probability_lookup(0.0, y, &table, 0.0).unwrap();
            assert_relative_eq!(direct, fast, epsilon = 2e-3);
        }
    }

    #[test]
    fn test_forward_bias_moves_peak() {
        let ray = forward_ray();
        let table = gaussian_lookup(101);
        // bias 0.5 moves the peak from 0.5 to 0.75 (y = 25)
        let at_new_peak = ray.probability_lookup(0.0, 25.0, &table, 0.5).unwrap();
        assert_relative_eq!(at_new_peak, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_translate_rotate() {
        let mut ray = forward_ray();
        ray.translate_rotate(&Pose3D::planar(100.0, 50.0, FRAC_PI_2));

        // forward now points along +X from (100, 50)
        assert_relative_eq!(ray.vertices[0].x, 110.0, epsilon = 1e-3);
        assert_relative_eq!(ray.vertices[0].y, 50.0, epsilon = 1e-3);
        assert_relative_eq!(ray.pan_angle, FRAC_PI_2, epsilon = 1e-5);
        assert_relative_eq!(ray.start_dist, 10.0, epsilon = 1e-3);
        assert_relative_eq!(ray.length, 20.0, epsilon = 1e-3);
        assert_eq!(ray.observed_from, Point3D::new(100.0, 50.0, 0.0));
    }

    #[test]
    fn test_trial_pose_does_not_mutate() {
        let ray = forward_ray();
        let before = ray.clone();
        let before_p = ray.probability(0.0, 18.0);

        for i in 0..10 {
            let f = i as f32;
            let trial = ray.trial_pose(0.1 * f, 0.0, 0.02 * f, 5.0 * f, -3.0 * f, 0.0);
            assert!(trial.observed_from.x != 0.0 || i == 0);
        }

        assert_eq!(ray, before);
        assert_eq!(ray.probability(0.0, 18.0), before_p);
    }

    #[test]
    fn test_trial_pose_places_ray() {
        let ray = forward_ray();
        let trial = ray.trial_pose(FRAC_PI_2, 0.0, 0.0, 100.0, 0.0, 0.0);
        assert_relative_eq!(trial.start_dist, 10.0, epsilon = 1e-3);
        assert_relative_eq!(trial.pan_angle, FRAC_PI_2, epsilon = 1e-5);
        assert_relative_eq!(trial.probability(120.0, 0.0).unwrap(), 1.0, epsilon = 1e-3);
        assert!(trial.probability(0.0, 20.0).is_none());
    }

    #[test]
    fn test_pan_bins_cover_range() {
        assert_eq!(pan_bin(-PI), 0);
        assert_eq!(pan_bin(PI - 1e-4), PAN_STEPS - 1);
        assert_eq!(pan_bin(PI), PAN_STEPS - 1);
    }

    #[test]
    fn test_gaussian_lookup_edges() {
        assert!(gaussian_lookup(0).is_empty());
        assert_eq!(gaussian_lookup(1), vec![1.0]);
        let t = gaussian_lookup(11);
        assert_relative_eq!(t[0], 1.0);
        assert!(t[10] < t[5]);
    }
}
