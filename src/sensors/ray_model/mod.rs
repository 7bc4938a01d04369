//! Disparity to probability-vs-distance lookup table.
//!
//! Each row holds, for one stereo disparity, the probability that the
//! matched feature lies in each distance cell along the ray. Rows are
//! spaced `interval` pixels apart: row `r` describes disparity
//! `r * interval`. Rows 0 and 1 are reserved and always empty.
//!
//! # Example
//!
//! ```
//! use drishti_slam::RayModelLookup;
//!
//! let lookup = RayModelLookup::surveyor_svs();
//! assert!(lookup.row(0).is_none());
//! let shape = lookup.ray_shape(10.0).expect("row for 10px");
//! assert!(shape.length_mm > 0.0);
//! ```

mod persistence;
mod surveyor_svs;

pub use surveyor_svs::{
    SURVEYOR_SVS_BASELINE_MM, SURVEYOR_SVS_CELL_MM, SURVEYOR_SVS_INTERVAL_PIXELS,
};

use crate::core::error::{Result, SlamError};

/// Rows reserved at the start of the table (disparity 0 and one interval).
pub const RESERVED_ROWS: usize = 2;

/// Scale used by the integer representation.
pub const INTEGER_SCALE: f32 = 10000.0;

/// Probability below which a row entry is treated as outside the ray.
const SHAPE_THRESHOLD: f32 = 1e-4;

/// Ray geometry derived from one lookup row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayShape {
    /// Distance from the camera to the start of the ray
    pub start_dist_mm: f32,
    /// Length of the ray
    pub length_mm: f32,
    /// Fraction along the ray of the most likely distance
    pub fattest_point: f32,
    /// Highest probability in the row
    pub peak_probability: f32,
    /// Standard deviation of the distance distribution
    pub sigma_mm: f32,
}

/// Lookup table mapping disparity to a probability-vs-distance curve.
#[derive(Debug, Clone, PartialEq)]
pub struct RayModelLookup {
    /// `probability[disparity_index][distance_index]`, rows padded to equal length
    probability: Vec<Vec<f32>>,
    /// Valid entries per row
    length: Vec<usize>,
    /// Disparity step between rows, in pixels
    interval: f32,
    /// Size of one distance cell
    distance_step_mm: f32,
}

impl RayModelLookup {
    /// Empty table with the given distance cell size.
    pub fn new(distance_step_mm: f32) -> Self {
        Self {
            probability: vec![Vec::new(); RESERVED_ROWS],
            length: vec![0; RESERVED_ROWS],
            interval: 1.0,
            distance_step_mm,
        }
    }

    /// Replace the table with `rows`, loaded from row index 2 onwards.
    ///
    /// The table is left untouched when `interval` is not a positive number.
    pub fn load_sensor_model_data(&mut self, rows: &[Vec<f32>], interval: f32) -> Result<()> {
        if !(interval.is_finite() && interval > 0.0) {
            return Err(SlamError::InvalidConfig(format!(
                "ray model interval must be positive, got {}",
                interval
            )));
        }
        if let Some(bad) = rows.iter().flatten().find(|p| !p.is_finite() || **p < 0.0) {
            return Err(SlamError::InvalidConfig(format!(
                "ray model probability out of range: {}",
                bad
            )));
        }
        self.fill(rows, interval);
        Ok(())
    }

    fn fill(&mut self, rows: &[Vec<f32>], interval: f32) {
        let max_length = rows.iter().map(Vec::len).max().unwrap_or(0);
        let total_rows = rows.len() + RESERVED_ROWS;

        self.interval = interval;
        self.probability = vec![vec![0.0; max_length]; total_rows];
        self.length = vec![0; total_rows];

        for (i, row) in rows.iter().enumerate() {
            let d = i + RESERVED_ROWS;
            self.probability[d][..row.len()].copy_from_slice(row);
            self.length[d] = row.len();
        }
        // reserved rows stay empty even though storage is padded
        for d in 0..RESERVED_ROWS.min(total_rows) {
            self.probability[d].clear();
        }
    }

    /// Disparity step between rows, in pixels.
    pub fn interval(&self) -> f32 {
        self.interval
    }

    /// Distance cell size in millimetres.
    pub fn distance_step_mm(&self) -> f32 {
        self.distance_step_mm
    }

    /// Number of rows including the reserved ones.
    pub fn rows(&self) -> usize {
        self.probability.len()
    }

    /// Valid entries in a row (0 for reserved or missing rows).
    pub fn row_length(&self, disparity_index: usize) -> usize {
        self.length.get(disparity_index).copied().unwrap_or(0)
    }

    /// Probability at a table position, 0 outside the valid range.
    pub fn probability(&self, disparity_index: usize, distance_index: usize) -> f32 {
        if distance_index >= self.row_length(disparity_index) {
            return 0.0;
        }
        self.probability[disparity_index][distance_index]
    }

    /// Valid entries of a row. Reserved rows are never returned.
    pub fn row(&self, disparity_index: usize) -> Option<&[f32]> {
        if disparity_index < RESERVED_ROWS {
            return None;
        }
        let len = self.row_length(disparity_index);
        (len > 0).then(|| &self.probability[disparity_index][..len])
    }

    /// Row index for a disparity in pixels.
    pub fn disparity_index(&self, disparity: f32) -> Option<usize> {
        if !(disparity.is_finite() && disparity > 0.0) {
            return None;
        }
        let idx = (disparity / self.interval).round() as usize;
        (idx >= RESERVED_ROWS && idx < self.rows()).then_some(idx)
    }

    /// Row for a disparity in pixels.
    pub fn row_for_disparity(&self, disparity: f32) -> Option<&[f32]> {
        self.row(self.disparity_index(disparity)?)
    }

    /// Ray geometry for a disparity: where the curve starts, ends and peaks.
    pub fn ray_shape(&self, disparity: f32) -> Option<RayShape> {
        let row = self.row_for_disparity(disparity)?;
        let first = row.iter().position(|&p| p > SHAPE_THRESHOLD)?;
        let last = row.iter().rposition(|&p| p > SHAPE_THRESHOLD)?;

        let (peak_index, peak_probability) = row[first..=last]
            .iter()
            .copied()
            .enumerate()
            .fold((0, f32::MIN), |best, (i, p)| if p > best.1 { (i, p) } else { best });

        let step = self.distance_step_mm;
        let cells = (last + 1 - first) as f32;
        let length_mm = cells * step;
        let fattest_point = ((peak_index as f32 + 0.5) / cells).clamp(0.0, 1.0);

        let sum: f32 = row[first..=last].iter().sum();
        let sigma_mm = if sum > 0.0 {
            let mean: f32 = row[first..=last]
                .iter()
                .enumerate()
                .map(|(i, p)| i as f32 * p)
                .sum::<f32>()
                / sum;
            let var: f32 = row[first..=last]
                .iter()
                .enumerate()
                .map(|(i, p)| (i as f32 - mean).powi(2) * p)
                .sum::<f32>()
                / sum;
            var.sqrt() * step
        } else {
            0.0
        };

        Some(RayShape {
            start_dist_mm: first as f32 * step,
            length_mm,
            fattest_point,
            peak_probability,
            sigma_mm,
        })
    }
}

impl Default for RayModelLookup {
    fn default() -> Self {
        Self::surveyor_svs()
    }
}
