//! Multi-hypothesis 3D occupancy grid.
//!
//! Every particle path writes its own hypotheses into the shared grid and
//! only sees the hypotheses of its own ancestry, plus whatever has been
//! distilled once all surviving paths agreed on a common ancestor.
//!
//! # Log-Odds Representation
//!
//! ```text
//! P(occupied) = 1 / (1 + exp(-log_odds))
//!
//! log_odds = log(P(occupied) / P(free))
//! ```
//!
//! # Matching Score
//!
//! For each cell a ray passes through, with ray probability `p` and prior
//! occupancy `q` seen through the ancestry:
//!
//! ```text
//! score += logit(p * q + (1 - p) * (1 - q))
//! ```

mod cell;
mod config;
mod export;

pub use cell::{GridCell, GridHypothesis};
pub use config::OccupancyGridConfig;

use crate::core::math::{log_odds_to_probability, probability_to_log_odds};
use crate::core::types::{PathId, Point3D};
use crate::sensors::EvidenceRay;

/// 3D occupancy grid with per-path hypotheses.
#[derive(Debug)]
pub struct OccupancyGrid {
    config: OccupancyGridConfig,

    /// Allocated cells.
    ///
    /// index = (cz * dimension_cells + cy) * dimension_cells + cx
    cells: Vec<Option<Box<GridCell>>>,

    /// World X and Y coordinate of cell (0, 0, _).
    origin_xy: f32,
}

impl OccupancyGrid {
    /// Create an empty grid.
    pub fn new(config: OccupancyGridConfig) -> Self {
        let total = config.dimension_cells * config.dimension_cells * config.dimension_cells_vertical;
        let origin_xy = -config.extent_mm() / 2.0;
        Self {
            config,
            cells: vec![None; total],
            origin_xy,
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &OccupancyGridConfig {
        &self.config
    }

    /// Cell edge length in millimetres.
    pub fn cell_size_mm(&self) -> f32 {
        self.config.cell_size_mm
    }

    /// Total number of cells, allocated or not.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// XY extent as `(min, max)` in millimetres; identical for both axes.
    pub fn extent_mm(&self) -> (f32, f32) {
        (self.origin_xy, self.origin_xy + self.config.extent_mm())
    }

    /// Cell index containing a world point, or `None` outside the grid.
    #[inline]
    pub fn world_to_cell(&self, x: f32, y: f32, z: f32) -> Option<usize> {
        let size = self.config.cell_size_mm;
        let cx = ((x - self.origin_xy) / size).floor();
        let cy = ((y - self.origin_xy) / size).floor();
        let cz = (z / size).floor();

        if cx < 0.0 || cy < 0.0 || cz < 0.0 {
            return None;
        }
        let (cx, cy, cz) = (cx as usize, cy as usize, cz as usize);
        let dim = self.config.dimension_cells;
        if cx >= dim || cy >= dim || cz >= self.config.dimension_cells_vertical {
            return None;
        }
        Some(self.cell_index(cx, cy, cz))
    }

    #[inline]
    fn cell_index(&self, cx: usize, cy: usize, cz: usize) -> usize {
        let dim = self.config.dimension_cells;
        (cz * dim + cy) * dim + cx
    }

    /// Cell coordinates `(cx, cy, cz)` of an index.
    #[inline]
    pub fn cell_coords(&self, index: usize) -> (usize, usize, usize) {
        let dim = self.config.dimension_cells;
        (index % dim, (index / dim) % dim, index / (dim * dim))
    }

    /// Centre of a cell in world coordinates.
    #[inline]
    pub fn cell_to_world(&self, index: usize) -> Point3D {
        let (cx, cy, cz) = self.cell_coords(index);
        let size = self.config.cell_size_mm;
        Point3D::new(
            self.origin_xy + (cx as f32 + 0.5) * size,
            self.origin_xy + (cy as f32 + 0.5) * size,
            (cz as f32 + 0.5) * size,
        )
    }

    /// Contents of a cell, if allocated.
    pub fn cell(&self, index: usize) -> Option<&GridCell> {
        self.cells.get(index)?.as_deref()
    }

    /// Log-odds of a cell as seen through an ancestry.
    pub fn log_odds(&self, index: usize, ancestry: &[PathId]) -> Option<f32> {
        self.cell(index)?.visible_log_odds(ancestry, None)
    }

    /// Occupancy probability at a world point as seen through an ancestry.
    pub fn probability_at(&self, x: f32, y: f32, z: f32, ancestry: &[PathId]) -> Option<f32> {
        let index = self.world_to_cell(x, y, z)?;
        self.log_odds(index, ancestry).map(log_odds_to_probability)
    }

    /// Score a ray against the grid and optionally record it as hypotheses.
    ///
    /// `ancestry` lists the paths whose hypotheses `path` may see, itself
    /// included. Cells that receive a hypothesis are appended to
    /// `observed_cells`. Returns `None` when no visited cell held evidence.
    pub fn insert(
        &mut self,
        ray: &EvidenceRay,
        path: PathId,
        ancestry: &[PathId],
        time_step: u32,
        localise_only: bool,
        observed_cells: &mut Vec<usize>,
    ) -> Option<f32> {
        let [start, end] = ray.vertices;
        let length = start.distance(&end);
        let steps = (length / (self.config.cell_size_mm * 0.5)).ceil() as usize;

        let mut score: Option<f32> = None;
        let mut last_cell = None;

        for i in 0..=steps {
            let fraction = if steps == 0 { 0.0 } else { i as f32 / steps as f32 };
            let point = ray.point_at(fraction);
            let Some(index) = self.world_to_cell(point.x, point.y, point.z) else {
                continue;
            };
            if last_cell == Some(index) {
                continue;
            }
            last_cell = Some(index);

            let Some(p) = ray.probability(point.x, point.y) else {
                continue;
            };

            let prior = self.cells[index]
                .as_deref()
                .and_then(|c| c.visible_log_odds(ancestry, Some((path, time_step))));
            if let Some(prior) = prior {
                let q = log_odds_to_probability(prior);
                let agreement = p * q + (1.0 - p) * (1.0 - q);
                *score.get_or_insert(0.0) += probability_to_log_odds(agreement);
            }

            if !localise_only {
                self.cells[index]
                    .get_or_insert_with(Box::default)
                    .hypotheses
                    .push(GridHypothesis {
                        path,
                        time_step,
                        log_odds: probability_to_log_odds(p),
                    });
                observed_cells.push(index);
            }
        }

        score
    }

    /// Retract every hypothesis a path left in the given cells.
    pub fn remove_hypotheses(&mut self, path: PathId, cells: &[usize]) -> usize {
        let mut removed = 0;
        for &index in cells {
            let Some(slot) = self.cells.get_mut(index) else {
                continue;
            };
            if let Some(cell) = slot {
                removed += cell.remove_path(path);
                if cell.is_empty() {
                    *slot = None;
                }
            }
        }
        removed
    }

    /// Make a path's hypotheses in the given cells permanent.
    pub fn distill_hypotheses(&mut self, path: PathId, cells: &[usize]) -> usize {
        let max = self.config.log_odds_max;
        let mut folded = 0;
        for &index in cells {
            if let Some(Some(cell)) = self.cells.get_mut(index) {
                folded += cell.distill_path(path, max);
            }
        }
        folded
    }

    /// Drop every hypothesis, keeping only distilled evidence.
    pub fn clear_hypotheses(&mut self) {
        for slot in &mut self.cells {
            if let Some(cell) = slot {
                cell.hypotheses.clear();
                if cell.is_empty() {
                    *slot = None;
                }
            }
        }
    }

    /// Number of hypotheses currently stored.
    pub fn hypothesis_count(&self) -> usize {
        self.cells
            .iter()
            .flatten()
            .map(|c| c.hypotheses.len())
            .sum()
    }

    /// Number of cells holding distilled evidence.
    pub fn distilled_count(&self) -> usize {
        self.cells
            .iter()
            .flatten()
            .filter(|c| c.distilled.is_some())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn small_grid() -> OccupancyGrid {
        OccupancyGrid::new(OccupancyGridConfig {
            dimension_cells: 50,
            dimension_cells_vertical: 10,
            cell_size_mm: 40.0,
            ..Default::default()
        })
    }

    fn forward_ray() -> EvidenceRay {
        EvidenceRay::new(
            0,
            Point3D::new(0.0, 200.0, 100.0),
            Point3D::new(0.0, 600.0, 100.0),
            0.5,
            40.0,
            10.0,
        )
    }

    #[test]
    fn test_world_to_cell_roundtrip() {
        let grid = small_grid();
        assert_eq!(grid.extent_mm(), (-1000.0, 1000.0));

        let index = grid.world_to_cell(10.0, -30.0, 50.0).unwrap();
        let centre = grid.cell_to_world(index);
        assert_relative_eq!(centre.x, 20.0);
        assert_relative_eq!(centre.y, -20.0);
        assert_relative_eq!(centre.z, 60.0);

        assert!(grid.world_to_cell(1000.0, 0.0, 0.0).is_none());
        assert!(grid.world_to_cell(0.0, 0.0, -1.0).is_none());
        assert!(grid.world_to_cell(0.0, 0.0, 400.0).is_none());
    }

    #[test]
    fn test_first_insert_has_no_evidence() {
        let mut grid = small_grid();
        let mut cells = Vec::new();
        let path = PathId(1);

        let score = grid.insert(&forward_ray(), path, &[path], 1, false, &mut cells);

        assert!(score.is_none());
        assert!(!cells.is_empty());
        assert_eq!(grid.hypothesis_count(), cells.len());
    }

    #[test]
    fn test_localise_only_leaves_grid_untouched() {
        let mut grid = small_grid();
        let mut cells = Vec::new();
        grid.insert(&forward_ray(), PathId(1), &[PathId(1)], 1, true, &mut cells);
        assert!(cells.is_empty());
        assert_eq!(grid.hypothesis_count(), 0);
    }

    #[test]
    fn test_matching_ray_scores_better_than_shifted_ray() {
        let mut grid = small_grid();
        let mut cells = Vec::new();
        let path = PathId(1);
        grid.insert(&forward_ray(), path, &[path], 1, false, &mut cells);

        let mut scratch = Vec::new();
        let same = grid
            .insert(&forward_ray(), path, &[path], 2, true, &mut scratch)
            .unwrap();

        // same bearing, peak moved 120mm further away
        let shifted = EvidenceRay::new(
            0,
            Point3D::new(0.0, 320.0, 100.0),
            Point3D::new(0.0, 720.0, 100.0),
            0.5,
            40.0,
            10.0,
        );
        let moved = grid
            .insert(&shifted, path, &[path], 2, true, &mut scratch)
            .unwrap();

        assert!(same > moved, "same {} vs moved {}", same, moved);
    }

    #[test]
    fn test_hypotheses_hidden_from_unrelated_paths() {
        let mut grid = small_grid();
        let mut cells = Vec::new();
        grid.insert(&forward_ray(), PathId(1), &[PathId(1)], 1, false, &mut cells);

        let mut scratch = Vec::new();
        let other = grid.insert(&forward_ray(), PathId(2), &[PathId(2)], 2, true, &mut scratch);
        assert!(other.is_none());

        let child = grid.insert(
            &forward_ray(),
            PathId(3),
            &[PathId(3), PathId(1)],
            2,
            true,
            &mut scratch,
        );
        assert!(child.is_some());
    }

    #[test]
    fn test_same_step_hypotheses_are_not_scored() {
        let mut grid = small_grid();
        let mut cells = Vec::new();
        let path = PathId(1);
        grid.insert(&forward_ray(), path, &[path], 5, false, &mut cells);
        let again = grid.insert(&forward_ray(), path, &[path], 5, false, &mut cells);
        assert!(again.is_none());
    }

    #[test]
    fn test_remove_and_distill() {
        let mut grid = small_grid();
        let mut a = Vec::new();
        let mut b = Vec::new();
        grid.insert(&forward_ray(), PathId(1), &[PathId(1)], 1, false, &mut a);
        grid.insert(&forward_ray(), PathId(2), &[PathId(2)], 1, false, &mut b);
        let per_path = a.len();

        assert_eq!(grid.remove_hypotheses(PathId(2), &b), per_path);
        assert_eq!(grid.hypothesis_count(), per_path);

        assert_eq!(grid.distill_hypotheses(PathId(1), &a), per_path);
        assert_eq!(grid.hypothesis_count(), 0);
        assert_eq!(grid.distilled_count(), per_path);

        // distilled evidence is visible to any path
        let peak = forward_ray().point_at(0.5);
        let p = grid
            .probability_at(peak.x, peak.y, peak.z, &[PathId(42)])
            .unwrap();
        assert!(p > 0.5);
    }

    #[test]
    fn test_clear_keeps_distilled() {
        let mut grid = small_grid();
        let mut a = Vec::new();
        let mut b = Vec::new();
        grid.insert(&forward_ray(), PathId(1), &[PathId(1)], 1, false, &mut a);
        grid.distill_hypotheses(PathId(1), &a);
        grid.insert(&forward_ray(), PathId(2), &[PathId(2)], 2, false, &mut b);

        grid.clear_hypotheses();
        assert_eq!(grid.hypothesis_count(), 0);
        assert_eq!(grid.distilled_count(), a.len());
    }
}
