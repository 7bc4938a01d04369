//! Mapping module.
//!
//! Provides the multi-hypothesis occupancy grid shared by every particle path.
//!
//! # Components
//!
//! - [`OccupancyGrid`]: 3D grid of distilled log-odds plus per-path hypotheses
//! - [`TreeBounds`]: XY bounding box of the particle tree
//!
//! # Example
//!
//! ```
//! use drishti_slam::algorithms::mapping::{OccupancyGrid, OccupancyGridConfig};
//! use drishti_slam::core::types::{PathId, Point3D};
//! use drishti_slam::EvidenceRay;
//!
//! let mut grid = OccupancyGrid::new(OccupancyGridConfig::default());
//! let ray = EvidenceRay::new(
//!     0,
//!     Point3D::new(0.0, 200.0, 100.0),
//!     Point3D::new(0.0, 600.0, 100.0),
//!     0.5,
//!     40.0,
//!     10.0,
//! );
//!
//! let mut cells = Vec::new();
//! let path = PathId(1);
//! // nothing is known yet, so there is no evidence to score against
//! assert!(grid.insert(&ray, path, &[path], 1, false, &mut cells).is_none());
//! assert!(!cells.is_empty());
//! ```

mod occupancy_grid;

pub use occupancy_grid::{GridCell, GridHypothesis, OccupancyGrid, OccupancyGridConfig};

/// Axis-aligned XY bounding box of pose positions, in millimetres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeBounds {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl TreeBounds {
    /// Create a new region.
    pub fn new(min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Degenerate box around a single point.
    pub fn at(x: f32, y: f32) -> Self {
        Self::new(x, y, x, y)
    }

    /// Expand region to include a point.
    pub fn expand_to_include(&mut self, x: f32, y: f32) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_tree_bounds_expand() {
        let mut bounds = TreeBounds::at(0.0, 0.0);

        bounds.expand_to_include(-50.0, 150.0);
        bounds.expand_to_include(20.0, -10.0);

        assert_relative_eq!(bounds.min_x, -50.0);
        assert_relative_eq!(bounds.max_y, 150.0);
        assert_relative_eq!(bounds.width(), 70.0);
        assert_relative_eq!(bounds.height(), 160.0);
        assert!(bounds.contains(0.0, 100.0));
        assert!(!bounds.contains(30.0, 0.0));
    }
}
