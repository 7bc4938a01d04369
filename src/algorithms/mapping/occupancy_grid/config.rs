//! Occupancy grid configuration.

use serde::{Deserialize, Serialize};

use crate::core::error::{Result, SlamError};

/// Configuration for the occupancy grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OccupancyGridConfig {
    /// Cells along each horizontal axis.
    ///
    /// The grid is centred on the origin in XY.
    pub dimension_cells: usize,

    /// Cells along the vertical axis, starting at the floor (z = 0).
    pub dimension_cells_vertical: usize,

    /// Cell edge length in millimetres.
    pub cell_size_mm: f32,

    /// Clamp applied to distilled log-odds.
    ///
    /// Prevents overconfidence. Typical: 50.0
    pub log_odds_max: f32,

    /// Log-odds threshold for considering a cell occupied.
    pub occupied_threshold: f32,

    /// Log-odds threshold for considering a cell free.
    pub free_threshold: f32,
}

impl Default for OccupancyGridConfig {
    fn default() -> Self {
        Self {
            dimension_cells: 128,         // 5.12m at 40mm
            dimension_cells_vertical: 16, // 0.64m
            cell_size_mm: 40.0,
            log_odds_max: 50.0,
            occupied_threshold: 0.5,
            free_threshold: -0.5,
        }
    }
}

impl OccupancyGridConfig {
    /// Check dimensions and thresholds.
    pub fn validate(&self) -> Result<()> {
        if self.dimension_cells == 0 || self.dimension_cells_vertical == 0 {
            return Err(SlamError::InvalidConfig(
                "grid dimensions must be non-zero".to_string(),
            ));
        }
        if !(self.cell_size_mm.is_finite() && self.cell_size_mm > 0.0) {
            return Err(SlamError::InvalidConfig(format!(
                "grid cell size must be positive, got {}",
                self.cell_size_mm
            )));
        }
        if self.log_odds_max <= 0.0 {
            return Err(SlamError::InvalidConfig(
                "log_odds_max must be positive".to_string(),
            ));
        }
        if self.free_threshold > self.occupied_threshold {
            return Err(SlamError::InvalidConfig(format!(
                "free threshold {} above occupied threshold {}",
                self.free_threshold, self.occupied_threshold
            )));
        }
        Ok(())
    }

    /// Width (and depth) of the grid in millimetres.
    pub fn extent_mm(&self) -> f32 {
        self.dimension_cells as f32 * self.cell_size_mm
    }
}
