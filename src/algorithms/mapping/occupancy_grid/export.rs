//! Export functionality for occupancy grids.

use std::io::Write;
use std::path::Path;

use super::OccupancyGrid;
use crate::core::error::Result;
use crate::core::types::PathId;

/// Pixel values used by the grayscale export.
const PIXEL_OCCUPIED: u8 = 0;
const PIXEL_UNKNOWN: u8 = 128;
const PIXEL_FREE: u8 = 255;

impl OccupancyGrid {
    /// Project the grid onto the floor as grayscale image data.
    ///
    /// Each pixel takes the most occupied cell of its column as seen through
    /// `ancestry`. Returns (width, height, pixels), row-major from the
    /// minimum Y row. 0 = occupied, 128 = unknown, 255 = free.
    pub fn to_grayscale(&self, ancestry: &[PathId]) -> (usize, usize, Vec<u8>) {
        let dim = self.config().dimension_cells;
        let layers = self.config().dimension_cells_vertical;
        let occupied = self.config().occupied_threshold;
        let free = self.config().free_threshold;

        let mut pixels = Vec::with_capacity(dim * dim);
        for cy in 0..dim {
            for cx in 0..dim {
                let column_max = (0..layers)
                    .filter_map(|cz| self.log_odds(self.cell_index(cx, cy, cz), ancestry))
                    .reduce(f32::max);

                let value = match column_max {
                    Some(v) if v >= occupied => PIXEL_OCCUPIED,
                    Some(v) if v <= free => PIXEL_FREE,
                    _ => PIXEL_UNKNOWN,
                };
                pixels.push(value);
            }
        }

        (dim, dim, pixels)
    }

    /// Count columns by state: (free, unknown, occupied).
    pub fn count_columns(&self, ancestry: &[PathId]) -> (usize, usize, usize) {
        let (_, _, pixels) = self.to_grayscale(ancestry);
        pixels.iter().fold((0, 0, 0), |(f, u, o), &p| match p {
            PIXEL_FREE => (f + 1, u, o),
            PIXEL_OCCUPIED => (f, u, o + 1),
            _ => (f, u + 1, o),
        })
    }

    /// Save the floor projection as a binary PGM (P5) image.
    ///
    /// Rows are flipped so +Y points up in image viewers.
    pub fn save_pgm<P: AsRef<Path>>(&self, path: P, ancestry: &[PathId]) -> Result<()> {
        let (width, height, pixels) = self.to_grayscale(ancestry);

        let mut file = std::io::BufWriter::new(std::fs::File::create(path.as_ref())?);
        writeln!(file, "P5")?;
        writeln!(file, "{} {}", width, height)?;
        writeln!(file, "255")?;
        for row in pixels.chunks(width.max(1)).rev() {
            file.write_all(row)?;
        }
        file.flush()?;

        log::info!(
            "Exported {}x{} map to {}",
            width,
            height,
            path.as_ref().display()
        );
        Ok(())
    }
}
