//! View-direction coverage grid
//!
//! A fixed 36x36 dwell-time grid over (yaw, pitch) in 10-degree cells. Each
//! tick the cell under the current view direction accumulates delta time,
//! capped per cell so early staring cannot dominate coverage.

use crate::sample::Vec3;

/// Cells per axis (10-degree cells)
pub const GRID_SIZE: usize = 36;

/// Cell edge length (degrees)
pub const CELL_DEG: f64 = 10.0;

/// Maximum dwell time credited to a single cell (seconds)
pub const CELL_DWELL_CAP_SEC: f64 = 1.0;

/// Dwell time a cell needs to count as covered (seconds)
pub const COVERED_THRESHOLD_SEC: f64 = 0.1;

/// Accumulated dwell-time grid over view directions
#[derive(Debug, Clone)]
pub struct CoverageGrid {
    cells: Vec<f64>,
}

impl Default for CoverageGrid {
    fn default() -> Self {
        Self::new()
    }
}

impl CoverageGrid {
    pub fn new() -> Self {
        Self {
            cells: vec![0.0; GRID_SIZE * GRID_SIZE],
        }
    }

    /// Credit `dt` seconds of dwell to the cell under `direction`
    pub fn mark(&mut self, direction: Vec3, dt: f64) {
        if direction.length_squared() <= 1e-12 || dt <= 0.0 {
            return;
        }
        let index = self.cell_index(direction.yaw_deg(), direction.pitch_deg());
        let cell = &mut self.cells[index];
        *cell = (*cell + dt).min(CELL_DWELL_CAP_SEC);
    }

    fn cell_index(&self, yaw_deg: f64, pitch_deg: f64) -> usize {
        let col = (((yaw_deg + 180.0) / CELL_DEG).floor() as isize)
            .clamp(0, GRID_SIZE as isize - 1) as usize;
        let row = (((pitch_deg + 90.0) / CELL_DEG).floor() as isize)
            .clamp(0, GRID_SIZE as isize - 1) as usize;
        row * GRID_SIZE + col
    }

    /// Number of cells whose dwell time exceeds the covered threshold
    pub fn covered_cells(&self) -> usize {
        self.cells
            .iter()
            .filter(|t| **t > COVERED_THRESHOLD_SEC)
            .count()
    }

    /// Coverage as a percentage of all grid cells (0-100)
    pub fn coverage_pct(&self) -> f64 {
        self.covered_cells() as f64 / (GRID_SIZE * GRID_SIZE) as f64 * 100.0
    }

    /// Total accumulated (capped) dwell time across cells
    pub fn total_dwell_sec(&self) -> f64 {
        self.cells.iter().sum()
    }

    pub fn reset(&mut self) {
        self.cells.iter_mut().for_each(|c| *c = 0.0);
    }
}
