//! Normalized experiment parameters derived from the header.

use bon::Builder;
use serde::{Deserialize, Serialize};

/// Acquisition parameters of one force volume experiment.
///
/// Derived quantities are computed once by the deriver and stored; nothing
/// here is recomputed on access.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
pub struct ExperimentParameters {
    pub number_of_map_rows: usize,
    pub number_of_map_columns: usize,
    pub scan_size: f64,
    pub ramp_length: f64,
    pub ramp_points: usize,
    pub ramp_step: f64,
    pub pixel_length_column: f64,
    pub pixel_length_row: f64,
}

impl ExperimentParameters {
    /// Total number of pixel curves in the grid.
    pub fn curve_count(&self) -> usize {
        self.number_of_map_rows * self.number_of_map_columns
    }

    pub fn topography_shape(&self) -> (usize, usize) {
        (self.number_of_map_rows, self.number_of_map_columns)
    }

    pub fn force_volume_shape(&self) -> (usize, usize, usize, usize) {
        (
            self.number_of_map_rows,
            self.number_of_map_columns,
            2,
            self.ramp_points,
        )
    }
}

/// Per-experiment probe calibration, kept alongside the parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    pub photodiode_sensitivity: f64,
    pub force_constant: f64,
    pub probe_radius: f64,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            photodiode_sensitivity: 1.0,
            force_constant: 1.0,
            probe_radius: 1.0,
        }
    }
}
