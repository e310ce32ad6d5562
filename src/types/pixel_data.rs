//! Decoded arrays and the per-pixel records stored in a dataset

use bon::Builder;
use ndarray::{Array2, Array4};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Height map, rows × columns, physical units.
pub type TopographyArray = Array2<f64>;

/// Deflection curves, rows × columns × {forward, backward} × ramp points.
pub type ForceVolumeArray = Array4<f64>;

/// Ramp direction: forward is the approach, backward the retract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    /// Position along the third axis of a [`ForceVolumeArray`].
    pub fn axis_index(self) -> usize {
        match self {
            Direction::Forward => 0,
            Direction::Backward => 1,
        }
    }

    pub(crate) fn column_name(self) -> &'static str {
        match self {
            Direction::Forward => "forward",
            Direction::Backward => "backward",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "forward" | "approach" => Ok(Direction::Forward),
            "backward" | "retract" => Ok(Direction::Backward),
            other => Err(format!("unknown ramp direction '{other}'")),
        }
    }
}

/// One grid cell of an experiment.
#[derive(Debug, Clone, PartialEq, Builder)]
pub struct PixelRecord {
    pub row: usize,
    pub column: usize,
    pub forward: Vec<f64>,
    pub backward: Vec<f64>,
    pub height: f64,
}

impl PixelRecord {
    pub fn curve(&self, direction: Direction) -> &[f64] {
        match direction {
            Direction::Forward => &self.forward,
            Direction::Backward => &self.backward,
        }
    }
}
