//! Decoder and store for Nanoscope force volume files.
//!
//! A force volume file is a text header followed by a binary payload holding
//! a height image and, for every pixel of the scan grid, a forward and a
//! backward deflection ramp. [`ForceVolumeFile`] decodes it into physical
//! units; [`Dataset`] keeps decoded experiments on disk and serves single
//! curves back by row-major pixel index.

pub mod config;
pub mod dataset;
pub mod error;
pub mod force_ramp_file;
pub mod force_volume_file;
pub mod parser;
#[cfg(feature = "python")]
pub mod python;
pub mod synthetic;
pub mod types;
pub mod utils;

pub use config::DecodeConfig;
pub use dataset::Dataset;
pub use error::{FvError, Result};
pub use force_ramp_file::{ForceRampFile, RampChannel};
pub use force_volume_file::{DecodedForceVolume, ForceVolumeFile, decode_force_volume};
pub use synthetic::SyntheticForceVolume;
pub use types::{
    Calibration, Direction, ExperimentParameters, ForceVolumeArray, PixelRecord, TopographyArray,
};
