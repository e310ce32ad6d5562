//! Decode configuration: channel names and instrument calibration constants.

use crate::error::Result;
use crate::types::channel::{ChannelScale, ChannelSpec};
use bon::Builder;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings for decoding a force volume file.
///
/// The defaults are the calibration factors of the instrument format and
/// reproduce its physical units exactly; override them only for files
/// written with a different calibration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
#[serde(default)]
pub struct DecodeConfig {
    #[builder(into, default = "Height".to_string())]
    pub height_channel: String,
    #[builder(into, default = "Deflection Error".to_string())]
    pub deflection_channel: String,
    /// Width of one payload sample; force volume payloads are 32-bit.
    #[builder(default = 4)]
    pub sample_width_bytes: usize,
    /// Divisor applied to raw heights (the 16-bit value range).
    #[builder(default = 65536.0)]
    pub height_normalization: f64,
    /// Deflection multiplier, V/LSB.
    #[builder(default = 0.000375)]
    pub deflection_scale: f64,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl DecodeConfig {
    /// Loads a JSON config file; absent fields keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn height_spec(&self) -> ChannelSpec {
        ChannelSpec::builder()
            .name(self.height_channel.clone())
            .sample_width_bytes(self.sample_width_bytes)
            .scale(ChannelScale::ZSensitivity {
                normalization: self.height_normalization,
            })
            .build()
    }

    pub fn deflection_spec(&self) -> ChannelSpec {
        ChannelSpec::builder()
            .name(self.deflection_channel.clone())
            .sample_width_bytes(self.sample_width_bytes)
            .scale(ChannelScale::Constant(self.deflection_scale))
            .build()
    }
}
