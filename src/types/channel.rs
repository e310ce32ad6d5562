//! Named binary channels and where they live in the file.

use crate::error::Result;
use crate::types::header::{RawHeaderFields, keys};
use bon::Builder;

/// How raw integer samples of a channel become physical units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChannelScale {
    /// `Sens. Zsens × 2:Z scale / normalization`, used by the height channel.
    ZSensitivity { normalization: f64 },
    /// A fixed instrument multiplier, used by the deflection channel.
    Constant(f64),
}

impl ChannelScale {
    pub fn resolve(&self, header: &RawHeaderFields) -> Result<f64> {
        match *self {
            ChannelScale::ZSensitivity { normalization } => {
                let sensitivity = header.number(keys::SENS_ZSENS, 0)?;
                let z_scale = header.number(keys::Z_SCALE, 0)?;
                Ok(sensitivity * z_scale / normalization)
            }
            ChannelScale::Constant(factor) => Ok(factor),
        }
    }
}

/// A channel the decoder wants to read.
#[derive(Debug, Clone, PartialEq, Builder)]
pub struct ChannelSpec {
    #[builder(into)]
    pub name: String,
    pub sample_width_bytes: usize,
    pub scale: ChannelScale,
}

/// Byte location and scaling of one channel's payload.
#[derive(Debug, Clone, PartialEq, Builder)]
pub struct ChannelLocation {
    #[builder(into)]
    pub name: String,
    /// Occurrence index of the matching "Image Data" declaration.
    pub declaration_index: usize,
    pub offset: u64,
    pub length: usize,
    pub sample_width_bytes: usize,
    pub scale_factor: f64,
}
