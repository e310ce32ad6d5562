//! Single force-ramp files: one approach/retract cycle recorded on several channels.

use crate::error::Result;
use crate::parser::{parse_header, read_channel};
use crate::types::header::{FORCE_RAMP_KEYS, keys};
use crate::types::{ChannelLocation, Direction, RawHeaderFields};
use crate::utils::{linspace, read_binary_file_mmap};
use log::{debug, info};
use ndarray::{Array2, ArrayView1};
use polars::prelude::*;
use std::path::Path;

/// One channel of a force ramp.
#[derive(Debug, Clone, PartialEq)]
pub struct RampChannel {
    pub name: String,
    /// Z position of each sample.
    pub x: Vec<f64>,
    /// 2 × points: forward then backward.
    pub y: Array2<f64>,
}

impl RampChannel {
    pub fn curve(&self, direction: Direction) -> ArrayView1<'_, f64> {
        self.y.row(direction.axis_index())
    }

    /// Columns `x`, `forward` and `backward`, one row per sample.
    pub fn to_frame(&self) -> Result<DataFrame> {
        let mut columns: Vec<Column> = vec![Series::new("x".into(), self.x.clone()).into()];
        for direction in [Direction::Forward, Direction::Backward] {
            let values: Vec<f64> = self.curve(direction).to_vec();
            columns.push(Series::new(direction.column_name().into(), values).into());
        }
        Ok(DataFrame::new(columns)?)
    }
}

/// Decodes every channel of a force-ramp file held in memory.
///
/// The Nth "Data offset" carries the channel declared by the (N+1)th image
/// entry, whose data length is the (N+1)th one as well.
pub fn decode_force_ramp(data: &[u8]) -> Result<(RawHeaderFields, Vec<RampChannel>)> {
    let header = parse_header(data, FORCE_RAMP_KEYS)?;
    let points = header.last_number(keys::RAMP_SAMPS_PER_LINE)? as usize;
    let z_sensitivity = header.number(keys::RAMP_SENS_ZSENS, 0)?;

    let mut channels = Vec::with_capacity(header.occurrences(keys::DATA_OFFSET));
    for i in 0..header.occurrences(keys::DATA_OFFSET) {
        let name = header.text(keys::RAMP_IMAGE_DATA, i + 1)?.to_string();
        let bytes_per_pixel = header.number(keys::BYTES_PER_PIXEL, i)? as usize;
        let location = ChannelLocation::builder()
            .name(name.clone())
            .declaration_index(i + 1)
            .offset(header.number(keys::DATA_OFFSET, i)? as u64)
            .length(header.number(keys::RAMP_DATA_LENGTH, i + 1)? as usize)
            .sample_width_bytes(2 * bytes_per_pixel)
            .scale_factor(header.number(keys::RAMP_Z_SCALE, i)?)
            .build();
        debug!("ramp channel {i}: {location:?}");

        let y: Array2<f64> = read_channel(data, &location, (2, points))?;
        let ramp_size = header.number(keys::RAMP_RAMP_SIZE, i)?;
        let x = linspace(0.0, 1.0, points)
            .into_iter()
            .map(|v| v * ramp_size * z_sensitivity)
            .collect();
        channels.push(RampChannel { name, x, y });
    }
    Ok((header, channels))
}

/// A decoded force-ramp file.
pub struct ForceRampFile {
    pub header: RawHeaderFields,
    pub channels: Vec<RampChannel>,
}

impl ForceRampFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mmap_data = read_binary_file_mmap(path)?;
        let (header, channels) = decode_force_ramp(&mmap_data)?;
        info!(
            "opened force ramp {} with {} channels",
            path.display(),
            channels.len()
        );
        Ok(Self { header, channels })
    }

    pub fn channel(&self, name: &str) -> Option<&RampChannel> {
        self.channels.iter().find(|c| c.name == name)
    }

    pub fn get_channel_names(&self) -> Vec<String> {
        self.channels.iter().map(|c| c.name.clone()).collect()
    }
}
