//! Generator for complete, well-formed force volume files.
//!
//! Produces the same layout the decoder expects from the instrument: a
//! padded text header whose file list declares a placeholder height image,
//! the height image and the deflection force volume, followed by the two
//! binary blocks. Raw sample values follow closed-form patterns so callers
//! can recompute every expected physical value.

use crate::error::Result;
use bon::Builder;
use std::path::Path;

const HEADER_BLOCK: usize = 4096;

#[derive(Debug, Clone, PartialEq, Builder)]
pub struct SyntheticForceVolume {
    #[builder(default = 4)]
    pub rows: usize,
    #[builder(default = 4)]
    pub columns: usize,
    #[builder(default = 16)]
    pub ramp_points: usize,
    /// Sens. Zsens, nm/V.
    #[builder(default = 20.5)]
    pub z_sensitivity: f64,
    /// 2:Z scale of the height image, V.
    #[builder(default = 440.0)]
    pub z_scale: f64,
    /// 4:Ramp Size, V.
    #[builder(default = 0.8)]
    pub ramp_size: f64,
    #[builder(default = 5000.0)]
    pub scan_size: f64,
    /// Shifts every raw sample so two files of the same grid differ.
    #[builder(default = 0)]
    pub seed: i32,
}

impl SyntheticForceVolume {
    pub fn raw_height(&self, row: usize, column: usize) -> i32 {
        let pixel = (row * self.columns + column) as i32;
        pixel * 37 - 1000 + self.seed
    }

    pub fn raw_deflection(&self, row: usize, column: usize, direction: usize, point: usize) -> i32 {
        let pixel = (row * self.columns + column) as i32;
        let ramp = point as i32 * if direction == 0 { 11 } else { -13 };
        pixel * 3 + ramp - 500 + self.seed
    }

    pub fn height_bytes(&self) -> usize {
        self.rows * self.columns * 4
    }

    pub fn deflection_bytes(&self) -> usize {
        self.rows * self.columns * 2 * self.ramp_points * 4
    }

    fn render_header(&self, header_length: usize) -> String {
        let height_offset = header_length;
        let deflection_offset = height_offset + self.height_bytes();
        let mut h = String::new();
        let mut line = |text: String| {
            h.push_str(&text);
            h.push_str("\r\n");
        };
        line("\\*Force file list".into());
        line("\\Version: 0x09300201".into());
        line(format!("\\Data length: {header_length}"));
        line("\\*Scanner list".into());
        line(format!("\\@Sens. Zsens: V {} nm/V", self.z_sensitivity));
        line("\\*Ciao scan list".into());
        line(format!(
            "\\Scan Size: {} {} nm",
            self.scan_size, self.scan_size
        ));
        line("\\@2:Image Data: S [Height] \"Height\"".into());
        line("\\*Ciao image list".into());
        line(format!("\\Data offset: {height_offset}"));
        line(format!("\\Data length: {}", self.height_bytes()));
        line("\\Bytes/pixel: 4".into());
        line(format!("\\Samps/line: {}", self.columns));
        line(format!("\\Number of lines: {}", self.rows));
        line("\\@2:Image Data: S [Height] \"Height\"".into());
        line(format!(
            "\\@2:Z scale: V [Sens. Zsens] (0.006713867 V/LSB) {} V",
            self.z_scale
        ));
        line("\\*Ciao force image list".into());
        line(format!("\\Data offset: {deflection_offset}"));
        line(format!("\\Data length: {}", self.deflection_bytes()));
        line("\\Bytes/pixel: 4".into());
        line(format!(
            "\\Samps/line: {} {}",
            self.ramp_points, self.ramp_points
        ));
        line(format!(
            "\\@4:Ramp Size: V [Sens. Zsens] (0.006713867 V/LSB) {} V",
            self.ramp_size
        ));
        line("\\@4:Image Data: S [DeflectionError] \"Deflection Error\"".into());
        line("\\*File list end".into());
        h
    }

    /// The header text padded to its declared length.
    pub fn header_text(&self) -> String {
        let mut header_length = HEADER_BLOCK;
        loop {
            let mut text = self.render_header(header_length);
            if text.len() <= header_length {
                let padding = header_length - text.len();
                text.extend(std::iter::repeat_n(' ', padding));
                return text;
            }
            header_length += HEADER_BLOCK;
        }
    }

    /// Complete file contents.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = self.header_text().into_bytes();
        bytes.reserve(self.height_bytes() + self.deflection_bytes());
        for row in 0..self.rows {
            for column in 0..self.columns {
                bytes.extend_from_slice(&self.raw_height(row, column).to_le_bytes());
            }
        }
        for row in 0..self.rows {
            for column in 0..self.columns {
                for direction in 0..2 {
                    for point in 0..self.ramp_points {
                        let raw = self.raw_deflection(row, column, direction, point);
                        bytes.extend_from_slice(&raw.to_le_bytes());
                    }
                }
            }
        }
        bytes
    }

    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_bytes())?;
        Ok(())
    }

    /// Physical height scale the decoder must apply.
    pub fn height_scale(&self, normalization: f64) -> f64 {
        self.z_sensitivity * self.z_scale / normalization
    }

    pub fn ramp_length(&self) -> f64 {
        self.ramp_size * self.z_sensitivity
    }

    /// Short human readable description.
    pub fn describe(&self) -> String {
        format!(
            "{}x{} grid, {} ramp points, {} bytes",
            self.rows,
            self.columns,
            self.ramp_points,
            self.header_text().len() + self.height_bytes() + self.deflection_bytes()
        )
    }
}
