use crate::config::DecodeConfig;
use crate::error::Result;
use crate::parser::{derive_parameters, locate, parse_header, read_channel};
use crate::types::header::FORCE_VOLUME_KEYS;
use crate::types::{
    ChannelLocation, ExperimentParameters, ForceVolumeArray, RawHeaderFields, TopographyArray,
};
use crate::utils::file_utils::read_binary_file_mmap;
use log::info;
use memmap2::Mmap;
use std::path::{Path, PathBuf};

/// Header, parameters and channel locations of a force volume file.
///
/// Holds no file state of its own: decoding works on any byte slice holding
/// the complete file.
#[derive(Debug, Clone, PartialEq)]
pub struct ForceVolumeLayout {
    pub header: RawHeaderFields,
    pub parameters: ExperimentParameters,
    pub height: ChannelLocation,
    pub deflection: ChannelLocation,
}

/// Fully decoded contents, ready to hand to a dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedForceVolume {
    pub parameters: ExperimentParameters,
    pub topography: TopographyArray,
    pub force_volume: ForceVolumeArray,
}

impl ForceVolumeLayout {
    /// Parses the header and resolves parameters and channel locations.
    pub fn parse(data: &[u8], config: &DecodeConfig) -> Result<Self> {
        let header = parse_header(data, FORCE_VOLUME_KEYS)?;
        let parameters = derive_parameters(&header)?;
        let height = locate(&header, &config.height_spec())?;
        let deflection = locate(&header, &config.deflection_spec())?;
        Ok(Self {
            header,
            parameters,
            height,
            deflection,
        })
    }

    pub fn read_topography(&self, data: &[u8]) -> Result<TopographyArray> {
        read_channel(data, &self.height, self.parameters.topography_shape())
    }

    pub fn read_force_volume(&self, data: &[u8]) -> Result<ForceVolumeArray> {
        read_channel(data, &self.deflection, self.parameters.force_volume_shape())
    }

    pub fn decode(&self, data: &[u8]) -> Result<DecodedForceVolume> {
        Ok(DecodedForceVolume {
            parameters: self.parameters.clone(),
            topography: self.read_topography(data)?,
            force_volume: self.read_force_volume(data)?,
        })
    }
}

/// Decodes a complete force volume file already held in memory.
pub fn decode_force_volume(data: &[u8], config: &DecodeConfig) -> Result<DecodedForceVolume> {
    ForceVolumeLayout::parse(data, config)?.decode(data)
}

/// A force volume file opened for decoding.
///
/// The file stays mapped for the lifetime of this value only.
pub struct ForceVolumeFile {
    path: PathBuf,
    mmap_data: Mmap,
    pub layout: ForceVolumeLayout,
}

impl ForceVolumeFile {
    pub fn open(path: impl AsRef<Path>, config: &DecodeConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mmap_data = read_binary_file_mmap(&path)?;
        let layout = ForceVolumeLayout::parse(&mmap_data, config)?;
        info!(
            "opened {}: {}x{} grid, {} ramp points",
            path.display(),
            layout.parameters.number_of_map_rows,
            layout.parameters.number_of_map_columns,
            layout.parameters.ramp_points
        );
        Ok(Self {
            path,
            mmap_data,
            layout,
        })
    }

    pub fn parameters(&self) -> &ExperimentParameters {
        &self.layout.parameters
    }

    pub fn read_topography(&self) -> Result<TopographyArray> {
        self.layout.read_topography(&self.mmap_data)
    }

    pub fn read_force_volume(&self) -> Result<ForceVolumeArray> {
        self.layout.read_force_volume(&self.mmap_data)
    }

    /// Decodes both channels and releases the file.
    pub fn decode(self) -> Result<DecodedForceVolume> {
        self.layout.decode(&self.mmap_data)
    }

    /// Get a summary of the file contents
    pub fn get_summary(&self) -> String {
        let p = &self.layout.parameters;
        let mut result = String::new();
        result.push_str(&format!("File: {}\n", self.path.display()));
        result.push_str(&format!(
            "  Grid: {} rows x {} columns\n",
            p.number_of_map_rows, p.number_of_map_columns
        ));
        result.push_str(&format!("  Scan size: {}\n", p.scan_size));
        result.push_str(&format!(
            "  Ramp: {} points over {} (step {})\n",
            p.ramp_points, p.ramp_length, p.ramp_step
        ));
        for location in [&self.layout.height, &self.layout.deflection] {
            result.push_str(&format!(
                "  Channel '{}': offset {}, {} bytes, scale {}\n",
                location.name, location.offset, location.length, location.scale_factor
            ));
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FvError;
    use crate::synthetic::SyntheticForceVolume;

    #[test]
    fn test_decode_synthetic_file() -> Result<()> {
        let synthetic = SyntheticForceVolume::builder()
            .rows(3)
            .columns(2)
            .ramp_points(5)
            .build();
        let config = DecodeConfig::default();
        let decoded = decode_force_volume(&synthetic.to_bytes(), &config)?;

        assert_eq!(decoded.parameters.curve_count(), 6);
        assert_eq!(decoded.topography.shape(), &[3, 2]);
        assert_eq!(decoded.force_volume.shape(), &[3, 2, 2, 5]);

        let scale = synthetic.height_scale(config.height_normalization);
        assert_eq!(
            decoded.topography[[2, 1]],
            synthetic.raw_height(2, 1) as f64 * scale
        );
        assert_eq!(
            decoded.force_volume[[1, 0, 1, 4]],
            synthetic.raw_deflection(1, 0, 1, 4) as f64 * config.deflection_scale
        );
        Ok(())
    }

    #[test]
    fn test_layout_locates_both_channels() -> Result<()> {
        let synthetic = SyntheticForceVolume::builder().build();
        let layout = ForceVolumeLayout::parse(&synthetic.to_bytes(), &DecodeConfig::default())?;
        let header_length = synthetic.header_text().len() as u64;
        assert_eq!(layout.height.offset, header_length);
        assert_eq!(
            layout.deflection.offset,
            header_length + synthetic.height_bytes() as u64
        );
        assert_eq!(layout.deflection.length, synthetic.deflection_bytes());
        Ok(())
    }

    #[test]
    fn test_unknown_channel_name() {
        let synthetic = SyntheticForceVolume::builder().build();
        let config = DecodeConfig::builder().deflection_channel("Friction").build();
        let err = decode_force_volume(&synthetic.to_bytes(), &config).unwrap_err();
        assert!(matches!(err, FvError::ChannelNotFound(name) if name == "Friction"));
    }

    #[test]
    fn test_huge_grid_is_rejected_without_panic() {
        let synthetic = SyntheticForceVolume::builder().build();
        let header = synthetic
            .header_text()
            .replace("Samps/line: 4\r", "Samps/line: 4294967296 4\r")
            .replace("Number of lines: 4", "Number of lines: 4294967296");
        let err = decode_force_volume(header.as_bytes(), &DecodeConfig::default()).unwrap_err();
        assert!(matches!(err, FvError::InvalidParameter { .. }));
    }

    #[test]
    fn test_open_from_disk() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("grid.spm");
        SyntheticForceVolume::builder().build().write_to(&path)?;

        let file = ForceVolumeFile::open(&path, &DecodeConfig::default())?;
        assert_eq!(file.parameters().ramp_points, 16);
        assert!(file.get_summary().contains("Deflection Error"));
        assert_eq!(file.read_topography()?.shape(), &[4, 4]);
        let decoded = file.decode()?;
        assert_eq!(decoded.force_volume.shape(), &[4, 4, 2, 16]);
        Ok(())
    }
}
