//! The dataset catalog: one JSON document naming every stored experiment.

use crate::error::{FvError, Result};
use crate::types::{Calibration, ExperimentParameters};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

pub const CATALOG_FILE: &str = "catalog.json";

/// A stored experiment and the pixel file holding its curves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentEntry {
    pub name: String,
    pub parameters: ExperimentParameters,
    #[serde(default)]
    pub calibration: Calibration,
    pub pixel_file: String,
    pub generation: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    /// Generation handed to the next ingest; pixel file names never repeat.
    pub next_generation: u64,
    pub experiments: BTreeMap<String, ExperimentEntry>,
}

impl Catalog {
    /// Loads the catalog of `root`, or an empty one if none was written yet.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(CATALOG_FILE);
        if !path.exists() {
            debug!("no catalog at {}, starting empty", path.display());
            return Ok(Self::default());
        }
        let text = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Replaces the catalog file of `root` in one rename.
    pub fn store(&self, root: &Path) -> Result<()> {
        let path = root.join(CATALOG_FILE);
        let mut staged = NamedTempFile::new_in(root)?;
        serde_json::to_writer_pretty(&mut staged, self)?;
        staged.flush()?;
        staged.as_file().sync_all()?;
        staged.persist(&path).map_err(|e| FvError::Persist {
            path: path.clone(),
            source: e.error,
        })?;
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&ExperimentEntry> {
        self.experiments
            .get(name)
            .ok_or_else(|| FvError::NotFound(format!("experiment '{name}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn entry(name: &str, generation: u64) -> ExperimentEntry {
        ExperimentEntry {
            name: name.to_string(),
            parameters: ExperimentParameters::builder()
                .number_of_map_rows(2)
                .number_of_map_columns(3)
                .scan_size(1000.0)
                .ramp_length(16.4)
                .ramp_points(8)
                .ramp_step(16.4 / 7.0)
                .pixel_length_column(1000.0 / 3.0)
                .pixel_length_row(500.0)
                .build(),
            calibration: Calibration::default(),
            pixel_file: format!("{name}-{generation}.parquet"),
            generation,
        }
    }

    #[test]
    fn test_store_and_load() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let mut catalog = Catalog::load(dir.path())?;
        assert!(catalog.experiments.is_empty());

        catalog.experiments.insert("scan_1".into(), entry("scan_1", 0));
        catalog.next_generation = 1;
        catalog.store(dir.path())?;

        let loaded = Catalog::load(dir.path())?;
        assert_eq!(loaded, catalog);
        // f64 parameters survive the JSON round exactly
        assert_eq!(loaded.get("scan_1")?.parameters.ramp_step, 16.4 / 7.0);
        Ok(())
    }

    #[test]
    fn test_unknown_experiment() {
        let catalog = Catalog::default();
        assert!(matches!(catalog.get("nope"), Err(FvError::NotFound(_))));
    }
}
