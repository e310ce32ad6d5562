//! Persistent store of decoded force volume experiments.
//!
//! A dataset is a directory holding `catalog.json` and one parquet pixel
//! table per experiment. Ingest writes the new pixel table under a fresh
//! file name, then swaps the catalog in a single rename, so readers see
//! either the previous experiment or the new one and never a mix. The old
//! pixel table is removed only after the swap.

pub mod catalog;
pub mod frame;

use crate::config::DecodeConfig;
use crate::error::{FvError, Result};
use crate::force_volume_file::{DecodedForceVolume, ForceVolumeFile};
use crate::types::{
    Calibration, Direction, ExperimentParameters, ForceVolumeArray, PixelRecord, TopographyArray,
};
use crate::utils::{Coordinate, experiment_name_from_path, linspace, sanitize_file_stem};
use catalog::{Catalog, ExperimentEntry};
use log::{debug, info, warn};
use polars::prelude::DataFrame;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

pub use catalog::CATALOG_FILE;

/// A directory of stored experiments.
///
/// Safe to share between threads: queries run concurrently, ingests and
/// removals are serialized and never expose a partially written experiment.
pub struct Dataset {
    root: PathBuf,
    catalog: RwLock<Catalog>,
    // name -> (generation, pixel table)
    frames: Mutex<HashMap<String, (u64, Arc<DataFrame>)>>,
}

fn check_shape(what: &'static str, expected: &[usize], actual: &[usize]) -> Result<()> {
    if expected != actual {
        return Err(FvError::Shape {
            what,
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        });
    }
    Ok(())
}

impl Dataset {
    /// Opens the dataset at `root`, creating the directory if needed.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        let catalog = Catalog::load(&root)?;
        info!(
            "opened dataset {} with {} experiments",
            root.display(),
            catalog.experiments.len()
        );
        Ok(Self {
            root,
            catalog: RwLock::new(catalog),
            frames: Mutex::new(HashMap::new()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn read_catalog(&self) -> RwLockReadGuard<'_, Catalog> {
        // the guarded catalog is only ever replaced whole, so a poisoned lock still holds a consistent value
        self.catalog.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_catalog(&self) -> RwLockWriteGuard<'_, Catalog> {
        self.catalog.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn forget_frame(&self, name: &str) {
        self.frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name);
    }

    /// Stores one experiment, replacing any previous experiment of that name.
    ///
    /// The arrays must match `parameters`: topography rows × columns, force
    /// volume rows × columns × 2 × ramp points. A replaced experiment is
    /// dropped entirely, including its calibration.
    pub fn ingest(
        &self,
        name: &str,
        parameters: &ExperimentParameters,
        topography: &TopographyArray,
        force_volume: &ForceVolumeArray,
    ) -> Result<()> {
        let (rows, columns) = parameters.topography_shape();
        check_shape("topography", &[rows, columns], topography.shape())?;
        check_shape(
            "force volume",
            &[rows, columns, 2, parameters.ramp_points],
            force_volume.shape(),
        )?;
        let mut df = frame::pixels_to_frame(topography, force_volume)?;

        let mut catalog = self.write_catalog();
        let generation = catalog.next_generation;
        let pixel_file = format!("{}-{generation}.parquet", sanitize_file_stem(name));
        let pixel_path = frame::write_frame(&mut df, &self.root, &pixel_file)?;
        debug!("wrote {} pixel rows to {}", df.height(), pixel_path.display());

        let mut next = catalog.clone();
        next.next_generation = generation + 1;
        let previous = next.experiments.insert(
            name.to_string(),
            ExperimentEntry {
                name: name.to_string(),
                parameters: parameters.clone(),
                calibration: Calibration::default(),
                pixel_file,
                generation,
            },
        );
        if let Err(e) = next.store(&self.root) {
            if let Err(cleanup) = fs::remove_file(&pixel_path) {
                warn!("could not remove {}: {cleanup}", pixel_path.display());
            }
            return Err(e);
        }
        *catalog = next;
        self.forget_frame(name);

        if let Some(previous) = previous {
            let stale = self.root.join(&previous.pixel_file);
            if let Err(e) = fs::remove_file(&stale) {
                warn!("could not remove replaced {}: {e}", stale.display());
            }
        }
        info!(
            "ingested experiment '{name}': {rows}x{columns} grid, {} ramp points",
            parameters.ramp_points
        );
        Ok(())
    }

    pub fn ingest_decoded(&self, name: &str, decoded: &DecodedForceVolume) -> Result<()> {
        self.ingest(
            name,
            &decoded.parameters,
            &decoded.topography,
            &decoded.force_volume,
        )
    }

    /// Decodes a force volume file and stores it under its file-name-derived name.
    ///
    /// Nothing is stored when decoding fails.
    pub fn ingest_file(&self, path: impl AsRef<Path>, config: &DecodeConfig) -> Result<String> {
        let path = path.as_ref();
        let name = experiment_name_from_path(path);
        let decoded = ForceVolumeFile::open(path, config)?.decode()?;
        self.ingest_decoded(&name, &decoded)?;
        Ok(name)
    }

    /// Names of all stored experiments, sorted.
    pub fn experiment_names(&self) -> Vec<String> {
        self.read_catalog().experiments.keys().cloned().collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read_catalog().experiments.contains_key(name)
    }

    pub fn parameters(&self, name: &str) -> Result<ExperimentParameters> {
        Ok(self.read_catalog().get(name)?.parameters.clone())
    }

    pub fn curve_count(&self, name: &str) -> Result<usize> {
        Ok(self.read_catalog().get(name)?.parameters.curve_count())
    }

    pub fn calibration(&self, name: &str) -> Result<Calibration> {
        Ok(self.read_catalog().get(name)?.calibration)
    }

    pub fn set_calibration(&self, name: &str, calibration: Calibration) -> Result<()> {
        let mut catalog = self.write_catalog();
        let mut next = catalog.clone();
        next.experiments
            .get_mut(name)
            .ok_or_else(|| FvError::NotFound(format!("experiment '{name}'")))?
            .calibration = calibration;
        next.store(&self.root)?;
        *catalog = next;
        Ok(())
    }

    /// Sample positions of the ramp axis.
    ///
    /// In physical units the axis runs from 0 to the ramp length; otherwise
    /// it is the sample index.
    pub fn ramp_axis(&self, name: &str, as_physical_units: bool) -> Result<Vec<f64>> {
        let catalog = self.read_catalog();
        let parameters = &catalog.get(name)?.parameters;
        let points = parameters.ramp_points;
        Ok(if as_physical_units {
            linspace(0.0, parameters.ramp_length, points)
        } else {
            (0..points).map(|i| i as f64).collect()
        })
    }

    /// Runs `f` on the pixel table of `name` while the catalog is read-locked,
    /// so the table cannot be replaced underneath it.
    fn with_frame<T>(
        &self,
        name: &str,
        f: impl FnOnce(&ExperimentEntry, &DataFrame) -> Result<T>,
    ) -> Result<T> {
        let catalog = self.read_catalog();
        let entry = catalog.get(name)?;
        let df = self.load_frame(entry)?;
        f(entry, &df)
    }

    fn load_frame(&self, entry: &ExperimentEntry) -> Result<Arc<DataFrame>> {
        let mut frames = self.frames.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((generation, df)) = frames.get(&entry.name) {
            if *generation == entry.generation {
                return Ok(Arc::clone(df));
            }
        }
        let path = self.root.join(&entry.pixel_file);
        debug!("loading pixel table {}", path.display());
        let df = Arc::new(frame::read_frame(&path)?);
        frames.insert(entry.name.clone(), (entry.generation, Arc::clone(&df)));
        Ok(df)
    }

    /// The full pixel table of an experiment.
    pub fn frame(&self, name: &str) -> Result<Arc<DataFrame>> {
        let catalog = self.read_catalog();
        self.load_frame(catalog.get(name)?)
    }

    fn coordinate(entry: &ExperimentEntry, index: usize) -> Result<Coordinate> {
        let count = entry.parameters.curve_count();
        if index >= count {
            return Err(FvError::NotFound(format!(
                "curve {index} of '{}' ({count} curves)",
                entry.name
            )));
        }
        Ok(Coordinate::from_linear(
            index,
            entry.parameters.number_of_map_columns,
        ))
    }

    /// One deflection ramp; `index` counts pixels in row-major order.
    pub fn curve(&self, name: &str, index: usize, direction: Direction) -> Result<Vec<f64>> {
        self.with_frame(name, |entry, df| {
            frame::curve_from_frame(
                df,
                Self::coordinate(entry, index)?,
                entry.parameters.number_of_map_columns,
                direction,
            )
        })
    }

    pub fn height(&self, name: &str, index: usize) -> Result<f64> {
        self.with_frame(name, |entry, df| {
            frame::height_from_frame(
                df,
                Self::coordinate(entry, index)?,
                entry.parameters.number_of_map_columns,
            )
        })
    }

    pub fn pixel(&self, name: &str, index: usize) -> Result<PixelRecord> {
        self.with_frame(name, |entry, df| {
            frame::pixel_from_frame(
                df,
                Self::coordinate(entry, index)?,
                entry.parameters.number_of_map_columns,
            )
        })
    }

    pub fn topography(&self, name: &str) -> Result<TopographyArray> {
        self.with_frame(name, |entry, df| {
            let (rows, columns) = entry.parameters.topography_shape();
            frame::topography_from_frame(df, rows, columns)
        })
    }

    /// Deletes an experiment and its pixel table.
    pub fn remove(&self, name: &str) -> Result<()> {
        let mut catalog = self.write_catalog();
        let mut next = catalog.clone();
        let removed = next
            .experiments
            .remove(name)
            .ok_or_else(|| FvError::NotFound(format!("experiment '{name}'")))?;
        next.store(&self.root)?;
        *catalog = next;
        self.forget_frame(name);

        let path = self.root.join(&removed.pixel_file);
        if let Err(e) = fs::remove_file(&path) {
            warn!("could not remove {}: {e}", path.display());
        }
        info!("removed experiment '{name}'");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array;
    use tempfile::tempdir;

    fn parameters(rows: usize, columns: usize, points: usize) -> ExperimentParameters {
        ExperimentParameters::builder()
            .number_of_map_rows(rows)
            .number_of_map_columns(columns)
            .scan_size(1000.0)
            .ramp_length(16.4)
            .ramp_points(points)
            .ramp_step(16.4 / (points - 1) as f64)
            .pixel_length_column(1000.0 / columns as f64)
            .pixel_length_row(1000.0 / rows as f64)
            .build()
    }

    fn arrays(
        p: &ExperimentParameters,
        offset: f64,
    ) -> (TopographyArray, ForceVolumeArray) {
        let topography = Array::from_shape_fn(p.topography_shape(), |(r, c)| {
            offset + (r * 10 + c) as f64
        });
        let force_volume = Array::from_shape_fn(p.force_volume_shape(), |(r, c, d, k)| {
            offset + (r * 1000 + c * 100 + d * 10 + k) as f64 * 0.25
        });
        (topography, force_volume)
    }

    #[test]
    fn test_ingest_and_query() -> Result<()> {
        let dir = tempdir()?;
        let dataset = Dataset::open(dir.path())?;
        let p = parameters(2, 3, 5);
        let (topography, force_volume) = arrays(&p, 0.0);
        dataset.ingest("scan_1", &p, &topography, &force_volume)?;

        assert_eq!(dataset.experiment_names(), vec!["scan_1".to_string()]);
        assert_eq!(dataset.curve_count("scan_1")?, 6);
        assert_eq!(dataset.parameters("scan_1")?, p);

        // index 4 is row 1, column 1
        let forward = dataset.curve("scan_1", 4, Direction::Forward)?;
        assert_eq!(forward.len(), 5);
        assert_eq!(forward[2], (1000 + 100 + 2) as f64 * 0.25);
        let backward = dataset.curve("scan_1", 4, Direction::Backward)?;
        assert_eq!(backward[0], (1000 + 100 + 10) as f64 * 0.25);
        assert_eq!(dataset.height("scan_1", 5)?, 12.0);
        assert_eq!(dataset.topography("scan_1")?, topography);
        Ok(())
    }

    #[test]
    fn test_out_of_range_and_unknown() -> Result<()> {
        let dir = tempdir()?;
        let dataset = Dataset::open(dir.path())?;
        let p = parameters(2, 2, 3);
        let (topography, force_volume) = arrays(&p, 0.0);
        dataset.ingest("scan", &p, &topography, &force_volume)?;

        assert!(dataset.curve("scan", 3, Direction::Forward).is_ok());
        assert!(matches!(
            dataset.curve("scan", 4, Direction::Forward),
            Err(FvError::NotFound(_))
        ));
        assert!(matches!(
            dataset.curve_count("other"),
            Err(FvError::NotFound(_))
        ));
        assert!(matches!(
            dataset.ramp_axis("other", true),
            Err(FvError::NotFound(_))
        ));
        Ok(())
    }

    #[test]
    fn test_ramp_axis() -> Result<()> {
        let dir = tempdir()?;
        let dataset = Dataset::open(dir.path())?;
        let p = parameters(1, 1, 5);
        let (topography, force_volume) = arrays(&p, 0.0);
        dataset.ingest("scan", &p, &topography, &force_volume)?;

        let physical = dataset.ramp_axis("scan", true)?;
        assert_eq!(physical.len(), 5);
        assert_eq!(physical[0], 0.0);
        assert_eq!(physical[4], 16.4);
        assert!((physical[1] - p.ramp_step).abs() < 1e-12);

        assert_eq!(dataset.ramp_axis("scan", false)?, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        Ok(())
    }

    #[test]
    fn test_shape_mismatch_is_rejected() -> Result<()> {
        let dir = tempdir()?;
        let dataset = Dataset::open(dir.path())?;
        let p = parameters(2, 2, 4);
        let (topography, _) = arrays(&p, 0.0);
        let (_, wrong) = arrays(&parameters(2, 2, 3), 0.0);

        let err = dataset.ingest("scan", &p, &topography, &wrong).unwrap_err();
        assert!(matches!(err, FvError::Shape { what: "force volume", .. }));
        assert!(dataset.experiment_names().is_empty());
        Ok(())
    }

    #[test]
    fn test_reingest_replaces_everything() -> Result<()> {
        let dir = tempdir()?;
        let dataset = Dataset::open(dir.path())?;
        let first = parameters(2, 2, 4);
        let (t1, f1) = arrays(&first, 0.0);
        dataset.ingest("scan", &first, &t1, &f1)?;
        dataset.set_calibration(
            "scan",
            Calibration {
                photodiode_sensitivity: 50.0,
                force_constant: 0.1,
                probe_radius: 20.0,
            },
        )?;
        // warm the cache so replacement must invalidate it
        dataset.curve("scan", 0, Direction::Forward)?;

        let second = parameters(3, 1, 6);
        let (t2, f2) = arrays(&second, 100.0);
        dataset.ingest("scan", &second, &t2, &f2)?;

        assert_eq!(dataset.curve_count("scan")?, 3);
        assert_eq!(dataset.calibration("scan")?, Calibration::default());
        let curve = dataset.curve("scan", 0, Direction::Forward)?;
        assert_eq!(curve.len(), 6);
        assert_eq!(curve[0], 100.0);

        let parquet_files = fs::read_dir(dir.path())?
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|x| x == "parquet"))
            .count();
        assert_eq!(parquet_files, 1);
        Ok(())
    }

    #[test]
    fn test_reopen_and_remove() -> Result<()> {
        let dir = tempdir()?;
        let p = parameters(2, 2, 3);
        let (topography, force_volume) = arrays(&p, 0.0);
        {
            let dataset = Dataset::open(dir.path())?;
            dataset.ingest("a", &p, &topography, &force_volume)?;
            dataset.ingest("b", &p, &topography, &force_volume)?;
        }

        let dataset = Dataset::open(dir.path())?;
        assert_eq!(dataset.experiment_names(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(
            dataset.pixel("b", 1)?.forward,
            force_volume.slice(ndarray::s![0, 1, 0, ..]).to_vec()
        );

        dataset.remove("a")?;
        assert!(!dataset.contains("a"));
        assert!(matches!(dataset.remove("a"), Err(FvError::NotFound(_))));
        assert_eq!(Dataset::open(dir.path())?.experiment_names(), vec!["b".to_string()]);
        Ok(())
    }
}
