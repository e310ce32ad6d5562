//! Python bindings: the dataset store and force ramp decoding.

use crate::config::DecodeConfig;
use crate::dataset::Dataset;
use crate::error::FvError;
use crate::force_ramp_file::ForceRampFile;
use crate::types::Direction;
use pyo3::exceptions::{PyFileNotFoundError, PyIOError, PyKeyError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3_polars::PyDataFrame;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;

impl From<FvError> for PyErr {
    fn from(err: FvError) -> PyErr {
        match &err {
            FvError::NotFound(_) | FvError::ChannelNotFound(_) => PyKeyError::new_err(err.to_string()),
            FvError::Io(e) if e.kind() == ErrorKind::NotFound => {
                PyFileNotFoundError::new_err(err.to_string())
            }
            FvError::Io(_) | FvError::Persist { .. } => PyIOError::new_err(err.to_string()),
            FvError::Polars(_) => PyRuntimeError::new_err(err.to_string()),
            _ => PyValueError::new_err(err.to_string()),
        }
    }
}

fn parse_direction(direction: &str) -> PyResult<Direction> {
    direction.parse().map_err(PyValueError::new_err)
}

/// A directory of decoded force volume experiments.
///
/// Args:
///     path (str): Dataset directory; created if missing.
#[pyclass(name = "Dataset")]
pub struct PyDataset {
    inner: Dataset,
}

#[pymethods]
impl PyDataset {
    #[new]
    fn new(path: PathBuf) -> PyResult<Self> {
        Ok(Self {
            inner: Dataset::open(path)?,
        })
    }

    /// Decodes a force volume file and stores it, replacing any experiment
    /// of the same name.
    ///
    /// Returns:
    ///     str: The experiment name, the file name with '.' replaced by '_'.
    #[pyo3(signature = (path, config_path = None))]
    fn ingest_file(
        &self,
        py: Python<'_>,
        path: PathBuf,
        config_path: Option<PathBuf>,
    ) -> PyResult<String> {
        let config = match config_path {
            Some(p) => DecodeConfig::from_json_file(p)?,
            None => DecodeConfig::default(),
        };
        Ok(py.allow_threads(|| self.inner.ingest_file(&path, &config))?)
    }

    fn experiments(&self) -> Vec<String> {
        self.inner.experiment_names()
    }

    fn curve_count(&self, name: &str) -> PyResult<usize> {
        Ok(self.inner.curve_count(name)?)
    }

    /// One deflection ramp of the pixel at row-major `index`.
    ///
    /// Args:
    ///     direction (str): "forward" (approach) or "backward" (retract).
    #[pyo3(signature = (name, index, direction = "forward"))]
    fn curve(&self, name: &str, index: usize, direction: &str) -> PyResult<Vec<f64>> {
        Ok(self.inner.curve(name, index, parse_direction(direction)?)?)
    }

    #[pyo3(signature = (name, as_physical_units = true))]
    fn ramp_axis(&self, name: &str, as_physical_units: bool) -> PyResult<Vec<f64>> {
        Ok(self.inner.ramp_axis(name, as_physical_units)?)
    }

    fn height(&self, name: &str, index: usize) -> PyResult<f64> {
        Ok(self.inner.height(name, index)?)
    }

    /// The pixel table: row, column, forward, backward, height.
    fn frame(&self, name: &str) -> PyResult<PyDataFrame> {
        Ok(PyDataFrame(self.inner.frame(name)?.as_ref().clone()))
    }

    fn remove(&self, name: &str) -> PyResult<()> {
        Ok(self.inner.remove(name)?)
    }

    fn __len__(&self) -> usize {
        self.inner.experiment_names().len()
    }

    fn __contains__(&self, name: &str) -> bool {
        self.inner.contains(name)
    }

    fn __repr__(&self) -> String {
        format!(
            "Dataset('{}', {} experiments)",
            self.inner.root().display(),
            self.inner.experiment_names().len()
        )
    }
}

/// Decodes a force ramp file into one DataFrame per channel.
///
/// Returns:
///     dict[str, polars.DataFrame]: Columns x, forward, backward.
#[pyfunction]
fn read_force_ramp(path: PathBuf) -> PyResult<HashMap<String, PyDataFrame>> {
    let ramp = ForceRampFile::open(&path)?;
    let mut frames = HashMap::with_capacity(ramp.channels.len());
    for channel in &ramp.channels {
        frames.insert(channel.name.clone(), PyDataFrame(channel.to_frame()?));
    }
    Ok(frames)
}

/// A Python module implemented in Rust. The name of this function must match
/// the `lib.name` setting in the `Cargo.toml`, else Python will not be able to
/// import the module.
#[pymodule]
fn nanoscope_fv(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyDataset>()?;
    m.add_function(wrap_pyfunction!(read_force_ramp, m)?)?;
    Ok(())
}
