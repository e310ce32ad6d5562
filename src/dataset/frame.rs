//! Pixel tables: one row per grid pixel, stored as parquet.
//!
//! Columns are `row` and `column` (u32), `forward` and `backward`
//! (list of f64, one ramp each) and `height` (f64), in row-major order.

use crate::error::{FvError, Result};
use crate::types::{Direction, ForceVolumeArray, PixelRecord, TopographyArray};
use crate::utils::Coordinate;
use itertools::iproduct;
use log::warn;
use ndarray::{Array2, s};
use polars::prelude::*;
use std::fs::File;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const ROW: &str = "row";
const COLUMN: &str = "column";
const HEIGHT: &str = "height";

/// Builds the pixel table of a decoded grid.
///
/// Both arrays must already agree on the grid shape.
pub fn pixels_to_frame(
    topography: &TopographyArray,
    force_volume: &ForceVolumeArray,
) -> Result<DataFrame> {
    let (rows, columns) = topography.dim();
    let count = rows * columns;
    let mut row_ids = Vec::with_capacity(count);
    let mut column_ids = Vec::with_capacity(count);
    let mut heights = Vec::with_capacity(count);
    let mut forward = Vec::with_capacity(count);
    let mut backward = Vec::with_capacity(count);

    for (r, c) in iproduct!(0..rows, 0..columns) {
        row_ids.push(r as u32);
        column_ids.push(c as u32);
        heights.push(topography[[r, c]]);
        for (direction, curves) in [
            (Direction::Forward, &mut forward),
            (Direction::Backward, &mut backward),
        ] {
            let values: Vec<f64> = force_volume
                .slice(s![r, c, direction.axis_index(), ..])
                .iter()
                .copied()
                .collect();
            curves.push(Series::new(PlSmallStr::EMPTY, values));
        }
    }

    let df = DataFrame::new(vec![
        Series::new(ROW.into(), row_ids).into(),
        Series::new(COLUMN.into(), column_ids).into(),
        Series::new(Direction::Forward.column_name().into(), forward).into(),
        Series::new(Direction::Backward.column_name().into(), backward).into(),
        Series::new(HEIGHT.into(), heights).into(),
    ])?;
    Ok(df)
}

/// Writes `df` to `root/file_name`, making it visible only once complete.
pub fn write_frame(df: &mut DataFrame, root: &Path, file_name: &str) -> Result<PathBuf> {
    let path = root.join(file_name);
    let mut staged = NamedTempFile::new_in(root)?;
    ParquetWriter::new(staged.as_file_mut()).finish(df)?;
    staged.as_file().sync_all()?;
    staged.persist(&path).map_err(|e| FvError::Persist {
        path: path.clone(),
        source: e.error,
    })?;
    Ok(path)
}

pub fn read_frame(path: &Path) -> Result<DataFrame> {
    let file = File::open(path)?;
    Ok(ParquetReader::new(file).finish()?)
}

fn coordinate_at(hit: &DataFrame) -> Result<Option<(u32, u32)>> {
    let row = hit.column(ROW)?.as_materialized_series().u32()?.get(0);
    let column = hit.column(COLUMN)?.as_materialized_series().u32()?.get(0);
    Ok(row.zip(column))
}

/// The table row of the pixel at `coordinate` in a grid `columns` wide.
///
/// Tables are written row-major, so the pixel sits at its linear index;
/// the stored coordinate is checked and a filter scan is the fallback.
fn pixel_rows(df: &DataFrame, coordinate: Coordinate, columns: usize) -> Result<DataFrame> {
    let wanted = (coordinate.y as u32, coordinate.x as u32);
    let linear = coordinate.to_linear(columns);
    if linear < df.height() {
        let hit = df.slice(linear as i64, 1);
        if coordinate_at(&hit)? == Some(wanted) {
            return Ok(hit);
        }
        warn!("pixel table is not row-major at index {linear}, scanning");
    }

    let hit = df
        .clone()
        .lazy()
        .filter(col(ROW).eq(lit(wanted.0)).and(col(COLUMN).eq(lit(wanted.1))))
        .collect()?;
    if hit.height() == 0 {
        return Err(FvError::NotFound(format!(
            "pixel ({}, {})",
            coordinate.y, coordinate.x
        )));
    }
    Ok(hit)
}

fn list_values(hit: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let series = hit
        .column(name)?
        .as_materialized_series()
        .list()?
        .get_as_series(0)
        .ok_or_else(|| FvError::NotFound(format!("{name} curve")))?;
    Ok(series.f64()?.into_no_null_iter().collect())
}

fn first_height(hit: &DataFrame) -> Result<f64> {
    hit.column(HEIGHT)?
        .as_materialized_series()
        .f64()?
        .get(0)
        .ok_or_else(|| FvError::NotFound("height".to_string()))
}

/// One ramp of the pixel at `coordinate`.
pub fn curve_from_frame(
    df: &DataFrame,
    coordinate: Coordinate,
    columns: usize,
    direction: Direction,
) -> Result<Vec<f64>> {
    let hit = pixel_rows(df, coordinate, columns)?;
    list_values(&hit, direction.column_name())
}

pub fn height_from_frame(df: &DataFrame, coordinate: Coordinate, columns: usize) -> Result<f64> {
    first_height(&pixel_rows(df, coordinate, columns)?)
}

pub fn pixel_from_frame(
    df: &DataFrame,
    coordinate: Coordinate,
    columns: usize,
) -> Result<PixelRecord> {
    let hit = pixel_rows(df, coordinate, columns)?;
    Ok(PixelRecord::builder()
        .row(coordinate.y)
        .column(coordinate.x)
        .forward(list_values(&hit, Direction::Forward.column_name())?)
        .backward(list_values(&hit, Direction::Backward.column_name())?)
        .height(first_height(&hit)?)
        .build())
}

/// Reassembles the height image from the pixel table.
pub fn topography_from_frame(
    df: &DataFrame,
    rows: usize,
    columns: usize,
) -> Result<TopographyArray> {
    let mut topography = Array2::<f64>::zeros((rows, columns));
    let row_ids = df.column(ROW)?.as_materialized_series().u32()?;
    let column_ids = df.column(COLUMN)?.as_materialized_series().u32()?;
    let heights = df.column(HEIGHT)?.as_materialized_series().f64()?;

    for ((r, c), height) in row_ids
        .into_no_null_iter()
        .zip(column_ids.into_no_null_iter())
        .zip(heights.into_no_null_iter())
    {
        let cell = topography
            .get_mut([r as usize, c as usize])
            .ok_or_else(|| FvError::Shape {
                what: "stored pixel",
                expected: vec![rows, columns],
                actual: vec![r as usize, c as usize],
            })?;
        *cell = height;
    }
    Ok(topography)
}
