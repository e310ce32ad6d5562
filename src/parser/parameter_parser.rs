//! Derivation of experiment parameters from raw header fields

use crate::error::{FvError, Result};
use crate::types::header::{RawHeaderFields, keys};
use crate::types::parameters::ExperimentParameters;
use log::debug;

/// Converts a header count into a positive grid dimension.
fn count(header: &RawHeaderFields, key: &str, index: usize, name: &'static str) -> Result<usize> {
    let value = header.number(key, index)?;
    if !value.is_finite() || value < 1.0 || value > u32::MAX as f64 {
        return Err(FvError::InvalidParameter {
            name,
            value: value.to_string(),
        });
    }
    Ok(value as usize)
}

/// Derives the normalized experiment parameters.
///
/// - rows from the first "Number of lines", columns from the first "Samps/line"
/// - ramp points from the second "Samps/line"
/// - ramp length = first "4:Ramp Size" × first "Sens. Zsens"
/// - ramp step = ramp length / (ramp points - 1)
/// - pixel pitch = scan size / grid count along each axis
pub fn derive_parameters(header: &RawHeaderFields) -> Result<ExperimentParameters> {
    let number_of_map_rows = count(header, keys::NUMBER_OF_LINES, 0, "number_of_map_rows")?;
    let number_of_map_columns = count(header, keys::SAMPS_PER_LINE, 0, "number_of_map_columns")?;
    let ramp_points = count(header, keys::SAMPS_PER_LINE, 1, "ramp_points")?;
    if ramp_points < 2 {
        return Err(FvError::InvalidParameter {
            name: "ramp_points",
            value: ramp_points.to_string(),
        });
    }

    let samples = number_of_map_rows
        .checked_mul(number_of_map_columns)
        .and_then(|n| n.checked_mul(2))
        .and_then(|n| n.checked_mul(ramp_points));
    if samples.is_none() {
        return Err(FvError::InvalidParameter {
            name: "ramp_points",
            value: format!(
                "{ramp_points} (grid {number_of_map_rows}x{number_of_map_columns} overflows the sample count)"
            ),
        });
    }

    let scan_size = header.number(keys::SCAN_SIZE, 0)?;
    let ramp_length = header.number(keys::RAMP_SIZE, 0)? * header.number(keys::SENS_ZSENS, 0)?;
    let ramp_step = ramp_length / (ramp_points - 1) as f64;

    let parameters = ExperimentParameters::builder()
        .number_of_map_rows(number_of_map_rows)
        .number_of_map_columns(number_of_map_columns)
        .scan_size(scan_size)
        .ramp_length(ramp_length)
        .ramp_points(ramp_points)
        .ramp_step(ramp_step)
        .pixel_length_column(scan_size / number_of_map_columns as f64)
        .pixel_length_row(scan_size / number_of_map_rows as f64)
        .build();
    debug!("derived parameters: {parameters:?}");
    Ok(parameters)
}
