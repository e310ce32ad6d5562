use crate::error::{FvError, Result};
use crate::types::channel::ChannelLocation;
use log::{debug, warn};
use ndarray::{Array, Dimension, IntoDimension};
use winnow::{
    Parser,
    binary::{le_i16, le_i32, le_i64},
    combinator::repeat,
    error::ContextError,
};

/// Decodes `count` little-endian signed integers of `width` bytes each.
pub fn parse_samples(mut input: &[u8], count: usize, width: usize) -> Result<Vec<f64>> {
    let decoded: std::result::Result<Vec<f64>, ContextError> = match width {
        2 => repeat(count, le_i16.map(f64::from)).parse_next(&mut input),
        4 => repeat(count, le_i32.map(f64::from)).parse_next(&mut input),
        8 => repeat(count, le_i64.map(|v: i64| v as f64)).parse_next(&mut input),
        other => {
            return Err(FvError::Format(format!(
                "unsupported sample width of {other} bytes"
            )));
        }
    };
    decoded.map_err(|e| FvError::Format(format!("failed to decode samples: {e:?}")))
}

/// Reads one channel from the file contents and reshapes it.
///
/// Seeks to the channel offset, decodes exactly as many samples as `shape`
/// holds and multiplies each by the channel scale factor. Fails with
/// [`FvError::TruncatedData`] when either the declared length or the file
/// itself is too short for the shape.
pub fn read_channel<D, Sh>(data: &[u8], location: &ChannelLocation, shape: Sh) -> Result<Array<f64, D>>
where
    D: Dimension,
    Sh: IntoDimension<Dim = D>,
{
    let dim = shape.into_dimension();
    let count = dim.size_checked().ok_or_else(|| {
        FvError::Format(format!(
            "shape {:?} of channel '{}' overflows the sample count",
            dim.slice(),
            location.name
        ))
    })?;
    let required = count
        .checked_mul(location.sample_width_bytes)
        .ok_or_else(|| {
            FvError::Format(format!(
                "channel '{}' needs more than {} bytes",
                location.name,
                usize::MAX
            ))
        })?;

    let start = usize::try_from(location.offset).unwrap_or(usize::MAX);
    let in_file = data.len().saturating_sub(start);
    let available = in_file.min(location.length);
    if available < required {
        return Err(FvError::TruncatedData {
            offset: location.offset,
            required,
            available,
        });
    }
    if location.length > required {
        warn!(
            "channel '{}' declares {} bytes, shape {:?} uses {}",
            location.name,
            location.length,
            dim.slice(),
            required
        );
    }

    let block = &data[start..start + required];
    let mut samples = parse_samples(block, count, location.sample_width_bytes)?;
    for sample in samples.iter_mut() {
        *sample *= location.scale_factor;
    }
    debug!(
        "decoded {} samples of channel '{}' from byte {}",
        count, location.name, location.offset
    );

    let expected = dim.slice().to_vec();
    Array::from_shape_vec(dim, samples).map_err(|_| FvError::Shape {
        what: "channel payload",
        expected,
        actual: vec![count],
    })
}
