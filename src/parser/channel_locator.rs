//! Locates named channels inside the binary region

use crate::error::{FvError, Result};
use crate::types::channel::{ChannelLocation, ChannelSpec};
use crate::types::header::{RawHeaderFields, keys};
use log::debug;

/// Occurrence index of the last "Image Data" declaration equal to `name`.
///
/// Later declarations override earlier placeholder entries, so the search
/// runs from the end.
pub fn find_declaration(header: &RawHeaderFields, name: &str) -> Result<usize> {
    header
        .texts(keys::IMAGE_DATA)
        .rev()
        .find(|(_, declared)| *declared == name)
        .map(|(index, _)| index)
        .ok_or_else(|| FvError::ChannelNotFound(name.to_string()))
}

/// Resolves the byte location and scale of `spec` from the header.
///
/// The data length shares the declaration's occurrence index while the data
/// offset sits one occurrence earlier; that pairing is fixed by the file
/// format.
pub fn locate(header: &RawHeaderFields, spec: &ChannelSpec) -> Result<ChannelLocation> {
    let declaration_index = find_declaration(header, &spec.name)?;
    let offset_index = declaration_index
        .checked_sub(1)
        .ok_or_else(|| FvError::missing(keys::DATA_OFFSET, 0))?;

    let offset = header.number(keys::DATA_OFFSET, offset_index)?;
    let length = header.number(keys::DATA_LENGTH, declaration_index)?;
    if offset < 0.0 || length < 0.0 {
        return Err(FvError::Format(format!(
            "negative payload location for channel '{}': offset {offset}, length {length}",
            spec.name
        )));
    }

    let location = ChannelLocation::builder()
        .name(spec.name.clone())
        .declaration_index(declaration_index)
        .offset(offset as u64)
        .length(length as usize)
        .sample_width_bytes(spec.sample_width_bytes)
        .scale_factor(spec.scale.resolve(header)?)
        .build();
    debug!("located channel: {location:?}");
    Ok(location)
}
