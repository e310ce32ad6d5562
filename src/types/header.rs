//! Raw header fields and the key vocabularies of the text header.

use crate::error::{FvError, Result};
use std::collections::HashMap;

/// Literal marker line that closes the text header.
pub const HEADER_TERMINATOR: &str = "*File list end";

/// How the value(s) of a key are pulled out of a matching header line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionRule {
    /// The text between the last two quote marks.
    QuotedText,
    /// The last integer literal on the line.
    FinalInteger,
    /// Lines carrying "@" or "LSB" yield their last signed literal, any
    /// other line yields every unsigned literal it contains.
    Numeric,
    /// The first signed literal inside parentheses, i.e. the V/LSB factor.
    ParenthesizedValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderKey {
    pub text: &'static str,
    pub rule: ExtractionRule,
}

impl HeaderKey {
    pub const fn new(text: &'static str, rule: ExtractionRule) -> Self {
        Self { text, rule }
    }
}

pub mod keys {
    pub const SENS_ZSENS: &str = "Sens. Zsens";
    pub const Z_SCALE: &str = "2:Z scale";
    pub const SAMPS_PER_LINE: &str = "Samps/line";
    pub const DATA_OFFSET: &str = "Data offset";
    pub const SCAN_SIZE: &str = "Scan Size";
    pub const Z_MAGNIFY: &str = "Z magnify";
    pub const RAMP_SIZE: &str = "4:Ramp Size";
    pub const FORCE_DATA_POINTS: &str = "Force Data Points";
    pub const NUMBER_OF_LINES: &str = "Number of lines";
    pub const DATA_LENGTH: &str = "Data length";
    pub const BYTES_PER_PIXEL: &str = "Bytes/pixel";
    pub const IMAGE_DATA: &str = "Image Data";

    // Single force-ramp files spell several keys with their trailing colon.
    pub const RAMP_SENS_ZSENS: &str = "Sens. Zsens:";
    pub const RAMP_DATA_LENGTH: &str = "Data length:";
    pub const RAMP_RAMP_SIZE: &str = "4:Ramp Size:";
    pub const RAMP_SAMPS_PER_LINE: &str = "Samps/line:";
    pub const RAMP_IMAGE_DATA: &str = "4:Image Data:";
    pub const RAMP_Z_SCALE: &str = "@4:Z scale";
}

use ExtractionRule::*;

/// Keys read from force volume files.
pub const FORCE_VOLUME_KEYS: &[HeaderKey] = &[
    HeaderKey::new(keys::SENS_ZSENS, Numeric),
    HeaderKey::new(keys::Z_SCALE, Numeric),
    HeaderKey::new(keys::SAMPS_PER_LINE, Numeric),
    HeaderKey::new(keys::DATA_OFFSET, Numeric),
    HeaderKey::new(keys::SCAN_SIZE, Numeric),
    HeaderKey::new(keys::Z_MAGNIFY, Numeric),
    HeaderKey::new(keys::RAMP_SIZE, Numeric),
    HeaderKey::new(keys::FORCE_DATA_POINTS, Numeric),
    HeaderKey::new(keys::NUMBER_OF_LINES, Numeric),
    HeaderKey::new(keys::DATA_LENGTH, Numeric),
    HeaderKey::new(keys::BYTES_PER_PIXEL, FinalInteger),
    HeaderKey::new(keys::IMAGE_DATA, QuotedText),
];

/// Keys read from single force-ramp files.
pub const FORCE_RAMP_KEYS: &[HeaderKey] = &[
    HeaderKey::new(keys::RAMP_SENS_ZSENS, Numeric),
    HeaderKey::new(keys::DATA_OFFSET, Numeric),
    HeaderKey::new(keys::RAMP_DATA_LENGTH, Numeric),
    HeaderKey::new(keys::Z_MAGNIFY, Numeric),
    HeaderKey::new(keys::RAMP_RAMP_SIZE, Numeric),
    HeaderKey::new(keys::RAMP_SAMPS_PER_LINE, Numeric),
    HeaderKey::new(keys::RAMP_IMAGE_DATA, QuotedText),
    HeaderKey::new(keys::BYTES_PER_PIXEL, FinalInteger),
    HeaderKey::new(keys::RAMP_Z_SCALE, ParenthesizedValue),
];

#[derive(Debug, Clone, PartialEq)]
pub enum HeaderValue {
    Number(f64),
    Text(String),
}

impl HeaderValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            HeaderValue::Number(n) => Some(*n),
            HeaderValue::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            HeaderValue::Text(s) => Some(s),
            HeaderValue::Number(_) => None,
        }
    }
}

/// Every occurrence of every vocabulary key, in header order.
///
/// The occurrence index is significant: the Nth "Data offset" belongs to a
/// specific "Image Data" declaration, so values are never collapsed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawHeaderFields {
    fields: HashMap<&'static str, Vec<HeaderValue>>,
}

impl RawHeaderFields {
    pub(crate) fn with_vocabulary(vocabulary: &[HeaderKey]) -> Self {
        Self {
            fields: vocabulary.iter().map(|k| (k.text, Vec::new())).collect(),
        }
    }

    pub(crate) fn push(&mut self, key: &'static str, value: HeaderValue) {
        self.fields.entry(key).or_default().push(value);
    }

    /// All occurrences of `key`; empty for keys never seen.
    pub fn values(&self, key: &str) -> &[HeaderValue] {
        self.fields.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn occurrences(&self, key: &str) -> usize {
        self.values(key).len()
    }

    /// The numeric value of occurrence `index` of `key`.
    pub fn number(&self, key: &str, index: usize) -> Result<f64> {
        let value = self
            .values(key)
            .get(index)
            .ok_or_else(|| FvError::missing(key, index))?;
        value.as_number().ok_or_else(|| {
            FvError::Format(format!(
                "header field '{key}' occurrence {index} is not numeric: {value:?}"
            ))
        })
    }

    /// The numeric value of the last occurrence of `key`.
    pub fn last_number(&self, key: &str) -> Result<f64> {
        match self.occurrences(key) {
            0 => Err(FvError::missing(key, 0)),
            n => self.number(key, n - 1),
        }
    }

    pub fn text(&self, key: &str, index: usize) -> Result<&str> {
        let value = self
            .values(key)
            .get(index)
            .ok_or_else(|| FvError::missing(key, index))?;
        value.as_text().ok_or_else(|| {
            FvError::Format(format!(
                "header field '{key}' occurrence {index} is not text: {value:?}"
            ))
        })
    }

    /// Text occurrences of `key` with their occurrence index.
    pub fn texts<'a>(&'a self, key: &str) -> impl DoubleEndedIterator<Item = (usize, &'a str)> {
        self.values(key)
            .iter()
            .enumerate()
            .filter_map(|(i, v)| v.as_text().map(|s| (i, s)))
    }
}
