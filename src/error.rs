//! Error type shared by the decode pipeline and the dataset store.

use std::path::PathBuf;

/// Errors raised while decoding force volume files or querying a dataset.
#[derive(Debug, thiserror::Error)]
pub enum FvError {
    /// The header is malformed: terminator missing, unreadable value, unsupported layout.
    #[error("format error: {0}")]
    Format(String),

    /// A required header key has fewer occurrences than the decoder needs.
    #[error("missing header field '{key}' (occurrence {index})")]
    MissingField { key: String, index: usize },

    /// A derived parameter violates its invariant.
    #[error("invalid parameter {name} = {value}")]
    InvalidParameter { name: &'static str, value: String },

    /// No "Image Data" occurrence declares this channel.
    #[error("channel '{0}' not declared in header")]
    ChannelNotFound(String),

    /// The binary region is shorter than the requested shape implies.
    #[error(
        "truncated data at byte offset {offset}: need {required} bytes, {available} available"
    )]
    TruncatedData {
        offset: u64,
        required: usize,
        available: usize,
    },

    /// Arrays handed to the store disagree with the experiment parameters.
    #[error("shape mismatch for {what}: expected {expected:?}, got {actual:?}")]
    Shape {
        what: &'static str,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// Unknown experiment, or a pixel index outside the grid.
    #[error("not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Atomic rename of a staged dataset file failed.
    #[error("failed to persist {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FvError {
    pub fn missing(key: &str, index: usize) -> Self {
        FvError::MissingField {
            key: key.to_string(),
            index,
        }
    }
}

pub type Result<T> = std::result::Result<T, FvError>;
