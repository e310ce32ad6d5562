//! Type definitions for the force volume file format

pub mod channel;
pub mod header;
pub mod parameters;
pub mod pixel_data;

// Re-export the main types for convenience
pub use channel::{ChannelLocation, ChannelScale, ChannelSpec};
pub use header::{ExtractionRule, HeaderKey, HeaderValue, RawHeaderFields};
pub use parameters::{Calibration, ExperimentParameters};
pub use pixel_data::{Direction, ForceVolumeArray, PixelRecord, TopographyArray};
