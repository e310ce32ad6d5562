//! Force volume file parsing functionality

mod channel_locator;
mod header_parser;
mod parameter_parser;
mod payload_parser;

// Re-export the parsing functions
pub use channel_locator::{find_declaration, locate};
pub use header_parser::{parse_header, parse_header_text};
pub use parameter_parser::derive_parameters;
pub use payload_parser::{parse_samples, read_channel};
