//! Configuration types
//!
//! The display configuration comes from `clock.toml` embedded in the
//! firmware image; per-tube calibration comes from flash as
//! postcard-serialized binary data.

pub mod calibration;
pub mod parse;
pub mod types;

pub use calibration::*;
pub use parse::{parse_config, ParseError};
pub use types::*;
