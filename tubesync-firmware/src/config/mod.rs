//! Configuration loading
//!
//! The display configuration is embedded at build time; the calibration
//! table comes from flash.

pub mod calibration;
pub mod loader;

pub use calibration::load_calibration;
pub use loader::load_config;
