//! Configuration types
//!
//! Board-agnostic monitor configuration, loaded at boot from an embedded
//! TOML file through the no_std subset parser in [`parse`].

pub mod calibration;
pub mod parse;
pub mod types;

pub use calibration::{Calibrate, CalibrationTable, LinearCalibration};
pub use parse::{parse_config, ParseError};
pub use types::*;
