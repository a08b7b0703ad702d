//! Configuration loading and parsing for devfilter.
//!
//! This module handles:
//! - TOML config file parsing
//! - Pattern list type validation

pub mod parser;
pub mod types;

pub use parser::{parse_config_file, parse_config_str};
pub use types::{Config, DevicesConfig};
