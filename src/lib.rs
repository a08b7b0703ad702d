//! Devfilter - rule-based block device visibility filter.
//!
//! This library provides the core functionality for devfilter, including:
//! - Configuration file parsing
//! - Accept/reject pattern parsing and compilation into one matcher
//! - Per-device evaluation with preferred-name promotion
//! - A symlink heuristic over raw accept patterns
//!
//! # Example
//!
//! ```no_run
//! use devfilter_cli::config::parse_config_file;
//! use devfilter_cli::device::Device;
//! use devfilter_cli::filter::{CommandContext, DeviceFilter, Provenance, RegexFilter};
//! use std::path::Path;
//!
//! let config = parse_config_file(Path::new("devfilter.toml")).unwrap();
//! let filter = RegexFilter::new(&config.devices.filter, Provenance::FILTER).unwrap();
//!
//! let mut dev = Device::new(["/dev/sda", "/dev/disk/by-id/wwn-0x5000c500a1b2c3d4"]);
//! if filter.passes(&CommandContext::default(), &mut dev) {
//!     println!("{} is visible", dev.name());
//! }
//! ```

pub mod config;
pub mod device;
pub mod error;
pub mod filter;

pub use error::{FilterError, PatternError, Result};
