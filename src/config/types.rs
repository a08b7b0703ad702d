use serde::Deserialize;
use toml::Value;

use crate::error::FilterError;
use crate::filter::compiler::pattern_strs;

/// Top-level configuration from a `devfilter.toml` file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
	/// Device visibility settings.
	#[serde(default)]
	pub devices: DevicesConfig,
}

/// The `[devices]` section.
///
/// Pattern lists are kept as raw TOML values so that a non-string entry is
/// reported against its list and position instead of failing deserialization.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DevicesConfig {
	/// Accept/reject patterns applied by commands that honour the filter.
	/// Later entries take precedence over earlier ones.
	#[serde(default)]
	pub filter: Vec<Value>,

	/// Accept/reject patterns applied before any other filtering.
	#[serde(default)]
	pub global_filter: Vec<Value>,

	/// Keep the canonical name even when a later alias is the one accepted.
	#[serde(default)]
	pub disable_preferred_name: bool,

	/// An explicit devices file supersedes regex filtering.
	#[serde(default)]
	pub use_devices_file: bool,

	/// Keep applying the regex filter even when the devices file is in use.
	#[serde(default)]
	pub filter_with_devices_file: bool,
}

impl DevicesConfig {
	/// Validate that both pattern lists contain only strings.
	pub fn validate(&self) -> Result<(), FilterError> {
		pattern_strs("filter", &self.filter)?;
		pattern_strs("global_filter", &self.global_filter)?;
		Ok(())
	}
}

impl Config {
	/// Validate all sections of this config.
	pub fn validate(&self) -> Result<(), FilterError> {
		self.devices.validate()
	}
}
