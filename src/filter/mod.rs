//! Device filtering for devfilter.
//!
//! This module handles:
//! - Parsing `a|regex|` / `r|regex|` patterns
//! - Compiling ordered pattern lists into a single matcher
//! - Evaluating devices against the compiled rules
//! - Scanning raw patterns for symlink paths

pub mod compiler;
pub mod pattern;
pub mod regex_filter;
pub mod symlink;

pub use compiler::{CompiledRules, PolarityBitmap, compile_patterns};
pub use pattern::{Pattern, Polarity};
pub use regex_filter::{Provenance, RegexFilter};
pub use symlink::contains_symlink;

use crate::config::DevicesConfig;
use crate::device::Device;
use crate::error::Result;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::trace;

/// Command-wide settings that change how filters treat devices.
#[derive(Debug, Clone, Default)]
pub struct CommandContext {
	/// Regex filtering is switched off for this command.
	pub skip_regex: bool,

	/// The command was given an explicit list of devices.
	pub devices_list: bool,

	/// A devices file decides which devices are visible.
	pub devices_file: bool,

	/// Apply the regex filter on top of the devices file.
	pub filter_with_devices_file: bool,

	/// Never switch a device's display name to the alias that was accepted.
	pub disable_preferred_name: bool,
}

impl CommandContext {
	/// Defaults taken from the `[devices]` section.
	pub fn from_config(devices: &DevicesConfig) -> Self {
		CommandContext {
			devices_file: devices.use_devices_file,
			filter_with_devices_file: devices.filter_with_devices_file,
			disable_preferred_name: devices.disable_preferred_name,
			..Default::default()
		}
	}
}

/// Number of holders currently using a filter.
#[derive(Debug, Default)]
pub struct UseCount(AtomicU32);

impl UseCount {
	pub fn retain(&self) {
		self.0.fetch_add(1, Ordering::Relaxed);
	}

	/// Release one holder. Releasing an unused filter leaves the count at 0.
	pub fn release(&self) {
		let _ = self
			.0
			.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
	}

	pub fn get(&self) -> u32 {
		self.0.load(Ordering::Relaxed)
	}
}

/// A device filter.
pub trait DeviceFilter: std::fmt::Debug {
	/// Short name used in log output.
	fn name(&self) -> &'static str;

	/// Decide whether `dev` is visible. May record why it was hidden in the
	/// device's filtered flags and change its display name.
	fn passes(&self, ctx: &CommandContext, dev: &mut Device) -> bool;

	fn use_count(&self) -> &UseCount;
}

/// Filters applied in sequence; a device must pass every one.
#[derive(Debug, Default)]
pub struct FilterChain {
	filters: Vec<Box<dyn DeviceFilter>>,
	use_count: UseCount,
}

impl FilterChain {
	pub fn new(filters: Vec<Box<dyn DeviceFilter>>) -> Self {
		FilterChain {
			filters,
			use_count: UseCount::default(),
		}
	}

	pub fn push(&mut self, filter: Box<dyn DeviceFilter>) {
		self.filters.push(filter);
	}

	pub fn len(&self) -> usize {
		self.filters.len()
	}

	pub fn is_empty(&self) -> bool {
		self.filters.is_empty()
	}

	/// Mark the chain and every member as in use.
	pub fn retain(&self) {
		self.use_count.retain();
		for filter in &self.filters {
			filter.use_count().retain();
		}
	}

	pub fn release(&self) {
		self.use_count.release();
		for filter in &self.filters {
			filter.use_count().release();
		}
	}
}

impl DeviceFilter for FilterChain {
	fn name(&self) -> &'static str {
		"chain"
	}

	fn passes(&self, ctx: &CommandContext, dev: &mut Device) -> bool {
		for filter in &self.filters {
			if !filter.passes(ctx, dev) {
				trace!("{}: filtered by {}", dev.name(), filter.name());
				return false;
			}
		}
		true
	}

	fn use_count(&self) -> &UseCount {
		&self.use_count
	}
}

/// Build the regex filters for both configured lists.
///
/// The global filter runs first. A list with no patterns contributes no
/// filter, since it would pass every device anyway.
pub fn build_chain(devices: &DevicesConfig) -> Result<FilterChain> {
	let mut chain = FilterChain::default();

	if !devices.global_filter.is_empty() {
		chain.push(Box::new(RegexFilter::new(
			&devices.global_filter,
			Provenance::GLOBAL_FILTER,
		)?));
	}
	if !devices.filter.is_empty() {
		chain.push(Box::new(RegexFilter::new(
			&devices.filter,
			Provenance::FILTER,
		)?));
	}

	Ok(chain)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::device::FilteredFlags;
	use toml::Value;

	fn regex(patterns: &[&str], provenance: Provenance) -> Box<dyn DeviceFilter> {
		let vals: Vec<Value> = patterns.iter().map(|p| Value::from(*p)).collect();
		Box::new(RegexFilter::new(&vals, provenance).unwrap())
	}

	#[test]
	fn test_use_count_does_not_underflow() {
		let count = UseCount::default();
		count.release();
		assert_eq!(count.get(), 0);
		count.retain();
		count.release();
		assert_eq!(count.get(), 0);
	}

	#[test]
	fn test_chain_requires_every_filter() {
		let chain = FilterChain::new(vec![
			regex(&["r|^/dev/loop|"], Provenance::GLOBAL_FILTER),
			regex(&["r|^/dev/sdb$|"], Provenance::FILTER),
		]);
		let ctx = CommandContext::default();

		let mut sda = Device::new(["/dev/sda"]);
		let mut sdb = Device::new(["/dev/sdb"]);
		let mut loop0 = Device::new(["/dev/loop0"]);

		assert!(chain.passes(&ctx, &mut sda));
		assert!(!chain.passes(&ctx, &mut sdb));
		assert!(!chain.passes(&ctx, &mut loop0));
		assert!(loop0.is_filtered(FilteredFlags::REGEX));
	}

	#[test]
	fn test_empty_chain_passes() {
		let chain = FilterChain::default();
		let mut dev = Device::new(["/dev/sda"]);
		assert!(chain.is_empty());
		assert!(chain.passes(&CommandContext::default(), &mut dev));
	}

	#[test]
	fn test_build_chain_from_config() {
		let devices = DevicesConfig {
			filter: vec![Value::from("r|^/dev/sdb$|")],
			global_filter: vec![Value::from("r|^/dev/loop|")],
			..Default::default()
		};
		let chain = build_chain(&devices).unwrap();
		assert_eq!(chain.len(), 2);
		assert_eq!(chain.filters[0].name(), "regex");

		let ctx = CommandContext::from_config(&devices);
		let mut loop0 = Device::new(["/dev/loop0"]);
		assert!(!chain.passes(&ctx, &mut loop0));

		assert!(build_chain(&DevicesConfig::default()).unwrap().is_empty());
	}

	#[test]
	fn test_build_chain_reports_bad_list() {
		let devices = DevicesConfig {
			filter: vec![Value::from("a|ok|"), Value::from("q|bad|")],
			..Default::default()
		};
		match build_chain(&devices).unwrap_err() {
			crate::error::FilterError::InvalidPattern { pattern, .. } => {
				assert_eq!(pattern, "q|bad|");
			}
			other => panic!("Expected InvalidPattern error, got {other:?}"),
		}
	}

	#[test]
	fn test_context_from_config() {
		let devices = DevicesConfig {
			use_devices_file: true,
			disable_preferred_name: true,
			..Default::default()
		};
		let ctx = CommandContext::from_config(&devices);
		assert!(ctx.devices_file);
		assert!(ctx.disable_preferred_name);
		assert!(!ctx.filter_with_devices_file);
		assert!(!ctx.skip_regex);
	}

	#[test]
	fn test_chain_propagates_use_count() {
		let mut chain = FilterChain::default();
		chain.push(regex(&["a|.*|"], Provenance::FILTER));
		assert_eq!(chain.len(), 1);

		chain.retain();
		assert_eq!(chain.use_count().get(), 1);
		assert_eq!(chain.filters[0].use_count().get(), 1);

		chain.release();
		assert_eq!(chain.use_count().get(), 0);
		assert_eq!(chain.filters[0].use_count().get(), 0);
	}
}
