use crate::device::{Device, FilteredFlags};
use crate::error::Result;
use crate::filter::compiler::{CompiledRules, compile_patterns};
use crate::filter::pattern::Polarity;
use crate::filter::{CommandContext, DeviceFilter, UseCount};
use std::sync::atomic::{AtomicBool, Ordering};
use toml::Value;
use tracing::{debug, error, warn};

/// Which configuration lists a regex filter was built from.
///
/// Only used to word the warnings printed when the devices file makes the
/// filter redundant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Provenance {
	pub config_filter: bool,
	pub config_global_filter: bool,
}

impl Provenance {
	pub const FILTER: Provenance = Provenance {
		config_filter: true,
		config_global_filter: false,
	};

	pub const GLOBAL_FILTER: Provenance = Provenance {
		config_filter: false,
		config_global_filter: true,
	};

	fn list_name(self) -> &'static str {
		if self.config_global_filter {
			"global_filter"
		} else {
			"filter"
		}
	}
}

/// Accept/reject regex filter over device aliases.
///
/// The compiled rules are immutable once built; only the use count and the
/// one-shot warning flags change afterwards, and those are atomic.
#[derive(Debug)]
pub struct RegexFilter {
	rules: CompiledRules,
	provenance: Provenance,
	warned_filter: AtomicBool,
	warned_global_filter: AtomicBool,
	use_count: UseCount,
}

impl RegexFilter {
	/// Compile `patterns` into a ready filter.
	///
	/// No filter is produced if any pattern is malformed.
	pub fn new(patterns: &[Value], provenance: Provenance) -> Result<Self> {
		let rules = compile_patterns(provenance.list_name(), patterns)?;

		debug!("Regex filter initialised.");

		Ok(RegexFilter {
			rules,
			provenance,
			warned_filter: AtomicBool::new(false),
			warned_global_filter: AtomicBool::new(false),
			use_count: UseCount::default(),
		})
	}

	pub fn rules(&self) -> &CompiledRules {
		&self.rules
	}

	/// Number of compiled patterns.
	pub fn pattern_count(&self) -> usize {
		self.rules.len()
	}

	pub fn provenance(&self) -> Provenance {
		self.provenance
	}

	pub fn warned_filter(&self) -> bool {
		self.warned_filter.load(Ordering::Relaxed)
	}

	pub fn warned_global_filter(&self) -> bool {
		self.warned_global_filter.load(Ordering::Relaxed)
	}

	/// Warn once per source list that the devices file overrides it.
	fn warn_ignored(&self) {
		if self.provenance.config_filter && !self.warned_filter.swap(true, Ordering::Relaxed) {
			warn!("Please remove the configured filter, it is ignored with the devices file.");
		}
		if self.provenance.config_global_filter
			&& !self.warned_global_filter.swap(true, Ordering::Relaxed)
		{
			warn!(
				"Please remove the configured global_filter, it is ignored with the devices file."
			);
		}
	}
}

impl DeviceFilter for RegexFilter {
	fn name(&self) -> &'static str {
		"regex"
	}

	fn passes(&self, ctx: &CommandContext, dev: &mut Device) -> bool {
		dev.filtered_flags.remove(FilteredFlags::REGEX);

		if ctx.devices_list || ctx.skip_regex {
			return true;
		}

		if ctx.devices_file && !ctx.filter_with_devices_file {
			self.warn_ignored();
			return true;
		}

		let mut rejected = false;
		let mut accepted = None;

		for (ix, alias) in dev.aliases().iter().enumerate() {
			match self.rules.polarity_of(alias) {
				Some(Polarity::Accept) => {
					accepted = Some(ix);
					break;
				}
				Some(Polarity::Reject) => rejected = true,
				None => {}
			}
		}

		if let Some(ix) = accepted {
			if ix != 0 && !ctx.disable_preferred_name {
				dev.set_preferred_name(ix);
			}
			return true;
		}

		if rejected {
			dev.filtered_flags.insert(FilteredFlags::REGEX);
			debug!("{}: Skipping (regex)", dev.name());
		}

		// Devices that match nothing pass.
		!rejected
	}

	fn use_count(&self) -> &UseCount {
		&self.use_count
	}
}

impl Drop for RegexFilter {
	fn drop(&mut self) {
		let in_use = self.use_count.get();
		if in_use != 0 {
			error!("Internal error: Destroying regex filter while in use {in_use} times.");
		}
	}
}
