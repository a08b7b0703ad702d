//! The block device view that filters operate on.

use bitflags::bitflags;

bitflags! {
	/// Reasons a device was hidden, one bit per filter kind.
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
	pub struct FilteredFlags: u32 {
		/// Rejected by the accept/reject regex filter.
		const REGEX = 1 << 0;
	}
}

/// A block device known by one or more alias paths.
///
/// The first alias is the canonical node (e.g. `/dev/sda`); the rest are
/// symlinks such as `/dev/disk/by-id/...`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Device {
	aliases: Vec<String>,
	preferred: Option<usize>,

	/// Why the device was filtered out, if it was.
	pub filtered_flags: FilteredFlags,
}

impl Device {
	pub fn new<I, S>(aliases: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Device {
			aliases: aliases.into_iter().map(Into::into).collect(),
			preferred: None,
			filtered_flags: FilteredFlags::empty(),
		}
	}

	pub fn aliases(&self) -> &[String] {
		&self.aliases
	}

	/// Display name: the preferred alias if one was chosen, else the first.
	pub fn name(&self) -> &str {
		let ix = self.preferred.unwrap_or(0);
		self.aliases.get(ix).map_or("[unknown]", String::as_str)
	}

	/// Make the alias at `ix` the display name.
	pub fn set_preferred_name(&mut self, ix: usize) {
		if ix < self.aliases.len() {
			self.preferred = Some(ix);
		}
	}

	pub fn preferred_name(&self) -> Option<&str> {
		self.preferred.map(|ix| self.aliases[ix].as_str())
	}

	pub fn is_filtered(&self, reason: FilteredFlags) -> bool {
		self.filtered_flags.contains(reason)
	}
}
