use crate::config::DevicesConfig;
use toml::Value;

/// Substrings that show up in udev-managed symlink paths.
///
/// The last four catch patterns that leave out the `/dev/disk/by-*/` prefix.
const SYMLINK_MARKERS: &[&str] = &[
	"/dev/disk/",
	"/dev/mapper/",
	"lvm-pv-uuid",
	"dm-uuid",
	"wwn-",
	"pci-",
];

/// Whether any accept pattern in `filter` or `global_filter` names a symlink.
///
/// This is a plain substring scan over the raw pattern text; nothing is
/// compiled, and entries that are not strings or not accept patterns are
/// ignored.
pub fn contains_symlink(config: &DevicesConfig) -> bool {
	list_contains_symlink(&config.filter) || list_contains_symlink(&config.global_filter)
}

fn list_contains_symlink(values: &[Value]) -> bool {
	values
		.iter()
		.filter_map(Value::as_str)
		.filter(|pattern| pattern.starts_with('a'))
		.any(|pattern| SYMLINK_MARKERS.iter().any(|marker| pattern.contains(*marker)))
}
