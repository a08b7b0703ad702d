use crate::error::{FilterError, Result};
use crate::filter::pattern::{Pattern, Polarity};
use regex::RegexSet;
use toml::Value;
use tracing::debug;

/// Fixed-size bitmap recording which compiled patterns accept.
///
/// Bit `i` set means pattern `i` of the matcher is an accept pattern; clear
/// means reject. The size always equals the number of compiled patterns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolarityBitmap {
	words: Vec<u64>,
	len: usize,
}

impl PolarityBitmap {
	/// Create a bitmap of `len` reject entries.
	fn try_with_len(len: usize) -> Result<Self> {
		let mut words = Vec::new();
		words
			.try_reserve_exact(len.div_ceil(64))
			.map_err(|source| FilterError::Allocation { count: len, source })?;
		words.resize(len.div_ceil(64), 0);
		Ok(PolarityBitmap { words, len })
	}

	fn set(&mut self, ix: usize, polarity: Polarity) {
		let mask = 1u64 << (ix % 64);
		match polarity {
			Polarity::Accept => self.words[ix / 64] |= mask,
			Polarity::Reject => self.words[ix / 64] &= !mask,
		}
	}

	/// Polarity of the pattern at `ix`.
	pub fn get(&self, ix: usize) -> Polarity {
		if self.words[ix / 64] & (1u64 << (ix % 64)) != 0 {
			Polarity::Accept
		} else {
			Polarity::Reject
		}
	}

	pub fn len(&self) -> usize {
		self.len
	}

	pub fn is_empty(&self) -> bool {
		self.len == 0
	}
}

/// A rule set compiled into a single multi-pattern matcher.
///
/// Patterns are stored in reverse declaration order, so the last declared
/// rule sits at index 0. The matcher reports the lowest matching index, which
/// makes later rules take precedence over earlier ones.
#[derive(Debug, Clone)]
pub struct CompiledRules {
	matcher: RegexSet,
	accept: PolarityBitmap,
}

impl CompiledRules {
	/// Index of the highest-precedence pattern matching `alias`.
	///
	/// Matching is an unanchored search; patterns use `^` and `$` to pin the
	/// start or end of the alias.
	pub fn first_match(&self, alias: &str) -> Option<usize> {
		self.matcher.matches(alias).iter().next()
	}

	/// Polarity of the highest-precedence pattern matching `alias`.
	pub fn polarity_of(&self, alias: &str) -> Option<Polarity> {
		self.first_match(alias).map(|ix| self.accept.get(ix))
	}

	pub fn bitmap(&self) -> &PolarityBitmap {
		&self.accept
	}

	/// Number of compiled patterns.
	pub fn len(&self) -> usize {
		self.matcher.len()
	}

	pub fn is_empty(&self) -> bool {
		self.matcher.is_empty()
	}
}

/// Borrow every entry of a pattern list as a string.
///
/// Fails on the first entry that is not a TOML string.
pub fn pattern_strs<'a>(list: &'static str, values: &'a [Value]) -> Result<Vec<&'a str>> {
	values
		.iter()
		.enumerate()
		.map(|(index, value)| {
			value.as_str().ok_or(FilterError::ConfigFormat {
				list,
				index,
				found: value.type_str(),
			})
		})
		.collect()
}

/// Compile an ordered pattern list into a matcher and polarity bitmap.
///
/// Compilation is all-or-nothing: a single bad entry fails the whole list.
/// The regex bodies only live in a scratch buffer for the duration of this
/// call.
pub fn compile_patterns(list: &'static str, values: &[Value]) -> Result<CompiledRules> {
	let raw = pattern_strs(list, values)?;
	let count = raw.len();

	let mut regexes: Vec<&str> = Vec::new();
	regexes
		.try_reserve_exact(count)
		.map_err(|source| FilterError::Allocation { count, source })?;
	regexes.resize(count, "");

	let mut accept = PolarityBitmap::try_with_len(count)?;

	// Fill back to front: the matcher prefers low indexes, the config
	// prefers later entries.
	for (i, pattern) in raw.iter().copied().enumerate() {
		let ix = count - 1 - i;
		let parsed = Pattern::parse(pattern).map_err(|source| FilterError::InvalidPattern {
			pattern: pattern.to_string(),
			source,
		})?;
		accept.set(ix, parsed.polarity);
		regexes[ix] = parsed.regex;
	}

	let matcher = RegexSet::new(&regexes)
		.map_err(|source| FilterError::MatcherCompilation { count, source })?;

	debug!(list, count, "compiled filter patterns");

	Ok(CompiledRules { matcher, accept })
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::PatternError;

	fn values(patterns: &[&str]) -> Vec<Value> {
		patterns.iter().map(|p| Value::from(*p)).collect()
	}

	#[test]
	fn test_pattern_count_matches_entries() {
		let rules = compile_patterns("filter", &values(&["a|sda|", "r|sdb|", "a(sdc)"])).unwrap();
		assert_eq!(rules.len(), 3);
		assert_eq!(rules.bitmap().len(), 3);
	}

	#[test]
	fn test_precedence_inverted_in_bitmap() {
		let rules = compile_patterns("filter", &values(&["a|x|", "r|y|"])).unwrap();
		// Last declared rule lands at index 0.
		assert_eq!(rules.bitmap().get(0), Polarity::Reject);
		assert_eq!(rules.bitmap().get(1), Polarity::Accept);
	}

	#[test]
	fn test_later_rule_wins() {
		let declared = values(&["a(^/dev/sda$)", "r(^/dev/sda$)"]);
		let rules = compile_patterns("filter", &declared).unwrap();
		assert_eq!(rules.first_match("/dev/sda"), Some(0));
		assert_eq!(rules.polarity_of("/dev/sda"), Some(Polarity::Reject));

		let declared = values(&["r(^/dev/sda$)", "a(^/dev/sda$)"]);
		let rules = compile_patterns("filter", &declared).unwrap();
		assert_eq!(rules.polarity_of("/dev/sda"), Some(Polarity::Accept));
	}

	#[test]
	fn test_overlapping_patterns_lowest_index_wins() {
		let declared = values(&["r|.*|", "a|^/dev/sd|", "r|^/dev/sdb|"]);
		let rules = compile_patterns("filter", &declared).unwrap();
		assert_eq!(rules.polarity_of("/dev/sdb"), Some(Polarity::Reject));
		assert_eq!(rules.polarity_of("/dev/sda"), Some(Polarity::Accept));
		assert_eq!(rules.polarity_of("/dev/loop0"), Some(Polarity::Reject));
	}

	#[test]
	fn test_match_is_unanchored_search() {
		let rules = compile_patterns("filter", &values(&["a|sda|"])).unwrap();
		assert_eq!(rules.first_match("/dev/sda1"), Some(0));

		let anchored = compile_patterns("filter", &values(&["a|^/dev/sda$|"])).unwrap();
		assert_eq!(anchored.first_match("/dev/sda1"), None);
		assert_eq!(anchored.first_match("/dev/sda"), Some(0));
	}

	#[test]
	fn test_empty_list_matches_nothing() {
		let rules = compile_patterns("filter", &[]).unwrap();
		assert!(rules.is_empty());
		assert!(rules.bitmap().is_empty());
		assert_eq!(rules.first_match("/dev/sda"), None);
	}

	#[test]
	fn test_bitmap_spans_words() {
		let patterns: Vec<String> = (0..70)
			.map(|i| if i % 2 == 0 { format!("a|^d{i}$|") } else { format!("r|^d{i}$|") })
			.collect();
		let vals: Vec<Value> = patterns.iter().map(|p| Value::from(p.as_str())).collect();
		let rules = compile_patterns("filter", &vals).unwrap();

		assert_eq!(rules.bitmap().len(), 70);
		assert_eq!(rules.polarity_of("d68"), Some(Polarity::Accept));
		assert_eq!(rules.polarity_of("d69"), Some(Polarity::Reject));
		assert_eq!(rules.polarity_of("d0"), Some(Polarity::Accept));
	}

	#[test]
	fn test_non_string_entry() {
		let vals = vec![Value::from("a|x|"), Value::from(true)];
		match compile_patterns("global_filter", &vals).unwrap_err() {
			FilterError::ConfigFormat { list, index, found } => {
				assert_eq!(list, "global_filter");
				assert_eq!(index, 1);
				assert_eq!(found, "boolean");
			}
			other => panic!("Expected ConfigFormat error, got {other:?}"),
		}
	}

	#[test]
	fn test_bad_pattern_fails_whole_list() {
		let result = compile_patterns("filter", &values(&["a|ok|", "x|bad|", "r|ok2|"]));
		match result.unwrap_err() {
			FilterError::InvalidPattern { pattern, source } => {
				assert_eq!(pattern, "x|bad|");
				assert_eq!(source, PatternError::InvalidPolarity);
			}
			other => panic!("Expected InvalidPattern error, got {other:?}"),
		}
	}

	#[test]
	fn test_invalid_regex_body() {
		let result = compile_patterns("filter", &values(&["a|[invalid|"]));
		assert!(matches!(
			result.unwrap_err(),
			FilterError::MatcherCompilation { count: 1, .. }
		));
	}
}
