use std::collections::TryReserveError;
use std::path::PathBuf;

/// Library-level structured errors for devfilter.
///
/// Use `thiserror` for structured errors that library consumers can match on.
/// The CLI binary wraps these with `anyhow` for rich context chains.
#[derive(Debug, thiserror::Error)]
pub enum FilterError {
	#[error("Failed to read config file: {path}")]
	ConfigReadError {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("Failed to parse config file: {path}")]
	ConfigParseError {
		path: PathBuf,
		#[source]
		source: toml::de::Error,
	},

	#[error("Filter patterns must be strings: {list}[{index}] is a {found}")]
	ConfigFormat {
		list: &'static str,
		index: usize,
		found: &'static str,
	},

	#[error("Invalid filter pattern \"{pattern}\"")]
	InvalidPattern {
		pattern: String,
		#[source]
		source: PatternError,
	},

	#[error("Failed to allocate space for {count} filter patterns")]
	Allocation {
		count: usize,
		#[source]
		source: TryReserveError,
	},

	#[error("Failed to build regex matcher from {count} filter patterns")]
	MatcherCompilation {
		count: usize,
		#[source]
		source: regex::Error,
	},
}

/// Reasons a single `a|...|` / `r|...|` pattern string fails to parse.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatternError {
	#[error("Pattern must begin with 'a' or 'r'")]
	InvalidPolarity,

	/// `expected` is the separator the pattern should end with, if the
	/// pattern got far enough to name one.
	#[error("Invalid separator at end of regex")]
	UnterminatedPattern { expected: Option<char> },
}

/// Result type alias using FilterError.
pub type Result<T> = std::result::Result<T, FilterError>;
