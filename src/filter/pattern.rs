use crate::error::PatternError;

/// Whether a matching pattern makes a device visible or hides it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
	Accept,
	Reject,
}

impl Polarity {
	/// Map the leading marker character of a pattern to its polarity.
	pub fn from_marker(marker: char) -> Option<Self> {
		match marker {
			'a' => Some(Polarity::Accept),
			'r' => Some(Polarity::Reject),
			_ => None,
		}
	}
}

/// A parsed filter pattern: `<a|r><sep><regex><sep>`.
///
/// The separator after the polarity marker is either a bracket opener, in
/// which case the pattern must end with the matching closer, or any other
/// character, which must then also terminate the pattern. Only the final
/// character is checked, so the body may itself contain the separator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern<'a> {
	pub polarity: Polarity,
	pub regex: &'a str,
}

impl<'a> Pattern<'a> {
	/// Parse a pattern string such as `a|^/dev/sd.*|` or `r(loop)`.
	pub fn parse(input: &'a str) -> Result<Self, PatternError> {
		let mut chars = input.chars();

		let polarity = chars
			.next()
			.and_then(Polarity::from_marker)
			.ok_or(PatternError::InvalidPolarity)?;

		let Some(open) = chars.next() else {
			return Err(PatternError::UnterminatedPattern { expected: None });
		};
		let sep = closing_separator(open);

		let rest = chars.as_str();
		let Some(regex) = rest.strip_suffix(sep) else {
			return Err(PatternError::UnterminatedPattern {
				expected: Some(sep),
			});
		};

		Ok(Pattern { polarity, regex })
	}
}

/// Brackets close with their partner; anything else closes with itself.
fn closing_separator(open: char) -> char {
	match open {
		'(' => ')',
		'[' => ']',
		'{' => '}',
		other => other,
	}
}
