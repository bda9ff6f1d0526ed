use std::fmt;
use std::net::Ipv4Addr;
use std::net::Ipv6Addr;

use serde::Deserialize;
use serde::Serialize;

/// The classified content of a rule value.
///
/// Classification is evaluated in precedence order: regex, scheme, ipv6,
/// ipv4, domain. A value matching none of them is [`RuleKind::None`], which is
/// only well-formed when the value is empty.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RuleKind {
	/// An empty value, or a non-empty value that is not recognized.
	None,
	/// A domain such as `example.com` or `*.example.com`.
	Domain,
	/// An IPv4 literal.
	Ipv4,
	/// A bracketed IPv6 literal such as `[::1]`.
	Ipv6,
	/// A `/pattern/flags` rule. The pattern is not compiled.
	Regex { pattern: String, flags: String },
	/// A `scheme:value` rule.
	Scheme { name: String, value: String },
	/// Opaque output text that bypasses classification.
	Raw,
}

impl RuleKind {
	/// The fieldless type of this kind, or `None` for an empty or invalid
	/// rule.
	pub fn rule_type(&self) -> Option<RuleType> {
		match self {
			Self::None => None,
			Self::Domain => Some(RuleType::Domain),
			Self::Ipv4 => Some(RuleType::Ipv4),
			Self::Ipv6 => Some(RuleType::Ipv6),
			Self::Regex { .. } => Some(RuleType::Regex),
			Self::Scheme { .. } => Some(RuleType::Scheme),
			Self::Raw => Some(RuleType::Raw),
		}
	}
}

/// Rule type names as they appear in configuration (`type: domain`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleType {
	Domain,
	Ipv4,
	Ipv6,
	Regex,
	Scheme,
	Raw,
}

impl fmt::Display for RuleType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			Self::Domain => "domain",
			Self::Ipv4 => "ipv4",
			Self::Ipv6 => "ipv6",
			Self::Regex => "regex",
			Self::Scheme => "scheme",
			Self::Raw => "raw",
		};
		write!(f, "{name}")
	}
}

/// How a computed value is assigned back to a rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignMode {
	/// Reclassify the rule from the new value.
	#[default]
	Classify,
	/// Force the new value as raw output text.
	Raw,
}

/// One line of a rule file.
///
/// A line is split into `value`, `separator` and `comment`, where `value` is
/// the leading run of non-whitespace characters and `separator` the run of
/// whitespace after it. For an unmodified rule, [`Rule::text`] reconstructs
/// the original line.
///
/// Rules are immutable: [`Rule::with_value`] and [`Rule::with_raw_value`]
/// return a new rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
	input: String,
	path: String,
	line: Option<usize>,
	value: String,
	separator: String,
	comment: String,
	kind: RuleKind,
}

impl Default for Rule {
	fn default() -> Self {
		Self::parse("")
	}
}

impl Rule {
	/// Parse a rule line without provenance.
	pub fn parse(input: impl Into<String>) -> Self {
		Self::parse_at(input, ".", None)
	}

	/// Parse a rule line read from `path` at the 1-indexed `line`.
	pub fn parse_at(input: impl Into<String>, path: impl Into<String>, line: Option<usize>) -> Self {
		let input = input.into();
		let (value, separator, comment) = split_line(&input);
		let value = value.to_string();
		let separator = separator.to_string();
		let comment = comment.to_string();
		let kind = classify(&value);

		Self {
			input,
			path: path.into(),
			line,
			value,
			separator,
			comment,
			kind,
		}
	}

	/// Return this rule with a new value, reclassified.
	#[must_use]
	pub fn with_value(self, value: impl Into<String>) -> Self {
		let value = value.into();
		let kind = classify(&value);
		Self {
			value,
			kind,
			..self
		}
	}

	/// Return this rule with `value` forced as raw output. An empty value
	/// yields [`RuleKind::None`].
	#[must_use]
	pub fn with_raw_value(self, value: impl Into<String>) -> Self {
		let value = value.into();
		let kind = if value.is_empty() {
			RuleKind::None
		} else {
			RuleKind::Raw
		};
		Self {
			value,
			kind,
			..self
		}
	}

	/// Assign a value according to `mode`.
	#[must_use]
	pub fn assign(self, value: impl Into<String>, mode: AssignMode) -> Self {
		match mode {
			AssignMode::Classify => self.with_value(value),
			AssignMode::Raw => self.with_raw_value(value),
		}
	}

	/// The original input line.
	pub fn input(&self) -> &str {
		&self.input
	}

	/// The source path (or URL) this rule was read from.
	pub fn path(&self) -> &str {
		&self.path
	}

	/// The 1-indexed source line, if known.
	pub fn line(&self) -> Option<usize> {
		self.line
	}

	pub fn value(&self) -> &str {
		&self.value
	}

	pub fn separator(&self) -> &str {
		&self.separator
	}

	pub fn comment(&self) -> &str {
		&self.comment
	}

	pub fn kind(&self) -> &RuleKind {
		&self.kind
	}

	/// `value + separator + comment`.
	pub fn text(&self) -> String {
		format!("{}{}{}", self.value, self.separator, self.comment)
	}

	/// Whether the value is non-empty but could not be classified.
	pub fn is_invalid(&self) -> bool {
		self.kind == RuleKind::None && !self.value.is_empty()
	}

	/// `path:line` for diagnostics.
	pub fn location(&self) -> String {
		match self.line {
			Some(line) => format!("{}:{line}", self.path),
			None => self.path.clone(),
		}
	}
}

fn split_line(input: &str) -> (&str, &str, &str) {
	let value_end = input.find(char::is_whitespace).unwrap_or(input.len());
	let (value, rest) = input.split_at(value_end);
	let separator_end = rest
		.find(|c: char| !c.is_whitespace())
		.unwrap_or(rest.len());
	let (separator, comment) = rest.split_at(separator_end);
	(value, separator, comment)
}

/// Classify a rule value.
pub fn classify(value: &str) -> RuleKind {
	if let Some((pattern, flags)) = match_regex_rule(value) {
		return RuleKind::Regex {
			pattern: pattern.to_string(),
			flags: flags.to_string(),
		};
	}

	if let Some((name, rest)) = match_scheme_rule(value) {
		return RuleKind::Scheme {
			name: name.to_string(),
			value: rest.to_string(),
		};
	}

	// A bracketed value is never a domain, so stop here either way.
	if let Some(inner) = value.strip_prefix('[').and_then(|v| v.strip_suffix(']')) {
		return if inner.parse::<Ipv6Addr>().is_ok() {
			RuleKind::Ipv6
		} else {
			RuleKind::None
		};
	}

	if value.parse::<Ipv4Addr>().is_ok() {
		return RuleKind::Ipv4;
	}

	if is_domain(value) {
		return RuleKind::Domain;
	}

	RuleKind::None
}

/// `/<pattern>/<flags>` where flags are lowercase ASCII letters.
fn match_regex_rule(value: &str) -> Option<(&str, &str)> {
	let body = value.strip_prefix('/')?;
	let slash = body.rfind('/')?;
	let (pattern, flags) = (&body[..slash], &body[slash + 1..]);
	flags
		.bytes()
		.all(|b| b.is_ascii_lowercase())
		.then_some((pattern, flags))
}

/// `<scheme>:<rest>` where the scheme is a lowercase letter followed by at
/// least one of `[0-9a-z+.-]`.
fn match_scheme_rule(value: &str) -> Option<(&str, &str)> {
	let (name, rest) = value.split_once(':')?;
	let mut bytes = name.bytes();
	let first = bytes.next()?;
	if !first.is_ascii_lowercase() || name.len() < 2 {
		return None;
	}

	bytes
		.all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || matches!(b, b'+' | b'.' | b'-'))
		.then_some((name, rest))
}

fn is_domain(value: &str) -> bool {
	!value.is_empty()
		&& value.split('.').all(|segment| {
			!segment.is_empty()
				&& segment
					.bytes()
					.all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || matches!(b, b'*' | b'-'))
		})
}
