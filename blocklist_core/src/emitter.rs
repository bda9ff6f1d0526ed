use std::fmt;

use chrono::DateTime;
use chrono::SecondsFormat;
use chrono::Utc;
use serde::Deserialize;

use crate::BlocklistError;
use crate::Rule;
use crate::RuleKind;
use crate::Template;

/// The placeholder name used in header templates.
pub const NOW_PLACEHOLDER: &str = "now";

/// Output formats a source file can be converted to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[non_exhaustive]
pub enum OutputFormat {
	/// The canonical blocklist format: rules are printed unchanged.
	#[default]
	#[serde(rename = "cft")]
	Canonical,
	/// A hosts file. Only plain domains and raw rules are supported.
	#[serde(rename = "hosts")]
	Hosts,
	/// A uBlock Origin static filter list.
	#[serde(rename = "ubo")]
	FilterList,
	/// A uBlacklist match-pattern list.
	#[serde(rename = "ublacklist")]
	UrlBlock,
}

impl fmt::Display for OutputFormat {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			Self::Canonical => "cft",
			Self::Hosts => "hosts",
			Self::FilterList => "ubo",
			Self::UrlBlock => "ublacklist",
		};
		write!(f, "{name}")
	}
}

impl OutputFormat {
	/// Whether scheme rules are resolved through the scheme table. When
	/// disabled, scheme rules reach the emitter untouched.
	pub fn allows_schemes(self) -> bool {
		!matches!(self, Self::Hosts)
	}

	/// Prefix for each header line, in the format's comment syntax.
	pub fn header_prefix(self) -> &'static str {
		match self {
			Self::Canonical => "  # ",
			Self::FilterList => "! ",
			Self::Hosts | Self::UrlBlock => "# ",
		}
	}

	/// Render the header block, without a trailing newline.
	pub fn render_header(self, headers: &Headers, now: DateTime<Utc>) -> String {
		let now = now.to_rfc3339_opts(SecondsFormat::Secs, false);
		let prefix = self.header_prefix();
		headers
			.0
			.render(&now)
			.trim_end_matches('\n')
			.split('\n')
			.map(|line| format!("{prefix}{line}"))
			.collect::<Vec<_>>()
			.join("\n")
	}

	/// Render one rule as an output line, or `None` when the format does not
	/// support it.
	pub fn render(self, rule: &Rule) -> Option<String> {
		match self {
			Self::Canonical => Some(rule.text()),
			Self::Hosts => render_hosts(rule),
			Self::FilterList => render_filter_list(rule),
			Self::UrlBlock => render_url_block(rule),
		}
	}
}

/// A header template with a `{now}` placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct Headers(Template);

impl TryFrom<String> for Headers {
	type Error = BlocklistError;

	fn try_from(source: String) -> Result<Self, Self::Error> {
		Template::parse(&source, NOW_PLACEHOLDER).map(Self)
	}
}

fn render_hosts(rule: &Rule) -> Option<String> {
	let supported = match rule.kind() {
		RuleKind::Domain => !rule.value().contains('*'),
		RuleKind::Raw => true,
		_ => false,
	};
	if !supported {
		return None;
	}

	Some(format!("127.0.0.1 {}{}", rule.value(), reattach_comment(rule.comment())))
}

fn render_filter_list(rule: &Rule) -> Option<String> {
	let value = rule.value();
	match rule.kind() {
		RuleKind::Regex { .. } => Some(format!("{value}$document")),
		RuleKind::Domain | RuleKind::Ipv4 | RuleKind::Ipv6 => {
			if value.contains('*') {
				Some(format!("||{value}^$document"))
			} else {
				Some(format!("||{value}^"))
			}
		}
		RuleKind::Raw => Some(value.to_string()),
		_ => None,
	}
}

fn render_url_block(rule: &Rule) -> Option<String> {
	let value = rule.value();
	let comment = reattach_comment(rule.comment());
	match rule.kind() {
		RuleKind::Regex { pattern, flags } => {
			Some(format!("/{}/{flags}{comment}", escape_regex_slash(pattern)))
		}
		RuleKind::Ipv4 | RuleKind::Ipv6 => Some(format!("*://{value}/*{comment}")),
		// Match patterns only allow `*.` at the start of the host, so any
		// other wildcard becomes a regex rule.
		RuleKind::Domain if value.contains('*') => {
			let domain = regex::escape(value).replace(r"\*", r"[\w.-]*");
			Some(format!(
				r"/https?:\/\/(?:[\w-]+\.)*(?:{domain})(?=[:\/?#]|$)/{comment}"
			))
		}
		RuleKind::Domain => Some(format!("*://*.{value}/*{comment}")),
		RuleKind::Raw => Some(format!("{value}{comment}")),
		_ => None,
	}
}

/// Re-attach a comment as `  #<text>`, dropping a leading `//` or `#`
/// marker.
fn reattach_comment(comment: &str) -> String {
	if comment.is_empty() {
		return String::new();
	}

	let trimmed = comment.trim_start();
	let text = trimmed
		.strip_prefix("//")
		.or_else(|| trimmed.strip_prefix('#'))
		.unwrap_or(comment);
	format!("  #{text}")
}

/// Escape every `/` in a regex pattern that is not already escaped.
pub fn escape_regex_slash(pattern: &str) -> String {
	let mut result = String::with_capacity(pattern.len());
	let mut chars = pattern.chars();

	while let Some(c) = chars.next() {
		match c {
			'\\' => {
				result.push('\\');
				if let Some(next) = chars.next() {
					result.push(next);
				}
			}
			'/' => result.push_str(r"\/"),
			c => result.push(c),
		}
	}

	result
}
