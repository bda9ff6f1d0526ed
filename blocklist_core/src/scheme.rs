use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::AssignMode;
use crate::BlocklistError;
use crate::Rule;
use crate::RuleKind;
use crate::Template;

/// The placeholder name used in scheme value templates.
pub const VALUE_PLACEHOLDER: &str = "value";

/// A named transformation applied to a scheme value before templating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Escaper {
	/// Escape regex metacharacters.
	Regex,
	/// Percent-encode everything except unreserved characters and `/`.
	Url,
}

impl Escaper {
	pub fn escape(self, value: &str) -> String {
		match self {
			Self::Regex => regex::escape(value),
			Self::Url => {
				value
					.split('/')
					.map(urlencoding::encode)
					.collect::<Vec<_>>()
					.join("/")
			}
		}
	}
}

impl FromStr for Escaper {
	type Err = BlocklistError;

	fn from_str(name: &str) -> Result<Self, Self::Err> {
		match name {
			"regex" => Ok(Self::Regex),
			"url" => Ok(Self::Url),
			other => Err(BlocklistError::UnknownEscaper(other.to_string())),
		}
	}
}

impl fmt::Display for Escaper {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Regex => write!(f, "regex"),
			Self::Url => write!(f, "url"),
		}
	}
}

/// A scheme entry as written in configuration.
///
/// ```yaml
/// schemes:
///   mailto:
///     escape: regex, url
///     grouping: '|'
///     value: '/^mailto:(?:{value})$/'
///     max: 4000
///     mode: raw
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SchemeConfig {
	/// Comma-separated escaper names, applied in order.
	#[serde(default)]
	pub escape: String,
	/// Separator joining grouped values. No grouping when absent or empty.
	#[serde(default)]
	pub grouping: Option<String>,
	/// Output template with a `{value}` placeholder.
	#[serde(default)]
	pub value: String,
	/// Maximum rendered length in characters.
	#[serde(default)]
	pub max: Option<usize>,
	#[serde(default)]
	pub mode: AssignMode,
}

/// A validated scheme definition.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "SchemeConfig")]
pub struct Scheme {
	escapers: Vec<Escaper>,
	grouping: Option<String>,
	template: Template,
	max: Option<usize>,
	mode: AssignMode,
}

impl TryFrom<SchemeConfig> for Scheme {
	type Error = BlocklistError;

	fn try_from(config: SchemeConfig) -> Result<Self, Self::Error> {
		let escapers = config
			.escape
			.split(',')
			.map(str::trim)
			.filter(|name| !name.is_empty())
			.map(str::parse)
			.collect::<Result<Vec<Escaper>, _>>()?;
		let template = Template::parse(&config.value, VALUE_PLACEHOLDER)?;

		Ok(Self {
			escapers,
			grouping: config.grouping.filter(|sep| !sep.is_empty()),
			template,
			max: config.max,
			mode: config.mode,
		})
	}
}

impl Scheme {
	pub fn escapers(&self) -> &[Escaper] {
		&self.escapers
	}

	pub fn grouping(&self) -> Option<&str> {
		self.grouping.as_deref()
	}

	pub fn template(&self) -> &Template {
		&self.template
	}

	pub fn max(&self) -> Option<usize> {
		self.max
	}

	pub fn mode(&self) -> AssignMode {
		self.mode
	}

	/// Run every escaper over `value` in order.
	pub fn escape(&self, value: &str) -> String {
		self.escapers
			.iter()
			.fold(value.to_string(), |value, escaper| escaper.escape(&value))
	}
}

/// What happened to a scheme rule passed to [`SchemeResolver::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemeOutcome {
	/// The rule was rewritten and should be emitted now.
	Emit(Rule),
	/// The rule was stored for grouping and is emitted by
	/// [`SchemeResolver::flush`].
	Buffered,
	/// The rule produces no output.
	Dropped,
}

/// An escaped value waiting in a group buffer, with the rule it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupItem {
	pub escaped: String,
	pub rule: Rule,
}

#[derive(Debug)]
struct SchemeGroup {
	name: String,
	items: Vec<GroupItem>,
}

/// Resolves scheme rules against the configured schemes for one conversion
/// task, buffering grouped schemes until [`SchemeResolver::flush`].
#[derive(Debug)]
pub struct SchemeResolver<'a> {
	schemes: &'a BTreeMap<String, Scheme>,
	groups: Vec<SchemeGroup>,
}

impl<'a> SchemeResolver<'a> {
	pub fn new(schemes: &'a BTreeMap<String, Scheme>) -> Self {
		Self {
			schemes,
			groups: Vec::new(),
		}
	}

	/// Handle a rule. Rules that are not of the scheme kind are returned
	/// unchanged as [`SchemeOutcome::Emit`].
	pub fn resolve(&mut self, rule: Rule) -> SchemeOutcome {
		let RuleKind::Scheme { name, value } = rule.kind() else {
			return SchemeOutcome::Emit(rule);
		};

		let Some(scheme) = self.schemes.get(name) else {
			tracing::warn!(location = %rule.location(), "rule \"{}\" has an undefined scheme", rule.value());
			return SchemeOutcome::Dropped;
		};

		if value.is_empty() {
			return SchemeOutcome::Dropped;
		}

		let escaped = scheme.escape(value);

		if scheme.grouping().is_some() {
			let name = name.clone();
			self.buffer(name, GroupItem { escaped, rule });
			return SchemeOutcome::Buffered;
		}

		let rendered = scheme.template().render(&escaped);
		if let Some(max) = scheme.max() {
			if rendered.chars().count() > max {
				tracing::warn!(location = %rule.location(), "rule \"{}\" exceeds max length {max}", rule.value());
				return SchemeOutcome::Dropped;
			}
		}

		SchemeOutcome::Emit(rule.assign(rendered, scheme.mode()))
	}

	fn buffer(&mut self, name: String, item: GroupItem) {
		match self.groups.iter_mut().find(|group| group.name == name) {
			Some(group) => group.items.push(item),
			None => {
				self.groups.push(SchemeGroup {
					name,
					items: vec![item],
				});
			}
		}
	}

	/// Pack every buffered group, in first-seen order, into synthetic rules.
	pub fn flush(self) -> Vec<Rule> {
		let mut rules = Vec::new();

		for group in self.groups {
			let Some(scheme) = self.schemes.get(&group.name) else {
				continue;
			};
			let separator = scheme.grouping().unwrap_or_default();
			let packed = pack_group(&group.items, separator, scheme.template(), scheme.max());

			rules.extend(
				packed
					.lines
					.into_iter()
					.map(|line| Rule::default().assign(line, scheme.mode())),
			);
		}

		rules
	}
}

/// The result of packing one scheme group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackedGroup {
	/// Rendered output lines, in item order.
	pub lines: Vec<String>,
	/// Items that did not fit within the max length on their own.
	pub dropped: Vec<Rule>,
}

/// Greedily pack `items` into the fewest rendered lines not exceeding `max`
/// characters. Without a max, everything is joined into one line.
///
/// Rendered length is assumed to be non-decreasing in the number of joined
/// items, so the longest fitting prefix is found by binary search.
pub fn pack_group(
	items: &[GroupItem],
	separator: &str,
	template: &Template,
	max: Option<usize>,
) -> PackedGroup {
	let render = |items: &[GroupItem]| {
		let joined = items
			.iter()
			.map(|item| item.escaped.as_str())
			.collect::<Vec<_>>()
			.join(separator);
		template.render(&joined)
	};

	let mut packed = PackedGroup::default();
	let Some(max) = max else {
		if !items.is_empty() {
			packed.lines.push(render(items));
		}
		return packed;
	};

	let fits = |line: &str| line.chars().count() <= max;
	let mut rest = items;

	while !rest.is_empty() {
		let whole = render(rest);
		if fits(&whole) {
			packed.lines.push(whole);
			break;
		}

		// The whole remainder does not fit, so the answer lies in
		// `0..rest.len()`. `low` always holds a fitting count (0 trivially).
		let mut low = 0;
		let mut high = rest.len() - 1;
		while low < high {
			let mid = low + (high - low).div_ceil(2);
			if fits(&render(&rest[..mid])) {
				low = mid;
			} else {
				high = mid - 1;
			}
		}

		if low == 0 {
			let item = &rest[0];
			tracing::warn!(location = %item.rule.location(), "rule \"{}\" exceeds max length {max}", item.rule.value());
			packed.dropped.push(item.rule.clone());
			rest = &rest[1..];
			continue;
		}

		packed.lines.push(render(&rest[..low]));
		rest = &rest[low..];
	}

	packed
}
