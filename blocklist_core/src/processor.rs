use regex::Regex;
use serde::Deserialize;

use crate::AssignMode;
use crate::BlocklistError;
use crate::Rule;
use crate::RuleType;

/// A processor entry as written in configuration.
///
/// ```yaml
/// processors:
///   - type: domain
///     pattern: '^www\.(.+)$'
///     replacement: '$1'
///   - find: 'ads.'
///     replacement: 'ads.example.com'
///     mode: raw
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProcessorConfig {
	/// Only rules of this type are considered. All types when absent.
	#[serde(default, rename = "type")]
	pub rule_type: Option<RuleType>,
	/// Literal substring the value must contain.
	#[serde(default)]
	pub find: Option<String>,
	/// Regex the value must match, and the substitution pattern.
	#[serde(default)]
	pub pattern: Option<String>,
	#[serde(default)]
	pub replacement: String,
	#[serde(default)]
	pub mode: AssignMode,
}

/// A processor with its pattern compiled.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "ProcessorConfig")]
pub struct Processor {
	rule_type: Option<RuleType>,
	find: Option<String>,
	pattern: Option<Regex>,
	replacement: String,
	mode: AssignMode,
}

impl TryFrom<ProcessorConfig> for Processor {
	type Error = BlocklistError;

	fn try_from(config: ProcessorConfig) -> Result<Self, Self::Error> {
		let pattern = config
			.pattern
			.map(|pattern| {
				Regex::new(&pattern).map_err(|e| {
					BlocklistError::InvalidPattern {
						pattern: pattern.clone(),
						reason: e.to_string(),
					}
				})
			})
			.transpose()?;

		Ok(Self {
			rule_type: config.rule_type,
			find: config.find,
			pattern,
			replacement: config.replacement,
			mode: config.mode,
		})
	}
}

impl Processor {
	pub fn mode(&self) -> AssignMode {
		self.mode
	}

	/// Compute the rewritten value for `rule`, or `None` when this processor
	/// does not apply.
	pub fn rewrite(&self, rule: &Rule) -> Option<String> {
		if let Some(rule_type) = self.rule_type {
			if rule.kind().rule_type() != Some(rule_type) {
				return None;
			}
		}

		let value = rule.value();
		if let Some(find) = &self.find {
			if !value.contains(find.as_str()) {
				return None;
			}
		} else if let Some(pattern) = &self.pattern {
			if !pattern.is_match(value) {
				return None;
			}
		}

		let rewritten = match &self.pattern {
			Some(pattern) => pattern.replace_all(value, self.replacement.as_str()).into_owned(),
			None => self.replacement.clone(),
		};

		Some(rewritten)
	}
}

/// Apply the first matching processor to `rule`. Later processors never see
/// the rewritten value.
pub fn apply_processors(rule: Rule, processors: &[Processor]) -> Rule {
	for processor in processors {
		if let Some(value) = processor.rewrite(&rule) {
			tracing::debug!(rule = rule.value(), new = value.as_str(), "rule rewritten by processor");
			return rule.assign(value, processor.mode);
		}
	}

	rule
}
