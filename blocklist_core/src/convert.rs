use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;

use crate::BlocklistResult;
use crate::Headers;
use crate::OutputFormat;
use crate::Processor;
use crate::Rule;
use crate::RuleKind;
use crate::Scheme;
use crate::SchemeOutcome;
use crate::SchemeResolver;
use crate::apply_processors;
use crate::files;

/// Per-task conversion settings, the `data` section of a build task.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConversionData {
	/// Header block written before any rule, with a `{now}` placeholder.
	pub headers: Option<Headers>,
	/// Ordered value rewrites. At most one applies to each rule.
	pub processors: Vec<Processor>,
	/// Scheme definitions keyed by scheme name.
	pub schemes: BTreeMap<String, Scheme>,
}

/// A single build task: convert `source` into `publish` using `format`.
#[derive(Debug, Clone, Deserialize)]
pub struct BuildTask {
	pub source: PathBuf,
	pub publish: PathBuf,
	#[serde(default, rename = "type")]
	pub format: OutputFormat,
	#[serde(default)]
	pub data: ConversionData,
}

/// Counts collected while converting one source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConversionStats {
	/// Lines written, excluding the header.
	pub emitted: usize,
	/// Rules that produced no output.
	pub skipped: usize,
}

/// The output of converting one source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conversion {
	pub output: String,
	pub stats: ConversionStats,
}

/// Summary of a finished build task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutcome {
	pub source: PathBuf,
	pub publish: PathBuf,
	pub format: OutputFormat,
	pub stats: ConversionStats,
}

/// Convert the rule lines in `input` into `format`.
///
/// Conversion runs in two phases. The stream phase walks the input in order,
/// rewriting each rule through the processors and the scheme table and
/// emitting it right away. Grouped scheme rules are only buffered; the flush
/// phase packs them and emits the packed lines after all other output.
///
/// `path` labels rules in log messages. `now` fills the header's `{now}`
/// placeholder.
pub fn convert(
	input: &str,
	path: &str,
	format: OutputFormat,
	data: &ConversionData,
	now: DateTime<Utc>,
) -> Conversion {
	let mut conversion = Conversion::default();

	if let Some(headers) = &data.headers {
		conversion.output.push_str(&format.render_header(headers, now));
		conversion.output.push('\n');
	}

	let mut resolver = SchemeResolver::new(&data.schemes);

	for rule in files::parse_rules(input, path) {
		if rule.value().is_empty() {
			continue;
		}
		if rule.is_invalid() {
			tracing::warn!(location = %rule.location(), "rule \"{}\" is invalid and was skipped", rule.value());
			conversion.stats.skipped += 1;
			continue;
		}

		let rule = apply_processors(rule, &data.processors);

		let rule = if format.allows_schemes() {
			match resolver.resolve(rule) {
				SchemeOutcome::Emit(rule) => rule,
				SchemeOutcome::Buffered => continue,
				SchemeOutcome::Dropped => {
					conversion.stats.skipped += 1;
					continue;
				}
			}
		} else {
			rule
		};

		if format.allows_schemes() && matches!(rule.kind(), RuleKind::Scheme { .. }) {
			tracing::warn!(location = %rule.location(), "rule \"{}\" is still a scheme rule after rewriting", rule.value());
			conversion.stats.skipped += 1;
			continue;
		}

		emit(&mut conversion, format, &rule);
	}

	for rule in resolver.flush() {
		emit(&mut conversion, format, &rule);
	}

	conversion
}

fn emit(conversion: &mut Conversion, format: OutputFormat, rule: &Rule) {
	if rule.is_invalid() {
		tracing::warn!(location = %rule.location(), "rule \"{}\" is invalid after rewriting and was skipped", rule.value());
		conversion.stats.skipped += 1;
		return;
	}

	match format.render(rule) {
		Some(line) => {
			conversion.output.push_str(&line);
			conversion.output.push('\n');
			conversion.stats.emitted += 1;
		}
		None => {
			tracing::debug!(location = %rule.location(), format = %format, "rule \"{}\" is not supported by the output format", rule.value());
			conversion.stats.skipped += 1;
		}
	}
}

/// Read the task's source, convert it and write the publish file.
pub fn run_build_task(
	task: &BuildTask,
	root: &Path,
	now: DateTime<Utc>,
) -> BlocklistResult<BuildOutcome> {
	let source = files::resolve_path(root, &task.source);
	let publish = files::resolve_path(root, &task.publish);
	let rel_path = files::display_path(root, &source);

	tracing::info!(
		"building \"{}\" as {} to \"{}\"",
		rel_path,
		task.format,
		files::display_path(root, &publish)
	);

	let input = files::read_text(&source)?;
	let conversion = convert(&input, &rel_path, task.format, &task.data, now);
	files::write_text(&publish, &conversion.output)?;

	Ok(BuildOutcome {
		source,
		publish,
		format: task.format,
		stats: conversion.stats,
	})
}
