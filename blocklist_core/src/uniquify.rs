use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::path::PathBuf;

use regex::Regex;
use serde::Deserialize;

use crate::BlocklistResult;
use crate::Rule;
use crate::RuleKind;
use crate::files;

/// Options for [`uniquify_files`]. Deserialized from `auto_tasks` kwargs.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UniquifyOptions {
	/// Files or directories to check. Falls back to `uniquify.source` when
	/// empty.
	pub files: Vec<PathBuf>,
	/// Detect duplicates across all files instead of per file.
	pub cross_files: bool,
	/// Rewrite files whose rules changed.
	pub auto_fix: bool,
	/// Files never rewritten by auto fix.
	pub auto_fix_excludes: Vec<PathBuf>,
	/// Strip trailing line endings of fixed files.
	pub strip_eol: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UniquifyIssueKind {
	/// The value already appeared at `first`.
	Duplicate { first: String },
	/// The domain is matched by the domain rule `by` at `location`.
	Covered { by: String, location: String },
}

/// A redundant rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniquifyIssue {
	/// `path:line` of the redundant rule.
	pub location: String,
	pub value: String,
	pub kind: UniquifyIssueKind,
}

impl UniquifyIssue {
	pub fn message(&self) -> String {
		match &self.kind {
			UniquifyIssueKind::Duplicate { first } => {
				format!("rule \"{}\" duplicates {first}", self.value)
			}
			UniquifyIssueKind::Covered { by, location } => {
				format!("rule \"{}\" is covered by \"{by}\" at {location}", self.value)
			}
		}
	}
}

impl fmt::Display for UniquifyIssue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}: {}", self.location, self.message())
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UniquifyReport {
	pub files: Vec<PathBuf>,
	pub issues: Vec<UniquifyIssue>,
	pub fixed_files: Vec<PathBuf>,
}

impl UniquifyReport {
	pub fn is_clean(&self) -> bool {
		self.issues.is_empty()
	}
}

/// Remove later occurrences of non-empty values, recording an issue for each.
pub fn deduplicate_rules(rules: Vec<Rule>, issues: &mut Vec<UniquifyIssue>) -> Vec<Rule> {
	let mut seen: HashMap<String, String> = HashMap::new();
	let mut kept = Vec::with_capacity(rules.len());

	for rule in rules {
		if rule.value().is_empty() {
			kept.push(rule);
			continue;
		}

		if let Some(first) = seen.get(rule.value()) {
			let issue = UniquifyIssue {
				location: rule.location(),
				value: rule.value().to_string(),
				kind: UniquifyIssueKind::Duplicate {
					first: first.clone(),
				},
			};
			tracing::debug!("{issue}");
			issues.push(issue);
			continue;
		}

		seen.insert(rule.value().to_string(), rule.location());
		kept.push(rule);
	}

	kept
}

/// The pattern of domains covered by `domain`, including its subdomains.
pub fn coverage_pattern(domain: &str) -> Option<Regex> {
	let domain = regex::escape(domain).replace(r"\*", r"[\w*-]*");
	Regex::new(&format!(r"^(?:[\w*-]+\.)*{domain}$")).ok()
}

/// Remove domain rules covered by another domain rule, recording an issue
/// for each covering rule.
pub fn remove_covered_rules(rules: Vec<Rule>, issues: &mut Vec<UniquifyIssue>) -> Vec<Rule> {
	let coverers: Vec<(&Rule, Regex)> = rules
		.iter()
		.filter(|rule| *rule.kind() == RuleKind::Domain)
		.filter_map(|rule| coverage_pattern(rule.value()).map(|pattern| (rule, pattern)))
		.collect();

	let mut covered = vec![false; rules.len()];
	for (index, rule) in rules.iter().enumerate() {
		if *rule.kind() != RuleKind::Domain {
			continue;
		}

		for (coverer, pattern) in &coverers {
			let is_self = coverer.path() == rule.path() && coverer.line() == rule.line();
			if is_self || !pattern.is_match(rule.value()) {
				continue;
			}

			let issue = UniquifyIssue {
				location: rule.location(),
				value: rule.value().to_string(),
				kind: UniquifyIssueKind::Covered {
					by: coverer.value().to_string(),
					location: coverer.location(),
				},
			};
			tracing::debug!("{issue}");
			issues.push(issue);
			covered[index] = true;
		}
	}

	drop(coverers);
	rules
		.into_iter()
		.zip(covered)
		.filter_map(|(rule, covered)| (!covered).then_some(rule))
		.collect()
}

fn uniquify_rules(rules: Vec<Rule>, issues: &mut Vec<UniquifyIssue>) -> Vec<Rule> {
	let rules = deduplicate_rules(rules, issues);
	remove_covered_rules(rules, issues)
}

/// Find duplicate and covered rules in `sources`, relative to `root`.
pub fn uniquify_files(
	root: &Path,
	sources: &[PathBuf],
	options: &UniquifyOptions,
) -> BlocklistResult<UniquifyReport> {
	let mut report = UniquifyReport::default();

	let mut loaded = Vec::new();
	for path in files::collect_rule_files(root, sources)? {
		let rel_path = files::display_path(root, &path);
		let content = files::read_text(&path)?;
		let rules = files::parse_rules(&content, &rel_path);
		loaded.push((path, rel_path, rules));
	}

	let results: Vec<Vec<Rule>> = if options.cross_files {
		let all = loaded
			.iter()
			.flat_map(|(_, _, rules)| rules.iter().cloned())
			.collect();
		let unique = uniquify_rules(all, &mut report.issues);
		loaded
			.iter()
			.map(|(_, rel_path, _)| {
				unique
					.iter()
					.filter(|rule| rule.path() == rel_path.as_str())
					.cloned()
					.collect()
			})
			.collect()
	} else {
		loaded
			.iter()
			.map(|(_, _, rules)| uniquify_rules(rules.clone(), &mut report.issues))
			.collect()
	};

	let excludes: Vec<PathBuf> = options
		.auto_fix_excludes
		.iter()
		.map(|path| files::resolve_path(root, path))
		.collect();

	for ((path, rel_path, rules), fixed) in loaded.into_iter().zip(results) {
		let excluded = excludes.iter().any(|exclude| files::same_file(exclude, &path));
		if options.auto_fix && !excluded && fixed != rules {
			tracing::info!("fixing \"{rel_path}\"");
			files::write_text(&path, &files::render_rules(&fixed, options.strip_eol))?;
			report.fixed_files.push(path.clone());
		}
		report.files.push(path);
	}

	Ok(report)
}
