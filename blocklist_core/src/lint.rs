use std::fmt;
use std::path::Path;
use std::path::PathBuf;

use regex::RegexBuilder;
use serde::Deserialize;

use crate::BlocklistResult;
use crate::Rule;
use crate::RuleKind;
use crate::files;

/// Options for [`lint_files`]. Deserialized from `auto_tasks` kwargs.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LintOptions {
	/// Files or directories to lint. Falls back to `lint.source` when empty.
	pub files: Vec<PathBuf>,
	/// Rewrite files whose rules changed.
	pub auto_fix: bool,
	/// Sort each run of rules between empty lines.
	pub sort_rules: bool,
	/// Report and remove lines without a value or comment.
	pub remove_empty: bool,
	/// Strip trailing line endings of every processed file when fixing.
	pub strip_eol: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LintIssueKind {
	/// The value is not empty but could not be classified.
	InvalidRule,
	/// The line has neither a value nor a comment.
	EmptyRule,
	/// The regex pattern does not compile.
	InvalidRegex { reason: String },
}

/// A problem found in a rule file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintIssue {
	/// Display path of the file.
	pub path: String,
	/// 1-indexed line number.
	pub line: usize,
	pub value: String,
	pub kind: LintIssueKind,
}

impl LintIssue {
	fn from_rule(rule: &Rule, kind: LintIssueKind) -> Self {
		Self {
			path: rule.path().to_string(),
			line: rule.line().unwrap_or_default(),
			value: rule.value().to_string(),
			kind,
		}
	}

	/// Human-readable message for this issue.
	pub fn message(&self) -> String {
		match &self.kind {
			LintIssueKind::InvalidRule => format!("rule \"{}\" is invalid", self.value),
			LintIssueKind::EmptyRule => "empty rule".to_string(),
			LintIssueKind::InvalidRegex { reason } => {
				format!("rule \"{}\" has an invalid regex: {reason}", self.value)
			}
		}
	}
}

impl fmt::Display for LintIssue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}:{}: {}", self.path, self.line, self.message())
	}
}

/// The result of linting a set of files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LintReport {
	/// Files that were checked.
	pub files: Vec<PathBuf>,
	pub issues: Vec<LintIssue>,
	/// Files rewritten by auto fix.
	pub fixed_files: Vec<PathBuf>,
}

impl LintReport {
	pub fn is_clean(&self) -> bool {
		self.issues.is_empty()
	}
}

/// Check a single rule, returning the first problem found.
pub fn check_rule(rule: &Rule, options: &LintOptions) -> Option<LintIssueKind> {
	if rule.is_invalid() {
		return Some(LintIssueKind::InvalidRule);
	}

	if options.remove_empty && rule.value().is_empty() && rule.comment().is_empty() {
		return Some(LintIssueKind::EmptyRule);
	}

	if let RuleKind::Regex { pattern, flags } = rule.kind() {
		if let Err(e) = compile_rule_regex(pattern, flags) {
			return Some(LintIssueKind::InvalidRegex {
				reason: e.to_string(),
			});
		}
	}

	None
}

/// Compile a regex rule pattern with its flags. Unknown flags are ignored.
pub fn compile_rule_regex(pattern: &str, flags: &str) -> Result<regex::Regex, regex::Error> {
	RegexBuilder::new(pattern)
		.case_insensitive(flags.contains('i'))
		.multi_line(flags.contains('m'))
		.dot_matches_new_line(flags.contains('s'))
		.unicode(true)
		.ignore_whitespace(flags.contains('x'))
		.build()
}

/// Sort each run of non-empty rules by `(value, separator, comment)`. Rules
/// with an empty value delimit runs and keep their position.
pub fn sort_rules(rules: Vec<Rule>) -> Vec<Rule> {
	let mut sorted = Vec::with_capacity(rules.len());
	let mut run: Vec<Rule> = Vec::new();

	let flush = |run: &mut Vec<Rule>, sorted: &mut Vec<Rule>| {
		run.sort_by(|a, b| {
			(a.value(), a.separator(), a.comment()).cmp(&(b.value(), b.separator(), b.comment()))
		});
		sorted.append(run);
	};

	for rule in rules {
		if rule.value().is_empty() {
			flush(&mut run, &mut sorted);
			sorted.push(rule);
		} else {
			run.push(rule);
		}
	}
	flush(&mut run, &mut sorted);

	sorted
}

/// Lint the rules of one file, returning the issues and the fixed rules.
pub fn lint_rules(rules: &[Rule], options: &LintOptions) -> (Vec<LintIssue>, Vec<Rule>) {
	let mut issues = Vec::new();
	let mut kept = Vec::with_capacity(rules.len());

	for rule in rules {
		match check_rule(rule, options) {
			Some(kind) => {
				let issue = LintIssue::from_rule(rule, kind);
				tracing::debug!("{issue}");
				issues.push(issue);
			}
			None => kept.push(rule.clone()),
		}
	}

	if options.sort_rules {
		kept = sort_rules(kept);
	}

	(issues, kept)
}

/// Lint every rule file in `sources`, relative to `root`.
pub fn lint_files(
	root: &Path,
	sources: &[PathBuf],
	options: &LintOptions,
) -> BlocklistResult<LintReport> {
	let mut report = LintReport::default();

	for path in files::collect_rule_files(root, sources)? {
		let rel_path = files::display_path(root, &path);
		tracing::debug!(path = rel_path.as_str(), "linting");

		let content = files::read_text(&path)?;
		let rules = files::parse_rules(&content, &rel_path);
		let (issues, fixed) = lint_rules(&rules, options);
		report.issues.extend(issues);

		if options.auto_fix {
			// Unchanged files still lose their trailing line endings.
			let rewritten = if fixed != rules {
				Some(files::render_rules(&fixed, options.strip_eol))
			} else if options.strip_eol {
				Some(files::strip_eol(&content).to_string())
			} else {
				None
			};

			if let Some(rewritten) = rewritten.filter(|rewritten| *rewritten != content) {
				tracing::info!("fixing \"{rel_path}\"");
				files::write_text(&path, &rewritten)?;
				report.fixed_files.push(path.clone());
			}
		}

		report.files.push(path);
	}

	Ok(report)
}
