use std::io;
use std::path::Path;
use std::path::PathBuf;

use crate::BlocklistError;
use crate::BlocklistResult;
use crate::Rule;

/// Extension of rule files collected from a source directory.
pub const RULE_FILE_EXTENSION: &str = "txt";

/// Read a text file, dropping a leading byte order mark and normalizing line
/// endings to LF.
pub fn read_text(path: &Path) -> BlocklistResult<String> {
	let content = std::fs::read_to_string(path).map_err(|e| {
		BlocklistError::ReadFile {
			path: path.display().to_string(),
			reason: e.to_string(),
		}
	})?;
	let content = content.strip_prefix('\u{feff}').unwrap_or(&content);

	Ok(normalize_line_endings(content))
}

/// Like [`read_text`], but a missing file reads as empty text.
pub fn read_text_or_empty(path: &Path) -> BlocklistResult<String> {
	match std::fs::metadata(path) {
		Ok(_) => read_text(path),
		Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(String::new()),
		Err(e) => Err(e.into()),
	}
}

/// Write `content`, creating parent directories as needed.
pub fn write_text(path: &Path, content: &str) -> BlocklistResult<()> {
	if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
		std::fs::create_dir_all(parent)?;
	}
	std::fs::write(path, content)?;
	Ok(())
}

/// Normalize CRLF and lone CR line endings to LF.
pub fn normalize_line_endings(content: &str) -> String {
	if content.contains('\r') {
		content.replace("\r\n", "\n").replace('\r', "\n")
	} else {
		content.to_string()
	}
}

/// Remove every trailing line terminator.
pub fn strip_eol(content: &str) -> &str {
	content.trim_end_matches(['\n', '\r'])
}

/// Parse every line of `content` into a rule, with `display` as the path.
pub fn parse_rules(content: &str, display: &str) -> Vec<Rule> {
	content
		.lines()
		.enumerate()
		.map(|(index, line)| Rule::parse_at(line, display, Some(index + 1)))
		.collect()
}

/// Serialize rules one per line, each terminated by LF.
pub fn render_rules(rules: &[Rule], strip_trailing_eol: bool) -> String {
	let mut content = String::new();
	for rule in rules {
		content.push_str(&rule.text());
		content.push('\n');
	}

	if strip_trailing_eol {
		content.truncate(strip_eol(&content).len());
	}

	content
}

/// Resolve `path` against `root` unless it is absolute.
pub fn resolve_path(root: &Path, path: &Path) -> PathBuf {
	if path.is_absolute() {
		path.to_path_buf()
	} else {
		root.join(path)
	}
}

/// A path relative to `root` for display, falling back to the full path.
pub fn display_path(root: &Path, path: &Path) -> String {
	path.strip_prefix(root)
		.unwrap_or(path)
		.display()
		.to_string()
}

/// Expand source paths into rule files. Directories contribute their `*.txt`
/// entries, sorted by name. Missing paths are skipped with a warning.
pub fn collect_rule_files(root: &Path, sources: &[PathBuf]) -> BlocklistResult<Vec<PathBuf>> {
	let mut files = Vec::new();

	for source in sources {
		let path = resolve_path(root, source);
		if path.is_dir() {
			let mut entries = Vec::new();
			for entry in std::fs::read_dir(&path)? {
				let entry_path = entry?.path();
				let is_rule_file = entry_path.is_file()
					&& entry_path
						.extension()
						.is_some_and(|ext| ext == RULE_FILE_EXTENSION);
				if is_rule_file {
					entries.push(entry_path);
				}
			}
			entries.sort();
			files.extend(entries);
		} else if path.is_file() {
			files.push(path);
		} else {
			tracing::warn!(path = %path.display(), "source path does not exist");
		}
	}

	Ok(files)
}

/// Whether two paths point at the same file.
pub fn same_file(a: &Path, b: &Path) -> bool {
	match (a.canonicalize(), b.canonicalize()) {
		(Ok(a), Ok(b)) => a == b,
		_ => a == b,
	}
}
