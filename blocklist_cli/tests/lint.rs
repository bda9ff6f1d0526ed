mod common;

use blocklist_core::AnyEmptyResult;
use predicates::prelude::PredicateBooleanExt;

const CONFIG: &str = "lint:\n  source: [src/blocklist]\nuniquify:\n  source: [src/blocklist]\n";

#[test]
fn lint_passes_on_clean_files() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write(tmp.path(), "src/config.yaml", CONFIG)?;
	common::write(
		tmp.path(),
		"src/blocklist/main.txt",
		"example.com  # spam\n/ads\\d+/i\n",
	)?;

	common::blocklist_cmd()
		.arg("lint")
		.arg("--check")
		.arg("--root")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("Linted 1 file(s), no issues found."));

	Ok(())
}

#[test]
fn lint_check_fails_on_invalid_rules() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write(tmp.path(), "src/config.yaml", CONFIG)?;
	common::write(
		tmp.path(),
		"src/blocklist/main.txt",
		"example.com\nbad_rule!\n/(unclosed/\n",
	)?;

	common::blocklist_cmd()
		.arg("lint")
		.arg("--check")
		.arg("--root")
		.arg(tmp.path())
		.assert()
		.code(1)
		.stdout(
			predicates::str::contains("src/blocklist/main.txt:2: rule \"bad_rule!\" is invalid")
				.and(predicates::str::contains("src/blocklist/main.txt:3"))
				.and(predicates::str::contains("2 issue(s) found")),
		);

	Ok(())
}

#[test]
fn lint_without_check_reports_but_succeeds() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write(tmp.path(), "src/config.yaml", CONFIG)?;
	common::write(tmp.path(), "src/blocklist/main.txt", "bad_rule!\n")?;

	common::blocklist_cmd()
		.arg("lint")
		.arg("--root")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("warning:"));

	Ok(())
}

#[test]
fn lint_auto_fix_sorts_and_removes_invalid_rules() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write(tmp.path(), "src/config.yaml", CONFIG)?;
	common::write(
		tmp.path(),
		"src/blocklist/main.txt",
		"zeta.com\nbad_rule!\nalpha.com\n\nbeta.com\n",
	)?;

	common::blocklist_cmd()
		.args(["lint", "--auto-fix", "--sort-rules", "--root"])
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("fixed: src/blocklist/main.txt"));

	let fixed = std::fs::read_to_string(tmp.path().join("src/blocklist/main.txt"))?;
	similar_asserts::assert_eq!(fixed, "alpha.com\nzeta.com\n\nbeta.com\n");

	Ok(())
}

#[test]
fn lint_accepts_explicit_files() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write(tmp.path(), "src/config.yaml", CONFIG)?;
	common::write(tmp.path(), "src/blocklist/main.txt", "bad_rule!\n")?;
	common::write(tmp.path(), "other/extra.txt", "example.org\n")?;

	common::blocklist_cmd()
		.arg("lint")
		.arg("--check")
		.arg("--root")
		.arg(tmp.path())
		.arg(tmp.path().join("other/extra.txt"))
		.assert()
		.success()
		.stdout(predicates::str::contains("no issues found"));

	Ok(())
}

#[test]
fn uniquify_check_reports_duplicates_and_covered_rules() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write(tmp.path(), "src/config.yaml", CONFIG)?;
	common::write(
		tmp.path(),
		"src/blocklist/main.txt",
		"example.com\nwww.example.com\nexample.com\nother.org\n",
	)?;

	common::blocklist_cmd()
		.args(["uniquify", "--check", "--root"])
		.arg(tmp.path())
		.assert()
		.code(1)
		.stdout(predicates::str::contains("2 redundant rule(s) found"));

	Ok(())
}

#[test]
fn uniquify_auto_fix_rewrites_file() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write(tmp.path(), "src/config.yaml", CONFIG)?;
	common::write(
		tmp.path(),
		"src/blocklist/main.txt",
		"example.com\nwww.example.com\nexample.com\nother.org\n",
	)?;

	common::blocklist_cmd()
		.args(["uniquify", "--auto-fix", "--root"])
		.arg(tmp.path())
		.assert()
		.success();

	let fixed = std::fs::read_to_string(tmp.path().join("src/blocklist/main.txt"))?;
	similar_asserts::assert_eq!(fixed, "example.com\nother.org\n");

	Ok(())
}
