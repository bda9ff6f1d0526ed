use std::path::Path;

use assert_cmd::Command;
use blocklist_core::AnyEmptyResult;
use insta_cmd::get_cargo_bin;

pub fn blocklist_cmd() -> Command {
	let mut cmd = Command::new(get_cargo_bin("blocklist"));
	cmd.env("NO_COLOR", "1");
	cmd
}

/// Write `content` to `root/relative`, creating parent directories.
pub fn write(root: &Path, relative: &str, content: &str) -> AnyEmptyResult {
	let path = root.join(relative);
	if let Some(parent) = path.parent() {
		std::fs::create_dir_all(parent)?;
	}
	std::fs::write(path, content)?;
	Ok(())
}
