use std::path::PathBuf;

use blocklist_core::DEFAULT_AUTO_TASK;
use blocklist_core::LintOptions;
use blocklist_core::UniquifyOptions;
use clap::Args;
use clap::Parser;
use clap::Subcommand;

#[derive(Parser)]
#[command(
	author,
	version,
	about = "Lint, deduplicate, build and aggregate blocklists.",
	long_about = "blocklist maintains human-edited rule files (one domain, IP, regex or scheme \
	              rule per line) and publishes them as hosts files, uBlock Origin filter lists \
	              and uBlacklist subscriptions.\n\nTasks are configured in `src/config.yaml` \
	              under the root directory.\n\nQuick start:\n  blocklist lint       Check rule \
	              files\n  blocklist uniquify   Find duplicate and covered rules\n  blocklist \
	              build      Publish every configured build\n  blocklist aggregate  Merge remote \
	              lists into local files\n  blocklist auto       Run the `default` auto task"
)]
pub struct BlocklistCli {
	#[command(subcommand)]
	pub command: Commands,

	/// Root directory to manipulate. Defaults to the current directory.
	#[arg(long, global = true)]
	pub root: Option<PathBuf>,

	/// Config file to use. Defaults to `src/config.yaml` under the root.
	#[arg(long, global = true)]
	pub config: Option<PathBuf>,

	/// Show only warnings and errors.
	#[arg(long, short, global = true, default_value_t = false, conflicts_with = "verbose")]
	pub quiet: bool,

	/// Show debug information.
	#[arg(long, short, global = true, default_value_t = false)]
	pub verbose: bool,

	/// Disable colored output.
	#[arg(long, global = true, default_value_t = false)]
	pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
	/// Check rule files for invalid, empty and broken regex rules.
	///
	/// Without file arguments, checks the files and directories listed under
	/// `lint.source` in the config. Directories contribute their `*.txt`
	/// files.
	#[command(visible_alias = "l")]
	Lint {
		/// File(s) or directories to check.
		#[arg(value_name = "FILE")]
		files: Vec<PathBuf>,

		/// Automatically fix issues.
		#[arg(long, short, default_value_t = false)]
		auto_fix: bool,

		/// Sort rules alphabetically within blocks separated by empty lines.
		#[arg(long, short, default_value_t = false)]
		sort_rules: bool,

		/// Remove empty lines.
		#[arg(long, short, default_value_t = false)]
		remove_empty: bool,

		/// Remove ending line feeds of fixed files.
		#[arg(long, short = 't', default_value_t = false)]
		strip_eol: bool,

		#[command(flatten)]
		check: CheckArgs,
	},
	/// Find duplicate rules and domains covered by other domain rules.
	///
	/// Without file arguments, checks the files and directories listed under
	/// `uniquify.source` in the config.
	#[command(visible_alias = "u")]
	Uniquify {
		/// File(s) or directories to check.
		#[arg(value_name = "FILE")]
		files: Vec<PathBuf>,

		/// Check for uniqueness across files.
		#[arg(long, short, default_value_t = false)]
		cross_files: bool,

		/// Automatically fix issues.
		#[arg(long, short, default_value_t = false)]
		auto_fix: bool,

		/// Remove ending line feeds of fixed files.
		#[arg(long, short = 't', default_value_t = false)]
		strip_eol: bool,

		#[command(flatten)]
		check: CheckArgs,
	},
	/// Convert source rule files into every configured output format.
	#[command(visible_alias = "b")]
	Build,
	/// Fetch remote lists and merge their rules into local files.
	///
	/// A destination whose source cannot be fetched is left untouched, and
	/// the command exits with status 1 after the other destinations finish.
	#[command(visible_alias = "a")]
	Aggregate,
	/// Run a configured auto task.
	Auto {
		/// The task name to run.
		#[arg(value_name = "NAME", default_value = DEFAULT_AUTO_TASK)]
		task: String,
	},
}

#[derive(Args, Debug, Clone, Copy, Default)]
pub struct CheckArgs {
	/// Exit with status 1 when issues are found.
	#[arg(long, default_value_t = false)]
	pub check: bool,
}

impl Commands {
	/// Lint options from the command line arguments.
	pub fn lint_options(&self) -> Option<LintOptions> {
		match self {
			Self::Lint {
				files,
				auto_fix,
				sort_rules,
				remove_empty,
				strip_eol,
				..
			} => {
				Some(LintOptions {
					files: files.clone(),
					auto_fix: *auto_fix,
					sort_rules: *sort_rules,
					remove_empty: *remove_empty,
					strip_eol: *strip_eol,
				})
			}
			_ => None,
		}
	}

	/// Uniquify options from the command line arguments.
	pub fn uniquify_options(&self) -> Option<UniquifyOptions> {
		match self {
			Self::Uniquify {
				files,
				cross_files,
				auto_fix,
				strip_eol,
				..
			} => {
				Some(UniquifyOptions {
					files: files.clone(),
					cross_files: *cross_files,
					auto_fix: *auto_fix,
					auto_fix_excludes: Vec::new(),
					strip_eol: *strip_eol,
				})
			}
			_ => None,
		}
	}
}
