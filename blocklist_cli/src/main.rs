use std::path::Path;
use std::path::PathBuf;
use std::process;

use blocklist_cli::BlocklistCli;
use blocklist_cli::Commands;
use blocklist_core::AggregateReport;
use blocklist_core::BlocklistResult;
use blocklist_core::BuildOutcome;
use blocklist_core::HttpFetcher;
use blocklist_core::LintReport;
use blocklist_core::Project;
use blocklist_core::StepReport;
use blocklist_core::UniquifyReport;
use blocklist_core::files::display_path;
use clap::Parser;
use owo_colors::OwoColorize;
use tracing_subscriber::EnvFilter;

static USE_COLOR: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(true);

fn color_enabled() -> bool {
	USE_COLOR.load(std::sync::atomic::Ordering::Relaxed)
}

/// Apply ANSI color codes only when color is enabled.
macro_rules! colored {
	($text:expr,red) => {
		if color_enabled() {
			format!("{}", $text.red())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,green) => {
		if color_enabled() {
			format!("{}", $text.green())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,yellow) => {
		if color_enabled() {
			format!("{}", $text.yellow())
		} else {
			format!("{}", $text)
		}
	};
}

/// Exit status when a check found issues or a destination failed.
const EXIT_PROBLEMS: i32 = 1;
/// Exit status for configuration and I/O errors.
const EXIT_ERROR: i32 = 2;

fn main() {
	let args = BlocklistCli::parse();

	// Respect NO_COLOR env var, --no-color flag and terminal support.
	let use_color = !args.no_color
		&& std::env::var_os("NO_COLOR").is_none()
		&& supports_color::on(supports_color::Stream::Stderr).is_some();
	if !use_color {
		USE_COLOR.store(false, std::sync::atomic::Ordering::Relaxed);
	}

	init_tracing(&args, use_color);

	miette::set_hook(Box::new(move |_| {
		Box::new(
			miette::MietteHandlerOpts::new()
				.color(use_color)
				.unicode(use_color)
				.build(),
		)
	}))
	.ok();

	match run(&args) {
		Ok(false) => {}
		Ok(true) => process::exit(EXIT_PROBLEMS),
		Err(e) => {
			let report: miette::Report = e.into();
			eprintln!("{report:?}");
			process::exit(EXIT_ERROR);
		}
	}
}

/// Install the log subscriber. `RUST_LOG` overrides the level chosen by
/// `--quiet` and `--verbose`.
fn init_tracing(args: &BlocklistCli, use_color: bool) {
	let level = if args.quiet {
		"warn"
	} else if args.verbose {
		"debug"
	} else {
		"info"
	};
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_ansi(use_color)
		.with_target(false)
		.without_time()
		.compact()
		.init();
}

fn resolve_root(args: &BlocklistCli) -> PathBuf {
	args.root
		.clone()
		.unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

/// Run the selected command. Returns whether problems were found that should
/// fail the process.
fn run(args: &BlocklistCli) -> BlocklistResult<bool> {
	let root = resolve_root(args);
	let project = Project::load(&root, args.config.as_deref())?;

	match &args.command {
		command @ Commands::Lint { check, .. } => {
			let options = command.lint_options().unwrap_or_default();
			let report = project.lint(&options)?;
			print_lint_report(&root, &report);
			Ok(check.check && !report.is_clean())
		}
		command @ Commands::Uniquify { check, .. } => {
			let options = command.uniquify_options().unwrap_or_default();
			let report = project.uniquify(&options)?;
			print_uniquify_report(&root, &report);
			Ok(check.check && !report.is_clean())
		}
		Commands::Build => {
			let outcomes = project.build(chrono::Utc::now())?;
			print_build_outcomes(&root, &outcomes);
			Ok(false)
		}
		Commands::Aggregate => {
			let report = project.aggregate(&HttpFetcher::new()?);
			print_aggregate_report(&root, &report);
			Ok(!report.is_ok())
		}
		Commands::Auto { task } => {
			let reports = project.auto(task, HttpFetcher::new, chrono::Utc::now())?;
			let mut failed = false;
			for report in &reports {
				match report {
					StepReport::Lint(report) => print_lint_report(&root, report),
					StepReport::Uniquify(report) => print_uniquify_report(&root, report),
					StepReport::Build(outcomes) => print_build_outcomes(&root, outcomes),
					StepReport::Aggregate(report) => {
						print_aggregate_report(&root, report);
						failed |= !report.is_ok();
					}
					_ => {}
				}
			}
			let problems = reports.iter().filter(|report| report.has_problems()).count();
			if problems > 0 {
				println!(
					"{} auto task `{task}` finished with problems in {problems} step(s).",
					colored!("!", yellow)
				);
			} else {
				println!("{} auto task `{task}` finished.", colored!("✓", green));
			}
			Ok(failed)
		}
	}
}

fn print_lint_report(root: &Path, report: &LintReport) {
	for issue in &report.issues {
		println!("{} {issue}", colored!("warning:", yellow));
	}
	for path in &report.fixed_files {
		println!("{} {}", colored!("fixed:", green), display_path(root, path));
	}

	if report.is_clean() {
		println!(
			"{} Linted {} file(s), no issues found.",
			colored!("✓", green),
			report.files.len()
		);
	} else {
		println!(
			"{} Linted {} file(s), {} issue(s) found.",
			colored!("!", yellow),
			report.files.len(),
			report.issues.len()
		);
	}
}

fn print_uniquify_report(root: &Path, report: &UniquifyReport) {
	for issue in &report.issues {
		println!("{} {issue}", colored!("warning:", yellow));
	}
	for path in &report.fixed_files {
		println!("{} {}", colored!("fixed:", green), display_path(root, path));
	}

	if report.is_clean() {
		println!(
			"{} Checked {} file(s), all rules are unique.",
			colored!("✓", green),
			report.files.len()
		);
	} else {
		println!(
			"{} Checked {} file(s), {} redundant rule(s) found.",
			colored!("!", yellow),
			report.files.len(),
			report.issues.len()
		);
	}
}

fn print_build_outcomes(root: &Path, outcomes: &[BuildOutcome]) {
	for outcome in outcomes {
		println!(
			"{} {} -> {} ({}, {} line(s))",
			colored!("built:", green),
			display_path(root, &outcome.source),
			display_path(root, &outcome.publish),
			outcome.format,
			outcome.stats.emitted
		);
	}
	println!("{} Built {} file(s).", colored!("✓", green), outcomes.len());
}

fn print_aggregate_report(root: &Path, report: &AggregateReport) {
	for outcome in &report.outcomes {
		println!(
			"{} {} ({} rule(s))",
			colored!("aggregated:", green),
			display_path(root, &outcome.dest),
			outcome.rules
		);
	}
	for failure in &report.failures {
		eprintln!(
			"{} {}: {}",
			colored!("error:", red),
			display_path(root, &failure.dest),
			failure.error
		);
	}

	if report.is_ok() {
		println!(
			"{} Aggregated {} destination(s).",
			colored!("✓", green),
			report.outcomes.len()
		);
	} else {
		println!(
			"{} {} of {} destination(s) failed.",
			colored!("!", yellow),
			report.failures.len(),
			report.outcomes.len() + report.failures.len()
		);
	}
}
