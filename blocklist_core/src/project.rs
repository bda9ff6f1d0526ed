use std::path::Path;
use std::path::PathBuf;

use chrono::DateTime;
use chrono::Utc;

use crate::AggregateOutcome;
use crate::AutoAction;
use crate::BlocklistConfig;
use crate::BlocklistError;
use crate::BlocklistResult;
use crate::BuildOutcome;
use crate::Fetcher;
use crate::LintOptions;
use crate::LintReport;
use crate::UniquifyOptions;
use crate::UniquifyReport;
use crate::lint_files;
use crate::run_aggregate_task;
use crate::run_build_task;
use crate::uniquify_files;

/// A project root together with its loaded configuration.
///
/// Every task method resolves relative paths against [`Project::root`].
#[derive(Debug, Clone)]
pub struct Project {
	pub root: PathBuf,
	pub config: BlocklistConfig,
}

/// The failure of one aggregate destination.
#[derive(Debug)]
pub struct AggregateFailure {
	pub dest: PathBuf,
	pub error: BlocklistError,
}

/// The result of running every aggregate task.
#[derive(Debug, Default)]
pub struct AggregateReport {
	pub outcomes: Vec<AggregateOutcome>,
	pub failures: Vec<AggregateFailure>,
}

impl AggregateReport {
	pub fn is_ok(&self) -> bool {
		self.failures.is_empty()
	}
}

/// What one auto task step produced.
#[derive(Debug)]
#[non_exhaustive]
pub enum StepReport {
	Lint(LintReport),
	Uniquify(UniquifyReport),
	Build(Vec<BuildOutcome>),
	Aggregate(AggregateReport),
}

impl StepReport {
	/// Whether the step found issues or failed a destination.
	pub fn has_problems(&self) -> bool {
		match self {
			Self::Lint(report) => !report.is_clean(),
			Self::Uniquify(report) => !report.is_clean(),
			Self::Build(_) => false,
			Self::Aggregate(report) => !report.is_ok(),
		}
	}
}

impl Project {
	/// Load the config at `config_path` (or the default location) for `root`.
	pub fn load(root: &Path, config_path: Option<&Path>) -> BlocklistResult<Self> {
		let path = BlocklistConfig::resolve_path(root, config_path);
		tracing::debug!(path = %path.display(), "loading config");
		let config = BlocklistConfig::load(&path)?;

		Ok(Self {
			root: root.to_path_buf(),
			config,
		})
	}

	/// Lint `options.files`, or the configured `lint.source` when empty.
	pub fn lint(&self, options: &LintOptions) -> BlocklistResult<LintReport> {
		let sources = if options.files.is_empty() {
			&self.config.lint.source
		} else {
			&options.files
		};
		lint_files(&self.root, sources, options)
	}

	/// Uniquify `options.files`, or the configured `uniquify.source` when
	/// empty.
	pub fn uniquify(&self, options: &UniquifyOptions) -> BlocklistResult<UniquifyReport> {
		let sources = if options.files.is_empty() {
			&self.config.uniquify.source
		} else {
			&options.files
		};
		uniquify_files(&self.root, sources, options)
	}

	/// Run every build task. The first failing task stops the build.
	pub fn build(&self, now: DateTime<Utc>) -> BlocklistResult<Vec<BuildOutcome>> {
		self.config
			.build
			.iter()
			.map(|task| run_build_task(task, &self.root, now))
			.collect()
	}

	/// Run every aggregate task. A failing destination is logged and
	/// recorded, and the remaining destinations still run.
	pub fn aggregate(&self, fetcher: &dyn Fetcher) -> AggregateReport {
		let mut report = AggregateReport::default();

		for task in &self.config.aggregate {
			match run_aggregate_task(task, &self.root, fetcher) {
				Ok(outcome) => report.outcomes.push(outcome),
				Err(error) => {
					tracing::error!(dest = %task.dest.display(), "{error}");
					report.failures.push(AggregateFailure {
						dest: task.dest.clone(),
						error,
					});
				}
			}
		}

		report
	}

	/// Run the steps of the auto task `name` in order.
	///
	/// `make_fetcher` is called once, when the first aggregate step runs.
	/// Tasks without an aggregate step never create a fetcher.
	pub fn auto<F, M>(
		&self,
		name: &str,
		mut make_fetcher: M,
		now: DateTime<Utc>,
	) -> BlocklistResult<Vec<StepReport>>
	where
		F: Fetcher,
		M: FnMut() -> BlocklistResult<F>,
	{
		let steps = self.config.auto_task(name)?;
		let mut reports = Vec::with_capacity(steps.len());
		let mut fetcher: Option<F> = None;

		for step in steps {
			tracing::info!("running auto task step: {}", step.action);
			let report = match step.action {
				AutoAction::Lint => StepReport::Lint(self.lint(&step.options()?)?),
				AutoAction::Uniquify => StepReport::Uniquify(self.uniquify(&step.options()?)?),
				AutoAction::Build => StepReport::Build(self.build(now)?),
				AutoAction::Aggregate => {
					let current = match fetcher.take() {
						Some(current) => current,
						None => make_fetcher()?,
					};
					let report = self.aggregate(&current);
					fetcher = Some(current);
					StepReport::Aggregate(report)
				}
			};
			reports.push(report);
		}

		Ok(reports)
	}
}
