use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::AggregateTask;
use crate::BlocklistError;
use crate::BlocklistResult;
use crate::BuildTask;
use crate::files;

/// Config file location relative to the root when none is given.
pub const DEFAULT_CONFIG_PATH: &str = "src/config.yaml";

/// Name of the auto task run when none is given.
pub const DEFAULT_AUTO_TASK: &str = "default";

/// Rule files or directories for a check command.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourceConfig {
	#[serde(default)]
	pub source: Vec<PathBuf>,
}

/// An action run by an auto task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum AutoAction {
	Lint,
	Uniquify,
	Build,
	Aggregate,
}

impl fmt::Display for AutoAction {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			Self::Lint => "lint",
			Self::Uniquify => "uniquify",
			Self::Build => "build",
			Self::Aggregate => "aggregate",
		};
		write!(f, "{name}")
	}
}

/// One step of an auto task, with options for the action.
#[derive(Debug, Clone, Deserialize)]
pub struct AutoStep {
	pub action: AutoAction,
	#[serde(default)]
	pub kwargs: serde_json::Value,
}

impl AutoStep {
	/// Deserialize `kwargs` into the action's options. Missing kwargs give
	/// the default options.
	pub fn options<T: DeserializeOwned + Default>(&self) -> BlocklistResult<T> {
		if self.kwargs.is_null() {
			return Ok(T::default());
		}

		serde_json::from_value(self.kwargs.clone()).map_err(|e| {
			BlocklistError::InvalidTaskOptions {
				action: self.action.to_string(),
				reason: e.to_string(),
			}
		})
	}
}

/// Configuration loaded from `src/config.yaml` (or a `.toml` / `.json`
/// file).
///
/// ```yaml
/// lint:
///   source: [src/blocklist]
/// uniquify:
///   source: [src/blocklist]
/// build:
///   - source: src/blocklist/main.txt
///     publish: dist/hosts.txt
///     type: hosts
/// aggregate:
///   - dest: src/blocklist/aggregated.txt
///     source:
///       - {url: "https://example.com/list.txt", type: ublacklist}
/// auto_tasks:
///   default:
///     - {action: lint, kwargs: {auto_fix: true}}
///     - {action: build}
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BlocklistConfig {
	#[serde(default)]
	pub lint: SourceConfig,
	#[serde(default)]
	pub uniquify: SourceConfig,
	#[serde(default)]
	pub build: Vec<BuildTask>,
	#[serde(default)]
	pub aggregate: Vec<AggregateTask>,
	/// Named sequences of actions.
	#[serde(default)]
	pub auto_tasks: BTreeMap<String, Vec<AutoStep>>,
}

impl BlocklistConfig {
	/// The config path: `explicit` resolved against `root`, or the default
	/// location.
	pub fn resolve_path(root: &Path, explicit: Option<&Path>) -> PathBuf {
		files::resolve_path(root, explicit.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH)))
	}

	/// Load and validate a config file. The format follows the extension.
	pub fn load(path: &Path) -> BlocklistResult<Self> {
		if !path.is_file() {
			return Err(BlocklistError::ConfigNotFound(path.display().to_string()));
		}

		let content = files::read_text(path)?;
		let format = path
			.extension()
			.and_then(|e| e.to_str())
			.unwrap_or("")
			.to_ascii_lowercase();

		Self::parse(&content, &format)
	}

	/// Parse config `content` written in `format` (`yaml`, `yml`, `toml` or
	/// `json`).
	pub fn parse(content: &str, format: &str) -> BlocklistResult<Self> {
		let config = match format {
			"yaml" | "yml" => {
				serde_yaml_ng::from_str(content).map_err(|e| BlocklistError::ConfigParse(e.to_string()))?
			}
			"toml" => toml::from_str(content).map_err(|e| BlocklistError::ConfigParse(e.to_string()))?,
			"json" => {
				serde_json::from_str(content).map_err(|e| BlocklistError::ConfigParse(e.to_string()))?
			}
			other => return Err(BlocklistError::UnsupportedConfigFormat(other.to_string())),
		};

		Ok(config)
	}

	/// The steps of the auto task `name`.
	pub fn auto_task(&self, name: &str) -> BlocklistResult<&[AutoStep]> {
		self.auto_tasks
			.get(name)
			.map(Vec::as_slice)
			.ok_or_else(|| BlocklistError::UnknownAutoTask(name.to_string()))
	}
}
