use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum BlocklistError {
	#[error(transparent)]
	#[diagnostic(code(blocklist::io_error))]
	Io(#[from] std::io::Error),

	#[error("failed to read `{path}`: {reason}")]
	#[diagnostic(code(blocklist::read_file))]
	ReadFile { path: String, reason: String },

	#[error("config file not found: `{0}`")]
	#[diagnostic(
		code(blocklist::config_not_found),
		help("pass `--config <FILE>` or create `src/config.yaml` under the root")
	)]
	ConfigNotFound(String),

	#[error("failed to parse config file: {0}")]
	#[diagnostic(
		code(blocklist::config_parse),
		help("check the `build`, `aggregate`, `lint`, `uniquify` and `auto_tasks` sections")
	)]
	ConfigParse(String),

	#[error("unsupported config file format: `{0}`")]
	#[diagnostic(
		code(blocklist::unsupported_config_format),
		help("supported formats: yaml, yml, toml, json")
	)]
	UnsupportedConfigFormat(String),

	#[error("unknown escaper: `{0}`")]
	#[diagnostic(code(blocklist::unknown_escaper), help("available escapers: regex, url"))]
	UnknownEscaper(String),

	#[error("invalid pattern `{pattern}`: {reason}")]
	#[diagnostic(code(blocklist::invalid_pattern))]
	InvalidPattern { pattern: String, reason: String },

	#[error("invalid template `{template}`: {reason}")]
	#[diagnostic(
		code(blocklist::invalid_template),
		help("use `{{{{` and `}}}}` for literal braces")
	)]
	InvalidTemplate { template: String, reason: String },

	#[error("failed to fetch `{url}`: {reason}")]
	#[diagnostic(code(blocklist::fetch))]
	Fetch { url: String, reason: String },

	#[error("failed to fetch `{url}`: HTTP status {status}")]
	#[diagnostic(code(blocklist::fetch_status))]
	FetchStatus { url: String, status: u16 },

	#[error("unknown auto task: `{0}`")]
	#[diagnostic(
		code(blocklist::unknown_auto_task),
		help("define the task under `auto_tasks` in the config file")
	)]
	UnknownAutoTask(String),

	#[error("invalid options for `{action}`: {reason}")]
	#[diagnostic(code(blocklist::invalid_task_options))]
	InvalidTaskOptions { action: String, reason: String },
}

pub type BlocklistResult<T> = Result<T, BlocklistError>;
pub type AnyError = Box<dyn std::error::Error>;
pub type AnyEmptyResult = Result<(), AnyError>;
pub type AnyResult<T> = Result<T, AnyError>;
