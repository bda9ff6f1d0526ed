use std::net::IpAddr;
use std::path::Path;
use std::path::PathBuf;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::Deserialize;

use crate::BlocklistError;
use crate::BlocklistResult;
use crate::Rule;
use crate::files;

/// Marker that identifies lines written by the aggregator.
pub const AGGREGATED_MARKER: &str = "#!aggregated";

const SOURCE_HEADER: &str = "#!aggregated source: ";

static UBLACKLIST_RULE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"^\*://(?:\*\.)?(?:www\.)?([\w.-]+)/\*(?:\s*#.*)?$")
		.expect("ublacklist rule regex is valid")
});

/// Hostnames that hosts files map for the local machine.
const LOCAL_HOSTNAMES: &[&str] = &[
	"localhost",
	"localhost.localdomain",
	"local",
	"broadcasthost",
	"ip6-localhost",
	"ip6-loopback",
	"ip6-localnet",
	"ip6-mcastprefix",
	"ip6-allnodes",
	"ip6-allrouters",
	"ip6-allhosts",
	"0.0.0.0",
];

/// How rules are extracted from a fetched remote list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum SourceType {
	/// A uBlacklist subscription: `*://*.example.com/*` lines.
	Ublacklist,
	/// A hosts file: `0.0.0.0 example.com` lines.
	Hosts,
}

impl SourceType {
	/// Extract domain rules from `text`, tagging each with `url` and its line.
	pub fn extract(self, text: &str, url: &str) -> Vec<Rule> {
		let mut rules = Vec::new();

		for (index, line) in text.lines().enumerate() {
			let line = line.trim_end_matches('\r');
			let line_number = Some(index + 1);
			match self {
				Self::Ublacklist => {
					if let Some(host) = UBLACKLIST_RULE.captures(line).and_then(|caps| caps.get(1)) {
						rules.push(Rule::parse_at(host.as_str(), url, line_number));
					}
				}
				Self::Hosts => {
					let content = line.split('#').next().unwrap_or_default();
					let mut fields = content.split_whitespace();
					let Some(address) = fields.next() else {
						continue;
					};
					if address.parse::<IpAddr>().is_err() {
						continue;
					}
					for host in fields {
						let host = host.to_ascii_lowercase();
						if LOCAL_HOSTNAMES.contains(&host.as_str()) {
							continue;
						}
						rules.push(Rule::parse_at(host, url, line_number));
					}
				}
			}
		}

		rules
	}
}

/// One remote list feeding an aggregate destination.
#[derive(Debug, Clone, Deserialize)]
pub struct AggregateSource {
	pub url: String,
	#[serde(rename = "type")]
	pub source_type: SourceType,
}

/// An aggregate task: merge every source's rules into `dest`.
#[derive(Debug, Clone, Deserialize)]
pub struct AggregateTask {
	pub dest: PathBuf,
	#[serde(default)]
	pub strip_eol: bool,
	pub source: Vec<AggregateSource>,
}

/// Summary of a finished aggregate task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateOutcome {
	pub dest: PathBuf,
	/// Rules written, across all sources.
	pub rules: usize,
	/// Whether the destination content changed.
	pub changed: bool,
}

/// Retrieves the text of a remote list.
pub trait Fetcher {
	fn fetch(&self, url: &str) -> BlocklistResult<String>;
}

/// Fetches lists over HTTP(S) with a blocking client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
	client: reqwest::blocking::Client,
}

impl HttpFetcher {
	pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

	pub fn new() -> BlocklistResult<Self> {
		let client = reqwest::blocking::Client::builder()
			.timeout(Self::DEFAULT_TIMEOUT)
			.user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
			.build()
			.map_err(|e| {
				BlocklistError::Fetch {
					url: String::new(),
					reason: e.to_string(),
				}
			})?;

		Ok(Self { client })
	}
}

impl Fetcher for HttpFetcher {
	fn fetch(&self, url: &str) -> BlocklistResult<String> {
		let fetch_error = |e: reqwest::Error| {
			BlocklistError::Fetch {
				url: url.to_string(),
				reason: e.to_string(),
			}
		};

		let response = self.client.get(url).send().map_err(fetch_error)?;
		let status = response.status();
		if !status.is_success() {
			return Err(BlocklistError::FetchStatus {
				url: url.to_string(),
				status: status.as_u16(),
			});
		}

		let text = response.text().map_err(fetch_error)?;
		Ok(files::normalize_line_endings(&text))
	}
}

/// Render the aggregation block for `url`: the source header and one marked
/// line per rule, each terminated by LF.
pub fn render_block(url: &str, rules: &[Rule]) -> String {
	let mut block = format!("  {SOURCE_HEADER}{url}\n");

	for rule in rules {
		block.push_str(rule.value());
		block.push(' ');
		if !rule.comment().is_empty() {
			block.push_str(rule.comment());
			block.push(' ');
		}
		block.push_str(AGGREGATED_MARKER);
		block.push('\n');
	}

	block
}

/// Merge `block` into `text`, replacing the existing block for `url` in
/// place or appending it after a blank line.
///
/// An existing block runs from its header line up to the next aggregation
/// marker line or the end of the text, excluding trailing blank lines.
pub fn merge_block(text: &str, url: &str, block: &str) -> String {
	let lines: Vec<&str> = text.split_inclusive('\n').collect();

	let Some(start) = lines.iter().position(|line| is_source_header(line, url)) else {
		let mut merged = text.to_string();
		if !merged.is_empty() {
			if !merged.ends_with('\n') {
				merged.push('\n');
			}
			if !merged.ends_with("\n\n") {
				merged.push('\n');
			}
		}
		merged.push_str(block);
		return merged;
	};

	let mut end = start + 1;
	while end < lines.len() && !is_marker_line(lines[end]) {
		end += 1;
	}
	while end > start + 1 && lines[end - 1].trim().is_empty() {
		end -= 1;
	}

	let mut merged = String::with_capacity(text.len() + block.len());
	merged.extend(lines[..start].iter().copied());
	merged.push_str(block);
	merged.extend(lines[end..].iter().copied());
	merged
}

fn is_source_header(line: &str, url: &str) -> bool {
	let line = line.trim_end_matches(['\n', '\r']);
	line.starts_with(char::is_whitespace)
		&& line
			.trim_start()
			.strip_prefix(SOURCE_HEADER)
			.is_some_and(|rest| rest == url)
}

fn is_marker_line(line: &str) -> bool {
	line.starts_with(char::is_whitespace)
		&& line
			.trim_start()
			.strip_prefix(AGGREGATED_MARKER)
			.is_some_and(|rest| !rest.starts_with(|c: char| c.is_alphanumeric() || c == '_'))
}

/// Fetch every source of `task` and merge their blocks into the destination.
///
/// All sources are fetched before anything is written, so a failed fetch
/// leaves the destination untouched.
pub fn run_aggregate_task(
	task: &AggregateTask,
	root: &Path,
	fetcher: &dyn Fetcher,
) -> BlocklistResult<AggregateOutcome> {
	let dest = files::resolve_path(root, &task.dest);

	let mut fetched = Vec::with_capacity(task.source.len());
	for source in &task.source {
		tracing::info!("aggregating rules from \"{}\"", source.url);
		let text = fetcher.fetch(&source.url)?;
		let rules = source.source_type.extract(&text, &source.url);
		tracing::debug!(url = source.url.as_str(), count = rules.len(), "extracted rules");
		fetched.push((source, rules));
	}

	let original = files::read_text_or_empty(&dest)?;
	let mut text = original.clone();
	let mut count = 0;
	for (source, rules) in &fetched {
		count += rules.len();
		text = merge_block(&text, &source.url, &render_block(&source.url, rules));
	}

	if task.strip_eol {
		text.truncate(files::strip_eol(&text).len());
	}

	files::write_text(&dest, &text)?;
	tracing::info!("wrote {count} aggregated rules to \"{}\"", files::display_path(root, &dest));

	Ok(AggregateOutcome {
		dest,
		rules: count,
		changed: text != original,
	})
}
