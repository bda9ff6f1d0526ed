//! `blocklist_core` is the core library for the blocklist toolkit. It reads
//! human-maintained rule files (one domain, IP, regex, scheme or raw rule per
//! line, with an optional comment) and publishes them in the formats that
//! content blockers understand. It can also pull rules from remote lists and
//! merge them into a local file.
//!
//! ## Conversion Pipeline
//!
//! ```text
//! Source rule file
//!   → Rule model (split into value / separator / comment, classified)
//!   → Processors (first matching rewrite per rule)
//!   → Scheme resolver (escape, template, buffer grouped schemes)
//!   → Format emitter (cft, hosts, ubo, ublacklist)
//!   → Flush (pack grouped schemes into max-length lines)
//! ```
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading from `src/config.yaml` (or TOML /
//!   JSON), including build, aggregate and auto task definitions.
//! - [`files`]: Reading, writing and collecting rule files.
//!
//! ## Key Types
//!
//! - [`Rule`]: One classified line of a rule file.
//! - [`Processor`]: A conditional value rewrite.
//! - [`Scheme`]: How `scheme:value` rules are escaped, templated and grouped.
//! - [`OutputFormat`]: The format a build task publishes.
//! - [`Project`]: A root directory with its loaded configuration, the entry
//!   point for running tasks.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use blocklist_core::ConversionData;
//! use blocklist_core::OutputFormat;
//! use blocklist_core::convert;
//!
//! let input = "example.com  # spam\n/ads\\d+/i\n";
//! let conversion = convert(
//! 	input,
//! 	"rules.txt",
//! 	OutputFormat::FilterList,
//! 	&ConversionData::default(),
//! 	chrono::Utc::now(),
//! );
//! print!("{}", conversion.output);
//! ```

pub use aggregate::*;
pub use config::*;
pub use convert::*;
pub use emitter::*;
pub use error::*;
pub use lint::*;
pub use processor::*;
pub use project::*;
pub use rule::*;
pub use scheme::*;
pub use template::*;
pub use uniquify::*;

mod aggregate;
pub mod config;
mod convert;
mod emitter;
#[allow(unused_assignments)]
mod error;
pub mod files;
mod lint;
mod processor;
mod project;
mod rule;
mod scheme;
mod template;
mod uniquify;
