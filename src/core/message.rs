//! core::message
//!
//! Commit message construction for pipeline runs.
//!
//! The commit message is the provenance record external tooling searches
//! (`dolt log`, `dolt_log` queries), so every builder must be pure: the same
//! [`RunParameters`] always produce the same string.
//!
//! # Builders
//!
//! - [`DefaultMessage`] - `Update from <source> run: <run_id>`
//! - [`ExtraParamsMessage`] - the default line followed by the extra
//!   parameters as sorted JSON
//! - any `Fn(&RunParameters) -> String`
//!
//! # Example
//!
//! ```
//! use doltrun::core::message::{CommitMessageBuilder, DefaultMessage};
//! use doltrun::core::params::RunParameters;
//! use doltrun::core::types::RunId;
//!
//! let params = RunParameters::for_run(RunId::new("run-42").unwrap());
//! let builder = DefaultMessage::new("kedro");
//! assert_eq!(builder.build(&params), "Update from kedro run: run-42");
//!
//! let custom = |p: &RunParameters| format!("nightly {}", p.run_id());
//! assert_eq!(custom.build(&params), "nightly run-42");
//! ```

use serde::{Deserialize, Serialize};

use super::params::RunParameters;

/// Source label used when none is configured.
pub const DEFAULT_SOURCE: &str = "pipeline";

/// Maps run metadata to a commit message.
pub trait CommitMessageBuilder {
    /// Build the commit message for a run. Must be deterministic.
    fn build(&self, params: &RunParameters) -> String;
}

impl<F> CommitMessageBuilder for F
where
    F: Fn(&RunParameters) -> String,
{
    fn build(&self, params: &RunParameters) -> String {
        self(params)
    }
}

/// `Update from <source> run: <run_id>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultMessage {
    source: String,
}

impl DefaultMessage {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

impl Default for DefaultMessage {
    fn default() -> Self {
        Self::new(DEFAULT_SOURCE)
    }
}

impl CommitMessageBuilder for DefaultMessage {
    fn build(&self, params: &RunParameters) -> String {
        format!("Update from {} run: {}", self.source, params.run_id())
    }
}

/// The default summary line, a blank line, then the extra parameters as
/// JSON with sorted keys.
///
/// Runs without extra parameters produce just the summary line.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExtraParamsMessage {
    summary: DefaultMessage,
}

impl ExtraParamsMessage {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            summary: DefaultMessage::new(source),
        }
    }
}

impl CommitMessageBuilder for ExtraParamsMessage {
    fn build(&self, params: &RunParameters) -> String {
        let summary = self.summary.build(params);
        if params.extra_params().is_empty() {
            return summary;
        }
        // BTreeMap keys serialize in order
        match serde_json::to_string(params.extra_params()) {
            Ok(body) => format!("{summary}\n\n{body}"),
            Err(_) => summary,
        }
    }
}

/// Message styles selectable from configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessageStyle {
    #[default]
    Default,
    ExtraParams,
}

impl MessageStyle {
    /// All style names, for validation messages.
    pub const NAMES: [&'static str; 2] = ["default", "extra-params"];

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "default" => Some(MessageStyle::Default),
            "extra-params" => Some(MessageStyle::ExtraParams),
            _ => None,
        }
    }

    /// Instantiate the builder for this style.
    pub fn builder(self, source: &str) -> StyledMessage {
        match self {
            MessageStyle::Default => StyledMessage::Default(DefaultMessage::new(source)),
            MessageStyle::ExtraParams => {
                StyledMessage::ExtraParams(ExtraParamsMessage::new(source))
            }
        }
    }
}

/// A builder chosen at runtime from a [`MessageStyle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StyledMessage {
    Default(DefaultMessage),
    ExtraParams(ExtraParamsMessage),
}

impl CommitMessageBuilder for StyledMessage {
    fn build(&self, params: &RunParameters) -> String {
        match self {
            StyledMessage::Default(b) => b.build(params),
            StyledMessage::ExtraParams(b) => b.build(params),
        }
    }
}

impl std::fmt::Display for MessageStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageStyle::Default => write!(f, "default"),
            MessageStyle::ExtraParams => write!(f, "extra-params"),
        }
    }
}

/// Whether a commit message's summary line names exactly this run.
///
/// The summary must end exactly at the id: `run-4` does not name a
/// `run-42` commit, and a run mentioned only in the body does not count.
pub fn names_run(message: &str, run_id: &str) -> bool {
    message
        .lines()
        .next()
        .and_then(|summary| summary.strip_suffix(run_id))
        .is_some_and(|head| head.ends_with("run: "))
}
