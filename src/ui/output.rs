//! ui::output
//!
//! Output formatting and display.
//!
//! # Design
//!
//! Output is formatted consistently and respects the quiet flag.
//! Status lines go to stderr so a pipeline command's stdout stays clean;
//! requested data (`log`, `config show`) goes to stdout.

use std::fmt::Display;

use crate::engine::RunOutcome;
use crate::store::CommitRecord;

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Quiet mode - minimal output
    Quiet,
    /// Normal mode - standard output
    Normal,
    /// Debug mode - verbose output
    Debug,
}

impl Verbosity {
    /// Create verbosity from flags.
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if debug {
            Verbosity::Debug
        } else {
            Verbosity::Normal
        }
    }
}

/// Print data the user asked for (always shown).
pub fn print(message: impl Display) {
    println!("{}", message);
}

/// Print a status message (respects quiet mode).
pub fn status(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        eprintln!("{}", message);
    }
}

/// Print an error message (always shown).
pub fn error(message: impl Display) {
    eprintln!("error: {}", message);
}

/// Print a warning message (respects quiet mode).
pub fn warn(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        eprintln!("warning: {}", message);
    }
}

/// Mask a secret for display.
pub fn mask(secret: &str) -> &'static str {
    if secret.is_empty() {
        "(empty)"
    } else {
        "********"
    }
}

/// One-line summary of a completed run.
pub fn format_outcome(outcome: &RunOutcome) -> String {
    let mut line = match &outcome.commit {
        Some(commit) => format!("run {}: committed {}", outcome.run_id, commit.short(7)),
        None => format!("run {}: nothing to commit", outcome.run_id),
    };
    if let Some(branch) = &outcome.branch {
        line.push_str(&format!(" on {}", branch));
    }
    if let Some(restored) = &outcome.restored {
        line.push_str(&format!(", restored {}", restored));
    }
    line
}

/// Format a commit record in `git log --oneline` style with a date.
pub fn format_commit(record: &CommitRecord) -> String {
    let summary = record.message.lines().next().unwrap_or_default();
    format!(
        "{}  {}  {}  {}",
        record.commit.short(7),
        record.date.format("%Y-%m-%d %H:%M:%S"),
        record.committer,
        summary
    )
}
