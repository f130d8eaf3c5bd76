//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`BranchName`] - Validated database branch name
//! - [`CommitRef`] - Content-addressed commit hash assigned by the store
//! - [`RunId`] - Identifier of a single pipeline execution
//! - [`DatabaseName`] - Name of the versioned database to operate against
//! - [`BranchPolicy`] - Whether a missing branch is created or rejected
//!
//! # Validation
//!
//! These types enforce validity at construction time. Invalid values
//! cannot be represented, so the lifecycle controller never hands a
//! malformed branch name to the store.
//!
//! # Examples
//!
//! ```
//! use doltrun::core::types::{BranchName, CommitRef, RunId};
//!
//! let branch = BranchName::new("experiment/feature-a").unwrap();
//! let commit = CommitRef::new("u8s83gqv0lc8eu9mb0nj5d2u8skv6ntd").unwrap();
//! let run = RunId::new("run-42").unwrap();
//!
//! assert!(BranchName::new("invalid..name").is_err());
//! assert!(CommitRef::new("not-a-hash").is_err());
//! assert!(RunId::new("").is_err());
//! # let _ = (branch, commit, run);
//! ```

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid branch name: {0}")]
    InvalidBranchName(String),

    #[error("invalid commit hash: {0}")]
    InvalidCommitRef(String),

    #[error("invalid run id: {0}")]
    InvalidRunId(String),

    #[error("invalid database name: {0}")]
    InvalidDatabaseName(String),
}

/// A validated branch name.
///
/// Dolt branches follow Git's refname rules (see `git check-ref-format`):
/// - Cannot be empty
/// - Cannot start with `.` or `-`
/// - Cannot end with `.lock` or `/`
/// - Cannot contain `..`, `@{`, `//`, or ASCII control characters
/// - Cannot contain spaces, `~`, `^`, `:`, `\`, `?`, `*`, `[`
/// - Cannot be exactly `@`
///
/// # Example
///
/// ```
/// use doltrun::core::types::BranchName;
///
/// let name = BranchName::new("experiment").unwrap();
/// assert_eq!(name.as_str(), "experiment");
///
/// assert!(BranchName::new("").is_err());
/// assert!(BranchName::new(".hidden").is_err());
/// assert!(BranchName::new("branch.lock").is_err());
/// assert!(BranchName::new("has space").is_err());
/// assert!(BranchName::new("@").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BranchName(String);

impl BranchName {
    /// Create a new validated branch name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidBranchName` if the name violates refname rules.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    fn validate(name: &str) -> Result<(), TypeError> {
        if name.is_empty() {
            return Err(TypeError::InvalidBranchName(
                "branch name cannot be empty".into(),
            ));
        }

        if name == "@" {
            return Err(TypeError::InvalidBranchName(
                "branch name cannot be '@' (reserved)".into(),
            ));
        }

        if name.starts_with('.') {
            return Err(TypeError::InvalidBranchName(
                "branch name cannot start with '.'".into(),
            ));
        }
        // A leading '-' would be parsed as a flag by DOLT_CHECKOUT
        if name.starts_with('-') {
            return Err(TypeError::InvalidBranchName(
                "branch name cannot start with '-'".into(),
            ));
        }

        if name.ends_with(".lock") {
            return Err(TypeError::InvalidBranchName(
                "branch name cannot end with '.lock'".into(),
            ));
        }
        if name.ends_with('/') {
            return Err(TypeError::InvalidBranchName(
                "branch name cannot end with '/'".into(),
            ));
        }

        for forbidden in ["..", "@{", "//"] {
            if name.contains(forbidden) {
                return Err(TypeError::InvalidBranchName(format!(
                    "branch name cannot contain '{forbidden}'"
                )));
            }
        }

        const INVALID_CHARS: [char; 8] = [' ', '~', '^', ':', '\\', '?', '*', '['];
        if let Some(c) = name.chars().find(|c| INVALID_CHARS.contains(c)) {
            return Err(TypeError::InvalidBranchName(format!(
                "branch name cannot contain '{c}'"
            )));
        }

        if name.chars().any(|c| c.is_ascii_control()) {
            return Err(TypeError::InvalidBranchName(
                "branch name cannot contain control characters".into(),
            ));
        }

        for component in name.split('/').filter(|c| !c.is_empty()) {
            if component.starts_with('.') {
                return Err(TypeError::InvalidBranchName(
                    "path component cannot start with '.'".into(),
                ));
            }
            if component.ends_with(".lock") {
                return Err(TypeError::InvalidBranchName(
                    "path component cannot end with '.lock'".into(),
                ));
            }
        }

        Ok(())
    }

    /// Get the branch name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for BranchName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<BranchName> for String {
    fn from(name: BranchName) -> Self {
        name.0
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BranchName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A commit hash assigned by the versioned store.
///
/// Dolt commit hashes are 32 characters of base32 using the alphabet
/// `0-9a-v`. Hashes are normalized to lowercase.
///
/// # Example
///
/// ```
/// use doltrun::core::types::CommitRef;
///
/// let commit = CommitRef::new("U8S83GQV0LC8EU9MB0NJ5D2U8SKV6NTD").unwrap();
/// assert_eq!(commit.as_str(), "u8s83gqv0lc8eu9mb0nj5d2u8skv6ntd");
/// assert_eq!(commit.short(8), "u8s83gqv");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CommitRef(String);

impl CommitRef {
    /// Length of a Dolt commit hash.
    pub const LEN: usize = 32;

    /// Create a new validated commit reference.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidCommitRef` if the string is not a 32
    /// character base32 hash.
    pub fn new(hash: impl Into<String>) -> Result<Self, TypeError> {
        let hash = hash.into().trim().to_ascii_lowercase();
        if hash.len() != Self::LEN {
            return Err(TypeError::InvalidCommitRef(format!(
                "expected {} characters, got {}",
                Self::LEN,
                hash.len()
            )));
        }
        if !hash.chars().all(|c| matches!(c, '0'..='9' | 'a'..='v')) {
            return Err(TypeError::InvalidCommitRef(
                "commit hash must be base32 (0-9, a-v)".into(),
            ));
        }
        Ok(Self(hash))
    }

    /// Get an abbreviated form of the hash.
    pub fn short(&self, len: usize) -> &str {
        let end = len.min(self.0.len());
        &self.0[..end]
    }

    /// Get the hash as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CommitRef {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<CommitRef> for String {
    fn from(commit: CommitRef) -> Self {
        commit.0
    }
}

impl std::fmt::Display for CommitRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of one pipeline execution.
///
/// Run ids end up at the end of a commit summary line, so they must be
/// non-empty, free of control characters and without surrounding
/// whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RunId(String);

impl RunId {
    /// Create a new validated run id.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidRunId` for empty or multi-line ids, and
    /// for ids with leading or trailing whitespace.
    pub fn new(id: impl Into<String>) -> Result<Self, TypeError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(TypeError::InvalidRunId("run id cannot be empty".into()));
        }
        if id.chars().any(|c| c.is_control()) {
            return Err(TypeError::InvalidRunId(
                "run id cannot contain control characters".into(),
            ));
        }
        if id.trim() != id {
            return Err(TypeError::InvalidRunId(
                "run id cannot start or end with whitespace".into(),
            ));
        }
        Ok(Self(id))
    }

    /// Generate a run id from the current UTC time.
    ///
    /// The format is `2024-05-01T12.30.15.123Z`: an RFC 3339 timestamp with
    /// colons replaced so the id is safe in file names and branch names.
    pub fn generate() -> Self {
        let stamp = Utc::now()
            .to_rfc3339_opts(SecondsFormat::Millis, true)
            .replace(':', ".");
        Self(stamp)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RunId {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RunId> for String {
    fn from(id: RunId) -> Self {
        id.0
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Name of a versioned database on the SQL server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DatabaseName(String);

impl DatabaseName {
    /// Create a new validated database name.
    ///
    /// MySQL identifiers are limited to 64 characters; backticks, slashes,
    /// dots and whitespace are rejected to keep the name usable unquoted.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        if name.is_empty() {
            return Err(TypeError::InvalidDatabaseName(
                "database name cannot be empty".into(),
            ));
        }
        if name.chars().count() > 64 {
            return Err(TypeError::InvalidDatabaseName(
                "database name cannot exceed 64 characters".into(),
            ));
        }
        if let Some(c) = name
            .chars()
            .find(|c| c.is_whitespace() || c.is_control() || matches!(c, '`' | '/' | '\\' | '.'))
        {
            return Err(TypeError::InvalidDatabaseName(format!(
                "database name cannot contain {c:?}"
            )));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for DatabaseName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<DatabaseName> for String {
    fn from(name: DatabaseName) -> Self {
        name.0
    }
}

impl std::fmt::Display for DatabaseName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What pre-run does when the requested branch does not exist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BranchPolicy {
    /// Create the branch from the current head, then check it out.
    #[default]
    Create,
    /// Fail with `BranchNotFound`.
    Require,
}

impl BranchPolicy {
    pub const NAMES: [&'static str; 2] = ["create", "require"];

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "create" => Some(BranchPolicy::Create),
            "require" => Some(BranchPolicy::Require),
            _ => None,
        }
    }
}

impl std::fmt::Display for BranchPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BranchPolicy::Create => write!(f, "create"),
            BranchPolicy::Require => write!(f, "require"),
        }
    }
}
