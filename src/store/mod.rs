//! store
//!
//! Capability interface over the versioned database.
//!
//! # Architecture
//!
//! This module is the **only doorway** to the versioned store. The
//! lifecycle controller talks to [`VersionedStore`]; only
//! [`dolt::DoltStore`] knows SQL, and no other module imports `sqlx`.
//!
//! # Responsibilities
//!
//! - Active branch query
//! - Branch existence check and creation
//! - Branch checkout
//! - Working-set commit
//! - Provenance lookup across every branch
//!
//! # Invariants
//!
//! - No business logic: branch policy, restore ordering and no-op commit
//!   tolerance live in [`crate::engine`]
//! - All operations return strong types (BranchName, CommitRef)
//! - Errors are normalized into [`StoreError`] categories

pub mod dolt;
pub mod mock;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::core::types::{BranchName, CommitRef, RunId};

pub use dolt::{DoltStore, StoreEndpoint};
pub use mock::MockStore;

/// Errors from versioned store operations.
///
/// The categories drive controller behavior: `NothingToCommit` is recovered
/// locally, everything else is fatal for the current lifecycle step.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The database could not be reached.
    #[error("versioned store unavailable: {message}")]
    Unavailable { message: String },

    /// The branch does not exist.
    #[error("branch not found: {branch}")]
    BranchNotFound { branch: String },

    /// Switching branches is impossible in the current state.
    #[error("cannot check out {branch}: {message}")]
    CheckoutConflict { branch: String, message: String },

    /// The working set has no changes.
    #[error("nothing to commit")]
    NothingToCommit,

    /// The commit was rejected.
    #[error("commit failed: {message}")]
    CommitFailed { message: String },

    /// Any other SQL failure.
    #[error("{operation} failed: {message}")]
    Query { operation: String, message: String },

    /// The store returned data that failed validation.
    #[error("invalid response from store: {0}")]
    InvalidResponse(String),
}

impl StoreError {
    /// Whether this error is the recoverable "clean working set" case.
    pub fn is_nothing_to_commit(&self) -> bool {
        matches!(self, StoreError::NothingToCommit)
    }
}

/// A commit as reported by the store's log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitRecord {
    pub commit: CommitRef,
    pub committer: String,
    pub message: String,
    pub date: DateTime<Utc>,
}

/// Capability surface the lifecycle controller consumes.
///
/// Receivers are `&mut self`: an implementation holds one database session,
/// and the checked-out branch is a property of that session.
pub trait VersionedStore {
    /// The currently checked-out branch.
    fn active_branch(&mut self) -> Result<BranchName, StoreError>;

    /// Whether a branch with this name exists.
    fn branch_exists(&mut self, branch: &BranchName) -> Result<bool, StoreError>;

    /// Create a branch at the current head without switching to it.
    fn create_branch(&mut self, branch: &BranchName) -> Result<(), StoreError>;

    /// Switch the active branch.
    fn checkout(&mut self, branch: &BranchName) -> Result<(), StoreError>;

    /// Stage every table and commit the working set.
    ///
    /// Returns `StoreError::NothingToCommit` when the working set is clean.
    fn commit(&mut self, message: &str) -> Result<CommitRef, StoreError>;

    /// Commits on any branch whose summary line names exactly `run_id`,
    /// newest first, at most `limit` of them.
    fn run_commits(&mut self, run_id: &RunId, limit: usize)
        -> Result<Vec<CommitRecord>, StoreError>;
}

impl<S: VersionedStore + ?Sized> VersionedStore for &mut S {
    fn active_branch(&mut self) -> Result<BranchName, StoreError> {
        (**self).active_branch()
    }

    fn branch_exists(&mut self, branch: &BranchName) -> Result<bool, StoreError> {
        (**self).branch_exists(branch)
    }

    fn create_branch(&mut self, branch: &BranchName) -> Result<(), StoreError> {
        (**self).create_branch(branch)
    }

    fn checkout(&mut self, branch: &BranchName) -> Result<(), StoreError> {
        (**self).checkout(branch)
    }

    fn commit(&mut self, message: &str) -> Result<CommitRef, StoreError> {
        (**self).commit(message)
    }

    fn run_commits(
        &mut self,
        run_id: &RunId,
        limit: usize,
    ) -> Result<Vec<CommitRecord>, StoreError> {
        (**self).run_commits(run_id, limit)
    }
}
