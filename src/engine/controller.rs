//! engine::controller
//!
//! The lifecycle controller: checkout, isolate, commit, restore.
//!
//! # State Machine
//!
//! ```text
//! Idle --pre_run--> AwaitingRun --post_run--> Idle
//! ```
//!
//! - `pre_run` optionally switches to the run's requested branch and records
//!   the branch it switched away from.
//! - `post_run` commits the working set, then restores the recorded branch.
//!
//! # Invariants
//!
//! - Commit always happens before restore, so the commit lands on the run's
//!   branch
//! - Restore is attempted whenever a switch happened, including after a
//!   failed commit
//! - A restore failure is always surfaced
//! - `BranchState` is empty whenever the controller is `Idle`
//! - Only one run is in flight per controller
//!
//! # Example
//!
//! ```
//! use doltrun::core::params::RunParameters;
//! use doltrun::core::types::RunId;
//! use doltrun::engine::LifecycleController;
//! use doltrun::store::MockStore;
//!
//! let store = MockStore::new("main");
//! let mut controller = LifecycleController::new(store.clone());
//!
//! let params = RunParameters::for_run(RunId::new("run-43").unwrap())
//!     .with_param("branch", "experiment")
//!     .unwrap();
//!
//! controller.pre_run(&params).unwrap();
//! assert_eq!(store.current(), "experiment");
//!
//! store.stage_changes();
//! let outcome = controller.post_run(&params).unwrap();
//! assert!(outcome.commit.is_some());
//! assert_eq!(store.current(), "main");
//! ```

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::state::{BranchState, Phase};
use crate::core::message::{CommitMessageBuilder, DefaultMessage};
use crate::core::params::RunParameters;
use crate::core::types::{BranchName, BranchPolicy, CommitRef, RunId};
use crate::store::{StoreError, VersionedStore};

/// Errors surfaced by the lifecycle callbacks.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// A store call failed during pre-run.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The commit failed; the original branch (if any) was restored.
    #[error(transparent)]
    Commit(StoreError),

    /// The original branch could not be restored.
    #[error("failed to restore branch {branch}: {source}")]
    Restore {
        branch: BranchName,
        #[source]
        source: StoreError,
        /// The commit error, when the commit failed as well.
        commit_error: Option<StoreError>,
    },

    /// `pre_run` was called while another run was in flight.
    #[error("run {run_id} is still in flight")]
    RunInFlight { run_id: RunId },

    /// `post_run` was called without a matching `pre_run`.
    #[error("no run in flight")]
    NoRunInFlight,
}

/// What `post_run` did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunOutcome {
    pub run_id: RunId,
    /// The new commit, or None when the run changed no data.
    pub commit: Option<CommitRef>,
    /// The branch the run was isolated on, if it asked for one.
    pub branch: Option<BranchName>,
    /// The branch restored after committing, if a switch happened.
    pub restored: Option<BranchName>,
}

/// Brackets pipeline runs with branch checkout, commit and restore.
///
/// Generic over the store and the commit message builder, both injected at
/// construction.
#[derive(Debug)]
pub struct LifecycleController<S, M = DefaultMessage> {
    store: S,
    message: M,
    policy: BranchPolicy,
    state: BranchState,
    phase: Phase,
}

impl<S: VersionedStore> LifecycleController<S, DefaultMessage> {
    /// Controller with the default message builder and branch policy.
    pub fn new(store: S) -> Self {
        Self::with_message_builder(store, DefaultMessage::default())
    }
}

impl<S: VersionedStore, M: CommitMessageBuilder> LifecycleController<S, M> {
    pub fn with_message_builder(store: S, message: M) -> Self {
        Self {
            store,
            message,
            policy: BranchPolicy::default(),
            state: BranchState::default(),
            phase: Phase::Idle,
        }
    }

    /// Set what happens when a requested branch does not exist.
    pub fn branch_policy(mut self, policy: BranchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn state(&self) -> &BranchState {
        &self.state
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Prepare the store for a run.
    ///
    /// Without a `branch` parameter no store call is made. With one, the
    /// active branch is recorded and the requested branch checked out
    /// (created first under [`BranchPolicy::Create`]).
    ///
    /// # Errors
    ///
    /// Any store failure aborts pre-run; the controller stays `Idle` with
    /// empty state and the run must not start.
    pub fn pre_run(&mut self, params: &RunParameters) -> Result<(), LifecycleError> {
        if let Phase::AwaitingRun { run_id } = &self.phase {
            return Err(LifecycleError::RunInFlight {
                run_id: run_id.clone(),
            });
        }
        self.state.clear();

        if let Some(requested) = params.branch() {
            self.state = self.switch_to(requested)?;
        } else {
            debug!(run_id = %params.run_id(), "no branch requested");
        }

        self.phase = Phase::AwaitingRun {
            run_id: params.run_id().clone(),
        };
        Ok(())
    }

    fn switch_to(&mut self, requested: &BranchName) -> Result<BranchState, StoreError> {
        let original = self.store.active_branch()?;

        if !self.store.branch_exists(requested)? {
            match self.policy {
                BranchPolicy::Create => {
                    info!(branch = %requested, from = %original, "creating branch");
                    self.store.create_branch(requested)?;
                }
                BranchPolicy::Require => {
                    return Err(StoreError::BranchNotFound {
                        branch: requested.to_string(),
                    });
                }
            }
        }

        self.store.checkout(requested)?;
        info!(branch = %requested, original = %original, "switched branch for run");
        Ok(BranchState::switched(requested.clone(), original))
    }

    /// Commit the run's data and restore the original branch.
    ///
    /// A clean working set is not an error: the outcome simply carries no
    /// commit. The controller returns to `Idle` on every path.
    ///
    /// # Errors
    ///
    /// - [`LifecycleError::Commit`] when the commit failed (the restore, if
    ///   needed, succeeded)
    /// - [`LifecycleError::Restore`] when the restore failed
    /// - [`LifecycleError::NoRunInFlight`] without a preceding `pre_run`
    pub fn post_run(&mut self, params: &RunParameters) -> Result<RunOutcome, LifecycleError> {
        let started = match std::mem::take(&mut self.phase) {
            Phase::AwaitingRun { run_id } => run_id,
            Phase::Idle => return Err(LifecycleError::NoRunInFlight),
        };
        if &started != params.run_id() {
            warn!(
                started = %started,
                finished = %params.run_id(),
                "post-run run id differs from pre-run"
            );
        }
        let state = std::mem::take(&mut self.state);

        let message = self.message.build(params);
        debug!(run_id = %params.run_id(), message = %message, "committing working set");
        let committed = match self.store.commit(&message) {
            Ok(commit) => {
                info!(commit = %commit, run_id = %params.run_id(), "committed run");
                Ok(Some(commit))
            }
            Err(e) if e.is_nothing_to_commit() => {
                warn!(run_id = %params.run_id(), "run produced no changes; nothing to commit");
                Ok(None)
            }
            Err(e) => Err(e),
        };

        if let Some(original) = &state.original_branch {
            if let Err(source) = self.store.checkout(original) {
                return Err(LifecycleError::Restore {
                    branch: original.clone(),
                    source,
                    commit_error: committed.err(),
                });
            }
            info!(branch = %original, "restored original branch");
        }

        let commit = committed.map_err(LifecycleError::Commit)?;
        Ok(RunOutcome {
            run_id: params.run_id().clone(),
            commit,
            branch: state.requested_branch,
            restored: state.original_branch,
        })
    }
}
