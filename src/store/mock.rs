//! store::mock
//!
//! In-memory versioned store for deterministic testing.
//!
//! # Design
//!
//! The mock keeps a set of branches, an active branch and a dirty flag for
//! the working set. Every call is recorded as a [`MockOperation`] so tests
//! can assert on call order (commit before restore, no checkout on the
//! no-branch path). Failures are injected per operation with [`FailOn`].
//!
//! Clones share state, so a test can hand one clone to a controller and
//! inspect the other.
//!
//! # Example
//!
//! ```
//! use doltrun::core::types::BranchName;
//! use doltrun::store::mock::{MockOperation, MockStore};
//! use doltrun::store::VersionedStore;
//!
//! let mut store = MockStore::new("main");
//! store.stage_changes();
//! let commit = store.commit("Update from pipeline run: run-1").unwrap();
//!
//! assert_eq!(store.active_branch().unwrap().as_str(), "main");
//! assert_eq!(store.head("main"), Some(commit));
//! assert!(matches!(store.operations()[0], MockOperation::Commit { .. }));
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, TimeZone, Utc};
use sha2::{Digest, Sha256};

use super::{CommitRecord, StoreError, VersionedStore};
use crate::core::message::names_run;
use crate::core::types::{BranchName, CommitRef, RunId};

/// Base32 alphabet used by Dolt commit hashes.
const BASE32: &[u8; 32] = b"0123456789abcdefghijklmnopqrstuv";

/// Mock versioned store for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping.
#[derive(Debug, Clone)]
pub struct MockStore {
    inner: Arc<Mutex<MockStoreInner>>,
}

#[derive(Debug)]
struct MockStoreInner {
    /// Branch name -> commits on that branch, oldest first.
    branches: BTreeMap<String, Vec<CommitRecord>>,
    active: String,
    dirty: bool,
    commit_counter: u64,
    fail_on: Vec<FailOn>,
    operations: Vec<MockOperation>,
}

/// An operation that should fail, and how.
#[derive(Debug, Clone)]
pub enum FailOn {
    ActiveBranch(StoreError),
    BranchExists(StoreError),
    CreateBranch(StoreError),
    /// Fail checkout of one branch, or of any branch when `branch` is None.
    Checkout {
        branch: Option<String>,
        error: StoreError,
    },
    Commit(StoreError),
    RunCommits(StoreError),
}

/// Recorded operation for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOperation {
    ActiveBranch,
    BranchExists { branch: String },
    CreateBranch { branch: String },
    Checkout { branch: String },
    Commit { branch: String, message: String },
    RunCommits { run_id: String },
}

impl MockStore {
    /// A store with a single branch, checked out.
    pub fn new(initial_branch: &str) -> Self {
        let mut branches = BTreeMap::new();
        branches.insert(initial_branch.to_string(), Vec::new());
        Self {
            inner: Arc::new(Mutex::new(MockStoreInner {
                branches,
                active: initial_branch.to_string(),
                dirty: false,
                commit_counter: 0,
                fail_on: Vec::new(),
                operations: Vec::new(),
            })),
        }
    }

    /// Add branches (at no particular commit) without switching to them.
    pub fn with_branches(self, names: &[&str]) -> Self {
        {
            let mut inner = self.lock();
            for name in names {
                inner.branches.entry((*name).to_string()).or_default();
            }
        }
        self
    }

    /// Mark the working set as having uncommitted changes.
    pub fn stage_changes(&self) {
        self.lock().dirty = true;
    }

    /// Inject a failure. Injected failures stay active until cleared.
    pub fn fail_on(&self, failure: FailOn) {
        self.lock().fail_on.push(failure);
    }

    pub fn clear_failures(&self) {
        self.lock().fail_on.clear();
    }

    /// Recorded operations, in call order.
    pub fn operations(&self) -> Vec<MockOperation> {
        self.lock().operations.clone()
    }

    pub fn clear_operations(&self) {
        self.lock().operations.clear();
    }

    /// Number of recorded checkout calls.
    pub fn checkout_count(&self) -> usize {
        self.lock()
            .operations
            .iter()
            .filter(|op| matches!(op, MockOperation::Checkout { .. }))
            .count()
    }

    /// Number of recorded commit calls, including ones that failed.
    pub fn commit_count(&self) -> usize {
        self.lock()
            .operations
            .iter()
            .filter(|op| matches!(op, MockOperation::Commit { .. }))
            .count()
    }

    /// Name of the active branch, without recording an operation.
    pub fn current(&self) -> String {
        self.lock().active.clone()
    }

    pub fn has_branch(&self, name: &str) -> bool {
        self.lock().branches.contains_key(name)
    }

    /// Latest commit on a branch.
    pub fn head(&self, branch: &str) -> Option<CommitRef> {
        self.lock()
            .branches
            .get(branch)
            .and_then(|commits| commits.last())
            .map(|c| c.commit.clone())
    }

    /// All commits on a branch, oldest first.
    pub fn commits(&self, branch: &str) -> Vec<CommitRecord> {
        self.lock().branches.get(branch).cloned().unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, MockStoreInner> {
        // A panicking test thread must not hide the state from assertions
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl MockStoreInner {
    fn failure(&self, matches: impl Fn(&FailOn) -> Option<StoreError>) -> Result<(), StoreError> {
        match self.fail_on.iter().find_map(matches) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn next_commit(&mut self, message: &str) -> CommitRef {
        self.commit_counter += 1;
        let digest = Sha256::new()
            .chain_update(self.commit_counter.to_be_bytes())
            .chain_update(message.as_bytes())
            .finalize();
        let hash: String = digest
            .iter()
            .take(CommitRef::LEN)
            .map(|b| BASE32[(*b % 32) as usize] as char)
            .collect();
        // Every byte maps into the alphabet, so the hash is always valid
        CommitRef::new(hash).unwrap_or_else(|_| unreachable!("mock hash is base32"))
    }

    fn timestamp(&self) -> DateTime<Utc> {
        // Deterministic clock: one second per commit
        Utc.timestamp_opt(1_700_000_000 + self.commit_counter as i64, 0)
            .single()
            .unwrap_or_default()
    }
}

impl VersionedStore for MockStore {
    fn active_branch(&mut self) -> Result<BranchName, StoreError> {
        let mut inner = self.lock();
        inner.operations.push(MockOperation::ActiveBranch);
        inner.failure(|f| match f {
            FailOn::ActiveBranch(e) => Some(e.clone()),
            _ => None,
        })?;
        BranchName::new(inner.active.clone())
            .map_err(|e| StoreError::InvalidResponse(e.to_string()))
    }

    fn branch_exists(&mut self, branch: &BranchName) -> Result<bool, StoreError> {
        let mut inner = self.lock();
        inner.operations.push(MockOperation::BranchExists {
            branch: branch.to_string(),
        });
        inner.failure(|f| match f {
            FailOn::BranchExists(e) => Some(e.clone()),
            _ => None,
        })?;
        Ok(inner.branches.contains_key(branch.as_str()))
    }

    fn create_branch(&mut self, branch: &BranchName) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner.operations.push(MockOperation::CreateBranch {
            branch: branch.to_string(),
        });
        inner.failure(|f| match f {
            FailOn::CreateBranch(e) => Some(e.clone()),
            _ => None,
        })?;
        if inner.branches.contains_key(branch.as_str()) {
            return Err(StoreError::Query {
                operation: "create_branch".into(),
                message: format!("branch '{branch}' already exists"),
            });
        }
        let history = inner
            .branches
            .get(&inner.active)
            .cloned()
            .unwrap_or_default();
        inner.branches.insert(branch.to_string(), history);
        Ok(())
    }

    fn checkout(&mut self, branch: &BranchName) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner.operations.push(MockOperation::Checkout {
            branch: branch.to_string(),
        });
        inner.failure(|f| match f {
            FailOn::Checkout { branch: None, error } => Some(error.clone()),
            FailOn::Checkout {
                branch: Some(b),
                error,
            } if b == branch.as_str() => Some(error.clone()),
            _ => None,
        })?;
        if !inner.branches.contains_key(branch.as_str()) {
            return Err(StoreError::BranchNotFound {
                branch: branch.to_string(),
            });
        }
        inner.active = branch.to_string();
        Ok(())
    }

    fn commit(&mut self, message: &str) -> Result<CommitRef, StoreError> {
        let mut inner = self.lock();
        let active = inner.active.clone();
        inner.operations.push(MockOperation::Commit {
            branch: active.clone(),
            message: message.to_string(),
        });
        inner.failure(|f| match f {
            FailOn::Commit(e) => Some(e.clone()),
            _ => None,
        })?;
        if !inner.dirty {
            return Err(StoreError::NothingToCommit);
        }

        let commit = inner.next_commit(message);
        let record = CommitRecord {
            commit: commit.clone(),
            committer: "root".to_string(),
            message: message.to_string(),
            date: inner.timestamp(),
        };
        inner.branches.entry(active).or_default().push(record);
        inner.dirty = false;
        Ok(commit)
    }

    fn run_commits(
        &mut self,
        run_id: &RunId,
        limit: usize,
    ) -> Result<Vec<CommitRecord>, StoreError> {
        let mut inner = self.lock();
        inner.operations.push(MockOperation::RunCommits {
            run_id: run_id.to_string(),
        });
        inner.failure(|f| match f {
            FailOn::RunCommits(e) => Some(e.clone()),
            _ => None,
        })?;
        // Branches created from a head share its history
        let mut seen = BTreeSet::new();
        let mut commits: Vec<CommitRecord> = inner
            .branches
            .values()
            .flatten()
            .filter(|c| names_run(&c.message, run_id.as_str()))
            .filter(|c| seen.insert(c.commit.as_str().to_string()))
            .cloned()
            .collect();
        commits.sort_by(|a, b| b.date.cmp(&a.date));
        commits.truncate(limit);
        Ok(commits)
    }
}
