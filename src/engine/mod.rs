//! engine
//!
//! Orchestrates the run lifecycle: pre-run -> pipeline -> post-run.
//!
//! # Architecture
//!
//! The engine is the central coordinator for a pipeline run against the
//! versioned store:
//!
//! 1. **Pre-run**: record the active branch, switch to the run's branch
//! 2. **Pipeline**: opaque; owned by the workflow engine
//! 3. **Post-run**: commit the working set, restore the original branch
//!
//! # Lifecycle
//!
//! ```text
//! Idle -> pre_run -> AwaitingRun -> [pipeline] -> post_run -> Idle
//! ```
//!
//! # Invariants
//!
//! - All branch moves and commits for a run flow through
//!   [`LifecycleController`]
//! - The database is never left on a branch the caller did not request,
//!   unless a restore failure is reported
//! - Controllers are injected into engines explicitly; no ambient state

pub mod controller;
pub mod hooks;
pub mod state;

pub use controller::{LifecycleController, LifecycleError, RunOutcome};
pub use hooks::{run_pipeline, PipelineHooks, PipelineRun, RunError};
pub use state::{BranchState, Phase};

use std::path::PathBuf;

/// Execution context for commands.
///
/// Contains global settings derived from CLI flags that affect command behavior.
#[derive(Debug, Clone, Default)]
pub struct Context {
    /// Working directory override.
    pub cwd: Option<PathBuf>,
    /// Debug logging enabled.
    pub debug: bool,
    /// Quiet mode (minimal output).
    pub quiet: bool,
}

impl Context {
    /// The directory project configuration is read from.
    pub fn working_dir(&self) -> std::io::Result<PathBuf> {
        match &self.cwd {
            Some(dir) => Ok(dir.clone()),
            None => std::env::current_dir(),
        }
    }
}
