//! engine::hooks
//!
//! The callback surface a workflow engine drives, and an in-process
//! bracket that drives it.
//!
//! # Contract
//!
//! An engine calls [`PipelineHooks::before_pipeline_run`] exactly once
//! before executing nodes and [`PipelineHooks::after_pipeline_run`] exactly
//! once afterwards, whether the nodes succeeded or failed. Engines register
//! a controller by passing it in; there is no global hook registry.
//!
//! [`run_pipeline`] implements that contract for callers that own the
//! pipeline body themselves (the `doltrun run` command among them).

use thiserror::Error;

use super::controller::{LifecycleController, LifecycleError, RunOutcome};
use crate::core::message::CommitMessageBuilder;
use crate::core::params::RunParameters;
use crate::store::VersionedStore;

/// Lifecycle callbacks invoked by a workflow engine.
pub trait PipelineHooks {
    fn before_pipeline_run(&mut self, params: &RunParameters) -> Result<(), LifecycleError>;

    fn after_pipeline_run(&mut self, params: &RunParameters)
        -> Result<RunOutcome, LifecycleError>;
}

impl<S: VersionedStore, M: CommitMessageBuilder> PipelineHooks for LifecycleController<S, M> {
    fn before_pipeline_run(&mut self, params: &RunParameters) -> Result<(), LifecycleError> {
        self.pre_run(params)
    }

    fn after_pipeline_run(
        &mut self,
        params: &RunParameters,
    ) -> Result<RunOutcome, LifecycleError> {
        self.post_run(params)
    }
}

/// Errors from a bracketed pipeline run.
#[derive(Debug, Error)]
pub enum RunError {
    /// A lifecycle callback failed; if it was pre-run, the body never ran.
    #[error(transparent)]
    Hook(#[from] LifecycleError),

    /// The pipeline body failed; post-run completed.
    #[error("pipeline failed: {0:#}")]
    Pipeline(anyhow::Error),

    /// The pipeline body failed and so did post-run.
    #[error("pipeline failed: {pipeline:#}; post-run also failed: {hook}")]
    PipelineAndHook {
        pipeline: anyhow::Error,
        hook: LifecycleError,
    },
}

/// Result of a bracketed pipeline run.
#[derive(Debug)]
pub struct PipelineRun<T> {
    pub output: T,
    pub outcome: RunOutcome,
}

/// Run `body` between the pre-run and post-run callbacks.
///
/// If pre-run fails the body is not executed. Post-run runs after the body
/// returns, whether it succeeded or not, so the run's data is committed and
/// the original branch restored on both paths.
///
/// # Example
///
/// ```
/// use doltrun::core::params::RunParameters;
/// use doltrun::core::types::RunId;
/// use doltrun::engine::{run_pipeline, LifecycleController};
/// use doltrun::store::MockStore;
///
/// let store = MockStore::new("main");
/// let mut controller = LifecycleController::new(store.clone());
/// let params = RunParameters::for_run(RunId::new("run-42").unwrap());
///
/// let run = run_pipeline(&mut controller, &params, || {
///     store.stage_changes();
///     Ok(3)
/// })
/// .unwrap();
///
/// assert_eq!(run.output, 3);
/// assert!(run.outcome.commit.is_some());
/// ```
pub fn run_pipeline<H, F, T>(
    hooks: &mut H,
    params: &RunParameters,
    body: F,
) -> Result<PipelineRun<T>, RunError>
where
    H: PipelineHooks + ?Sized,
    F: FnOnce() -> anyhow::Result<T>,
{
    hooks.before_pipeline_run(params)?;

    let result = body();
    let after = hooks.after_pipeline_run(params);

    match (result, after) {
        (Ok(output), Ok(outcome)) => Ok(PipelineRun { output, outcome }),
        (Ok(_), Err(hook)) => Err(RunError::Hook(hook)),
        (Err(pipeline), Ok(_)) => Err(RunError::Pipeline(pipeline)),
        (Err(pipeline), Err(hook)) => Err(RunError::PipelineAndHook { pipeline, hook }),
    }
}
