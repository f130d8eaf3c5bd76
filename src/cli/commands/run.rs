//! run command - Execute a command as a pipeline between pre-run and post-run

use std::path::Path;
use std::process::{Command, ExitCode, ExitStatus};

use anyhow::{bail, Context as _, Result};
use thiserror::Error;

use crate::cli::args::RunArgs;
use crate::core::lock::RunLock;
use crate::core::params::{ParamValue, RunParameters, BRANCH_KEY};
use crate::core::types::{BranchPolicy, RunId};
use crate::engine::{run_pipeline, Context, LifecycleController, RunError};
use crate::store::{DoltStore, StoreEndpoint};
use crate::ui::output::{self, Verbosity};

use super::load_config;
use super::log_cmd::overrides;

/// Environment variable carrying the run id to the command.
pub const RUN_ID_ENV: &str = "DOLTRUN_RUN_ID";
/// Environment variable carrying the database name to the command.
pub const DATABASE_ENV: &str = "DOLTRUN_DATABASE";
/// Environment variable carrying the run's branch to the command.
pub const BRANCH_ENV: &str = "DOLTRUN_BRANCH";

/// The pipeline command ran but did not succeed.
#[derive(Debug, Error)]
#[error("command exited with {status}")]
pub struct CommandFailed {
    pub status: ExitStatus,
}

impl CommandFailed {
    /// Exit code to report: the command's own when it has one, else 1.
    pub fn exit_code(&self) -> u8 {
        self.status
            .code()
            .and_then(|c| u8::try_from(c).ok())
            .filter(|c| *c != 0)
            .unwrap_or(1)
    }
}

/// Run `args.command` bracketed by the lifecycle hooks.
pub fn run(ctx: &Context, args: RunArgs) -> Result<ExitCode> {
    let verbosity = Verbosity::from_flags(ctx.quiet, ctx.debug);
    let cwd = ctx
        .working_dir()
        .context("Failed to determine working directory")?;
    let config = load_config(ctx)?;

    let params = build_params(&args)?;
    let endpoint = config.endpoint(&overrides(&args.store))?;
    let policy = if args.require_branch {
        BranchPolicy::Require
    } else {
        config.branch_policy()
    };

    let _lock = if !args.no_lock && config.lock_enabled() {
        Some(RunLock::acquire(&config.lock_dir(), &endpoint.lock_key())?)
    } else {
        None
    };

    let env = command_env(&params, &endpoint);
    let store = DoltStore::new(endpoint).context("Failed to create store")?;
    let mut controller =
        LifecycleController::with_message_builder(store, config.message_builder(args.message_style))
            .branch_policy(policy);

    output::status(format!("run {}: starting", params.run_id()), verbosity);
    let result = run_pipeline(&mut controller, &params, || {
        spawn(&args.command, &cwd, &env)
    });
    controller.into_store().close();

    match result {
        Ok(run) => {
            output::status(output::format_outcome(&run.outcome), verbosity);
            Ok(ExitCode::SUCCESS)
        }
        Err(RunError::Pipeline(err)) => match err.downcast_ref::<CommandFailed>() {
            Some(failed) => {
                output::warn(
                    format!(
                        "run {}: {}; its writes were committed",
                        params.run_id(),
                        failed
                    ),
                    verbosity,
                );
                Ok(ExitCode::from(failed.exit_code()))
            }
            None => Err(err),
        },
        Err(err) => Err(err.into()),
    }
}

/// Assemble run parameters from the command line.
///
/// `--branch` wins over a `branch=` parameter.
pub(crate) fn build_params(args: &RunArgs) -> Result<RunParameters> {
    let run_id = match &args.run_id {
        Some(id) => RunId::new(id.as_str()).context("Invalid run id")?,
        None => RunId::generate(),
    };

    let mut extra = RunParameters::parse_assignments(args.params.iter().map(String::as_str))?;
    if let Some(branch) = &args.branch {
        extra.insert(BRANCH_KEY.to_string(), ParamValue::from(branch.as_str()));
    }

    let mut params = RunParameters::new(run_id, extra)?;
    if let Some(name) = &args.pipeline {
        params = params.with_pipeline_name(name.as_str());
    }
    Ok(params)
}

/// Variables exported to the pipeline command.
pub(crate) fn command_env(
    params: &RunParameters,
    endpoint: &StoreEndpoint,
) -> Vec<(&'static str, String)> {
    let mut env = vec![
        (RUN_ID_ENV, params.run_id().to_string()),
        (DATABASE_ENV, endpoint.database.to_string()),
    ];
    if let Some(branch) = params.branch() {
        env.push((BRANCH_ENV, branch.to_string()));
    }
    env
}

fn spawn(command: &[String], cwd: &Path, env: &[(&'static str, String)]) -> Result<()> {
    let Some((program, rest)) = command.split_first() else {
        bail!("no command given");
    };

    tracing::debug!(program = %program, args = ?rest, "starting pipeline command");
    let status = Command::new(program)
        .args(rest)
        .current_dir(cwd)
        .envs(env.iter().map(|(k, v)| (*k, v.as_str())))
        .status()
        .with_context(|| format!("Failed to start `{}`", program))?;

    if status.success() {
        Ok(())
    } else {
        Err(CommandFailed { status }.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::args::StoreArgs;
    use crate::core::types::DatabaseName;

    fn args() -> RunArgs {
        RunArgs {
            branch: None,
            run_id: Some("run-42".into()),
            params: Vec::new(),
            pipeline: None,
            store: StoreArgs::default(),
            message_style: None,
            require_branch: false,
            no_lock: false,
            command: vec!["true".into()],
        }
    }

    mod params {
        use super::*;

        #[test]
        fn typed_params_and_branch_flag() {
            let a = RunArgs {
                branch: Some("exp".into()),
                params: vec!["lr=0.1".into(), "epochs=3".into(), "branch=other".into()],
                pipeline: Some("train".into()),
                ..args()
            };
            let p = build_params(&a).unwrap();
            assert_eq!(p.run_id().as_str(), "run-42");
            assert_eq!(p.branch().map(|b| b.as_str()), Some("exp"));
            assert_eq!(p.extra_params().get("lr"), Some(&ParamValue::Float(0.1)));
            assert_eq!(p.extra_params().get("epochs"), Some(&ParamValue::Integer(3)));
            assert_eq!(p.pipeline_name(), Some("train"));
        }

        #[test]
        fn generated_run_id_when_absent() {
            let a = RunArgs {
                run_id: None,
                ..args()
            };
            let p = build_params(&a).unwrap();
            assert!(!p.run_id().as_str().is_empty());
        }

        #[test]
        fn invalid_branch_rejected() {
            let a = RunArgs {
                branch: Some("bad..name".into()),
                ..args()
            };
            assert!(build_params(&a).is_err());
        }

        #[test]
        fn malformed_assignment_rejected() {
            let a = RunArgs {
                params: vec!["novalue".into()],
                ..args()
            };
            assert!(build_params(&a).is_err());
        }
    }

    mod env {
        use super::*;

        fn endpoint() -> StoreEndpoint {
            StoreEndpoint::new(DatabaseName::new("analytics").unwrap())
        }

        #[test]
        fn branch_exported_only_when_set() {
            let plain = build_params(&args()).unwrap();
            let env = command_env(&plain, &endpoint());
            assert_eq!(
                env,
                vec![
                    (RUN_ID_ENV, "run-42".to_string()),
                    (DATABASE_ENV, "analytics".to_string()),
                ]
            );

            let branched = build_params(&RunArgs {
                branch: Some("exp".into()),
                ..args()
            })
            .unwrap();
            let env = command_env(&branched, &endpoint());
            assert!(env.contains(&(BRANCH_ENV, "exp".to_string())));
        }
    }

    #[cfg(unix)]
    mod spawning {
        use super::*;

        #[test]
        fn success_and_failure() {
            let cwd = std::env::temp_dir();
            assert!(spawn(&["true".into()], &cwd, &[]).is_ok());

            let err = spawn(&["false".into()], &cwd, &[]).unwrap_err();
            let failed = err.downcast_ref::<CommandFailed>().unwrap();
            assert_eq!(failed.exit_code(), 1);
        }

        #[test]
        fn exit_code_passed_through() {
            let cwd = std::env::temp_dir();
            let err = spawn(
                &["sh".into(), "-c".into(), "exit 7".into()],
                &cwd,
                &[],
            )
            .unwrap_err();
            assert_eq!(err.downcast_ref::<CommandFailed>().unwrap().exit_code(), 7);
        }

        #[test]
        fn env_visible_to_command() {
            let cwd = std::env::temp_dir();
            let env = [(RUN_ID_ENV, "run-42".to_string())];
            let result = spawn(
                &["sh".into(), "-c".into(), "test \"$DOLTRUN_RUN_ID\" = run-42".into()],
                &cwd,
                &env,
            );
            assert!(result.is_ok());
        }

        #[test]
        fn missing_program_is_start_error() {
            let cwd = std::env::temp_dir();
            let err = spawn(&["doltrun-no-such-program".into()], &cwd, &[]).unwrap_err();
            assert!(err.downcast_ref::<CommandFailed>().is_none());
            assert!(err.to_string().contains("Failed to start"));
        }
    }
}
