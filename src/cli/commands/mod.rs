//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Loads configuration and resolves the store endpoint
//! 2. Drives the engine (or a read-only store query)
//! 3. Formats and displays output
//!
//! Handlers do NOT call the store's checkout or commit directly; branch
//! moves and commits go through [`crate::engine::LifecycleController`].

mod completion;
mod config_cmd;
mod log_cmd;
mod run;

pub use completion::completion;
pub use config_cmd::{path as config_path, show as config_show};
pub use log_cmd::log;
pub use run::run;

use std::process::ExitCode;

use anyhow::{Context as _, Result};

use crate::cli::args::{Command, ConfigAction};
use crate::core::config::{Config, ConfigLoadResult};
use crate::engine::Context;
use crate::ui::output::{self, Verbosity};

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<ExitCode> {
    match command {
        Command::Run(args) => run::run(ctx, args),
        Command::Log {
            run_id,
            limit,
            json,
            store,
        } => log_cmd::log(ctx, &run_id, limit, json, &store).map(|_| ExitCode::SUCCESS),
        Command::Config { action } => {
            match action {
                ConfigAction::Show => config_cmd::show(ctx)?,
                ConfigAction::Path => config_cmd::path(ctx)?,
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Completion { shell } => {
            completion::completion(shell)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Load configuration for the context's working directory, reporting
/// warnings.
pub(crate) fn load_config(ctx: &Context) -> Result<Config> {
    let cwd = ctx
        .working_dir()
        .context("Failed to determine working directory")?;
    let ConfigLoadResult { config, warnings } =
        Config::load(Some(&cwd)).context("Failed to load config")?;

    let verbosity = Verbosity::from_flags(ctx.quiet, ctx.debug);
    for warning in warnings {
        output::warn(
            format!("{} ({})", warning.message, warning.path.display()),
            verbosity,
        );
    }
    Ok(config)
}
