//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--cwd <path>`: Run as if in that directory
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::core::message::MessageStyle;

/// doltrun - Run a pipeline on its own Dolt branch and commit what it wrote
#[derive(Parser, Debug)]
#[command(name = "doltrun")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Run as if doltrun was started in this directory
    #[arg(long, global = true)]
    pub cwd: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Connection flags shared by commands that talk to the store.
#[derive(Args, Debug, Clone, Default)]
pub struct StoreArgs {
    /// Database name (overrides store.database)
    #[arg(long, value_name = "DB")]
    pub database: Option<String>,

    /// Server host (overrides store.host)
    #[arg(long)]
    pub host: Option<String>,

    /// Server port (overrides store.port)
    #[arg(long)]
    pub port: Option<u16>,

    /// User name (overrides store.user)
    #[arg(long)]
    pub user: Option<String>,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a command as a pipeline bracketed by branch checkout and commit
    #[command(
        name = "run",
        long_about = "Run a command as a pipeline against a Dolt database.\n\n\
            Before the command starts, the database is switched onto the run's branch \
            (created from the current head if it does not exist). After the command \
            exits, successfully or not, everything it wrote is committed with a message \
            naming the run, and the original branch is restored.\n\n\
            The command sees DOLTRUN_RUN_ID, DOLTRUN_DATABASE and, when a branch was \
            requested, DOLTRUN_BRANCH in its environment.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Run on the current branch; commit whatever the job writes
    doltrun run -- python etl.py

    # Isolate an experiment on its own branch
    doltrun run --branch exp-lr-0.1 --param lr=0.1 -- python train.py

    # Fixed run id, parameters recorded in the commit message
    doltrun run --run-id nightly-2024-05-01 --message-style extra-params \\
        --param window=7 -- ./nightly.sh

    # Fail instead of creating a missing branch
    doltrun run --branch release --require-branch -- ./publish.sh

FINDING A RUN LATER:
    doltrun log nightly-2024-05-01"
    )]
    Run(RunArgs),

    /// Find the commits a run produced
    #[command(
        name = "log",
        long_about = "Find the commits a run produced.\n\n\
            Searches the commits of every branch for a summary line that names \
            exactly this run id, so runs that committed to their own branch are \
            found after the original branch was restored.",
        after_help = "\
WORKFLOW EXAMPLES:
    doltrun log run-42
    doltrun log run-42 --json | jq '.[0].commit'"
    )]
    Log {
        /// Run id to search for
        run_id: String,

        /// Maximum number of commits to show
        #[arg(long, default_value_t = 20)]
        limit: usize,

        /// Output JSON
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        store: StoreArgs,
    },

    /// Show configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completion scripts
    #[command(
        name = "completion",
        long_about = "Generate shell completion scripts for tab-completion.\n\n\
            Outputs a completion script for the specified shell. Add the output \
            to your shell's configuration to enable tab-completion for doltrun commands.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Bash (add to ~/.bashrc)
    doltrun completion bash >> ~/.bashrc

    # Zsh (add to ~/.zshrc)
    doltrun completion zsh >> ~/.zshrc

    # Fish
    doltrun completion fish > ~/.config/fish/completions/doltrun.fish"
    )]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Arguments for `doltrun run`.
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Branch to run on (stored as the `branch` parameter)
    #[arg(short, long)]
    pub branch: Option<String>,

    /// Run id (default: current UTC timestamp)
    #[arg(long, value_name = "ID")]
    pub run_id: Option<String>,

    /// Extra run parameter; values are typed as bool, integer, float or string
    #[arg(short, long = "param", value_name = "KEY=VALUE")]
    pub params: Vec<String>,

    /// Pipeline name recorded with the run
    #[arg(long, value_name = "NAME")]
    pub pipeline: Option<String>,

    #[command(flatten)]
    pub store: StoreArgs,

    /// Commit message style (overrides message.style)
    #[arg(long, value_name = "STYLE", value_parser = parse_message_style)]
    pub message_style: Option<MessageStyle>,

    /// Fail if the branch does not exist instead of creating it
    #[arg(long)]
    pub require_branch: bool,

    /// Do not take the host-local run lock
    #[arg(long)]
    pub no_lock: bool,

    /// Command to run, after `--`
    #[arg(last = true, required = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}

fn parse_message_style(name: &str) -> Result<MessageStyle, String> {
    MessageStyle::parse(name).ok_or_else(|| {
        format!(
            "unknown message style '{}' (expected one of: {})",
            name,
            MessageStyle::NAMES.join(", ")
        )
    })
}

/// Config subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Print the effective configuration (password masked)
    Show,
    /// Print the config files that were loaded
    Path,
}

/// Supported shells for completion
#[derive(clap::ValueEnum, Debug, Clone, Copy)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}
