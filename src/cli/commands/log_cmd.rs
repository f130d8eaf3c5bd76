//! log command - Find the commits a run produced

use crate::cli::args::StoreArgs;
use crate::core::config::StoreOverrides;
use crate::core::types::RunId;
use crate::engine::Context;
use crate::store::{CommitRecord, DoltStore, VersionedStore};
use crate::ui::output::{self, Verbosity};
use anyhow::{Context as _, Result};

use super::load_config;

/// Search every branch's history for commits naming `run_id`.
pub fn log(ctx: &Context, run_id: &str, limit: usize, json: bool, store: &StoreArgs) -> Result<()> {
    let run_id = RunId::new(run_id).context("Invalid run id")?;
    let config = load_config(ctx)?;
    let endpoint = config.endpoint(&overrides(store))?;
    let verbosity = Verbosity::from_flags(ctx.quiet, ctx.debug);

    let mut store = DoltStore::new(endpoint).context("Failed to create store")?;
    let records = find_run_commits(&mut store, &run_id, limit)?;
    store.close();

    if json {
        output::print(serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        output::status(format!("no commits found for run {}", run_id), verbosity);
        return Ok(());
    }
    for record in &records {
        output::print(output::format_commit(record));
    }
    Ok(())
}

/// Commits on any branch whose summary line names exactly this run,
/// newest first.
pub(crate) fn find_run_commits<S: VersionedStore>(
    store: &mut S,
    run_id: &RunId,
    limit: usize,
) -> Result<Vec<CommitRecord>> {
    store
        .run_commits(run_id, limit)
        .context("Failed to search commit history")
}

pub(crate) fn overrides(store: &StoreArgs) -> StoreOverrides {
    StoreOverrides {
        database: store.database.clone(),
        host: store.host.clone(),
        port: store.port,
        user: store.user.clone(),
    }
}
