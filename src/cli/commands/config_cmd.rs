//! config command - Show effective configuration and its sources

use crate::core::config::{Config, FileConfig, MessageSection, RunSection, StoreSection};
use crate::engine::Context;
use crate::ui::output;
use anyhow::{Context as _, Result};

use super::load_config;

/// Print the effective configuration as TOML, password masked.
pub fn show(ctx: &Context) -> Result<()> {
    let config = load_config(ctx)?;
    let rendered = toml::to_string_pretty(&effective(&config))
        .context("Failed to render config")?;
    for (scope, p) in [("global", config.global_path()), ("project", config.project_path())] {
        if let Some(p) = p {
            output::print(format!("# {}: {}", scope, p.display()));
        }
    }
    output::print(rendered.trim_end());
    Ok(())
}

/// Print the config files that were loaded, global first.
pub fn path(ctx: &Context) -> Result<()> {
    let config = load_config(ctx)?;
    let mut any = false;
    if let Some(p) = config.global_path() {
        output::print(format!("global: {}", p.display()));
        any = true;
    }
    if let Some(p) = config.project_path() {
        output::print(format!("project: {}", p.display()));
        any = true;
    }
    if !any {
        output::print("no config files loaded");
    }
    Ok(())
}

/// Every setting with precedence and defaults applied.
fn effective(config: &Config) -> FileConfig {
    FileConfig {
        store: Some(StoreSection {
            database: config.database(),
            host: Some(config.host()),
            port: Some(config.port()),
            user: Some(config.user()),
            password: Some(output::mask(&config.password()).to_string()),
        }),
        run: Some(RunSection {
            branch_policy: Some(config.branch_policy()),
            lock: Some(config.lock_enabled()),
            lock_dir: Some(config.lock_dir()),
        }),
        message: Some(MessageSection {
            style: Some(config.message_style()),
            source: Some(config.message_source()),
        }),
    }
}
