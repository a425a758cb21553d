//! Command implementations

use std::path::Path;

use anyhow::{Context, Result};

use ctbind::util::config::{global_config_path, load_config, project_config_path, Config};

pub mod check;
pub mod completions;
pub mod generate;
pub mod resolve;

/// Global, then project, then an explicit `--config` file.
fn load_merged_config(extra: Option<&Path>) -> Result<Config> {
    let cwd = std::env::current_dir().context("failed to get current directory")?;
    let mut config = load_config(global_config_path().as_deref(), &project_config_path(&cwd));
    if let Some(path) = extra {
        config.merge(Config::load(path)?);
    }
    Ok(config)
}
