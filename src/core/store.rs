//! Snapshot location and layout selection shared by the commands.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::{
    cli::SnapshotArgs,
    graph::FunctionGraph,
    infra::config::{Config, load_config_in},
};

/// Configuration for `root`, falling back to defaults when it cannot be read.
pub fn config_for(root: &Path) -> Config
{
    load_config_in(root).unwrap_or_else(|err| {
        tracing::warn!(error = %format!("{err:#}"), "using default configuration");
        Config::default()
    })
}

/// Explicit `--snapshot`, else `build.snapshot_file` under the root.
pub fn snapshot_path(
    target: &SnapshotArgs,
    config: &Config,
) -> PathBuf
{
    match &target.snapshot
    {
        Some(path) => path.clone(),
        None => target
            .path
            .join(&config.build.snapshot_file),
    }
}

/// A directory holds the sharded layout; anything else is a single document.
pub fn load(path: &Path) -> Result<FunctionGraph>
{
    let graph = if path.is_dir()
    {
        FunctionGraph::load_sharded(path)
    }
    else
    {
        FunctionGraph::load(path)
    };
    graph.with_context(|| format!("Failed to load snapshot {}", path.display()))
}

/// Write `graph` to `path`; `sharded` writes the directory layout.
pub fn save(
    graph: &FunctionGraph,
    path: &Path,
    sharded: bool,
    batch_size: usize,
) -> Result<()>
{
    let written = if sharded
    {
        graph
            .save_sharded(path, batch_size)
            .map(|_| ())
    }
    else
    {
        graph.save(path)
    };
    written.with_context(|| format!("Failed to write snapshot {}", path.display()))
}
