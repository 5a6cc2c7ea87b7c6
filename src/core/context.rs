//! `sgraph context`: attach free text to a function's reverse edges.

use anyhow::{Result, bail};

use crate::{
    cli::{AppContext, ContextArgs},
    core::store,
};

pub fn run(args: ContextArgs, ctx: &AppContext) -> Result<()> {
    let config = store::config_for(&args.target.path);
    let path = store::snapshot_path(&args.target, &config);
    let mut graph = store::load(&path)?;

    if graph.function(&args.name).is_none() {
        bail!("No function named `{}` in the snapshot", args.name);
    }
    if !graph.set_import_edge_context(&args.name, args.text.as_str()) {
        // Only functions with callers carry a context
        if !ctx.quiet {
            println!("`{}` has no callers; nothing to annotate", args.name);
        }
        return Ok(());
    }

    if ctx.dry_run {
        if !ctx.quiet {
            println!("Would set context of `{}` in {}", args.name, path.display());
        }
        return Ok(());
    }

    store::save(&graph, &path, path.is_dir(), config.build.shard_batch_size)?;
    if !ctx.quiet {
        println!("Updated context of `{}`", args.name);
    }
    Ok(())
}
