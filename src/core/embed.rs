//! `sgraph embed`: annotate a snapshot with semantic vectors.

use std::time::Duration;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;

use crate::{
    cli::{AppContext, EmbedArgs},
    core::store,
    embedding::{AnnotateOptions, OpenAiProvider, annotate},
    infra::config::EmbedConfig,
};

impl EmbedConfig {
    /// Annotation tunables from this section.
    pub fn annotate_options(&self, force: bool) -> AnnotateOptions {
        AnnotateOptions {
            batch_size: self.batch_size.max(1),
            retries: self.retries,
            backoff: Duration::from_millis(self.backoff_ms),
            force,
        }
    }
}

pub fn run(args: EmbedArgs, ctx: &AppContext) -> Result<()> {
    let mut config = store::config_for(&args.target.path);
    if let Some(model) = args.model {
        config.embed.model = model;
    }
    if let Some(batch_size) = args.batch_size {
        config.embed.batch_size = batch_size;
    }

    let path = store::snapshot_path(&args.target, &config);
    let mut graph = store::load(&path)?;

    if ctx.dry_run {
        let pending = graph
            .functions()
            .filter(|n| args.force || n.embedding.is_empty())
            .count();
        if !ctx.quiet {
            println!("{}", "DRY RUN: Would embed:".yellow());
            println!(
                "  {pending} of {} functions with {}",
                graph.len(),
                config.embed.model
            );
        }
        return Ok(());
    }

    let provider = OpenAiProvider::from_config(&config.embed)
        .context("Failed to configure embedding provider")?;

    let progress = if ctx.quiet {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb.set_message("embedding");
        pb
    };

    let opts = config.embed.annotate_options(args.force);
    let report = annotate(&mut graph, &provider, &opts, &progress);
    progress.finish_and_clear();

    store::save(
        &graph,
        &path,
        path.is_dir(),
        config.build.shard_batch_size,
    )?;

    if !ctx.quiet {
        println!(
            "{} embedded {} functions ({} tokens) -> {}",
            if ctx.no_color { "✓".to_string() } else { "✓".green().to_string() },
            report.embedded,
            report.tokens,
            path.display()
        );
        if !report.gaps.is_empty() {
            println!(
                "  {} function(s) left without a vector; rerun to retry",
                report.gaps.len()
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_follow_config() {
        let cfg = EmbedConfig {
            batch_size: 0,
            retries: 5,
            backoff_ms: 250,
            ..EmbedConfig::default()
        };
        let opts = cfg.annotate_options(true);
        assert_eq!(opts.batch_size, 1);
        assert_eq!(opts.retries, 5);
        assert_eq!(opts.backoff, Duration::from_millis(250));
        assert!(opts.force);
    }
}
