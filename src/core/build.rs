//! Graph building pipeline: discover files, extract functions in parallel,
//! merge them serially in path order, resolve edges once, and persist the
//! snapshot. Organized into small structs with associated functions.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::{
    cli::{AppContext, BuildArgs},
    core::{
        functions::{
            ExtractOptions, FileExtraction, FunctionExtractor, Language, Truncation,
            get_extractor, resolve_languages,
        },
        store,
    },
    graph::FunctionGraph,
    infra::{config::Config, io::read_lines, walk::SourceWalker},
};

/// Everything the pipeline needs, resolved from flags and config.
#[derive(Debug, Clone)]
pub struct BuildSettings
{
    pub root: PathBuf,
    pub languages: Vec<Language>,
    pub extract: ExtractOptions,
    pub ignore_patterns: Vec<String>,
    pub max_file_bytes: u64,
    pub skip_test_files: bool,
}

impl BuildSettings
{
    /// Merge CLI flags over the `[build]` config section.
    pub fn resolve(
        args: &BuildArgs,
        cfg: &Config,
    ) -> Result<Self>
    {
        // CLI list wins over config; empty means every grammar
        let names = if args
            .languages
            .is_empty()
        {
            &cfg.build
                .languages
        }
        else
        {
            &args.languages
        };
        let languages = resolve_languages(names)?;

        Ok(Self {
            root: args
                .target
                .path
                .clone(),
            languages,
            extract: ExtractOptions {
                lookback_limit: args
                    .lookback
                    .or(cfg
                        .build
                        .lookback_limit),
                capture: args
                    .capture
                    .map(Into::into)
                    .unwrap_or(
                        cfg.build
                            .capture,
                    ),
            },
            ignore_patterns: cfg
                .ignore_patterns
                .clone(),
            max_file_bytes: cfg
                .build
                .max_file_bytes,
            skip_test_files: args.skip_tests
                || cfg
                    .build
                    .skip_test_files,
        })
    }

    /// Settings for `root` with every grammar and default tunables.
    pub fn for_root(root: impl Into<PathBuf>) -> Self
    {
        let cfg = Config::default();
        Self {
            root: root.into(),
            languages: Language::ALL.to_vec(),
            extract: ExtractOptions::default(),
            ignore_patterns: cfg.ignore_patterns,
            max_file_bytes: cfg
                .build
                .max_file_bytes,
            skip_test_files: false,
        }
    }
}

/// What happened to one discovered file.
#[derive(Debug)]
enum FileOutcome
{
    Extracted
    {
        file: String,
        extraction: FileExtraction,
    },
    TooLarge
    {
        file: String,
        bytes: u64,
    },
    Unreadable
    {
        file: String,
        error: String,
    },
}

/// Counters reported after a build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildSummary
{
    pub files: usize,
    pub functions: usize,
    pub edges: usize,
    pub unresolved: usize,

    /// Records dropped because their name was already taken
    pub duplicates: usize,

    /// Files skipped for size or read errors
    pub skipped: Vec<String>,

    /// Files whose tail could not be extracted
    pub truncated: Vec<(String, Truncation)>,
}

/// Compiled extractors, one per selected grammar, shared across threads.
struct ExtractorSet
{
    by_language: HashMap<Language, Box<dyn FunctionExtractor>>,
}

impl ExtractorSet
{
    fn compile(settings: &BuildSettings) -> Result<Self>
    {
        let mut by_language = HashMap::with_capacity(
            settings
                .languages
                .len(),
        );
        for &lang in &settings.languages
        {
            by_language.insert(lang, get_extractor(lang, &settings.extract)?);
        }
        Ok(Self { by_language })
    }

    fn get(
        &self,
        lang: Language,
    ) -> Option<&dyn FunctionExtractor>
    {
        self.by_language
            .get(&lang)
            .map(|e| e.as_ref())
    }
}

/// Path relative to the root with `/` separators.
fn relative_name(
    root: &Path,
    path: &Path,
) -> String
{
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

/// Parallel per-file extraction
struct Extractor;

impl Extractor
{
    fn extract_one(
        settings: &BuildSettings,
        extractors: &ExtractorSet,
        path: &Path,
        lang: Language,
    ) -> FileOutcome
    {
        let file = relative_name(&settings.root, path);

        let bytes = match std::fs::metadata(path)
        {
            Ok(meta) => meta.len(),
            Err(err) =>
            {
                return FileOutcome::Unreadable { file, error: err.to_string() };
            }
        };
        if bytes > settings.max_file_bytes
        {
            return FileOutcome::TooLarge { file, bytes };
        }

        let lines = match read_lines(path)
        {
            Ok(lines) => lines,
            Err(err) =>
            {
                return FileOutcome::Unreadable { file, error: format!("{err:#}") };
            }
        };

        let Some(extractor) = extractors.get(lang)
        else
        {
            return FileOutcome::Extracted { file, extraction: FileExtraction::default() };
        };

        let extraction = extractor.extract(&lines, &file);
        debug!(
            file = %file,
            language = %lang,
            functions = extraction.functions.len(),
            "extracted file"
        );
        FileOutcome::Extracted { file, extraction }
    }

    fn extract_parallel(
        settings: &BuildSettings,
        extractors: &ExtractorSet,
        files: &[(PathBuf, Language)],
        progress: &ProgressBar,
    ) -> Vec<FileOutcome>
    {
        // Order is preserved by collect, so the merge stays deterministic
        files
            .par_iter()
            .map(|(path, lang)| {
                let outcome = Self::extract_one(settings, extractors, path, *lang);
                progress.inc(1);
                outcome
            })
            .collect()
    }
}

/// Serial ingestion into the graph
struct Merger;

impl Merger
{
    fn merge(
        graph: &mut FunctionGraph,
        outcomes: Vec<FileOutcome>,
        summary: &mut BuildSummary,
    )
    {
        for outcome in outcomes
        {
            match outcome
            {
                FileOutcome::Extracted { file, extraction } =>
                {
                    summary.files += 1;
                    if let Some(t) = extraction.truncated
                    {
                        warn!(file = %file, line = t.line + 1, reason = %t.reason, "truncated extraction");
                        summary
                            .truncated
                            .push((file, t));
                    }
                    for record in extraction.functions
                    {
                        if !graph.add_function(record)
                        {
                            summary.duplicates += 1;
                        }
                    }
                }
                FileOutcome::TooLarge { file, bytes } =>
                {
                    warn!(file = %file, bytes, "skipping oversized file");
                    summary
                        .skipped
                        .push(file);
                }
                FileOutcome::Unreadable { file, error } =>
                {
                    warn!(file = %file, error = %error, "skipping unreadable file");
                    summary
                        .skipped
                        .push(file);
                }
            }
        }
    }
}

/// Run the whole pipeline and return the resolved graph.
pub fn build_graph(
    settings: &BuildSettings,
    progress: &ProgressBar,
) -> Result<(FunctionGraph, BuildSummary)>
{
    // Compile patterns before touching the filesystem
    let extractors = ExtractorSet::compile(settings)?;

    let walker = SourceWalker::new(&settings.ignore_patterns, &settings.languages)?
        .with_skip_test_files(settings.skip_test_files)?;
    let files = walker.walk(&settings.root);
    info!(root = %settings.root.display(), files = files.len(), "discovered source files");

    progress.set_length(files.len() as u64);
    let outcomes = Extractor::extract_parallel(settings, &extractors, &files, progress);

    let repository = dunce::canonicalize(&settings.root)
        .unwrap_or_else(|_| {
            settings
                .root
                .clone()
        })
        .display()
        .to_string();
    let mut graph = FunctionGraph::new(repository);
    let mut summary = BuildSummary::default();
    Merger::merge(&mut graph, outcomes, &mut summary);

    let report = graph.set_edges()?;
    summary.functions = graph.len();
    summary.edges = report.edges;
    summary.unresolved = report.unresolved;

    Ok((graph, summary))
}

fn progress_bar(
    ctx: &AppContext,
    message: &'static str,
) -> ProgressBar
{
    if ctx.quiet
    {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(0);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    pb.set_style(style);
    pb.set_message(message);
    pb
}

/// Public CLI entry point
pub fn run(
    args: BuildArgs,
    ctx: &AppContext,
) -> Result<()>
{
    let config = store::config_for(&args.target.path);
    let settings = BuildSettings::resolve(&args, &config)?;

    let (path, sharded) = match &args.shard
    {
        Some(dir) => (dir.clone(), true),
        None => (store::snapshot_path(&args.target, &config), false),
    };

    // Reuse what is already on disk unless asked to start over
    if path.exists() && !args.rebuild
    {
        let graph = store::load(&path)?;
        if !ctx.quiet
        {
            println!(
                "Reusing snapshot {} ({} functions, {} edges); pass --rebuild to re-extract",
                path.display(),
                graph.len(),
                graph.edge_count()
            );
        }
        return Ok(());
    }

    let progress = progress_bar(ctx, "extracting");
    let (graph, summary) = build_graph(&settings, &progress)?;
    progress.finish_and_clear();

    if ctx.dry_run
    {
        if !ctx.quiet
        {
            println!("{}", "DRY RUN: Would write:".yellow());
            println!(
                "  {} ({} functions from {} files)",
                path.display(),
                summary.functions,
                summary.files
            );
        }
        return Ok(());
    }

    store::save(
        &graph,
        &path,
        sharded,
        config
            .build
            .shard_batch_size,
    )
    .context("Failed to save graph")?;

    if !ctx.quiet
    {
        let check = if ctx.no_color { "✓".to_string() } else { "✓".green().to_string() };
        println!(
            "{check} {} functions, {} edges, {} unresolved calls from {} files -> {}",
            summary.functions,
            summary.edges,
            summary.unresolved,
            summary.files,
            path.display()
        );
        if !summary
            .truncated
            .is_empty()
        {
            println!(
                "  {} file(s) truncated, see -v output",
                summary
                    .truncated
                    .len()
            );
        }
        if !summary
            .skipped
            .is_empty()
        {
            println!(
                "  {} file(s) skipped",
                summary
                    .skipped
                    .len()
            );
        }
    }
    Ok(())
}
