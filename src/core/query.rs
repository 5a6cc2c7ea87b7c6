//! `sgraph query`: rank functions by similarity to a prompt.

use std::cmp::Ordering;

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use serde::Serialize;

use crate::{
    cli::{AppContext, QueryArgs},
    core::store,
    embedding::{Embedding, EmbeddingProvider, OpenAiProvider},
    graph::{FunctionGraph, FunctionNode},
};

/// One ranked function.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryHit<'g> {
    pub name: &'g str,
    pub filename: &'g str,
    pub definition_line: usize,
    pub score: f32,
}

impl<'g> QueryHit<'g> {
    fn new(node: &'g FunctionNode, score: f32) -> Self {
        Self {
            name: &node.name,
            filename: &node.filename,
            definition_line: node.definition_line,
            score,
        }
    }
}

/// The `top_k` annotated functions closest to `query`, best first.
/// Functions without a vector, or with one of another size, are skipped.
pub fn rank<'g>(graph: &'g FunctionGraph, query: &Embedding, top_k: usize) -> Vec<QueryHit<'g>> {
    let mut hits: Vec<QueryHit<'g>> = graph
        .functions()
        .filter_map(|node| {
            query
                .similarity(&node.embedding)
                .map(|score| QueryHit::new(node, score))
        })
        .collect();

    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.name.cmp(b.name))
    });
    hits.truncate(top_k);
    hits
}

pub fn run(args: QueryArgs, ctx: &AppContext) -> Result<()> {
    let config = store::config_for(&args.target.path);
    let path = store::snapshot_path(&args.target, &config);
    let graph = store::load(&path)?;

    let annotated = graph.functions().filter(|n| !n.embedding.is_empty()).count();
    if annotated == 0 {
        anyhow::bail!(
            "Snapshot {} has no embeddings; run `sgraph embed` first",
            path.display()
        );
    }

    let provider = OpenAiProvider::from_config(&config.embed)
        .context("Failed to configure embedding provider")?;
    let query = provider
        .embed(&args.prompt)
        .context("Failed to embed the prompt")?;

    let top_k = args.top_k.unwrap_or(config.query.top_k);
    let hits = rank(&graph, &query, top_k);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&hits)?);
        return Ok(());
    }

    for hit in &hits {
        let location = format!("{}:{}", hit.filename, hit.definition_line + 1);
        if ctx.no_color {
            println!("{:.3}  {}  {}", hit.score, hit.name, location);
        } else {
            println!("{:.3}  {}  {}", hit.score, hit.name.bold(), location.dimmed());
        }
    }
    if hits.is_empty() && !ctx.quiet {
        println!("No matches");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::functions::FunctionRecord;

    fn graph() -> FunctionGraph {
        let mut g = FunctionGraph::new("");
        for name in ["parse", "render", "plain"] {
            g.add_function(FunctionRecord::new(name, "a.ts", format!("function {name}()")));
        }
        g.set_embedding("parse", Embedding::new(vec![1.0, 0.0]));
        g.set_embedding("render", Embedding::new(vec![0.6, 0.8]));
        g
    }

    #[test]
    fn ranks_best_first_and_skips_unannotated() {
        let g = graph();
        let hits = rank(&g, &Embedding::new(vec![0.0, 1.0]), 10);
        let names: Vec<&str> = hits.iter().map(|h| h.name).collect();
        assert_eq!(names, vec!["render", "parse"]);
        assert!((hits[0].score - 0.8).abs() < 1e-6);
    }

    #[test]
    fn top_k_truncates() {
        let g = graph();
        assert_eq!(rank(&g, &Embedding::new(vec![1.0, 0.0]), 1)[0].name, "parse");
    }

    #[test]
    fn mismatched_dimensions_are_ignored() {
        let g = graph();
        assert!(rank(&g, &Embedding::new(vec![1.0, 0.0, 0.0]), 5).is_empty());
    }
}
