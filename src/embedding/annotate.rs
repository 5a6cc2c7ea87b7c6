//! Vector annotation pass over a [`FunctionGraph`].
//!
//! Functions without a vector are embedded in batches on the rayon pool.
//! Each batch is retried with exponential backoff; a batch that still fails
//! is retried one item at a time, and items that fail after that are
//! reported as gaps. The pass never aborts on a provider error.

use std::{thread, time::Duration};

use indicatif::ProgressBar;
use rayon::prelude::*;
use tracing::{debug, warn};

use super::{
    provider::{EmbedError, EmbeddingProvider},
    vector::Embedding,
};
use crate::graph::FunctionGraph;

/// Longest text sent for one function; longer bodies are cut.
pub const MAX_INPUT_CHARS: usize = 24_000;

#[derive(Debug, Clone)]
pub struct AnnotateOptions {
    pub batch_size: usize,
    pub retries: u32,
    pub backoff: Duration,
    /// Re-embed functions that already carry a vector
    pub force: bool,
}

impl Default for AnnotateOptions {
    fn default() -> Self {
        Self {
            batch_size: 32,
            retries: 3,
            backoff: Duration::from_millis(500),
            force: false,
        }
    }
}

/// A function left without a vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gap {
    pub name: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotationReport {
    pub embedded: usize,
    pub skipped: usize,
    pub gaps: Vec<Gap>,
    pub tokens: u64,
}

/// Text embedded for a function: its definition, cut at a char boundary.
pub fn embedding_text(definition: &[String]) -> String {
    let text = definition.join("\n");
    match text.char_indices().nth(MAX_INPUT_CHARS) {
        Some((cut, _)) => text[..cut].to_string(),
        None => text,
    }
}

/// Run `op` until it succeeds, fails with a permanent error, or runs out of
/// retries. The wait doubles after every failed attempt.
pub fn with_retry<T>(
    retries: u32,
    backoff: Duration,
    mut op: impl FnMut() -> Result<T, EmbedError>,
) -> Result<T, EmbedError> {
    let mut attempt = 0;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(err) if attempt < retries && err.is_retryable() => {
                let wait = backoff.saturating_mul(1 << attempt.min(16));
                debug!(attempt, ?wait, error = %err, "retrying embedding request");
                thread::sleep(wait);
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Outcome of one batch: vectors per name, or the error that left it out.
struct BatchOutcome {
    results: Vec<(String, Result<Embedding, EmbedError>)>,
    tokens: u64,
}

fn run_batch(
    provider: &dyn EmbeddingProvider,
    batch: &[(String, String)],
    opts: &AnnotateOptions,
) -> BatchOutcome {
    let items: Vec<(&str, &str)> = batch
        .iter()
        .map(|(name, text)| (name.as_str(), text.as_str()))
        .collect();

    match with_retry(opts.retries, opts.backoff, || provider.embed_batch(&items)) {
        Ok(out) => BatchOutcome {
            results: out.vectors.into_iter().map(|(n, e)| (n, Ok(e))).collect(),
            tokens: out.tokens,
        },
        Err(err) => {
            warn!(items = batch.len(), error = %err, "batch failed, embedding items one by one");
            let results = batch
                .iter()
                .map(|(name, text)| {
                    let one = with_retry(opts.retries, opts.backoff, || provider.embed(text));
                    (name.clone(), one)
                })
                .collect();
            BatchOutcome { results, tokens: 0 }
        }
    }
}

/// Embed every function that lacks a vector (or all with `force`).
pub fn annotate(
    graph: &mut FunctionGraph,
    provider: &dyn EmbeddingProvider,
    opts: &AnnotateOptions,
    progress: &ProgressBar,
) -> AnnotationReport {
    let mut report = AnnotationReport::default();
    let mut pending: Vec<(String, String)> = Vec::new();
    for node in graph.functions() {
        if !opts.force && !node.embedding.is_empty() {
            continue;
        }
        let text = embedding_text(&node.definition);
        if text.trim().is_empty() {
            report.skipped += 1;
            continue;
        }
        pending.push((node.name.clone(), text));
    }

    progress.set_length(pending.len() as u64);
    let outcomes: Vec<BatchOutcome> = pending
        .par_chunks(opts.batch_size.max(1))
        .map(|batch| {
            let outcome = run_batch(provider, batch, opts);
            progress.inc(batch.len() as u64);
            outcome
        })
        .collect();

    for outcome in outcomes {
        report.tokens += outcome.tokens;
        for (name, result) in outcome.results {
            match result {
                Ok(embedding) => {
                    if graph.set_embedding(&name, embedding) {
                        report.embedded += 1;
                    }
                }
                Err(err) => {
                    warn!(name = %name, error = %err, "no embedding");
                    report.gaps.push(Gap {
                        name,
                        error: err.to_string(),
                    });
                }
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::{core::functions::FunctionRecord, embedding::provider::BatchEmbedding};

    /// Fails batches a fixed number of times and rejects texts containing
    /// "poison" outright.
    struct Flaky {
        batch_failures: AtomicUsize,
        batch_calls: AtomicUsize,
    }

    impl Flaky {
        fn new(batch_failures: usize) -> Self {
            Self {
                batch_failures: AtomicUsize::new(batch_failures),
                batch_calls: AtomicUsize::new(0),
            }
        }
    }

    impl EmbeddingProvider for Flaky {
        fn dimensions(&self) -> usize {
            2
        }

        fn embed(&self, text: &str) -> Result<Embedding, EmbedError> {
            if text.contains("poison") {
                return Err(EmbedError::Status {
                    status: 400,
                    body: "bad input".into(),
                });
            }
            Ok(Embedding::new(vec![1.0, text.len() as f32]).normalized())
        }

        fn embed_batch(&self, items: &[(&str, &str)]) -> Result<BatchEmbedding, EmbedError> {
            self.batch_calls.fetch_add(1, Ordering::SeqCst);
            let left = self.batch_failures.load(Ordering::SeqCst);
            if left > 0 {
                self.batch_failures.store(left - 1, Ordering::SeqCst);
                return Err(EmbedError::Request("connection reset".into()));
            }
            if items.iter().any(|(_, t)| t.contains("poison")) {
                return Err(EmbedError::Status {
                    status: 400,
                    body: "bad input".into(),
                });
            }
            let vectors = items
                .iter()
                .map(|(id, t)| Ok(((*id).to_string(), self.embed(t)?)))
                .collect::<Result<Vec<_>, EmbedError>>()?;
            Ok(BatchEmbedding {
                vectors,
                tokens: items.len() as u64 * 10,
            })
        }

        fn name(&self) -> &str {
            "flaky"
        }
    }

    fn graph(bodies: &[(&str, &str)]) -> FunctionGraph {
        let mut g = FunctionGraph::new("");
        for (name, body) in bodies {
            let mut r = FunctionRecord::new(*name, "a.py", format!("def {name}():"));
            r.definition = vec![format!("def {name}():"), format!("    {body}")];
            g.add_function(r);
        }
        g
    }

    fn opts(batch_size: usize) -> AnnotateOptions {
        AnnotateOptions {
            batch_size,
            retries: 2,
            backoff: Duration::from_millis(1),
            force: false,
        }
    }

    #[test]
    fn retry_recovers_from_transient_failures() {
        let provider = Flaky::new(2);
        let mut g = graph(&[("a", "x()"), ("b", "y()")]);
        let report = annotate(&mut g, &provider, &opts(8), &ProgressBar::hidden());

        assert_eq!(report.embedded, 2);
        assert!(report.gaps.is_empty());
        assert_eq!(report.tokens, 20);
        assert_eq!(provider.batch_calls.load(Ordering::SeqCst), 3);
        assert!(g.functions().all(|n| n.embedding.len() == 2));
    }

    #[test]
    fn permanent_failure_falls_back_to_items_and_records_gaps() {
        let provider = Flaky::new(0);
        let mut g = graph(&[("good", "x()"), ("bad", "poison()")]);
        let report = annotate(&mut g, &provider, &opts(8), &ProgressBar::hidden());

        assert_eq!(report.embedded, 1);
        assert_eq!(report.gaps.len(), 1);
        assert_eq!(report.gaps[0].name, "bad");
        assert!(g.function("bad").unwrap().embedding.is_empty());
        assert!(!g.function("good").unwrap().embedding.is_empty());
        // Permanent errors are not retried
        assert_eq!(provider.batch_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn annotated_functions_are_skipped_unless_forced() {
        let provider = Flaky::new(0);
        let mut g = graph(&[("a", "x()"), ("b", "y()")]);
        g.set_embedding("a", Embedding::new(vec![0.0, 1.0]));

        let report = annotate(&mut g, &provider, &opts(1), &ProgressBar::hidden());
        assert_eq!(report.embedded, 1);
        assert_eq!(g.function("a").unwrap().embedding.as_slice(), &[0.0, 1.0]);

        let forced = AnnotateOptions {
            force: true,
            ..opts(1)
        };
        let report = annotate(&mut g, &provider, &forced, &ProgressBar::hidden());
        assert_eq!(report.embedded, 2);
    }

    #[test]
    fn with_retry_stops_after_budget() {
        let mut calls = 0;
        let out: Result<(), EmbedError> = with_retry(3, Duration::from_millis(1), || {
            calls += 1;
            Err(EmbedError::Request("down".into()))
        });
        assert!(out.is_err());
        assert_eq!(calls, 4);
    }

    #[test]
    fn long_definitions_are_cut() {
        let body = vec!["é".repeat(MAX_INPUT_CHARS + 10)];
        assert_eq!(embedding_text(&body).chars().count(), MAX_INPUT_CHARS);
    }
}
