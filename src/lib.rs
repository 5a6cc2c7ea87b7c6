//! **scopegraph** - Heuristic call-graph extraction for C, C++, Java, TypeScript and Python
//!
//! Character-level scope automata find function definitions and call sites
//! without a full parser. Results land in a name-keyed graph that can be
//! snapshotted, annotated with semantic vectors, and queried.

/// Command-line interface with clap integration
pub mod cli;

/// Shell completion generation
pub mod completion;

/// Scope automata - depth tracking over a character stream
pub mod scope {
    /// Shared event type, tracker trait and capture flavor
    pub mod tracker;
    pub use tracker::{CaptureFlavor, ScopeEvent, ScopeTracker};

    /// Depth counter for a single bracket pair
    pub mod counter;
    pub use counter::BracketCounter;

    /// Brace-delimited scopes with quote and comment awareness
    pub mod braced;
    pub use braced::{BracedScope, C_QUOTES, SCRIPT_QUOTES, ScopeToken};

    /// Indentation-delimited scopes (Python)
    pub mod indent;
    pub use indent::IndentScope;
}

/// Language processing - per-grammar function extractors
pub mod parsers {
    /// Cursor, parser state and bounded backward search
    pub mod cursor;

    /// Keyword sets and identifier tracking
    pub mod words;

    /// Forward strategy: name and argument list first, then body
    pub mod forward;

    /// Backward strategy: opening brace first, then signature lookback
    pub mod backward;

    pub mod c_parser;
    pub use c_parser::CExtractor;

    pub mod java_parser;
    pub use java_parser::JavaExtractor;

    pub mod cpp_parser;
    pub use cpp_parser::CppExtractor;

    pub mod typescript_parser;
    pub use typescript_parser::TypeScriptExtractor;

    pub mod python_parser;
    pub use python_parser::PythonExtractor;

    // Re-export common extractor interface
    pub use crate::core::functions::{FunctionExtractor, get_extractor};
}

/// Function graph - nodes, edge resolution and snapshots
pub mod graph {
    pub mod function_graph;
    pub use function_graph::{
        EdgeReport, FunctionGraph, FunctionNode, GraphError, ImportEdges, ImportView,
    };

    /// Single-document and sharded persistence
    pub mod snapshot;
    pub use snapshot::{Manifest, ShardSlot};

    /// Graphviz export via petgraph
    pub mod dot;
}

/// Semantic vectors - provider seam and annotation pass
pub mod embedding {
    pub mod vector;
    pub use vector::{DIMENSIONS, Embedding, dot};

    pub mod provider;
    pub use provider::{BatchEmbedding, EmbedError, EmbeddingProvider};

    /// HTTP provider for OpenAI-compatible endpoints
    pub mod openai;
    pub use openai::{DEFAULT_BASE_URL, DEFAULT_MODEL, OpenAiProvider};

    /// Batched, retrying annotation of a graph
    pub mod annotate;
    pub use annotate::{AnnotateOptions, AnnotationReport, Gap, annotate};
}

/// Core pipeline - records, building and the command implementations
pub mod core {
    /// Function records, languages and the extractor registry
    pub mod functions;
    pub use functions::{
        ExtractError, ExtractOptions, FileExtraction, FunctionRecord, Language, Truncation,
        TruncationReason,
    };

    /// Snapshot location helpers shared by the commands
    pub mod store;

    /// Walk, extract in parallel, merge, resolve, save
    pub mod build;
    pub use build::{BuildSettings, BuildSummary, build_graph, run as build_run};

    pub mod embed;
    pub use embed::run as embed_run;

    /// Similarity ranking over annotated nodes
    pub mod query;
    pub use query::{rank, run as query_run};

    pub mod show;
    pub use show::run as show_run;

    /// Reverse edge context editing
    pub mod context;
    pub use context::run as context_run;
}

/// Infrastructure - configuration, I/O, walking and logging
pub mod infra {
    /// Layered configuration with TOML/YAML/JSON files and env overrides
    pub mod config;
    pub use self::config::{Config, init as config_init, load_config, load_config_in};

    /// Memory-mapped file I/O for large files (>1MB threshold)
    pub mod io;
    pub use io::{read_file_smart, read_lines};

    /// Gitignore-aware source discovery
    pub mod walk;
    pub use walk::SourceWalker;

    /// tracing subscriber setup
    pub mod logging;
}

// Strategic re-exports for clean CLI interface
pub use cli::{AppContext, Cli, Commands};
pub use self::core::{build_run, context_run, embed_run, query_run, show_run};
pub use infra::{Config, SourceWalker, load_config};

// Core types for external consumers
pub use self::core::{FunctionRecord, Language};
pub use graph::{FunctionGraph, FunctionNode};
