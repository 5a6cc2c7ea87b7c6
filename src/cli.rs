use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::scope::CaptureFlavor;

/// Shared application context for global flags
#[derive(Clone, Debug)]
pub struct AppContext {
    pub quiet: bool,    // global --quiet
    pub no_color: bool, // global --no-color
    pub dry_run: bool,  // global --dry-run
}

#[derive(Parser)]
#[command(name = "sgraph")]
#[command(about = "A fast heuristic call-graph extractor for C, C++, Java, TypeScript and Python")]
#[command(version, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Suppress progress bars and non-essential output
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Show what would be done without writing anything
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract functions and call edges into a graph snapshot
    Build(BuildArgs),

    /// Attach semantic vectors to the functions of a snapshot
    Embed(EmbedArgs),

    /// Rank functions by similarity to a prompt
    Query(QueryArgs),

    /// Inspect nodes and edges of a snapshot
    Show(ShowArgs),

    /// Set the context text of a function's reverse edges
    Context(ContextArgs),

    /// Initialize a scopegraph.toml config file
    Init(InitArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Where the snapshot lives
#[derive(Debug, Clone, Args)]
pub struct SnapshotArgs {
    /// Root directory of the analysed source tree
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Snapshot file, or directory for the sharded layout
    /// (default: <path>/scopegraph.json)
    #[arg(short, long)]
    pub snapshot: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CaptureArg {
    /// Quote and comment aware
    Lexical,
    /// Plain bracket counter
    Counting,
}

impl From<CaptureArg> for CaptureFlavor {
    fn from(arg: CaptureArg) -> Self {
        match arg {
            CaptureArg::Lexical => CaptureFlavor::Lexical,
            CaptureArg::Counting => CaptureFlavor::Counting,
        }
    }
}

#[derive(Debug, Parser)]
pub struct BuildArgs {
    #[command(flatten)]
    pub target: SnapshotArgs,

    /// Languages to include (c, cpp, java, typescript, python)
    #[arg(short, long, value_delimiter = ',')]
    pub languages: Vec<String>,

    /// Maximum characters searched backward for a signature
    #[arg(long)]
    pub lookback: Option<usize>,

    /// Backing for balanced sub-scans (C and Java only)
    #[arg(long, value_enum)]
    pub capture: Option<CaptureArg>,

    /// Re-extract even when a snapshot already exists
    #[arg(long)]
    pub rebuild: bool,

    /// Write the sharded layout into this directory instead of one file
    #[arg(long)]
    pub shard: Option<PathBuf>,

    /// Skip *.test.* and *.spec.* files
    #[arg(long)]
    pub skip_tests: bool,
}

#[derive(Debug, Parser)]
pub struct EmbedArgs {
    #[command(flatten)]
    pub target: SnapshotArgs,

    /// Re-embed functions that already have a vector
    #[arg(long)]
    pub force: bool,

    /// Functions per provider request
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Embedding model name
    #[arg(long)]
    pub model: Option<String>,
}

#[derive(Debug, Parser)]
pub struct QueryArgs {
    /// Natural-language description of the code to find
    pub prompt: String,

    #[command(flatten)]
    pub target: SnapshotArgs,

    /// Number of results
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Emit results as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ShowView {
    /// Functions with file and line
    #[default]
    Nodes,
    /// Forward edges (caller -> callee)
    Edges,
    /// Reverse edges (callee <- caller) with context
    Imports,
    /// Calls with no matching definition
    Unresolved,
    /// Graphviz source
    Dot,
}

#[derive(Debug, Parser)]
pub struct ShowArgs {
    /// What to print
    #[arg(value_enum, default_value_t = ShowView::Nodes)]
    pub view: ShowView,

    #[command(flatten)]
    pub target: SnapshotArgs,

    /// Show a single function with its callees and callers
    #[arg(short, long)]
    pub name: Option<String>,

    /// Include function bodies in the node listing
    #[arg(long)]
    pub bodies: bool,
}

#[derive(Debug, Parser)]
pub struct ContextArgs {
    /// Qualified function name
    pub name: String,

    /// Context text attached to the function's callers
    pub text: String,

    #[command(flatten)]
    pub target: SnapshotArgs,
}

#[derive(Debug, Parser)]
pub struct InitArgs {
    /// Directory to initialize config in
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Overwrite existing config file
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

#[derive(Debug, Parser)]
pub struct CompletionsArgs {
    /// Target shell
    #[arg(value_enum)]
    pub shell: Shell,

    /// Output directory; if omitted and --stdout not set, prints error
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Print completion script to stdout instead of a file
    #[arg(long)]
    pub stdout: bool,
}
