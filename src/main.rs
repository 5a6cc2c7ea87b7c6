use anyhow::Result;
use clap::Parser;
use scopegraph::{
    cli::{AppContext, Cli, Commands},
    infra::logging,
};

fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init(cli.verbose, cli.quiet, cli.no_color);

    // Build a context once, pass everywhere
    let ctx = AppContext {
        quiet: cli.quiet,
        no_color: cli.no_color,
        dry_run: cli.dry_run,
    };

    match cli.command {
        Commands::Build(args) => scopegraph::build_run(args, &ctx),
        Commands::Embed(args) => scopegraph::embed_run(args, &ctx),
        Commands::Query(args) => scopegraph::query_run(args, &ctx),
        Commands::Show(args) => scopegraph::show_run(args, &ctx),
        Commands::Context(args) => scopegraph::context_run(args, &ctx),
        Commands::Init(args) => scopegraph::infra::config::init(args, &ctx),
        Commands::Completions(args) => scopegraph::completion::run(args, &ctx),
    }
}
