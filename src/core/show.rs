//! `sgraph show`: print nodes, edge tables, or Graphviz source.

use std::fmt::Write as _;

use anyhow::{Result, bail};
use owo_colors::OwoColorize;

use crate::{
    cli::{AppContext, ShowArgs, ShowView},
    core::store,
    graph::FunctionGraph,
};

/// Paint helper honouring `--no-color`.
struct Style {
    color: bool,
}

impl Style {
    fn name(&self, s: &str) -> String {
        if self.color { s.bold().to_string() } else { s.to_string() }
    }

    fn dim(&self, s: &str) -> String {
        if self.color { s.dimmed().to_string() } else { s.to_string() }
    }
}

fn render_nodes(graph: &FunctionGraph, bodies: bool, style: &Style) -> String {
    let mut out = String::new();
    for node in graph.functions() {
        let location = format!("{}:{}", node.filename, node.definition_line + 1);
        let _ = writeln!(out, "{}  {}", style.name(&node.name), style.dim(&location));
        if bodies {
            for line in &node.definition {
                let _ = writeln!(out, "    {line}");
            }
        }
    }
    out
}

fn render_edges(graph: &FunctionGraph, style: &Style) -> String {
    let mut out = String::new();
    for (caller, callees) in graph.dependencies() {
        let _ = writeln!(out, "{} -> {}", style.name(caller), callees.join(", "));
    }
    out
}

fn render_imports(graph: &FunctionGraph, style: &Style) -> String {
    let mut out = String::new();
    for (callee, edges) in graph.imports() {
        let _ = write!(out, "{} <- {}", style.name(callee), edges.functions.join(", "));
        if !edges.context.is_empty() {
            let _ = write!(out, "  {}", style.dim(&format!("# {}", edges.context)));
        }
        out.push('\n');
    }
    out
}

fn render_unresolved(graph: &FunctionGraph) -> String {
    let mut names: Vec<&str> = graph.unresolved().collect();
    names.sort_unstable();
    names.iter().map(|n| format!("{n}\n")).collect()
}

/// One function with its signature, callees, and callers.
fn render_node(graph: &FunctionGraph, name: &str, bodies: bool, style: &Style) -> Result<String> {
    let Some(node) = graph.function(name) else {
        bail!("No function named `{name}` in the snapshot");
    };

    let mut out = String::new();
    let _ = writeln!(out, "{}", style.name(&node.name));
    let _ = writeln!(
        out,
        "  {}",
        style.dim(&format!("{}:{}", node.filename, node.definition_line + 1))
    );
    let _ = writeln!(out, "  {}", node.signature);

    let callees: Vec<&str> = graph
        .dependencies_of(name)
        .unwrap_or_default()
        .into_iter()
        .map(|n| n.name.as_str())
        .collect();
    let _ = writeln!(out, "  calls:     {}", callees.join(", "));

    let callers = graph.imports_of(name);
    let names: Vec<&str> = callers.functions.iter().map(|n| n.name.as_str()).collect();
    let _ = writeln!(out, "  called by: {}", names.join(", "));
    if !callers.context.is_empty() {
        let _ = writeln!(out, "  context:   {}", callers.context);
    }
    if bodies {
        for line in &node.definition {
            let _ = writeln!(out, "    {line}");
        }
    }
    Ok(out)
}

pub fn render(graph: &FunctionGraph, args: &ShowArgs, color: bool) -> Result<String> {
    let style = Style { color };
    if let Some(name) = &args.name {
        return render_node(graph, name, args.bodies, &style);
    }
    let text = match args.view {
        ShowView::Nodes => render_nodes(graph, args.bodies, &style),
        ShowView::Edges => render_edges(graph, &style),
        ShowView::Imports => render_imports(graph, &style),
        ShowView::Unresolved => render_unresolved(graph),
        ShowView::Dot => graph.to_dot(),
    };
    Ok(text)
}

pub fn run(args: ShowArgs, ctx: &AppContext) -> Result<()> {
    let config = store::config_for(&args.target.path);
    let path = store::snapshot_path(&args.target, &config);
    let mut graph = store::load(&path)?;

    // Unresolved names are not persisted
    if args.view == ShowView::Unresolved {
        graph.set_edges()?;
    }

    print!("{}", render(&graph, &args, !ctx.no_color)?);
    Ok(())
}
