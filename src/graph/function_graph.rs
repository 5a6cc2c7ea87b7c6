//! Function graph: node table, forward and reverse edges, and the queue of
//! raw call names that edge resolution works from.
//!
//! Nodes are keyed by qualified name (`Class.method`). Edge tables store
//! node keys; accessors hand back the nodes themselves.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::{core::functions::FunctionRecord, embedding::Embedding};

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("caller {0} is queued for edges but has no node")]
    MissingCaller(String),

    #[error("{table} references unknown function {name}")]
    DanglingEdge { table: &'static str, name: String },

    #[error("snapshot I/O on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("snapshot JSON in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid snapshot manifest: {0}")]
    Manifest(String),
}

/// A function as stored in the graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionNode {
    pub name: String,
    pub filename: String,
    pub signature: String,
    pub definition: Vec<String>,
    pub definition_line: usize,
    pub declaration_line: usize,
    #[serde(default)]
    pub embedding: Embedding,
}

impl From<FunctionRecord> for FunctionNode {
    fn from(record: FunctionRecord) -> Self {
        Self {
            name: record.name,
            filename: record.filename,
            signature: record.signature,
            definition: record.definition,
            definition_line: record.definition_line,
            declaration_line: record.declaration_line,
            embedding: record.embedding,
        }
    }
}

/// Reverse edges into one function.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportEdges {
    pub functions: Vec<String>,
    #[serde(default)]
    pub context: String,
}

/// Borrowed view of a function's callers.
#[derive(Debug, Clone, Default)]
pub struct ImportView<'g> {
    pub functions: Vec<&'g FunctionNode>,
    pub context: &'g str,
}

/// Outcome of one resolution pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EdgeReport {
    pub edges: usize,
    pub unresolved: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionGraph {
    repository: String,
    functions: IndexMap<String, FunctionNode>,
    #[serde(default)]
    dependencies: IndexMap<String, Vec<String>>,
    #[serde(default)]
    imports: IndexMap<String, ImportEdges>,
    #[serde(default)]
    dependency_queue_set: IndexMap<String, Vec<String>>,
    #[serde(skip)]
    unresolved: IndexSet<String>,
}

impl FunctionGraph {
    pub fn new(repository: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            ..Self::default()
        }
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    /// Insert a record unless its name is taken. Returns whether it was added.
    pub fn add_function(&mut self, record: FunctionRecord) -> bool {
        if self.functions.contains_key(&record.name) {
            debug!(name = %record.name, file = %record.filename, "duplicate function name, keeping first");
            return false;
        }
        let calls: Vec<String> = record.calls.iter().cloned().collect();
        self.dependency_queue_set.insert(record.name.clone(), calls);
        self.functions.insert(record.name.clone(), record.into());
        true
    }

    /// Rebuild forward and reverse edges from the call queue.
    ///
    /// A callee resolves to a node with its exact name, or failing that to
    /// the same name under one of the caller's enclosing qualifiers
    /// (`Outer.Inner.helper`, then `Outer.helper`). Import contexts survive.
    pub fn set_edges(&mut self) -> Result<EdgeReport, GraphError> {
        if let Some(caller) = self
            .dependency_queue_set
            .keys()
            .find(|caller| !self.functions.contains_key(*caller))
        {
            return Err(GraphError::MissingCaller(caller.clone()));
        }

        let mut contexts: IndexMap<String, String> = self
            .imports
            .drain(..)
            .filter(|(_, edges)| !edges.context.is_empty())
            .map(|(name, edges)| (name, edges.context))
            .collect();
        self.dependencies.clear();
        self.unresolved.clear();

        let mut edges = 0;
        for (caller, callees) in &self.dependency_queue_set {
            for callee in callees {
                let Some(target) = self.resolve(caller, callee) else {
                    self.unresolved.insert(callee.clone());
                    continue;
                };

                let forward = self.dependencies.entry(caller.clone()).or_default();
                if forward.contains(&target) {
                    continue;
                }
                forward.push(target.clone());
                edges += 1;

                let reverse = self.imports.entry(target).or_default();
                if !reverse.functions.contains(caller) {
                    reverse.functions.push(caller.clone());
                }
            }
        }

        for (name, edges) in self.imports.iter_mut() {
            if let Some(context) = contexts.swap_remove(name) {
                edges.context = context;
            }
        }

        if !self.unresolved.is_empty() {
            debug!(count = self.unresolved.len(), names = ?self.unresolved, "unresolved calls");
        }
        Ok(EdgeReport {
            edges,
            unresolved: self.unresolved.len(),
        })
    }

    fn resolve(&self, caller: &str, callee: &str) -> Option<String> {
        if self.functions.contains_key(callee) {
            return Some(callee.to_string());
        }
        let mut scope = caller;
        while let Some((outer, _)) = scope.rsplit_once('.') {
            let candidate = format!("{outer}.{callee}");
            if self.functions.contains_key(&candidate) {
                return Some(candidate);
            }
            scope = outer;
        }
        None
    }

    /// Attach free-text context to an existing reverse edge entry.
    pub fn set_import_edge_context(&mut self, name: &str, context: impl Into<String>) -> bool {
        match self.imports.get_mut(name) {
            Some(edges) => {
                edges.context = context.into();
                true
            }
            None => false,
        }
    }

    pub fn function(&self, name: &str) -> Option<&FunctionNode> {
        self.functions.get(name)
    }

    /// Callees of `name`, or `None` when it calls nothing known.
    pub fn dependencies_of(&self, name: &str) -> Option<Vec<&FunctionNode>> {
        self.dependencies
            .get(name)
            .map(|callees| callees.iter().filter_map(|c| self.functions.get(c)).collect())
    }

    /// Callers of `name`; empty when nothing calls it.
    pub fn imports_of(&self, name: &str) -> ImportView<'_> {
        match self.imports.get(name) {
            Some(edges) => ImportView {
                functions: edges
                    .functions
                    .iter()
                    .filter_map(|c| self.functions.get(c))
                    .collect(),
                context: &edges.context,
            },
            None => ImportView::default(),
        }
    }

    pub fn set_embedding(&mut self, name: &str, embedding: Embedding) -> bool {
        match self.functions.get_mut(name) {
            Some(node) => {
                node.embedding = embedding;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Number of forward edges.
    pub fn edge_count(&self) -> usize {
        self.dependencies.values().map(Vec::len).sum()
    }

    pub fn functions(&self) -> impl Iterator<Item = &FunctionNode> {
        self.functions.values()
    }

    pub(crate) fn functions_mut(&mut self) -> impl Iterator<Item = &mut FunctionNode> {
        self.functions.values_mut()
    }

    /// Forward edge table as `(caller, callees)`.
    pub fn dependencies(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.dependencies
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Reverse edge table as `(callee, edges)`.
    pub fn imports(&self) -> impl Iterator<Item = (&str, &ImportEdges)> {
        self.imports.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Raw call names queued for `name`.
    pub fn queued_calls(&self, name: &str) -> Option<&[String]> {
        self.dependency_queue_set.get(name).map(Vec::as_slice)
    }

    /// Call names that matched no node in the last resolution pass.
    pub fn unresolved(&self) -> impl Iterator<Item = &str> {
        self.unresolved.iter().map(String::as_str)
    }

    /// Check that every edge endpoint names a node.
    pub fn validate(&self) -> Result<(), GraphError> {
        let dangling = |table: &'static str, name: &str| GraphError::DanglingEdge {
            table,
            name: name.to_string(),
        };

        for (caller, callees) in &self.dependencies {
            if let Some(bad) = std::iter::once(caller)
                .chain(callees)
                .find(|n| !self.functions.contains_key(*n))
            {
                return Err(dangling("dependencies", bad));
            }
        }
        for (callee, edges) in &self.imports {
            if let Some(bad) = std::iter::once(callee)
                .chain(&edges.functions)
                .find(|n| !self.functions.contains_key(*n))
            {
                return Err(dangling("imports", bad));
            }
        }
        if let Some(bad) = self
            .dependency_queue_set
            .keys()
            .find(|n| !self.functions.contains_key(*n))
        {
            return Err(dangling("dependencyQueueSet", bad));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, calls: &[&str]) -> FunctionRecord {
        let mut r = FunctionRecord::new(name, "src/a.c", format!("int {name}()"));
        for c in calls {
            r.add_call(c);
        }
        r
    }

    #[test]
    fn first_writer_wins() {
        let mut g = FunctionGraph::new("/repo");
        assert!(g.add_function(record("f", &["a"])));
        let mut other = record("f", &["b"]);
        other.filename = "src/b.c".into();
        assert!(!g.add_function(other));

        assert_eq!(g.len(), 1);
        assert_eq!(g.function("f").unwrap().filename, "src/a.c");
        assert_eq!(g.queued_calls("f"), Some(&["a".to_string()][..]));
    }

    #[test]
    fn edges_link_callers_and_callees() {
        let mut g = FunctionGraph::new("/repo");
        g.add_function(record("add", &[]));
        g.add_function(record("main", &["add", "printf"]));

        let report = g.set_edges().unwrap();
        assert_eq!(report, EdgeReport { edges: 1, unresolved: 1 });

        let deps: Vec<&str> = g
            .dependencies_of("main")
            .unwrap()
            .iter()
            .map(|n| n.name.as_str())
            .collect();
        assert_eq!(deps, vec!["add"]);

        let callers: Vec<&str> = g.imports_of("add").functions.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(callers, vec!["main"]);
        assert!(g.dependencies_of("add").is_none());
        assert!(g.imports_of("main").functions.is_empty());
        assert_eq!(g.unresolved().collect::<Vec<_>>(), vec!["printf"]);
    }

    #[test]
    fn callee_resolves_through_caller_qualifier() {
        let mut g = FunctionGraph::new("");
        g.add_function(record("Calc.sum", &["check"]));
        g.add_function(record("Calc.check", &[]));
        g.add_function(record("Outer.Inner.run", &["sum", "helper"]));
        g.add_function(record("Outer.helper", &[]));
        g.set_edges().unwrap();

        assert_eq!(g.dependencies_of("Calc.sum").unwrap()[0].name, "Calc.check");
        let run: Vec<&str> = g
            .dependencies_of("Outer.Inner.run")
            .unwrap()
            .iter()
            .map(|n| n.name.as_str())
            .collect();
        assert_eq!(run, vec!["Outer.helper"]);
    }

    #[test]
    fn set_edges_is_idempotent_and_keeps_context() {
        let mut g = FunctionGraph::new("");
        g.add_function(record("a", &["b"]));
        g.add_function(record("b", &[]));
        g.set_edges().unwrap();
        assert!(g.set_import_edge_context("b", "used for parsing"));
        assert!(!g.set_import_edge_context("a", "nobody calls a"));

        let before = g.clone();
        g.set_edges().unwrap();
        assert_eq!(g, before);
        assert_eq!(g.imports_of("b").context, "used for parsing");
    }

    #[test]
    fn declared_helper_links_once_defined() {
        let mut g = FunctionGraph::new("");
        g.add_function(record("main", &["helper"]));
        g.set_edges().unwrap();
        assert!(g.dependencies_of("main").is_none());

        g.add_function(record("helper", &[]));
        g.set_edges().unwrap();
        assert_eq!(g.dependencies_of("main").unwrap().len(), 1);
        assert_eq!(g.unresolved().count(), 0);
    }

    #[test]
    fn missing_caller_is_fatal_and_leaves_graph_untouched() {
        let mut g = FunctionGraph::new("");
        g.add_function(record("a", &["b"]));
        g.add_function(record("b", &[]));
        g.set_edges().unwrap();

        g.dependency_queue_set.insert("ghost".into(), vec!["a".into()]);
        let before_edges = g.edge_count();
        assert!(matches!(g.set_edges(), Err(GraphError::MissingCaller(name)) if name == "ghost"));
        assert_eq!(g.edge_count(), before_edges);
    }

    #[test]
    fn recursion_is_a_self_edge() {
        let mut g = FunctionGraph::new("");
        g.add_function(record("fact", &["fact"]));
        g.set_edges().unwrap();
        assert_eq!(g.dependencies_of("fact").unwrap()[0].name, "fact");
        assert_eq!(g.imports_of("fact").functions.len(), 1);
    }

    #[test]
    fn validate_reports_dangling_edges() {
        let mut g = FunctionGraph::new("");
        g.add_function(record("a", &["b"]));
        g.add_function(record("b", &[]));
        g.set_edges().unwrap();
        assert!(g.validate().is_ok());

        g.dependencies.insert("a".into(), vec!["zzz".into()]);
        assert!(matches!(
            g.validate(),
            Err(GraphError::DanglingEdge { table: "dependencies", ref name }) if name == "zzz"
        ));
    }

    #[test]
    fn set_embedding_on_known_nodes_only() {
        let mut g = FunctionGraph::new("");
        g.add_function(record("a", &[]));
        assert!(g.set_embedding("a", Embedding::new(vec![1.0])));
        assert!(!g.set_embedding("b", Embedding::new(vec![1.0])));
        assert_eq!(g.function("a").unwrap().embedding.len(), 1);
    }
}
