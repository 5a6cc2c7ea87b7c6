//! Graphviz export of the forward edges.

use std::collections::HashMap;

use petgraph::{
    dot::{Config, Dot},
    graph::{DiGraph, NodeIndex},
};

use super::function_graph::FunctionGraph;

impl FunctionGraph {
    /// Forward edges as a petgraph graph; isolated nodes are kept.
    pub fn to_petgraph(&self) -> DiGraph<&str, &str> {
        let mut graph = DiGraph::with_capacity(self.len(), self.edge_count());
        let mut index: HashMap<&str, NodeIndex> = HashMap::with_capacity(self.len());

        for node in self.functions() {
            index.insert(node.name.as_str(), graph.add_node(node.name.as_str()));
        }
        for (caller, callees) in self.dependencies() {
            let Some(&from) = index.get(caller) else {
                continue;
            };
            for callee in callees {
                if let Some(&to) = index.get(callee.as_str()) {
                    graph.add_edge(from, to, "");
                }
            }
        }
        graph
    }

    /// DOT source for the call graph.
    pub fn to_dot(&self) -> String {
        let graph = self.to_petgraph();
        format!("{}", Dot::with_config(&graph, &[Config::EdgeNoLabel]))
    }
}
