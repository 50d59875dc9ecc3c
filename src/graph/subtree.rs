//! Subtree resolution for bulk edits.

use std::collections::HashSet;

use crate::graph::model::{Graph, NodeId};

/// How far a bulk operation reaches from the active node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scope {
    #[default]
    Single,
    Subtree,
}

impl Scope {
    /// The nodes an operation on `node` should touch.
    pub fn resolve(self, graph: &Graph, node: NodeId) -> Vec<NodeId> {
        match self {
            Scope::Single => vec![node],
            Scope::Subtree => subtree_of(graph, node),
        }
    }
}

/// `node` plus every node reachable over tree (non-secondary) edges, in
/// pre-order.
///
/// Removing and re-adding edges can close a loop of tree edges, so visited
/// nodes are tracked.
pub fn subtree_of(graph: &Graph, node: NodeId) -> Vec<NodeId> {
    if !graph.contains(node) {
        return Vec::new();
    }
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    let mut stack = vec![node];
    while let Some(current) = stack.pop() {
        if !seen.insert(current) {
            continue;
        }
        out.push(current);
        let children: Vec<NodeId> = graph
            .incident_edges(current, false)
            .iter()
            .map(|e| e.destination)
            .collect();
        stack.extend(children.into_iter().rev());
    }
    out
}
