//! `mindtree list`: print the nodes and edges of a document.

use std::path::Path;

use anyhow::Result;

use crate::graph::model::Graph;
use crate::parser::document;

pub fn run(file: &Path) -> Result<()> {
    let graph = document::load(file)?;
    for line in list_lines(&graph) {
        println!("  {}", line);
    }
    Ok(())
}

/// Nodes in document order, then edges by node index.
fn list_lines(graph: &Graph) -> Vec<String> {
    let mut lines = Vec::new();
    for (index, node) in graph.nodes().iter().enumerate() {
        let marker = if node.active { "*" } else { " " };
        lines.push(format!(
            "{marker}{index:>3}  ({:.0}, {:.0})  x{:.2}  {}",
            node.pos.x,
            node.pos.y,
            node.scale,
            node.content.replace('\n', " / ")
        ));
    }

    let edges = graph.all_edges();
    if edges.is_empty() {
        lines.push("No edges.".to_string());
        return lines;
    }
    for edge in edges {
        let (Some(src), Some(dst)) = (
            graph.index_of(edge.source),
            graph.index_of(edge.destination),
        ) else {
            continue;
        };
        let kind = if edge.secondary { " (secondary)" } else { "" };
        lines.push(format!("{src} -> {dst}{kind}"));
    }
    lines
}
