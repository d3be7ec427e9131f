//! Path finder: enumerates simple paths between two nodes with
//! backtracking depth-first search.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::id::CanonicalId;

use super::builder::{build_graph, GraphFilter};
use super::resolver::RelationshipResolver;
use super::{GraphEdge, GraphNode};

/// Default bound on path length (edge count).
pub const DEFAULT_MAX_PATH_DEPTH: usize = 5;

/// An ordered, non-repeating walk from source to target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphPath {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub length: usize,
}

struct PathSearch<'g> {
    target: &'g str,
    adjacency: HashMap<&'g str, Vec<&'g GraphEdge>>,
    nodes_by_id: HashMap<&'g str, &'g GraphNode>,
    max_depth: usize,
    visited: HashSet<&'g str>,
    path_nodes: Vec<&'g GraphNode>,
    path_edges: Vec<&'g GraphEdge>,
    found: Vec<GraphPath>,
}

impl<'g> PathSearch<'g> {
    fn record_current(&mut self) {
        self.found.push(GraphPath {
            nodes: self.path_nodes.iter().map(|n| (*n).clone()).collect(),
            edges: self.path_edges.iter().map(|e| (*e).clone()).collect(),
            length: self.path_edges.len(),
        });
    }

    fn dfs(&mut self, current: &'g str) {
        if current == self.target {
            self.record_current();
            return;
        }
        if self.path_edges.len() >= self.max_depth {
            return;
        }
        let out = match self.adjacency.get(current) {
            Some(edges) => edges.clone(),
            None => return,
        };
        // Classic backtrack: push, recurse, pop
        for edge in out {
            let next = edge.target.as_str();
            if self.visited.contains(next) {
                continue;
            }
            // Edges at the depth boundary may point past the built graph
            let Some(node) = self.nodes_by_id.get(next).copied() else {
                continue;
            };
            self.visited.insert(next);
            self.path_nodes.push(node);
            self.path_edges.push(edge);
            self.dfs(next);
            self.path_edges.pop();
            self.path_nodes.pop();
            self.visited.remove(next);
        }
    }
}

/// Enumerate all simple paths from `source_id` to `target_id` no longer
/// than `max_depth` edges, in DFS discovery order. Returns an empty list
/// when either endpoint is not materialized in the built graph.
pub async fn find_paths(
    resolver: &RelationshipResolver,
    source_id: &CanonicalId,
    target_id: &CanonicalId,
    max_depth: usize,
) -> Result<Vec<GraphPath>> {
    let graph = build_graph(
        resolver,
        &GraphFilter {
            source_id: Some(source_id.clone()),
            max_depth,
            ..Default::default()
        },
    )
    .await?;

    let source = source_id.qualified();
    let target = target_id.qualified();

    let nodes_by_id: HashMap<&str, &GraphNode> =
        graph.nodes.iter().map(|n| (n.id.as_str(), n)).collect();
    let Some(source_node) = nodes_by_id.get(source.as_str()).copied() else {
        return Ok(Vec::new());
    };
    if !nodes_by_id.contains_key(target.as_str()) {
        return Ok(Vec::new());
    }

    let mut adjacency: HashMap<&str, Vec<&GraphEdge>> = HashMap::new();
    for edge in &graph.edges {
        adjacency.entry(edge.source.as_str()).or_default().push(edge);
    }

    let mut search = PathSearch {
        target: target.as_str(),
        adjacency,
        nodes_by_id,
        max_depth,
        visited: HashSet::from([source.as_str()]),
        path_nodes: vec![source_node],
        path_edges: Vec::new(),
        found: Vec::new(),
    };
    search.dfs(source.as_str());

    log::debug!(
        "Found {} paths from {} to {} (max depth {})",
        search.found.len(),
        source,
        target,
        max_depth
    );
    Ok(search.found)
}
