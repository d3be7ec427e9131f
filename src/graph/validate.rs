//! Graph validator: general cycle detection, referential integrity and
//! topic hierarchy checks.
//!
//! All three checks run over possibly-inconsistent data; findings
//! accumulate as strings and are never raised. Only infrastructure
//! failures (database errors) propagate as `Err`.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::id::{CanonicalId, EntityKind};
use crate::store::PredicateFilter;

use super::builder::{build_graph, GraphFilter};
use super::resolver::RelationshipResolver;
use super::Graph;

/// Bound on ancestor-chain walks in the topic hierarchy check.
const MAX_ANCESTOR_DEPTH: usize = 64;

/// Accumulated integrity findings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
}

/// Run all integrity checks over the full graph; never short-circuits.
pub async fn validate_graph(resolver: &RelationshipResolver) -> Result<ValidationReport> {
    let mut errors = Vec::new();

    let graph = build_graph(resolver, &GraphFilter::default()).await?;
    detect_graph_cycles(&graph, &mut errors);
    check_referential_integrity(resolver, &mut errors).await?;
    check_topic_hierarchy(resolver, &mut errors).await?;

    log::info!("Graph validation finished with {} errors", errors.len());
    Ok(ValidationReport {
        valid: errors.is_empty(),
        errors,
    })
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

struct CycleSearch<'g> {
    adjacency: HashMap<&'g str, Vec<&'g str>>,
    color: HashMap<&'g str, Color>,
    path: Vec<&'g str>,
    errors: Vec<String>,
}

impl<'g> CycleSearch<'g> {
    fn visit(&mut self, node: &'g str) {
        self.color.insert(node, Color::Gray);
        self.path.push(node);

        let next_nodes = self.adjacency.get(node).cloned().unwrap_or_default();
        for next in next_nodes {
            match self.color.get(next).copied().unwrap_or(Color::White) {
                Color::Gray => {
                    // Back-edge: name the full cycle from the first
                    // occurrence of `next` on the stack
                    let start = self.path.iter().position(|&n| n == next).unwrap_or(0);
                    let mut cycle: Vec<&str> = self.path[start..].to_vec();
                    cycle.push(next);
                    self.errors
                        .push(format!("Cycle detected: {}", cycle.join(" -> ")));
                }
                Color::White => self.visit(next),
                Color::Black => {}
            }
        }

        self.path.pop();
        self.color.insert(node, Color::Black);
    }
}

/// White/gray/black DFS over the built graph; every back-edge is
/// reported with its full cycle path.
fn detect_graph_cycles(graph: &Graph, errors: &mut Vec<String>) {
    let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
    let mut color: HashMap<&str, Color> = HashMap::new();

    for node in &graph.nodes {
        color.insert(node.id.as_str(), Color::White);
    }
    for edge in &graph.edges {
        adjacency
            .entry(edge.source.as_str())
            .or_default()
            .push(edge.target.as_str());
        // Boundary edges can reference ids absent from the node list
        color.entry(edge.source.as_str()).or_insert(Color::White);
        color.entry(edge.target.as_str()).or_insert(Color::White);
    }

    let mut search = CycleSearch {
        adjacency,
        color,
        path: Vec::new(),
        errors: Vec::new(),
    };

    let mut starts: Vec<&str> = search.color.keys().copied().collect();
    starts.sort_unstable();
    for start in starts {
        if search.color.get(start).copied() == Some(Color::White) {
            search.visit(start);
        }
    }
    errors.append(&mut search.errors);
}

/// Every predicate's subject and every member of its target collection
/// must resolve to an existing entity.
async fn check_referential_integrity(
    resolver: &RelationshipResolver,
    errors: &mut Vec<String>,
) -> Result<()> {
    let predicates = resolver.predicates().list(PredicateFilter::default()).await?;
    for predicate in predicates {
        if resolver
            .entities()
            .read(&predicate.subject_id)
            .await?
            .is_none()
        {
            errors.push(format!(
                "Predicate {} references missing subject {}",
                predicate.id.qualified(),
                predicate.subject_id.qualified()
            ));
        }
        for target in &predicate.targets {
            if resolver.entities().read(target).await?.is_none() {
                errors.push(format!(
                    "Predicate {} references missing target {}",
                    predicate.id.qualified(),
                    target.qualified()
                ));
            }
        }
    }
    Ok(())
}

/// Walk each topic's `is_part_of` ancestor chain; a topic reachable from
/// itself is reported together with the ancestor that closes the loop.
/// Hierarchy edges are direct entity references, not predicates, so this
/// check is independent of the predicate-graph cycle detection.
async fn check_topic_hierarchy(
    resolver: &RelationshipResolver,
    errors: &mut Vec<String>,
) -> Result<()> {
    let topics = resolver.entities().list(Some(EntityKind::Topic)).await?;
    for topic in &topics {
        let mut pending: Vec<(CanonicalId, usize)> = topic
            .is_part_of
            .iter()
            .map(|id| (id.clone(), 1))
            .collect();
        let mut seen: HashSet<CanonicalId> = HashSet::new();

        while let Some((ancestor_id, depth)) = pending.pop() {
            if depth > MAX_ANCESTOR_DEPTH || !seen.insert(ancestor_id.clone()) {
                continue;
            }
            let Some(ancestor) = resolver.entities().read(&ancestor_id).await? else {
                continue;
            };
            if ancestor.is_part_of.contains(&topic.id) {
                errors.push(format!(
                    "Topic {} has a circular is_part_of reference through {}",
                    topic.id.qualified(),
                    ancestor.id.qualified()
                ));
                continue;
            }
            for parent in &ancestor.is_part_of {
                pending.push((parent.clone(), depth + 1));
            }
        }
    }
    Ok(())
}
