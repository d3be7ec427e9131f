//! Graph builder: expands seed relationships into a bounded-depth
//! node/edge snapshot.

use std::collections::HashMap;

use serde_json::json;

use crate::error::Result;
use crate::id::CanonicalId;
use crate::store::Entity;

use super::resolver::{Relationship, RelationshipFilter, RelationshipResolver};
use super::{Graph, GraphEdge, GraphNode, RelationshipType};

/// Default expansion bound for graph construction.
pub const DEFAULT_MAX_DEPTH: usize = 10;

/// Selects the seed relationships and bounds the expansion.
#[derive(Debug, Clone)]
pub struct GraphFilter {
    pub source_id: Option<CanonicalId>,
    pub target_id: Option<CanonicalId>,
    pub kind: Option<RelationshipType>,
    pub max_depth: usize,
}

impl Default for GraphFilter {
    fn default() -> Self {
        Self {
            source_id: None,
            target_id: None,
            kind: None,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

fn node_from_entity(entity: &Entity) -> GraphNode {
    GraphNode {
        id: entity.id.qualified(),
        kind: entity.id.kind().name().to_string(),
        name: entity.name.clone(),
        properties: json!({
            "description": entity.description,
            "has_part": entity.has_part,
            "is_part_of": entity.is_part_of,
        }),
    }
}

fn edge_from_relationship(rel: &Relationship) -> GraphEdge {
    GraphEdge {
        id: rel.id.qualified(),
        source: rel.source_id.qualified(),
        target: rel.target_id.qualified(),
        label: rel.name.clone(),
        properties: json!({
            "kind": rel.kind,
            "property_id": rel.property_id,
            "value": rel.value,
        }),
    }
}

/// Build a graph snapshot from the relationships selected by `filter`.
///
/// Expansion follows both outgoing and incoming relationships of every
/// materialized node. The already-materialized check is the cycle-safety
/// mechanism; `max_depth` bounds total work on top of it. Entities that
/// cannot be resolved are skipped silently.
pub async fn build_graph(resolver: &RelationshipResolver, filter: &GraphFilter) -> Result<Graph> {
    let seeds = resolver
        .list_relationships(&RelationshipFilter {
            source_id: filter.source_id.clone(),
            target_id: filter.target_id.clone(),
            kind: filter.kind,
        })
        .await?;

    let mut nodes: HashMap<String, GraphNode> = HashMap::new();
    let mut edges: HashMap<String, GraphEdge> = HashMap::new();

    // Worklist of (node, depth) pairs standing in for the recursive visit
    let mut pending: Vec<(CanonicalId, usize)> = Vec::new();
    if let Some(id) = &filter.source_id {
        pending.push((id.clone(), 0));
    } else if let Some(id) = &filter.target_id {
        pending.push((id.clone(), 0));
    } else {
        for rel in &seeds {
            pending.push((rel.source_id.clone(), 0));
        }
    }

    while let Some((id, depth)) = pending.pop() {
        if depth > filter.max_depth {
            continue;
        }
        let key = id.qualified();
        if nodes.contains_key(&key) {
            continue;
        }
        let Some(entity) = resolver.entities().read(&id).await? else {
            continue;
        };
        nodes.insert(key, node_from_entity(&entity));

        let outgoing = resolver
            .list_relationships(&RelationshipFilter {
                source_id: Some(id.clone()),
                target_id: None,
                kind: filter.kind,
            })
            .await?;
        let incoming = resolver
            .list_relationships(&RelationshipFilter {
                source_id: None,
                target_id: Some(id.clone()),
                kind: filter.kind,
            })
            .await?;

        for rel in outgoing.iter().chain(incoming.iter()) {
            edges
                .entry(rel.id.qualified())
                .or_insert_with(|| edge_from_relationship(rel));
            let neighbour = if rel.source_id == id {
                rel.target_id.clone()
            } else {
                rel.source_id.clone()
            };
            pending.push((neighbour, depth + 1));
        }
    }

    log::debug!(
        "Built graph with {} nodes and {} edges",
        nodes.len(),
        edges.len()
    );
    Ok(Graph {
        nodes: nodes.into_values().collect(),
        edges: edges.into_values().collect(),
    })
}
