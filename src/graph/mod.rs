//! Relationship graph subsystem: classification, resolution, traversal,
//! path-finding, validation and export.
//!
//! Predicates are flat edge records; everything here is a transient view
//! computed on demand from the current predicate set.

mod builder;
mod classify;
mod export;
mod paths;
mod resolver;
mod validate;

pub use builder::{build_graph, GraphFilter, DEFAULT_MAX_DEPTH};
pub use classify::classify;
pub use export::export_graph;
pub use paths::{find_paths, GraphPath, DEFAULT_MAX_PATH_DEPTH};
pub use resolver::{
    PredicateDraft, PredicateInput, Relationship, RelationshipFilter, RelationshipResolver,
};
pub use validate::{validate_graph, ValidationReport};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ContentGraphError;

/// Closed set of supported ordered entity-type pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationshipType {
    #[serde(rename = "concept-to-concept")]
    ConceptToConcept,
    #[serde(rename = "concept-to-resource")]
    ConceptToResource,
    #[serde(rename = "concept-to-topic")]
    ConceptToTopic,
    #[serde(rename = "resource-to-resource")]
    ResourceToResource,
    #[serde(rename = "resource-to-topic")]
    ResourceToTopic,
    #[serde(rename = "topic-to-topic")]
    TopicToTopic,
}

impl RelationshipType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipType::ConceptToConcept => "concept-to-concept",
            RelationshipType::ConceptToResource => "concept-to-resource",
            RelationshipType::ConceptToTopic => "concept-to-topic",
            RelationshipType::ResourceToResource => "resource-to-resource",
            RelationshipType::ResourceToTopic => "resource-to-topic",
            RelationshipType::TopicToTopic => "topic-to-topic",
        }
    }
}

impl fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelationshipType {
    type Err = ContentGraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            RelationshipType::ConceptToConcept,
            RelationshipType::ConceptToResource,
            RelationshipType::ConceptToTopic,
            RelationshipType::ResourceToResource,
            RelationshipType::ResourceToTopic,
            RelationshipType::TopicToTopic,
        ]
        .into_iter()
        .find(|t| t.as_str() == s)
        .ok_or_else(|| {
            ContentGraphError::UnsupportedRelationship(format!("unknown relationship type: {}", s))
        })
    }
}

/// One node per distinct entity materialized during traversal. Ids are
/// qualified canonical-id strings so snapshots serialize as plain JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub kind: String,
    pub name: String,
    pub properties: serde_json::Value,
}

/// One edge per distinct predicate id; duplicates are coalesced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub label: String,
    pub properties: serde_json::Value,
}

/// A computed snapshot. Callers must not rely on node or edge order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Graph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl Graph {
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn edge(&self, id: &str) -> Option<&GraphEdge> {
        self.edges.iter().find(|e| e.id == id)
    }
}
