pub mod config;
pub mod db;
pub mod error;
pub mod graph;
pub mod id;
pub mod store;

pub use config::Config;
pub use error::{ContentGraphError, Result};
pub use graph::{
    build_graph, classify, export_graph, find_paths, validate_graph, Graph, GraphEdge, GraphFilter,
    GraphNode, GraphPath, PredicateDraft, PredicateInput, Relationship, RelationshipFilter,
    RelationshipResolver, RelationshipType, ValidationReport,
};
pub use id::{CanonicalId, EntityKind};
