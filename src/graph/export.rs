//! Graph exporter: serializes a built graph snapshot to JSON.

use crate::error::Result;

use super::builder::{build_graph, GraphFilter};
use super::resolver::RelationshipResolver;

/// Build the graph selected by `filter` and serialize it as pretty JSON.
/// Purely a projection over the builder's output.
pub async fn export_graph(resolver: &RelationshipResolver, filter: &GraphFilter) -> Result<String> {
    let graph = build_graph(resolver, filter).await?;
    log::debug!(
        "Exporting graph with {} nodes and {} edges",
        graph.nodes.len(),
        graph.edges.len()
    );
    Ok(serde_json::to_string_pretty(&graph)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{migrate, Db};
    use crate::graph::{Graph, PredicateDraft, PredicateInput, RelationshipResolver};
    use crate::id::{CanonicalId, EntityKind};
    use crate::store::{EntityStore, NewEntity, PredicateStore};
    use std::path::Path;
    use tempfile::TempDir;

    async fn setup_resolver() -> (RelationshipResolver, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let db = Db::new(&db_path);
        let migrations_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations");
        db.with_connection(move |conn| migrate::run_migrations(conn, &migrations_dir))
            .await
            .unwrap();
        let resolver =
            RelationshipResolver::new(EntityStore::new(db.clone()), PredicateStore::new(db));
        (resolver, temp_dir)
    }

    #[tokio::test]
    async fn test_export_round_trips_as_json() {
        let (resolver, _temp) = setup_resolver().await;
        let c1 = resolver
            .entities()
            .create(NewEntity::new(EntityKind::Concept, "c1").local("c1"))
            .await
            .unwrap()
            .id;
        let r1 = resolver
            .entities()
            .create(NewEntity::new(EntityKind::Resource, "r1").local("r1"))
            .await
            .unwrap()
            .id;
        resolver
            .create_relationship(
                &c1,
                &r1,
                PredicateInput::Inline(PredicateDraft::new("defines")),
            )
            .await
            .unwrap();

        let json = export_graph(&resolver, &GraphFilter::default()).await.unwrap();
        let graph: Graph = serde_json::from_str(&json).unwrap();
        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.edges[0].label, "defines");
        assert_eq!(
            graph.edges[0].properties["kind"],
            serde_json::json!("concept-to-resource")
        );
    }

    #[tokio::test]
    async fn test_export_empty_graph() {
        let (resolver, _temp) = setup_resolver().await;
        let json = export_graph(&resolver, &GraphFilter::default()).await.unwrap();
        let graph: Graph = serde_json::from_str(&json).unwrap();
        assert!(graph.nodes.is_empty());
        assert!(graph.edges.is_empty());
    }

    #[tokio::test]
    async fn test_export_respects_filter() {
        let (resolver, _temp) = setup_resolver().await;
        let a = resolver
            .entities()
            .create(NewEntity::new(EntityKind::Concept, "a").local("a"))
            .await
            .unwrap()
            .id;
        let b = resolver
            .entities()
            .create(NewEntity::new(EntityKind::Concept, "b").local("b"))
            .await
            .unwrap()
            .id;
        let lone = CanonicalId::new(EntityKind::Concept, "lone").unwrap();
        resolver
            .entities()
            .create(NewEntity::new(EntityKind::Concept, "lone").local("lone"))
            .await
            .unwrap();
        resolver
            .create_relationship(&a, &b, PredicateInput::Inline(PredicateDraft::new("x")))
            .await
            .unwrap();

        let json = export_graph(
            &resolver,
            &GraphFilter {
                source_id: Some(a.clone()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let graph: Graph = serde_json::from_str(&json).unwrap();
        assert_eq!(graph.nodes.len(), 2);
        assert!(graph.node(&lone.qualified()).is_none());
    }
}
