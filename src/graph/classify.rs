//! Relationship classification over ordered entity pairs.

use crate::error::{ContentGraphError, Result};
use crate::id::EntityKind;
use crate::store::Entity;

use super::RelationshipType;

/// Classification role of an entity within a relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Concept,
    Resource,
    Topic,
}

/// Topic is checked before the resource fallback: a resource carrying
/// hierarchy markers takes the topic role. Predicate-kind entities have
/// no role and never classify.
fn role_of(entity: &Entity) -> Option<Role> {
    match entity.id.kind() {
        EntityKind::Concept => Some(Role::Concept),
        EntityKind::Topic => Some(Role::Topic),
        EntityKind::Resource if entity.has_hierarchy_markers() => Some(Role::Topic),
        EntityKind::Resource => Some(Role::Resource),
        EntityKind::Predicate => None,
    }
}

/// Classify an ordered entity pair. Only the six documented pairs
/// succeed; classification is not symmetric.
pub fn classify(source: &Entity, target: &Entity) -> Result<RelationshipType> {
    use Role::*;
    match (role_of(source), role_of(target)) {
        (Some(Concept), Some(Concept)) => Ok(RelationshipType::ConceptToConcept),
        (Some(Concept), Some(Topic)) => Ok(RelationshipType::ConceptToTopic),
        (Some(Concept), Some(Resource)) => Ok(RelationshipType::ConceptToResource),
        (Some(Resource), Some(Topic)) => Ok(RelationshipType::ResourceToTopic),
        (Some(Resource), Some(Resource)) => Ok(RelationshipType::ResourceToResource),
        (Some(Topic), Some(Topic)) => Ok(RelationshipType::TopicToTopic),
        _ => Err(ContentGraphError::UnsupportedRelationship(format!(
            "{} ({}) -> {} ({})",
            source.id.qualified(),
            source.id.kind(),
            target.id.qualified(),
            target.id.kind()
        ))),
    }
}
