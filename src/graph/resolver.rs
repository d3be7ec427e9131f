//! Relationship resolver: create/read/update/delete/list over
//! relationship views.
//!
//! The resolver is the only writer of relationship semantics; it owns the
//! existence checks and classification that turn a raw predicate into a
//! `Relationship`. The existence check and the subsequent predicate write
//! are not atomic: a concurrent delete of an endpoint between the two
//! steps leaves a dangling predicate, which `validate_graph` reports.

use serde::{Deserialize, Serialize};

use crate::error::{ContentGraphError, Result};
use crate::id::CanonicalId;
use crate::store::{
    Entity, EntityStore, NewPredicate, Predicate, PredicateFilter, PredicateStore, PredicateUpdate,
};

use super::{classify, RelationshipType};

/// Derived relationship view; recomputed from a predicate plus its two
/// classified endpoints, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    pub id: CanonicalId,
    pub kind: RelationshipType,
    pub source_id: CanonicalId,
    pub target_id: CanonicalId,
    pub predicate_id: CanonicalId,
    pub name: String,
    pub property_id: Option<String>,
    pub value: Option<String>,
}

/// Inline predicate fields for relationship creation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PredicateDraft {
    pub name: String,
    pub property_id: Option<String>,
    pub value: Option<String>,
}

impl PredicateDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            property_id: None,
            value: None,
        }
    }

    pub fn property_id(mut self, property_id: impl Into<String>) -> Self {
        self.property_id = Some(property_id.into());
        self
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

/// Where the edge record for a new relationship comes from: an existing
/// predicate used as a template, or inline fields. Either way a fresh
/// record is created; an existing predicate is never mutated in place.
#[derive(Debug, Clone)]
pub enum PredicateInput {
    Existing(CanonicalId),
    Inline(PredicateDraft),
}

/// Listing filter; all present fields are conjunctive.
#[derive(Debug, Clone, Default)]
pub struct RelationshipFilter {
    pub source_id: Option<CanonicalId>,
    pub target_id: Option<CanonicalId>,
    pub kind: Option<RelationshipType>,
}

/// Orchestrates entity lookups, classification and predicate-store calls.
#[derive(Debug, Clone)]
pub struct RelationshipResolver {
    entities: EntityStore,
    predicates: PredicateStore,
}

impl RelationshipResolver {
    pub fn new(entities: EntityStore, predicates: PredicateStore) -> Self {
        Self {
            entities,
            predicates,
        }
    }

    pub fn entities(&self) -> &EntityStore {
        &self.entities
    }

    pub fn predicates(&self) -> &PredicateStore {
        &self.predicates
    }

    async fn require_entity(&self, id: &CanonicalId) -> Result<Entity> {
        self.entities
            .read(id)
            .await?
            .ok_or_else(|| ContentGraphError::NotFound(format!("entity {}", id.qualified())))
    }

    fn view(predicate: Predicate, kind: RelationshipType) -> Result<Relationship> {
        let target_id = predicate.primary_target().cloned().ok_or_else(|| {
            ContentGraphError::Validation(format!(
                "predicate {} has an empty target collection",
                predicate.id.qualified()
            ))
        })?;
        Ok(Relationship {
            id: predicate.id.clone(),
            kind,
            source_id: predicate.subject_id,
            target_id,
            predicate_id: predicate.id,
            name: predicate.name,
            property_id: predicate.property_id,
            value: predicate.value,
        })
    }

    /// Create a relationship between two existing entities. The edge
    /// record is always a fresh predicate with the resolved endpoints as
    /// subject and sole target.
    pub async fn create_relationship(
        &self,
        source_id: &CanonicalId,
        target_id: &CanonicalId,
        input: PredicateInput,
    ) -> Result<Relationship> {
        let source = self.require_entity(source_id).await?;
        let target = self.require_entity(target_id).await?;
        let kind = classify(&source, &target)?;

        let draft = match input {
            PredicateInput::Existing(template_id) => {
                let template = self.predicates.read(&template_id).await?.ok_or_else(|| {
                    ContentGraphError::NotFound(format!("predicate {}", template_id.qualified()))
                })?;
                PredicateDraft {
                    name: template.name,
                    property_id: template.property_id,
                    value: template.value,
                }
            }
            PredicateInput::Inline(draft) => draft,
        };

        let predicate = self
            .predicates
            .create(NewPredicate {
                local: None,
                name: draft.name,
                property_id: draft.property_id,
                value: draft.value,
                subject_id: source_id.clone(),
                targets: vec![target_id.clone()],
            })
            .await?;

        log::info!(
            "Created {} relationship {} ({} -> {})",
            kind,
            predicate.id.qualified(),
            source_id.qualified(),
            target_id.qualified()
        );
        Self::view(predicate, kind)
    }

    /// Resolve a relationship view. `None` when the predicate or either
    /// endpoint entity is missing; dangling references are reported by
    /// `validate_graph`, not here.
    pub async fn get_relationship(&self, id: &CanonicalId) -> Result<Option<Relationship>> {
        let Some(predicate) = self.predicates.read(id).await? else {
            return Ok(None);
        };
        let Some(target_id) = predicate.primary_target().cloned() else {
            return Ok(None);
        };
        let Some(source) = self.entities.read(&predicate.subject_id).await? else {
            return Ok(None);
        };
        let Some(target) = self.entities.read(&target_id).await? else {
            return Ok(None);
        };
        let kind = classify(&source, &target)?;
        Ok(Some(Self::view(predicate, kind)?))
    }

    /// Update the mutable fields of a relationship. Subject, target and
    /// kind are immutable after creation.
    pub async fn update_relationship(
        &self,
        id: &CanonicalId,
        update: PredicateUpdate,
    ) -> Result<Relationship> {
        let updated = self.predicates.update(id, update).await?.ok_or_else(|| {
            ContentGraphError::NotFound(format!("relationship {}", id.qualified()))
        })?;

        let target_id = updated.primary_target().cloned().ok_or_else(|| {
            ContentGraphError::Validation(format!(
                "predicate {} has an empty target collection",
                updated.id.qualified()
            ))
        })?;
        let source = self.require_entity(&updated.subject_id).await?;
        let target = self.require_entity(&target_id).await?;
        let kind = classify(&source, &target)?;
        Self::view(updated, kind)
    }

    /// Delete the underlying predicate; false when it was absent.
    pub async fn delete_relationship(&self, id: &CanonicalId) -> Result<bool> {
        let deleted = self.predicates.delete(id).await?;
        if deleted {
            log::info!("Deleted relationship {}", id.qualified());
        }
        Ok(deleted)
    }

    /// List relationship views matching the filter. Predicates whose
    /// endpoints cannot be resolved or classified are skipped silently.
    pub async fn list_relationships(
        &self,
        filter: &RelationshipFilter,
    ) -> Result<Vec<Relationship>> {
        let predicates = self
            .predicates
            .list(PredicateFilter {
                subject_id: filter.source_id.clone(),
                target_id: filter.target_id.clone(),
            })
            .await?;

        let mut relationships = Vec::new();
        for predicate in predicates {
            let Some(target_id) = predicate.primary_target().cloned() else {
                continue;
            };
            let Some(source) = self.entities.read(&predicate.subject_id).await? else {
                continue;
            };
            let Some(target) = self.entities.read(&target_id).await? else {
                continue;
            };
            let Ok(kind) = classify(&source, &target) else {
                continue;
            };
            if let Some(want) = filter.kind {
                if kind != want {
                    continue;
                }
            }
            relationships.push(Self::view(predicate, kind)?);
        }
        Ok(relationships)
    }
}
