//! File-backed stores for entities and predicates.
//!
//! Both stores share one SQLite database and are handed their `Db`
//! explicitly; tests build their own stores over temporary databases.

mod entities;
mod predicates;

pub use entities::{EntityStore, EntityUpdate, NewEntity};
pub use predicates::{NewPredicate, PredicateFilter, PredicateStore, PredicateUpdate};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::id::CanonicalId;

/// A content entity (concept, resource or topic). The type tag is the
/// id's kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: CanonicalId,
    pub name: String,
    pub description: Option<String>,
    /// Hierarchy markers. Set on topics; a resource carrying either marker
    /// takes the topic role during classification.
    #[serde(default)]
    pub has_part: Vec<CanonicalId>,
    #[serde(default)]
    pub is_part_of: Vec<CanonicalId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity {
    /// True when either hierarchy marker is present.
    pub fn has_hierarchy_markers(&self) -> bool {
        !self.has_part.is_empty() || !self.is_part_of.is_empty()
    }
}

/// Durable edge record: one subject, one or more targets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Predicate {
    pub id: CanonicalId,
    pub name: String,
    pub property_id: Option<String>,
    pub value: Option<String>,
    pub subject_id: CanonicalId,
    pub targets: Vec<CanonicalId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Predicate {
    /// Primary edge target: the first member of the target collection.
    pub fn primary_target(&self) -> Option<&CanonicalId> {
        self.targets.first()
    }
}

fn encode_id_list(ids: &[CanonicalId]) -> Result<String> {
    Ok(serde_json::to_string(ids)?)
}

fn decode_id_list(json: Option<&str>) -> Result<Vec<CanonicalId>> {
    match json {
        Some(s) if !s.is_empty() => Ok(serde_json::from_str(s)?),
        _ => Ok(Vec::new()),
    }
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            crate::error::ContentGraphError::Validation(format!("bad stored timestamp {:?}: {}", s, e))
        })
}
