//! Predicate store: CRUD over the durable edge records.
//!
//! Structural fields (subject, target collection) are fixed at creation;
//! the update type only carries the mutable descriptive fields.

use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use crate::db::Db;
use crate::error::{ContentGraphError, Result};
use crate::id::{CanonicalId, EntityKind};

use super::{decode_id_list, encode_id_list, parse_timestamp, Predicate};

const PREDICATE_COLUMNS: &str =
    "predicate_id, name, property_id, value, subject_id, targets_json, created_at, updated_at";

type PredicateRow = (
    CanonicalId,
    String,
    Option<String>,
    Option<String>,
    CanonicalId,
    String,
    String,
    String,
);

fn read_predicate_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PredicateRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
    ))
}

fn hydrate(row: PredicateRow) -> Result<Predicate> {
    let (id, name, property_id, value, subject_id, targets_json, created_at, updated_at) = row;
    Ok(Predicate {
        id,
        name,
        property_id,
        value,
        subject_id,
        targets: decode_id_list(Some(&targets_json))?,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

/// Input for predicate creation.
#[derive(Debug, Clone)]
pub struct NewPredicate {
    /// Explicit local code; a UUID v4 is minted when absent.
    pub local: Option<String>,
    pub name: String,
    pub property_id: Option<String>,
    pub value: Option<String>,
    pub subject_id: CanonicalId,
    pub targets: Vec<CanonicalId>,
}

impl NewPredicate {
    pub fn new(name: impl Into<String>, subject_id: CanonicalId, targets: Vec<CanonicalId>) -> Self {
        Self {
            local: None,
            name: name.into(),
            property_id: None,
            value: None,
            subject_id,
            targets,
        }
    }

    pub fn local(mut self, local: impl Into<String>) -> Self {
        self.local = Some(local.into());
        self
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

/// Partial update over the mutable, non-structural fields.
#[derive(Debug, Clone, Default)]
pub struct PredicateUpdate {
    pub name: Option<String>,
    pub property_id: Option<String>,
    pub value: Option<String>,
}

/// Listing filter; both fields are conjunctive when present. The target
/// filter matches the primary target only.
#[derive(Debug, Clone, Default)]
pub struct PredicateFilter {
    pub subject_id: Option<CanonicalId>,
    pub target_id: Option<CanonicalId>,
}

/// CRUD over predicate records, keyed by canonical id.
#[derive(Debug, Clone)]
pub struct PredicateStore {
    db: Db,
}

impl PredicateStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Create a new predicate record; the target collection must be
    /// non-empty.
    pub async fn create(&self, input: NewPredicate) -> Result<Predicate> {
        if input.targets.is_empty() {
            return Err(ContentGraphError::Validation(
                "predicate requires at least one target".to_string(),
            ));
        }

        let id = match input.local {
            Some(local) => CanonicalId::new(EntityKind::Predicate, local)?,
            None => CanonicalId::generate(EntityKind::Predicate),
        };
        let now = Utc::now();
        let predicate = Predicate {
            id,
            name: input.name,
            property_id: input.property_id,
            value: input.value,
            subject_id: input.subject_id,
            targets: input.targets,
            created_at: now,
            updated_at: now,
        };

        let row = predicate.clone();
        self.db
            .with_connection(move |conn| {
                let targets_json = encode_id_list(&row.targets)?;
                conn.execute(
                    "INSERT INTO predicates (predicate_id, name, property_id, value, subject_id, targets_json, target_id, created_at, updated_at) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                    params![
                        row.id,
                        row.name,
                        row.property_id,
                        row.value,
                        row.subject_id,
                        targets_json,
                        row.targets[0],
                        row.created_at.to_rfc3339(),
                        row.updated_at.to_rfc3339(),
                    ],
                )
                .map_err(|e| match e {
                    rusqlite::Error::SqliteFailure(f, _)
                        if f.code == rusqlite::ErrorCode::ConstraintViolation =>
                    {
                        ContentGraphError::Validation(format!(
                            "predicate {} already exists",
                            row.id.qualified()
                        ))
                    }
                    other => ContentGraphError::Database(other),
                })?;
                Ok(())
            })
            .await?;

        log::debug!(
            "Created predicate {} ({} -> {})",
            predicate.id.qualified(),
            predicate.subject_id.qualified(),
            predicate.targets[0].qualified()
        );
        Ok(predicate)
    }

    /// Read a predicate by canonical id; `None` when absent.
    pub async fn read(&self, id: &CanonicalId) -> Result<Option<Predicate>> {
        let id = id.clone();
        self.db
            .with_connection(move |conn| {
                let row: Option<PredicateRow> = conn
                    .query_row(
                        &format!(
                            "SELECT {} FROM predicates WHERE predicate_id = ?1",
                            PREDICATE_COLUMNS
                        ),
                        params![id],
                        read_predicate_row,
                    )
                    .optional()?;
                row.map(hydrate).transpose()
            })
            .await
    }

    /// Update the descriptive fields; `None` when the predicate is absent.
    /// Subject and targets are immutable after creation.
    pub async fn update(
        &self,
        id: &CanonicalId,
        update: PredicateUpdate,
    ) -> Result<Option<Predicate>> {
        let id = id.clone();
        self.db
            .with_connection(move |conn| {
                let row: Option<PredicateRow> = conn
                    .query_row(
                        &format!(
                            "SELECT {} FROM predicates WHERE predicate_id = ?1",
                            PREDICATE_COLUMNS
                        ),
                        params![id],
                        read_predicate_row,
                    )
                    .optional()?;
                let Some(mut predicate) = row.map(hydrate).transpose()? else {
                    return Ok(None);
                };

                if let Some(name) = update.name {
                    predicate.name = name;
                }
                if let Some(property_id) = update.property_id {
                    predicate.property_id = Some(property_id);
                }
                if let Some(value) = update.value {
                    predicate.value = Some(value);
                }
                predicate.updated_at = Utc::now();

                conn.execute(
                    "UPDATE predicates SET name = ?2, property_id = ?3, value = ?4, updated_at = ?5 \
                     WHERE predicate_id = ?1",
                    params![
                        predicate.id,
                        predicate.name,
                        predicate.property_id,
                        predicate.value,
                        predicate.updated_at.to_rfc3339(),
                    ],
                )?;
                Ok(Some(predicate))
            })
            .await
    }

    /// Delete a predicate; false when it was absent.
    pub async fn delete(&self, id: &CanonicalId) -> Result<bool> {
        let id = id.clone();
        self.db
            .with_connection(move |conn| {
                let n = conn.execute(
                    "DELETE FROM predicates WHERE predicate_id = ?1",
                    params![id],
                )?;
                Ok(n > 0)
            })
            .await
    }

    /// List predicates matching the filter.
    pub async fn list(&self, filter: PredicateFilter) -> Result<Vec<Predicate>> {
        self.db
            .with_connection(move |conn| {
                let mut sql = format!("SELECT {} FROM predicates", PREDICATE_COLUMNS);
                let mut clauses: Vec<&str> = Vec::new();
                let mut bound: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
                if let Some(subject_id) = filter.subject_id {
                    clauses.push("subject_id = ?");
                    bound.push(Box::new(subject_id));
                }
                if let Some(target_id) = filter.target_id {
                    clauses.push("target_id = ?");
                    bound.push(Box::new(target_id));
                }
                if !clauses.is_empty() {
                    sql.push_str(" WHERE ");
                    sql.push_str(&clauses.join(" AND "));
                }
                sql.push_str(" ORDER BY predicate_id");

                let mut stmt = conn.prepare(&sql)?;
                let rows: Vec<PredicateRow> = stmt
                    .query_map(rusqlite::params_from_iter(bound), read_predicate_row)?
                    .collect::<std::result::Result<_, _>>()?;
                rows.into_iter().map(hydrate).collect()
            })
            .await
    }

    /// Count all predicate records.
    pub async fn count(&self) -> Result<u64> {
        self.db
            .with_connection(|conn| {
                let n: i64 =
                    conn.query_row("SELECT COUNT(*) FROM predicates", [], |row| row.get(0))?;
                Ok(n as u64)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrate;
    use std::path::Path;
    use tempfile::TempDir;

    async fn setup_store() -> (PredicateStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let db = Db::new(&db_path);
        let migrations_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations");
        db.with_connection(move |conn| migrate::run_migrations(conn, &migrations_dir))
            .await
            .unwrap();
        (PredicateStore::new(db), temp_dir)
    }

    fn concept(local: &str) -> CanonicalId {
        CanonicalId::new(EntityKind::Concept, local).unwrap()
    }

    fn resource(local: &str) -> CanonicalId {
        CanonicalId::new(EntityKind::Resource, local).unwrap()
    }

    #[tokio::test]
    async fn test_create_and_read() {
        let (store, _temp) = setup_store().await;

        let created = store
            .create(
                NewPredicate::new("defines", concept("c1"), vec![resource("r1")])
                    .property_id("rel-1")
                    .value("x"),
            )
            .await
            .unwrap();
        assert_eq!(created.id.kind(), EntityKind::Predicate);

        let read = store.read(&created.id).await.unwrap().unwrap();
        assert_eq!(read.name, "defines");
        assert_eq!(read.property_id.as_deref(), Some("rel-1"));
        assert_eq!(read.subject_id, concept("c1"));
        assert_eq!(read.primary_target(), Some(&resource("r1")));
    }

    #[tokio::test]
    async fn test_empty_targets_rejected() {
        let (store, _temp) = setup_store().await;

        let err = store
            .create(NewPredicate::new("defines", concept("c1"), vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, ContentGraphError::Validation(_)));
    }

    #[tokio::test]
    async fn test_multi_target_round_trip() {
        let (store, _temp) = setup_store().await;

        let targets = vec![resource("r1"), resource("r2")];
        let created = store
            .create(NewPredicate::new("cites", concept("c1"), targets.clone()))
            .await
            .unwrap();

        let read = store.read(&created.id).await.unwrap().unwrap();
        assert_eq!(read.targets, targets);
        assert_eq!(read.primary_target(), Some(&resource("r1")));
    }

    #[tokio::test]
    async fn test_update_descriptive_fields_only() {
        let (store, _temp) = setup_store().await;

        let created = store
            .create(NewPredicate::new("old", concept("c1"), vec![resource("r1")]))
            .await
            .unwrap();

        let updated = store
            .update(
                &created.id,
                PredicateUpdate {
                    name: Some("new".to_string()),
                    value: Some("42".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.name, "new");
        assert_eq!(updated.value.as_deref(), Some("42"));
        // Structural fields untouched
        assert_eq!(updated.subject_id, created.subject_id);
        assert_eq!(updated.targets, created.targets);
    }

    #[tokio::test]
    async fn test_update_missing_returns_none() {
        let (store, _temp) = setup_store().await;
        let ghost = CanonicalId::new(EntityKind::Predicate, "ghost").unwrap();
        let result = store
            .update(&ghost, PredicateUpdate::default())
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_delete() {
        let (store, _temp) = setup_store().await;

        let created = store
            .create(NewPredicate::new("gone", concept("c1"), vec![resource("r1")]))
            .await
            .unwrap();
        assert!(store.delete(&created.id).await.unwrap());
        assert!(!store.delete(&created.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_filters() {
        let (store, _temp) = setup_store().await;

        store
            .create(NewPredicate::new("a", concept("c1"), vec![resource("r1")]))
            .await
            .unwrap();
        store
            .create(NewPredicate::new("b", concept("c1"), vec![resource("r2")]))
            .await
            .unwrap();
        store
            .create(NewPredicate::new("c", concept("c2"), vec![resource("r1")]))
            .await
            .unwrap();

        let all = store.list(PredicateFilter::default()).await.unwrap();
        assert_eq!(all.len(), 3);

        let from_c1 = store
            .list(PredicateFilter {
                subject_id: Some(concept("c1")),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(from_c1.len(), 2);

        let to_r1 = store
            .list(PredicateFilter {
                target_id: Some(resource("r1")),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(to_r1.len(), 2);

        let both = store
            .list(PredicateFilter {
                subject_id: Some(concept("c2")),
                target_id: Some(resource("r1")),
            })
            .await
            .unwrap();
        assert_eq!(both.len(), 1);
        assert_eq!(both[0].name, "c");

        assert_eq!(store.count().await.unwrap(), 3);
    }
}
