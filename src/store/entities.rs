//! Entity store: CRUD plus count/validate_index over concept, resource and
//! topic records.

use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use crate::db::Db;
use crate::error::{ContentGraphError, Result};
use crate::id::{CanonicalId, EntityKind};

use super::{decode_id_list, encode_id_list, parse_timestamp, Entity};

const ENTITY_COLUMNS: &str =
    "entity_id, name, description, has_part_json, is_part_of_json, created_at, updated_at";

/// Raw column tuple, hydrated into an [`Entity`] after the query.
type EntityRow = (
    CanonicalId,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    String,
    String,
);

fn read_entity_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<EntityRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn hydrate(row: EntityRow) -> Result<Entity> {
    let (id, name, description, has_part_json, is_part_of_json, created_at, updated_at) = row;
    Ok(Entity {
        id,
        name,
        description,
        has_part: decode_id_list(has_part_json.as_deref())?,
        is_part_of: decode_id_list(is_part_of_json.as_deref())?,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

/// Input for entity creation.
#[derive(Debug, Clone)]
pub struct NewEntity {
    pub kind: EntityKind,
    /// Explicit local code; a UUID v4 is minted when absent.
    pub local: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub has_part: Vec<CanonicalId>,
    pub is_part_of: Vec<CanonicalId>,
}

impl NewEntity {
    pub fn new(kind: EntityKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            local: None,
            name: name.into(),
            description: None,
            has_part: Vec::new(),
            is_part_of: Vec::new(),
        }
    }

    pub fn local(mut self, local: impl Into<String>) -> Self {
        self.local = Some(local.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn has_part(mut self, children: Vec<CanonicalId>) -> Self {
        self.has_part = children;
        self
    }

    pub fn is_part_of(mut self, parents: Vec<CanonicalId>) -> Self {
        self.is_part_of = parents;
        self
    }
}

/// Partial update; `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct EntityUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub has_part: Option<Vec<CanonicalId>>,
    pub is_part_of: Option<Vec<CanonicalId>>,
}

/// CRUD over entity records, keyed by canonical id.
#[derive(Debug, Clone)]
pub struct EntityStore {
    db: Db,
}

impl EntityStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Create a new entity; fails on duplicate id or predicate kind.
    pub async fn create(&self, input: NewEntity) -> Result<Entity> {
        if input.kind == EntityKind::Predicate {
            return Err(ContentGraphError::Validation(
                "predicate records are created through the predicate store".to_string(),
            ));
        }

        let id = match input.local {
            Some(local) => CanonicalId::new(input.kind, local)?,
            None => CanonicalId::generate(input.kind),
        };
        let now = Utc::now();
        let entity = Entity {
            id,
            name: input.name,
            description: input.description,
            has_part: input.has_part,
            is_part_of: input.is_part_of,
            created_at: now,
            updated_at: now,
        };

        let row = entity.clone();
        self.db
            .with_connection(move |conn| {
                let has_part_json = encode_id_list(&row.has_part)?;
                let is_part_of_json = encode_id_list(&row.is_part_of)?;
                conn.execute(
                    "INSERT INTO entities (entity_id, kind, name, description, has_part_json, is_part_of_json, created_at, updated_at) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    params![
                        row.id,
                        row.id.kind().name(),
                        row.name,
                        row.description,
                        has_part_json,
                        is_part_of_json,
                        row.created_at.to_rfc3339(),
                        row.updated_at.to_rfc3339(),
                    ],
                )
                .map_err(|e| match e {
                    rusqlite::Error::SqliteFailure(f, _)
                        if f.code == rusqlite::ErrorCode::ConstraintViolation =>
                    {
                        ContentGraphError::Validation(format!(
                            "entity {} already exists",
                            row.id.qualified()
                        ))
                    }
                    other => ContentGraphError::Database(other),
                })?;
                Ok(())
            })
            .await?;

        log::debug!("Created entity {}", entity.id.qualified());
        Ok(entity)
    }

    /// Read an entity by canonical id; `None` when absent.
    pub async fn read(&self, id: &CanonicalId) -> Result<Option<Entity>> {
        let id = id.clone();
        self.db
            .with_connection(move |conn| {
                let row: Option<EntityRow> = conn
                    .query_row(
                        &format!("SELECT {} FROM entities WHERE entity_id = ?1", ENTITY_COLUMNS),
                        params![id],
                        read_entity_row,
                    )
                    .optional()?;
                row.map(hydrate).transpose()
            })
            .await
    }

    /// Apply a partial update; `None` when the entity is absent.
    pub async fn update(&self, id: &CanonicalId, update: EntityUpdate) -> Result<Option<Entity>> {
        let id = id.clone();
        self.db
            .with_connection(move |conn| {
                let row: Option<EntityRow> = conn
                    .query_row(
                        &format!("SELECT {} FROM entities WHERE entity_id = ?1", ENTITY_COLUMNS),
                        params![id],
                        read_entity_row,
                    )
                    .optional()?;
                let Some(mut entity) = row.map(hydrate).transpose()? else {
                    return Ok(None);
                };

                if let Some(name) = update.name {
                    entity.name = name;
                }
                if let Some(description) = update.description {
                    entity.description = Some(description);
                }
                if let Some(has_part) = update.has_part {
                    entity.has_part = has_part;
                }
                if let Some(is_part_of) = update.is_part_of {
                    entity.is_part_of = is_part_of;
                }
                entity.updated_at = Utc::now();

                conn.execute(
                    "UPDATE entities SET name = ?2, description = ?3, has_part_json = ?4, \
                     is_part_of_json = ?5, updated_at = ?6 WHERE entity_id = ?1",
                    params![
                        entity.id,
                        entity.name,
                        entity.description,
                        encode_id_list(&entity.has_part)?,
                        encode_id_list(&entity.is_part_of)?,
                        entity.updated_at.to_rfc3339(),
                    ],
                )?;
                Ok(Some(entity))
            })
            .await
    }

    /// Delete an entity; false when it was absent.
    pub async fn delete(&self, id: &CanonicalId) -> Result<bool> {
        let id = id.clone();
        let deleted = self
            .db
            .with_connection(move |conn| {
                let n = conn.execute("DELETE FROM entities WHERE entity_id = ?1", params![id])?;
                Ok(n > 0)
            })
            .await?;
        Ok(deleted)
    }

    /// List entities, optionally restricted to one kind.
    pub async fn list(&self, kind: Option<EntityKind>) -> Result<Vec<Entity>> {
        self.db
            .with_connection(move |conn| {
                let (sql, kind_name) = match kind {
                    Some(k) => (
                        format!(
                            "SELECT {} FROM entities WHERE kind = ?1 ORDER BY entity_id",
                            ENTITY_COLUMNS
                        ),
                        Some(k.name()),
                    ),
                    None => (
                        format!("SELECT {} FROM entities ORDER BY entity_id", ENTITY_COLUMNS),
                        None,
                    ),
                };
                let mut stmt = conn.prepare(&sql)?;
                let rows: Vec<EntityRow> = match kind_name {
                    Some(k) => stmt
                        .query_map(params![k], read_entity_row)?
                        .collect::<std::result::Result<_, _>>()?,
                    None => stmt
                        .query_map([], read_entity_row)?
                        .collect::<std::result::Result<_, _>>()?,
                };
                rows.into_iter().map(hydrate).collect()
            })
            .await
    }

    /// Count entities, optionally restricted to one kind.
    pub async fn count(&self, kind: Option<EntityKind>) -> Result<u64> {
        self.db
            .with_connection(move |conn| {
                let n: i64 = match kind {
                    Some(k) => conn.query_row(
                        "SELECT COUNT(*) FROM entities WHERE kind = ?1",
                        params![k.name()],
                        |row| row.get(0),
                    )?,
                    None => {
                        conn.query_row("SELECT COUNT(*) FROM entities", [], |row| row.get(0))?
                    }
                };
                Ok(n as u64)
            })
            .await
    }

    /// Check stored ids against the kind column; returns one message per
    /// inconsistent row. An empty result means the index is sound.
    pub async fn validate_index(&self) -> Result<Vec<String>> {
        self.db
            .with_connection(|conn| {
                let mut stmt = conn.prepare("SELECT entity_id, kind FROM entities")?;
                let rows: Vec<(String, String)> = stmt
                    .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                    .collect::<std::result::Result<_, _>>()?;

                let mut problems = Vec::new();
                for (raw_id, kind) in rows {
                    match CanonicalId::parse(&raw_id) {
                        Ok(id) if id.kind().name() != kind => problems.push(format!(
                            "entity {} is indexed under kind {} but its id encodes {}",
                            raw_id,
                            kind,
                            id.kind().name()
                        )),
                        Ok(_) => {}
                        Err(e) => problems.push(format!("entity id {} does not parse: {}", raw_id, e)),
                    }
                }
                Ok(problems)
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

    async fn setup_store() -> (EntityStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let db = Db::new(&db_path);
        let migrations_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations");
        db.with_connection(move |conn| migrate::run_migrations(conn, &migrations_dir))
            .await
            .unwrap();
        (EntityStore::new(db), temp_dir)
    }

    #[tokio::test]
    async fn test_create_and_read() {
        let (store, _temp) = setup_store().await;

        let created = store
            .create(NewEntity::new(EntityKind::Concept, "Gravitation").description("A force"))
            .await
            .unwrap();
        assert_eq!(created.id.kind(), EntityKind::Concept);

        let read = store.read(&created.id).await.unwrap().unwrap();
        assert_eq!(read.name, "Gravitation");
        assert_eq!(read.description.as_deref(), Some("A force"));
        assert!(read.has_part.is_empty());
    }

    #[tokio::test]
    async fn test_create_with_explicit_local() {
        let (store, _temp) = setup_store().await;

        let created = store
            .create(NewEntity::new(EntityKind::Topic, "Physics").local("physics"))
            .await
            .unwrap();
        assert_eq!(created.id.qualified(), "cg:topic:physics");
    }

    #[tokio::test]
    async fn test_duplicate_id_rejected() {
        let (store, _temp) = setup_store().await;

        store
            .create(NewEntity::new(EntityKind::Concept, "One").local("same"))
            .await
            .unwrap();
        let err = store
            .create(NewEntity::new(EntityKind::Concept, "Two").local("same"))
            .await
            .unwrap_err();
        assert!(matches!(err, ContentGraphError::Validation(_)));
    }

    #[tokio::test]
    async fn test_predicate_kind_rejected() {
        let (store, _temp) = setup_store().await;

        let err = store
            .create(NewEntity::new(EntityKind::Predicate, "nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, ContentGraphError::Validation(_)));
    }

    #[tokio::test]
    async fn test_update_fields() {
        let (store, _temp) = setup_store().await;

        let topic = store
            .create(NewEntity::new(EntityKind::Topic, "Old name"))
            .await
            .unwrap();
        let parent = CanonicalId::new(EntityKind::Topic, "parent").unwrap();

        let updated = store
            .update(
                &topic.id,
                EntityUpdate {
                    name: Some("New name".to_string()),
                    is_part_of: Some(vec![parent.clone()]),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.name, "New name");
        assert_eq!(updated.is_part_of, vec![parent]);

        let read = store.read(&topic.id).await.unwrap().unwrap();
        assert_eq!(read.name, "New name");
    }

    #[tokio::test]
    async fn test_update_missing_returns_none() {
        let (store, _temp) = setup_store().await;
        let ghost = CanonicalId::new(EntityKind::Concept, "ghost").unwrap();
        let result = store.update(&ghost, EntityUpdate::default()).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_delete() {
        let (store, _temp) = setup_store().await;

        let e = store
            .create(NewEntity::new(EntityKind::Resource, "Doc"))
            .await
            .unwrap();
        assert!(store.delete(&e.id).await.unwrap());
        assert!(!store.delete(&e.id).await.unwrap());
        assert!(store.read(&e.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_and_count_by_kind() {
        let (store, _temp) = setup_store().await;

        store
            .create(NewEntity::new(EntityKind::Concept, "c1"))
            .await
            .unwrap();
        store
            .create(NewEntity::new(EntityKind::Concept, "c2"))
            .await
            .unwrap();
        store
            .create(NewEntity::new(EntityKind::Topic, "t1"))
            .await
            .unwrap();

        let concepts = store.list(Some(EntityKind::Concept)).await.unwrap();
        assert_eq!(concepts.len(), 2);
        assert_eq!(store.count(Some(EntityKind::Concept)).await.unwrap(), 2);
        assert_eq!(store.count(None).await.unwrap(), 3);
        assert_eq!(store.count(Some(EntityKind::Predicate)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_validate_index_clean() {
        let (store, _temp) = setup_store().await;
        store
            .create(NewEntity::new(EntityKind::Concept, "fine"))
            .await
            .unwrap();
        assert!(store.validate_index().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_validate_index_reports_mismatches() {
        let (store, _temp) = setup_store().await;
        let e = store
            .create(NewEntity::new(EntityKind::Concept, "skewed"))
            .await
            .unwrap();

        // Corrupt the kind column behind the store's back
        let id = e.id.clone();
        store
            .db
            .with_connection(move |conn| {
                conn.execute(
                    "UPDATE entities SET kind = 'topic' WHERE entity_id = ?1",
                    params![id],
                )?;
                Ok(())
            })
            .await
            .unwrap();

        let problems = store.validate_index().await.unwrap();
        assert_eq!(problems.len(), 1);
        assert!(problems[0].contains("indexed under kind topic"));
    }
}
