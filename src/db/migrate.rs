//! Versioned SQL migrations loaded from a directory.
//!
//! Files are named `NNN_description.sql`; each is applied once, inside a
//! transaction, and recorded in `schema_migrations`.

use rusqlite::{params, Connection};
use std::fs;
use std::path::Path;

use crate::error::{ContentGraphError, Result};

struct MigrationFile {
    version: u32,
    name: String,
    sql: String,
}

fn ensure_tracking_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;
    Ok(())
}

/// Names of migrations already recorded, in version order.
pub fn applied_migrations(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM schema_migrations ORDER BY version")?;
    let names: Vec<String> = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()
        .map_err(ContentGraphError::Database)?;
    Ok(names)
}

fn parse_migration_filename(filename: &str) -> Result<(u32, String)> {
    let stem = filename.trim_end_matches(".sql");
    let version_str = stem.split('_').next().ok_or_else(|| {
        ContentGraphError::Config(format!("Invalid migration filename: {}", filename))
    })?;
    let version: u32 = version_str.parse().map_err(|_| {
        ContentGraphError::Config(format!("Invalid migration version: {}", version_str))
    })?;
    Ok((version, stem.to_string()))
}

fn load_migration_files(migrations_dir: &Path) -> Result<Vec<MigrationFile>> {
    let mut migrations = Vec::new();

    for entry in fs::read_dir(migrations_dir).map_err(ContentGraphError::Io)? {
        let entry = entry.map_err(ContentGraphError::Io)?;
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) != Some("sql") {
            continue;
        }
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ContentGraphError::Config("Invalid migration filename".to_string()))?;
        let (version, name) = parse_migration_filename(filename)?;
        let sql = fs::read_to_string(&path).map_err(ContentGraphError::Io)?;
        migrations.push(MigrationFile { version, name, sql });
    }

    migrations.sort_by_key(|m| m.version);
    Ok(migrations)
}

/// Apply all pending migrations; returns how many were applied.
pub fn run_migrations(conn: &mut Connection, migrations_dir: &Path) -> Result<usize> {
    ensure_tracking_table(conn)?;

    let applied = applied_migrations(conn)?;
    let mut applied_now = 0;

    for migration in load_migration_files(migrations_dir)? {
        if applied.contains(&migration.name) {
            log::debug!("Migration {} already applied, skipping", migration.name);
            continue;
        }

        log::info!(
            "Applying migration: {} (version {})",
            migration.name,
            migration.version
        );

        let tx = conn.transaction()?;
        // execute_batch handles multi-statement files
        tx.execute_batch(&migration.sql).map_err(|e| {
            ContentGraphError::Config(format!(
                "Failed to execute migration {}: {}",
                migration.name, e
            ))
        })?;
        tx.execute(
            "INSERT INTO schema_migrations (version, name) VALUES (?1, ?2)",
            params![migration.version, migration.name],
        )?;
        tx.commit()?;
        applied_now += 1;
    }

    log::debug!("{} migrations applied this run", applied_now);
    Ok(applied_now)
}
