//! Database migrations.
//!
//! Versioned, incremental migrations for the SQLite learning record store.
//! Each migration runs in its own transaction and is recorded in the
//! `schema_migrations` table, so reopening an already-migrated database is a
//! no-op.

use rusqlite::Connection;

use crate::storage::{StorageError, StorageResult};

/// Current schema version.
pub const CURRENT_SCHEMA_VERSION: i32 = 2;

/// Initial schema SQL (V1).
const INIT_SCHEMA: &str = include_str!("schema.sql");

/// A single schema migration.
#[derive(Debug, Clone)]
pub struct Migration {
    pub version: i32,
    pub name: String,
    pub sql: String,
}

impl Migration {
    pub fn new(version: i32, name: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            version,
            name: name.into(),
            sql: sql.into(),
        }
    }
}

/// All migrations, ordered by version.
pub fn get_migrations() -> Vec<Migration> {
    vec![
        Migration::new(1, "initial schema", INIT_SCHEMA),
        Migration::new(
            2,
            "query indexes",
            r#"
            -- latest-session and grade-history lookups scan by concept + time
            CREATE INDEX IF NOT EXISTS idx_recall_sessions_concept_ts
                ON recall_sessions(concept_id, timestamp);

            CREATE INDEX IF NOT EXISTS idx_concepts_topic
                ON concepts(topic_id);

            CREATE INDEX IF NOT EXISTS idx_learning_states_concept
                ON learning_states(concept_id);
            "#,
        ),
    ]
}

fn ensure_migrations_table(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at INTEGER NOT NULL
        );
        "#,
    )
    .map_err(|e| StorageError::Migration(format!("failed to create migrations table: {}", e)))?;

    Ok(())
}

/// Current database version; 0 when no migration has been applied.
pub fn get_current_version(conn: &Connection) -> i32 {
    if ensure_migrations_table(conn).is_err() {
        return 0;
    }

    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )
    .unwrap_or(0)
}

fn get_applied_versions(conn: &Connection) -> StorageResult<Vec<i32>> {
    ensure_migrations_table(conn)?;

    let mut stmt = conn.prepare("SELECT version FROM schema_migrations ORDER BY version")?;
    let versions = stmt
        .query_map([], |row| row.get(0))?
        .filter_map(|r| r.ok())
        .collect();

    Ok(versions)
}

fn record_migration(conn: &Connection, migration: &Migration) -> StorageResult<()> {
    conn.execute(
        "INSERT INTO schema_migrations (version, name, applied_at) VALUES (?1, ?2, ?3)",
        rusqlite::params![
            migration.version,
            migration.name,
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs() as i64
        ],
    )?;

    Ok(())
}

/// Runs all pending migrations, returning the final schema version.
pub fn run_migrations(conn: &Connection) -> Result<i32, StorageError> {
    ensure_migrations_table(conn)?;

    let applied_versions = get_applied_versions(conn)?;
    let migrations = get_migrations();
    let mut final_version = get_current_version(conn);

    log::info!(
        "database version {}, target version {}",
        final_version,
        CURRENT_SCHEMA_VERSION
    );

    for migration in migrations {
        if applied_versions.contains(&migration.version) {
            continue;
        }

        log::info!("running migration v{}: {}", migration.version, migration.name);

        match execute_migration_in_transaction(conn, &migration) {
            Ok(()) => {
                final_version = migration.version;
            }
            Err(e) => {
                log::error!("migration v{} failed: {}", migration.version, e);
                return Err(e);
            }
        }
    }

    Ok(final_version)
}

fn execute_migration_in_transaction(conn: &Connection, migration: &Migration) -> StorageResult<()> {
    conn.execute("BEGIN IMMEDIATE", [])?;

    match conn.execute_batch(&migration.sql) {
        Ok(()) => {
            if let Err(e) = record_migration(conn, migration) {
                conn.execute("ROLLBACK", []).ok();
                return Err(e);
            }

            conn.execute("COMMIT", [])?;
            Ok(())
        }
        Err(e) => {
            conn.execute("ROLLBACK", []).ok();
            Err(StorageError::Migration(format!(
                "migration v{} failed: {}",
                migration.version, e
            )))
        }
    }
}
