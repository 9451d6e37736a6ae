//! SQLite-backed learning record store.
//!
//! Keyed storage for topics, concepts, per-concept memory state, the
//! append-only recall session log and technique progress counters. The
//! scheduling engine drives it through the repositories below and through
//! [`Storage::transaction`] for the multi-write update protocol.

pub mod concept;
pub mod learning_state;
pub mod migrations;
pub mod models;
pub mod recall_session;
pub mod technique_progress;
pub mod topic;

pub use concept::ConceptRepository;
pub use learning_state::LearningStateRepository;
pub use migrations::run_migrations;
pub use models::{Concept, LearningState, RecallSession, Topic, TechniqueProgress};
pub use recall_session::RecallSessionRepository;
pub use technique_progress::TechniqueProgressRepository;
pub use topic::TopicRepository;

use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Storage layer error type.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("migration error: {0}")]
    Migration(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("lock acquisition failed: {0}")]
    LockError(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Storage handle over a single SQLite connection.
///
/// Cheap to share; every engine call receives this handle explicitly rather
/// than reaching for a process-global connection. The single connection also
/// serializes updates: a selection query and an in-flight update never
/// interleave.
pub struct Storage {
    conn: Arc<Mutex<Connection>>,
    db_path: String,
}

impl Storage {
    /// Opens (creating if needed) a file-backed store and runs migrations.
    /// WAL mode and foreign keys are enabled.
    pub fn new<P: AsRef<Path>>(db_path: P) -> StorageResult<Self> {
        let path_str = db_path.as_ref().to_string_lossy().to_string();
        let connection = Connection::open(&db_path)?;

        connection.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;
             PRAGMA foreign_keys=ON;",
        )?;

        Self::from_connection(connection, path_str)
    }

    /// In-memory store for tests. No WAL, but foreign keys stay on.
    pub fn in_memory() -> StorageResult<Self> {
        let connection = Connection::open_in_memory()?;

        connection.execute_batch("PRAGMA foreign_keys=ON;")?;

        Self::from_connection(connection, ":memory:".to_string())
    }

    fn from_connection(connection: Connection, db_path: String) -> StorageResult<Self> {
        let conn = Arc::new(Mutex::new(connection));

        {
            let guard = conn
                .lock()
                .map_err(|e| StorageError::LockError(e.to_string()))?;
            migrations::run_migrations(&guard)?;
        }

        Ok(Self { conn, db_path })
    }

    pub fn connection(&self) -> Arc<Mutex<Connection>> {
        Arc::clone(&self.conn)
    }

    pub fn db_path(&self) -> &str {
        &self.db_path
    }

    pub fn topics(&self) -> TopicRepository {
        TopicRepository::new(Arc::clone(&self.conn))
    }

    pub fn concepts(&self) -> ConceptRepository {
        ConceptRepository::new(Arc::clone(&self.conn))
    }

    pub fn learning_states(&self) -> LearningStateRepository {
        LearningStateRepository::new(Arc::clone(&self.conn))
    }

    pub fn recall_sessions(&self) -> RecallSessionRepository {
        RecallSessionRepository::new(Arc::clone(&self.conn))
    }

    pub fn technique_progress(&self) -> TechniqueProgressRepository {
        TechniqueProgressRepository::new(Arc::clone(&self.conn))
    }

    /// Runs a closure inside one transaction. All writes of an update
    /// protocol invocation commit or roll back together.
    pub fn transaction<F, T>(&self, f: F) -> StorageResult<T>
    where
        F: FnOnce(&Connection) -> StorageResult<T>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| StorageError::LockError(e.to_string()))?;

        let tx = conn.transaction()?;
        let result = f(&tx)?;
        tx.commit()?;

        Ok(result)
    }

    /// Runs a read-only closure under the connection lock, giving a
    /// consistent snapshot across several queries.
    pub fn snapshot<F, T>(&self, f: F) -> StorageResult<T>
    where
        F: FnOnce(&Connection) -> StorageResult<T>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StorageError::LockError(e.to_string()))?;

        f(&conn)
    }
}
