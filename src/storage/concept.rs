//! Concept table operations.

use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

use crate::storage::models::Concept;
use crate::storage::{StorageError, StorageResult};

/// Looks a concept up by id. Shared with the update protocol, which runs the
/// check inside its own transaction.
pub(crate) fn get_concept(conn: &Connection, concept_id: i64) -> StorageResult<Option<Concept>> {
    let concept = conn
        .query_row(
            "SELECT * FROM concepts WHERE id = ?1",
            params![concept_id],
            |row| Concept::from_row(row),
        )
        .optional()?;

    Ok(concept)
}

/// Concept repository.
pub struct ConceptRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ConceptRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_connection(&self) -> StorageResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| StorageError::LockError(e.to_string()))
    }

    /// Creates a concept under a topic, returning its assigned id.
    pub fn add(&self, topic_id: i64, content: &str) -> StorageResult<i64> {
        let conn = self.get_connection()?;
        Concept::create(&conn, topic_id, content)
    }

    pub fn get(&self, concept_id: i64) -> StorageResult<Option<Concept>> {
        let conn = self.get_connection()?;
        get_concept(&conn, concept_id)
    }

    pub fn exists(&self, concept_id: i64) -> StorageResult<bool> {
        Ok(self.get(concept_id)?.is_some())
    }

    /// Concepts for one topic, id-ordered.
    pub fn get_for_topic(&self, topic_id: i64) -> StorageResult<Vec<Concept>> {
        let conn = self.get_connection()?;

        let mut stmt =
            conn.prepare("SELECT * FROM concepts WHERE topic_id = ?1 ORDER BY id")?;
        let concepts = stmt
            .query_map(params![topic_id], |row| Concept::from_row(row))?
            .filter_map(|r| r.ok())
            .collect();

        Ok(concepts)
    }
}
