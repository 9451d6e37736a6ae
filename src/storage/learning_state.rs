//! Learning state table operations.
//!
//! One row per concept at most; absence of a row is the "new, never graded"
//! state. Rows are only written by the update protocol.

use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

use crate::storage::models::LearningState;
use crate::storage::{StorageError, StorageResult};

pub(crate) fn get_state(conn: &Connection, concept_id: i64) -> StorageResult<Option<LearningState>> {
    let state = conn
        .query_row(
            "SELECT * FROM learning_states WHERE concept_id = ?1",
            params![concept_id],
            |row| LearningState::from_row(row),
        )
        .optional()?;

    Ok(state)
}

/// Learning state repository.
pub struct LearningStateRepository {
    conn: Arc<Mutex<Connection>>,
}

impl LearningStateRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_connection(&self) -> StorageResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| StorageError::LockError(e.to_string()))
    }

    /// Memory state for a concept; `None` means never graded.
    pub fn get(&self, concept_id: i64) -> StorageResult<Option<LearningState>> {
        let conn = self.get_connection()?;
        get_state(&conn, concept_id)
    }

    /// Creates or overwrites the state row for a concept.
    pub fn upsert(&self, concept_id: i64, difficulty: f64, stability: f64) -> StorageResult<()> {
        let conn = self.get_connection()?;
        LearningState::upsert(&conn, concept_id, difficulty, stability)
    }
}
