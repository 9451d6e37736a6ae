//! Technique progress table operations.
//!
//! Counters here exist for reporting; the allocator itself recomputes from
//! the session log on every call.

use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

use crate::storage::models::TechniqueProgress;
use crate::storage::{StorageError, StorageResult};

pub(crate) fn get_progress(
    conn: &Connection,
    concept_id: i64,
    technique: &str,
) -> StorageResult<Option<TechniqueProgress>> {
    let progress = conn
        .query_row(
            "SELECT * FROM technique_progress WHERE concept_id = ?1 AND technique = ?2",
            params![concept_id, technique],
            |row| TechniqueProgress::from_row(row),
        )
        .optional()?;

    Ok(progress)
}

/// Technique progress repository.
pub struct TechniqueProgressRepository {
    conn: Arc<Mutex<Connection>>,
}

impl TechniqueProgressRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_connection(&self) -> StorageResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| StorageError::LockError(e.to_string()))
    }

    /// Progress row for a (concept, technique) pair, if any application has
    /// been recorded.
    pub fn get(&self, concept_id: i64, technique: &str) -> StorageResult<Option<TechniqueProgress>> {
        let conn = self.get_connection()?;
        get_progress(&conn, concept_id, technique)
    }

    /// All progress rows for a concept.
    pub fn get_for_concept(&self, concept_id: i64) -> StorageResult<Vec<TechniqueProgress>> {
        let conn = self.get_connection()?;

        let mut stmt = conn.prepare(
            "SELECT * FROM technique_progress WHERE concept_id = ?1 ORDER BY technique",
        )?;

        let rows = stmt
            .query_map(params![concept_id], |row| TechniqueProgress::from_row(row))?
            .filter_map(|r| r.ok())
            .collect();

        Ok(rows)
    }
}
