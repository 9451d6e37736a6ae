//! Topic table operations.

use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

use crate::storage::models::Topic;
use crate::storage::{StorageError, StorageResult};

/// Topic repository.
pub struct TopicRepository {
    conn: Arc<Mutex<Connection>>,
}

impl TopicRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_connection(&self) -> StorageResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| StorageError::LockError(e.to_string()))
    }

    /// Creates a topic, returning its assigned id. Topic names are unique.
    pub fn add(&self, name: &str) -> StorageResult<i64> {
        let conn = self.get_connection()?;
        Topic::create(&conn, name)
    }

    /// All topics, id-ordered.
    pub fn get_all(&self) -> StorageResult<Vec<Topic>> {
        let conn = self.get_connection()?;

        let mut stmt = conn.prepare("SELECT * FROM topics ORDER BY id")?;
        let topics = stmt
            .query_map([], |row| Topic::from_row(row))?
            .filter_map(|r| r.ok())
            .collect();

        Ok(topics)
    }

    pub fn find(&self, topic_id: i64) -> StorageResult<Option<Topic>> {
        let conn = self.get_connection()?;

        let topic = conn
            .query_row(
                "SELECT * FROM topics WHERE id = ?1",
                params![topic_id],
                |row| Topic::from_row(row),
            )
            .optional()?;

        Ok(topic)
    }
}
