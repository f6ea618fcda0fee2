//! # Herald Store
//!
//! SQLite-backed persistence: the recipient directory, the admin store, and
//! the bounded scheduled-content queue. One connection behind a mutex —
//! every operation is serialized, which is what keeps the queue capacity and
//! FIFO-eviction invariants intact when schedule submissions race the daily
//! trigger.

mod admins;
mod directory;
mod queue;

pub use queue::ScheduledEntry;

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::Connection;

use herald_core::{HeraldError, Result};

pub struct Store {
    conn: Mutex<Connection>,
    queue_capacity: usize,
}

impl Store {
    /// Open or create the database at `path`.
    pub fn open(path: &Path, queue_capacity: usize) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)
            .map_err(|e| HeraldError::Storage(format!("DB open: {e}")))?;
        Self::from_connection(conn, queue_capacity)
    }

    /// In-memory database, used by tests.
    pub fn open_in_memory(queue_capacity: usize) -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| HeraldError::Storage(format!("DB open: {e}")))?;
        Self::from_connection(conn, queue_capacity)
    }

    fn from_connection(conn: Connection, queue_capacity: usize) -> Result<Self> {
        migrate(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            queue_capacity: queue_capacity.max(1),
        })
    }

    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }

    pub(crate) fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| HeraldError::Storage(format!("DB lock poisoned: {e}")))
    }
}

fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS recipients (
            chat_id INTEGER PRIMARY KEY,
            joined_at TEXT NOT NULL,
            start_count INTEGER NOT NULL DEFAULT 1
        );

        CREATE TABLE IF NOT EXISTS admins (
            chat_id INTEGER PRIMARY KEY,
            granted_at TEXT NOT NULL
        );

        -- Bounded FIFO of content awaiting the daily drain.
        -- AUTOINCREMENT keeps ids monotonic even after eviction.
        CREATE TABLE IF NOT EXISTS scheduled_queue (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            kind TEXT NOT NULL,
            text TEXT,
            media_ref TEXT,
            caption TEXT,
            created_at TEXT NOT NULL
        );
        ",
    )
    .map_err(|e| HeraldError::Storage(format!("Migration: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_and_migrate() {
        let dir = std::env::temp_dir().join("herald-store-open-test");
        std::fs::create_dir_all(&dir).ok();
        let store = Store::open(&dir.join("test.db"), 10).unwrap();
        assert_eq!(store.recipient_count().unwrap(), 0);
        assert!(store.drain().unwrap().is_empty());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_capacity_floor() {
        let store = Store::open_in_memory(0).unwrap();
        assert_eq!(store.queue_capacity(), 1);
    }
}
