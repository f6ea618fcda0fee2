//! Scheduled content queue — bounded, insertion-ordered, durable.
//!
//! Capacity K (config, default 10). When full, `enqueue` evicts exactly the
//! lowest-id row before inserting; count-check, eviction, and insert run in
//! one transaction so concurrent enqueues cannot double-evict or collide on
//! ids. `drain` reads without deleting — removal after dispatch is the daily
//! trigger's job.

use chrono::{DateTime, Utc};

use herald_core::{Content, HeraldError, Result};

use crate::Store;

/// One queued piece of content. Ids are monotonically increasing and never
/// reused, so ascending id order is scheduling order.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledEntry {
    pub id: i64,
    pub content: Content,
    pub created_at: DateTime<Utc>,
}

impl Store {
    /// Append content to the queue, evicting the oldest entry when full.
    pub fn enqueue(&self, content: &Content) -> Result<ScheduledEntry> {
        content.validate()?;
        let mut conn = self.conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| HeraldError::Storage(format!("Enqueue: {e}")))?;

        let count: i64 = tx
            .query_row("SELECT COUNT(*) FROM scheduled_queue", [], |r| r.get(0))
            .map_err(|e| HeraldError::Storage(format!("Enqueue: {e}")))?;
        if count as usize >= self.queue_capacity {
            tx.execute(
                "DELETE FROM scheduled_queue
                 WHERE id = (SELECT MIN(id) FROM scheduled_queue)",
                [],
            )
            .map_err(|e| HeraldError::Storage(format!("Enqueue evict: {e}")))?;
            tracing::debug!("Queue full ({count}), evicted oldest entry");
        }

        let created_at = Utc::now();
        tx.execute(
            "INSERT INTO scheduled_queue (kind, text, media_ref, caption, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                content.kind(),
                content.text_part(),
                content.media_ref(),
                content.caption(),
                created_at.to_rfc3339(),
            ],
        )
        .map_err(|e| HeraldError::Storage(format!("Enqueue insert: {e}")))?;
        let id = tx.last_insert_rowid();
        tx.commit()
            .map_err(|e| HeraldError::Storage(format!("Enqueue commit: {e}")))?;

        tracing::info!("📥 Scheduled entry [{id}] enqueued ({})", content.kind());
        Ok(ScheduledEntry {
            id,
            content: content.clone(),
            created_at,
        })
    }

    /// All queued entries in ascending id order, without removing them.
    pub fn drain(&self) -> Result<Vec<ScheduledEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, kind, text, media_ref, caption, created_at
                 FROM scheduled_queue ORDER BY id ASC",
            )
            .map_err(|e| HeraldError::Storage(format!("Drain: {e}")))?;

        type Row = (i64, String, Option<String>, Option<String>, Option<String>, String);
        let rows = stmt
            .query_map([], |row| {
                Ok::<Row, rusqlite::Error>((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                ))
            })
            .map_err(|e| HeraldError::Storage(format!("Drain: {e}")))?;

        let mut entries = Vec::new();
        for row in rows {
            let (id, kind, text, media_ref, caption, created_at) =
                row.map_err(|e| HeraldError::Storage(format!("Drain: {e}")))?;
            let content = Content::from_parts(
                &kind,
                text.as_deref(),
                media_ref.as_deref(),
                caption.as_deref(),
            )?;
            let created_at = DateTime::parse_from_rfc3339(&created_at)
                .map(|d| d.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now());
            entries.push(ScheduledEntry { id, content, created_at });
        }
        Ok(entries)
    }

    /// Delete one queued entry. No-op if the id is absent.
    pub fn remove_scheduled(&self, id: i64) -> Result<()> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM scheduled_queue WHERE id = ?1", [id])
            .map_err(|e| HeraldError::Storage(format!("Remove scheduled: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Content {
        Content::text(s).unwrap()
    }

    #[test]
    fn test_enqueue_assigns_ascending_ids() {
        let store = Store::open_in_memory(10).unwrap();
        let a = store.enqueue(&text("a")).unwrap();
        let b = store.enqueue(&text("b")).unwrap();
        assert!(b.id > a.id);
    }

    #[test]
    fn test_capacity_evicts_oldest_only() {
        // Scenario B: fill to capacity, the 11th enqueue evicts exactly id 1.
        let store = Store::open_in_memory(10).unwrap();
        for i in 1..=10 {
            let entry = store.enqueue(&text(&format!("m{i}"))).unwrap();
            assert_eq!(entry.id, i);
        }
        store.enqueue(&text("m11")).unwrap();

        let ids: Vec<i64> = store.drain().unwrap().iter().map(|e| e.id).collect();
        assert_eq!(ids, (2..=11).collect::<Vec<i64>>());
    }

    #[test]
    fn test_drain_is_not_destructive() {
        let store = Store::open_in_memory(10).unwrap();
        store.enqueue(&text("keep")).unwrap();
        assert_eq!(store.drain().unwrap().len(), 1);
        assert_eq!(store.drain().unwrap().len(), 1);
    }

    #[test]
    fn test_drain_ascending_and_round_trips_media() {
        let store = Store::open_in_memory(10).unwrap();
        store.enqueue(&text("first")).unwrap();
        let photo = Content::from_parts("photo", None, Some("f-1"), Some("cap")).unwrap();
        store.enqueue(&photo).unwrap();

        let entries = store.drain().unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.windows(2).all(|w| w[0].id < w[1].id));
        assert_eq!(entries[0].content.text_part(), Some("first"));
        assert_eq!(entries[1].content, photo);
    }

    #[test]
    fn test_remove_absent_id_is_noop() {
        let store = Store::open_in_memory(10).unwrap();
        store.enqueue(&text("a")).unwrap();
        store.remove_scheduled(999).unwrap();
        assert_eq!(store.drain().unwrap().len(), 1);
    }

    #[test]
    fn test_ids_stay_monotonic_after_eviction() {
        let store = Store::open_in_memory(2).unwrap();
        store.enqueue(&text("a")).unwrap();
        store.enqueue(&text("b")).unwrap();
        let c = store.enqueue(&text("c")).unwrap();
        assert_eq!(c.id, 3);
        let ids: Vec<i64> = store.drain().unwrap().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn test_enqueue_rejects_invalid_content() {
        let store = Store::open_in_memory(10).unwrap();
        let bad = Content::Text { text: String::new() };
        assert!(store.enqueue(&bad).is_err());
        assert!(store.drain().unwrap().is_empty());
    }
}
