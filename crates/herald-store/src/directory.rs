//! Recipient directory — everyone the bot can address.

use chrono::Utc;

use herald_core::{HeraldError, RecipientId, Result};

use crate::Store;

impl Store {
    /// Register a recipient, or bump their start counter if already known.
    pub fn register_recipient(&self, id: RecipientId) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO recipients (chat_id, joined_at) VALUES (?1, ?2)
             ON CONFLICT(chat_id) DO UPDATE SET start_count = start_count + 1",
            rusqlite::params![id.0, Utc::now().to_rfc3339()],
        )
        .map_err(|e| HeraldError::Storage(format!("Register recipient: {e}")))?;
        Ok(())
    }

    /// Remove a recipient (left the chat or blocked the bot). Idempotent.
    pub fn remove_recipient(&self, id: RecipientId) -> Result<()> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM recipients WHERE chat_id = ?1", [id.0])
            .map_err(|e| HeraldError::Storage(format!("Remove recipient: {e}")))?;
        Ok(())
    }

    pub fn recipient_count(&self) -> Result<usize> {
        let conn = self.conn()?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM recipients", [], |r| r.get(0))
            .map_err(|e| HeraldError::Storage(format!("Count recipients: {e}")))?;
        Ok(count as usize)
    }

    /// The full recipient set, in ascending chat-id order.
    pub fn recipients(&self) -> Result<Vec<RecipientId>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT chat_id FROM recipients ORDER BY chat_id")
            .map_err(|e| HeraldError::Storage(format!("List recipients: {e}")))?;
        let rows = stmt
            .query_map([], |row| row.get::<_, i64>(0))
            .map_err(|e| HeraldError::Storage(format!("List recipients: {e}")))?;
        let mut out = Vec::new();
        for row in rows {
            let id = row.map_err(|e| HeraldError::Storage(format!("List recipients: {e}")))?;
            out.push(RecipientId(id));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_is_upsert() {
        let store = Store::open_in_memory(10).unwrap();
        store.register_recipient(RecipientId(7)).unwrap();
        store.register_recipient(RecipientId(7)).unwrap();
        store.register_recipient(RecipientId(9)).unwrap();
        assert_eq!(store.recipient_count().unwrap(), 2);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let store = Store::open_in_memory(10).unwrap();
        store.register_recipient(RecipientId(7)).unwrap();
        store.remove_recipient(RecipientId(7)).unwrap();
        store.remove_recipient(RecipientId(7)).unwrap();
        assert_eq!(store.recipient_count().unwrap(), 0);
    }

    #[test]
    fn test_recipients_ordering() {
        let store = Store::open_in_memory(10).unwrap();
        for id in [30, 10, 20] {
            store.register_recipient(RecipientId(id)).unwrap();
        }
        let ids: Vec<i64> = store.recipients().unwrap().iter().map(|r| r.0).collect();
        assert_eq!(ids, vec![10, 20, 30]);
    }
}
