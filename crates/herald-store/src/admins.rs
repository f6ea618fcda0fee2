//! Admin capability store — who may run broadcast and schedule flows.

use chrono::Utc;

use herald_core::{HeraldError, RecipientId, Result};

use crate::Store;

impl Store {
    /// Grant admin capability. No-op if already granted.
    pub fn grant_admin(&self, id: RecipientId) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO admins (chat_id, granted_at) VALUES (?1, ?2)",
            rusqlite::params![id.0, Utc::now().to_rfc3339()],
        )
        .map_err(|e| HeraldError::Storage(format!("Grant admin: {e}")))?;
        Ok(())
    }

    /// Revoke admin capability. Idempotent.
    pub fn revoke_admin(&self, id: RecipientId) -> Result<()> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM admins WHERE chat_id = ?1", [id.0])
            .map_err(|e| HeraldError::Storage(format!("Revoke admin: {e}")))?;
        Ok(())
    }

    pub fn is_admin(&self, id: RecipientId) -> Result<bool> {
        let conn = self.conn()?;
        let found = conn
            .query_row("SELECT 1 FROM admins WHERE chat_id = ?1", [id.0], |_| Ok(()))
            .map(|_| true);
        match found {
            Ok(v) => Ok(v),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(false),
            Err(e) => Err(HeraldError::Storage(format!("Check admin: {e}"))),
        }
    }
}
