//! Durable conversation history over SQLite.

use crate::agent::content::StoredPart;
use anyhow::{bail, Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

/// Identifies one conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionKey {
    pub app_name: String,
    pub user_id: String,
    pub session_id: String,
}

impl SessionKey {
    pub fn new(
        app_name: impl Into<String>,
        user_id: impl Into<String>,
        session_id: impl Into<String>,
    ) -> SessionKey {
        SessionKey {
            app_name: app_name.into(),
            user_id: user_id.into(),
            session_id: session_id.into(),
        }
    }
}

/// One recorded turn of a conversation.
#[derive(Debug, Clone)]
pub struct SessionEvent {
    pub uid: String,
    pub author: String,
    pub role: String,
    pub parts: Vec<StoredPart>,
    pub created_at: String,
}

/// Append-only session log. Cheap to clone; all clones share one connection.
#[derive(Clone)]
pub struct SessionStore {
    conn: Arc<Mutex<Connection>>,
}

impl SessionStore {
    pub fn new(conn: Connection) -> SessionStore {
        SessionStore {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow::anyhow!("session store mutex poisoned"))
    }

    /// Create the session row if absent. True when this call created it.
    pub fn create_session(&self, key: &SessionKey) -> Result<bool> {
        let conn = self.lock()?;
        let now = Utc::now().to_rfc3339();
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO sessions (app_name, user_id, session_id, created_at, last_active_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![key.app_name, key.user_id, key.session_id, now],
        )?;
        Ok(inserted > 0)
    }

    pub fn session_exists(&self, key: &SessionKey) -> Result<bool> {
        let conn = self.lock()?;
        Ok(Self::row_id(&conn, key)?.is_some())
    }

    /// Record one turn. Returns the event uid.
    pub fn append_event(
        &self,
        key: &SessionKey,
        author: &str,
        role: &str,
        parts: &[StoredPart],
    ) -> Result<String> {
        let conn = self.lock()?;
        let Some(session_row) = Self::row_id(&conn, key)? else {
            bail!("unknown session {}", key.session_id);
        };
        let uid = Uuid::now_v7().to_string();
        let now = Utc::now().to_rfc3339();
        let parts_json = serde_json::to_string(parts).context("failed to encode event parts")?;
        conn.execute(
            "INSERT INTO events (session_id, uid, author, role, parts, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![session_row, uid, author, role, parts_json, now],
        )?;
        conn.execute(
            "UPDATE sessions SET last_active_at = ?1 WHERE id = ?2",
            params![now, session_row],
        )?;
        Ok(uid)
    }

    /// Every event of the session in append order. Empty when the session
    /// does not exist.
    pub fn list_events(&self, key: &SessionKey) -> Result<Vec<SessionEvent>> {
        let conn = self.lock()?;
        let Some(session_row) = Self::row_id(&conn, key)? else {
            return Ok(Vec::new());
        };
        let mut stmt = conn.prepare(
            "SELECT uid, author, role, parts, created_at
             FROM events WHERE session_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map([session_row], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut events = Vec::new();
        for row in rows {
            let (uid, author, role, parts_raw, created_at) = row?;
            let parts: Vec<StoredPart> = serde_json::from_str(&parts_raw)
                .with_context(|| format!("corrupt parts for event {uid}"))?;
            events.push(SessionEvent {
                uid,
                author,
                role,
                parts,
                created_at,
            });
        }
        Ok(events)
    }

    fn row_id(conn: &Connection, key: &SessionKey) -> Result<Option<i64>> {
        let id = conn
            .query_row(
                "SELECT id FROM sessions
                 WHERE app_name = ?1 AND user_id = ?2 AND session_id = ?3",
                params![key.app_name, key.user_id, key.session_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store() -> SessionStore {
        SessionStore::new(crate::db::open_memory_database().unwrap())
    }

    fn key() -> SessionKey {
        SessionKey::new("copydesk", "user-1", "session-1")
    }

    #[test]
    fn create_session_is_idempotent() {
        let store = test_store();
        assert!(store.create_session(&key()).unwrap());
        assert!(!store.create_session(&key()).unwrap());
        assert!(store.session_exists(&key()).unwrap());
    }

    #[test]
    fn events_come_back_in_append_order() {
        let store = test_store();
        store.create_session(&key()).unwrap();
        store
            .append_event(&key(), "user", "user", &[StoredPart::Text { text: "one".into() }])
            .unwrap();
        store
            .append_event(&key(), "scribe", "model", &[StoredPart::Text { text: "two".into() }])
            .unwrap();

        let events = store.list_events(&key()).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].author, "user");
        assert_eq!(events[1].role, "model");
        assert!(matches!(&events[1].parts[0], StoredPart::Text { text } if text == "two"));
    }

    #[test]
    fn append_to_unknown_session_fails() {
        let store = test_store();
        let err = store
            .append_event(&key(), "user", "user", &[])
            .unwrap_err();
        assert!(err.to_string().contains("unknown session"));
    }

    #[test]
    fn listing_unknown_session_is_empty() {
        let store = test_store();
        assert!(store.list_events(&key()).unwrap().is_empty());
    }

    #[test]
    fn event_uids_are_unique_and_ordered() {
        let store = test_store();
        store.create_session(&key()).unwrap();
        let first = store
            .append_event(&key(), "user", "user", &[StoredPart::Text { text: "a".into() }])
            .unwrap();
        let second = store
            .append_event(&key(), "user", "user", &[StoredPart::Text { text: "b".into() }])
            .unwrap();
        assert_ne!(first, second);
    }
}
