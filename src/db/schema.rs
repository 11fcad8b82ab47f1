//! SQL DDL for the session log tables.
//!
//! Defines the `sessions`, `events`, and `schema_meta` tables. All DDL uses
//! `IF NOT EXISTS` for idempotent initialization. The DDL here is the v1
//! baseline; later shape changes live in [`crate::db::migrations`].

use rusqlite::Connection;

/// Baseline DDL for the session log.
const SCHEMA_SQL: &str = r#"
-- One row per conversation, keyed by the (app, user, session) triple
CREATE TABLE IF NOT EXISTS sessions (
    id INTEGER PRIMARY KEY,
    app_name TEXT NOT NULL,
    user_id TEXT NOT NULL,
    session_id TEXT NOT NULL,
    created_at TEXT NOT NULL,
    UNIQUE(app_name, user_id, session_id)
);

CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id);

-- Ordered event log per session; parts holds the JSON-encoded content parts
CREATE TABLE IF NOT EXISTS events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id INTEGER NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
    uid TEXT NOT NULL UNIQUE,
    author TEXT NOT NULL,
    role TEXT NOT NULL,
    parts TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_events_session ON events(session_id);

-- Schema metadata
CREATE TABLE IF NOT EXISTS schema_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Initialize all schema tables. Idempotent (uses IF NOT EXISTS).
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    // Set initial schema version if not already present
    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', '1')",
        [],
    )?;

    Ok(())
}
