//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the run archive.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track crawl runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    post_id TEXT NOT NULL,
    author TEXT NOT NULL,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL,
    error_message TEXT
);

-- Thread participants and how their follow-list retrieval ended
CREATE TABLE IF NOT EXISTS participants (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id INTEGER NOT NULL REFERENCES runs(id),
    handle TEXT NOT NULL,
    position INTEGER NOT NULL,
    state TEXT NOT NULL,
    follows_count INTEGER NOT NULL DEFAULT 0,
    error_message TEXT,
    UNIQUE(run_id, handle)
);

CREATE INDEX IF NOT EXISTS idx_participants_run ON participants(run_id);
CREATE INDEX IF NOT EXISTS idx_participants_state ON participants(state);

-- Directed follow edges between participants
CREATE TABLE IF NOT EXISTS edges (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id INTEGER NOT NULL REFERENCES runs(id),
    follower TEXT NOT NULL,
    followed TEXT NOT NULL,
    UNIQUE(run_id, follower, followed)
);

CREATE INDEX IF NOT EXISTS idx_edges_run ON edges(run_id);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
