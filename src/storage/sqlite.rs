//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::crawler::Edge;
use crate::state::ParticipantState;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{ParticipantRecord, RunRecord, RunStatus};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

const RUN_COLUMNS: &str =
    "id, started_at, finished_at, post_id, author, config_hash, status, error_message";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens or creates the archive at `path`
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        error_message: Option<&str>,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, error_message = ?3
             WHERE id = ?4 AND status = ?5",
            params![
                status.to_db_string(),
                now,
                error_message,
                run_id,
                RunStatus::Running.to_db_string()
            ],
        )?;

        if updated == 0 {
            // Distinguish a missing run from one that already ended
            self.get_run(run_id)?;
            return Err(StorageError::RunFinished(run_id));
        }
        Ok(())
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        post_id: row.get(3)?,
        author: row.get(4)?,
        config_hash: row.get(5)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(6)?).unwrap_or(RunStatus::Failed),
        error_message: row.get(7)?,
    })
}

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(
        &mut self,
        post_id: &str,
        author: &str,
        config_hash: &str,
    ) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, post_id, author, config_hash, status)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                now,
                post_id,
                author,
                config_hash,
                RunStatus::Running.to_db_string()
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS),
                params![run_id],
                run_from_row,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                &format!("SELECT {} FROM runs ORDER BY id DESC LIMIT 1", RUN_COLUMNS),
                [],
                run_from_row,
            )
            .optional()?;
        Ok(run)
    }

    fn complete_run(&mut self, run_id: i64) -> StorageResult<()> {
        self.finish_run(run_id, RunStatus::Completed, None)
    }

    fn fail_run(&mut self, run_id: i64, reason: &str) -> StorageResult<()> {
        self.finish_run(run_id, RunStatus::Failed, Some(reason))
    }

    // ===== Participants =====

    fn record_participant(
        &mut self,
        run_id: i64,
        record: &ParticipantRecord,
    ) -> StorageResult<()> {
        self.conn.execute(
            "INSERT INTO participants (run_id, handle, position, state, follows_count, error_message)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(run_id, handle) DO UPDATE SET
                position = excluded.position,
                state = excluded.state,
                follows_count = excluded.follows_count,
                error_message = excluded.error_message",
            params![
                run_id,
                record.handle,
                record.position,
                record.state.to_db_string(),
                record.follows_count as i64,
                record.error_message
            ],
        )?;
        Ok(())
    }

    fn get_participants(&self, run_id: i64) -> StorageResult<Vec<ParticipantRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT handle, position, state, follows_count, error_message
             FROM participants WHERE run_id = ?1 ORDER BY position",
        )?;

        let records = stmt
            .query_map(params![run_id], |row| {
                Ok(ParticipantRecord {
                    handle: row.get(0)?,
                    position: row.get(1)?,
                    state: ParticipantState::from_db_string(&row.get::<_, String>(2)?)
                        .unwrap_or(ParticipantState::Pending),
                    follows_count: row.get::<_, i64>(3)? as u64,
                    error_message: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    fn count_participants_by_state(
        &self,
        run_id: i64,
        state: ParticipantState,
    ) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM participants WHERE run_id = ?1 AND state = ?2",
            params![run_id, state.to_db_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    // ===== Edges =====

    fn insert_edges(&mut self, run_id: i64, edges: &[Edge]) -> StorageResult<usize> {
        let tx = self.conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO edges (run_id, follower, followed) VALUES (?1, ?2, ?3)",
            )?;
            for edge in edges {
                inserted += stmt.execute(params![run_id, edge.follower, edge.followed])?;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }

    fn count_edges(&self, run_id: i64) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM edges WHERE run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}
