//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::crawler::Edge;
use crate::state::ParticipantState;
use crate::storage::{ParticipantRecord, RunRecord};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Run {0} is already finished")]
    RunFinished(i64),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for run archive backends
pub trait Storage {
    // ===== Run Management =====

    /// Creates a new run in the `running` state
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, post_id: &str, author: &str, config_hash: &str)
        -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Marks a run as completed with a finish timestamp
    fn complete_run(&mut self, run_id: i64) -> StorageResult<()>;

    /// Marks a run as failed, keeping the reason
    fn fail_run(&mut self, run_id: i64, reason: &str) -> StorageResult<()>;

    // ===== Participants =====

    /// Records (or replaces) the outcome of one participant
    fn record_participant(&mut self, run_id: i64, record: &ParticipantRecord)
        -> StorageResult<()>;

    /// Gets the participants of a run in position order
    fn get_participants(&self, run_id: i64) -> StorageResult<Vec<ParticipantRecord>>;

    /// Counts participants of a run in the given state
    fn count_participants_by_state(&self, run_id: i64, state: ParticipantState)
        -> StorageResult<u64>;

    // ===== Edges =====

    /// Inserts edges for a run in one transaction, ignoring duplicates
    ///
    /// # Returns
    ///
    /// The number of edges actually inserted
    fn insert_edges(&mut self, run_id: i64, edges: &[Edge]) -> StorageResult<usize>;

    /// Counts the edges of a run
    fn count_edges(&self, run_id: i64) -> StorageResult<u64>;
}
