//! Storage module for the run archive
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Run tracking (target, config hash, status, timestamps)
//! - Per-participant retrieval outcomes
//! - The edges each run produced

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::state::ParticipantState;
use std::path::Path;

/// Opens (creating if needed) the run archive at `path`
pub fn open_storage(path: &Path) -> StorageResult<SqliteStorage> {
    SqliteStorage::new(path)
}

/// Represents a crawl run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub post_id: String,
    pub author: String,
    pub config_hash: String,
    pub status: RunStatus,
    pub error_message: Option<String>,
}

/// Represents one participant of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantRecord {
    pub handle: String,

    /// 0 for the root author, then repliers in discovery order
    pub position: u32,

    pub state: ParticipantState,

    /// Size of the retrieved follow-set
    pub follows_count: u64,

    pub error_message: Option<String>,
}

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
