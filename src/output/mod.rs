//! Output module for crawl artifacts and reports
//!
//! This module handles:
//! - Writing the final edge list as CSV
//! - Appending account failures to the error log
//! - Dumping each participant's raw follow list
//! - Loading and printing statistics from the run archive

mod artifacts;
mod csv;
pub mod stats;

pub use artifacts::{Artifacts, ErrorLog, FollowDumps};
pub use csv::{format_edges_csv, write_edges_csv};
pub use stats::{load_statistics, print_statistics, RunStatistics};

use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Refusing to use '{0}' as a file name")]
    InvalidName(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;
