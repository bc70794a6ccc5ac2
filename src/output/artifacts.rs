//! Side artifacts written while the crawl runs

use crate::config::OutputConfig;
use crate::output::{OutputError, OutputResult};
use chrono::Utc;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Append-only log of accounts that could not be resolved
#[derive(Debug)]
pub struct ErrorLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl ErrorLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one line describing a failed account resolution
    pub fn record(&self, handle: &str, reason: &str) -> OutputResult<()> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let reason = reason.replace(['\r', '\n'], " ");

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(
            file,
            "{} Error in fetching user -{}-: {}",
            Utc::now().to_rfc3339(),
            handle,
            reason
        )?;
        Ok(())
    }
}

/// Per-participant dumps of the raw follow list
#[derive(Debug, Clone)]
pub struct FollowDumps {
    dir: PathBuf,
}

impl FollowDumps {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the dump for `handle`
    pub fn path_for(&self, handle: &str) -> OutputResult<PathBuf> {
        if handle.is_empty() || !handle.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(OutputError::InvalidName(handle.to_string()));
        }
        Ok(self.dir.join(format!("{}.txt", handle)))
    }

    /// Writes `<dir>/<handle>.txt`, one followed handle per line
    pub fn write(&self, handle: &str, follows: &[String]) -> OutputResult<PathBuf> {
        let path = self.path_for(handle)?;
        fs::create_dir_all(&self.dir)?;

        let mut writer = BufWriter::new(File::create(&path)?);
        for followed in follows {
            writeln!(writer, "{}", followed)?;
        }
        writer.flush()?;
        Ok(path)
    }
}

/// Artifact writers handed to follow-list retrieval
#[derive(Debug)]
pub struct Artifacts {
    pub error_log: ErrorLog,
    pub dumps: Option<FollowDumps>,
}

impl Artifacts {
    pub fn from_config(config: &OutputConfig) -> Self {
        Self {
            error_log: ErrorLog::new(&config.error_log_path),
            dumps: config
                .write_follow_dumps
                .then(|| FollowDumps::new(&config.dump_dir)),
        }
    }
}
