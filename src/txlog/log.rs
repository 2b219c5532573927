//! Append-only audit log over a JSONL file

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde_json::Value;

use super::errors::{LogError, LogResult};
use super::record::{Action, LogEntry};
use crate::storage::copy_verified;

/// Handle to one table's transaction log file.
#[derive(Debug)]
pub struct TransactionLog {
    path: PathBuf,
}

impl TransactionLog {
    /// Binds a handle to the given log file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the log file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates the log file empty if it does not exist.
    pub fn create_if_missing(&self) -> LogResult<()> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| LogError::io(format!("create log file {}", self.path.display()), e))?;
        Ok(())
    }

    /// Appends one timestamped entry under an exclusive lock.
    pub fn append(&self, action: Action, record_id: &str, data: Option<Value>) -> LogResult<()> {
        let entry = LogEntry::new(action, record_id, data);
        let mut line = serde_json::to_vec(&entry)?;
        line.push(b'\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| LogError::io(format!("open log file {}", self.path.display()), e))?;

        file.lock_exclusive()
            .map_err(|e| LogError::io(format!("lock log file {}", self.path.display()), e))?;

        file.write_all(&line)
            .map_err(|e| LogError::io(format!("append to {}", self.path.display()), e))?;
        file.flush()
            .map_err(|e| LogError::io(format!("flush {}", self.path.display()), e))?;

        Ok(())
    }

    /// Reads entries sequentially with skip/limit pagination.
    ///
    /// Unparsable lines are skipped silently — the log is diagnostic,
    /// not authoritative.
    pub fn read(&self, limit: Option<usize>, offset: usize) -> LogResult<Vec<LogEntry>> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(LogError::io(
                    format!("open log file {}", self.path.display()),
                    e,
                ))
            }
        };

        file.lock_shared()
            .map_err(|e| LogError::io(format!("lock log file {}", self.path.display()), e))?;

        let reader = BufReader::new(file);
        let mut entries = Vec::new();
        let mut seen = 0usize;

        for line in reader.lines() {
            let line = line
                .map_err(|e| LogError::io(format!("read log file {}", self.path.display()), e))?;
            let Ok(entry) = serde_json::from_str::<LogEntry>(&line) else {
                continue;
            };

            if seen < offset {
                seen += 1;
                continue;
            }
            seen += 1;

            entries.push(entry);
            if let Some(limit) = limit {
                if entries.len() >= limit {
                    break;
                }
            }
        }

        Ok(entries)
    }

    /// Truncates the log to zero length, optionally copying it to a
    /// timestamped backup first. Returns the backup path, if one was
    /// made.
    pub fn rotate(&self, backup_dir: Option<&Path>) -> LogResult<Option<PathBuf>> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .open(&self.path)
            .map_err(|e| LogError::io(format!("open log file {}", self.path.display()), e))?;

        file.lock_exclusive()
            .map_err(|e| LogError::io(format!("lock log file {}", self.path.display()), e))?;

        let backup_path = match backup_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir).map_err(|e| {
                    LogError::io(format!("create backup directory {}", dir.display()), e)
                })?;
                let dst = crate::storage::timestamped_path(dir, &self.path);
                copy_verified(&self.path, &dst)?;
                Some(dst)
            }
            None => None,
        };

        file.set_len(0)
            .map_err(|e| LogError::io(format!("truncate {}", self.path.display()), e))?;
        file.sync_all()
            .map_err(|e| LogError::io(format!("fsync {}", self.path.display()), e))?;

        Ok(backup_path)
    }
}
