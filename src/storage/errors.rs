//! Storage error types
//!
//! I/O failures carry their source error and the operation context.
//! Corruption of a single line is fatal for that read only; the caller
//! decides whether the table survives.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage failures.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The file could not be opened, locked, read or written
    #[error("I/O failure ({context})")]
    Io {
        /// What the engine was doing when the failure occurred
        context: String,
        #[source]
        source: io::Error,
    },

    /// A record failed to serialize to a JSON line
    #[error("record serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The line at a given byte offset is missing or not a JSON object
    #[error("corrupt record at byte offset {offset}: {reason}")]
    Corrupt {
        /// Byte offset of the line start
        offset: u64,
        /// Parse or bounds failure description
        reason: String,
    },

    /// A backup copy did not match its source after writing
    #[error("backup verification failed: {} -> {}", src.display(), dst.display())]
    BackupMismatch {
        /// Source file
        src: PathBuf,
        /// Rejected copy (removed before this error is returned)
        dst: PathBuf,
    },

    /// Compaction could not swap the rewritten file into place
    #[error("compaction failed: {0}")]
    CompactionFailed(String),
}

impl StorageError {
    /// Shorthand for an I/O failure with context.
    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        StorageError::Io {
            context: context.into(),
            source,
        }
    }

    /// Shorthand for a corrupt line at an offset.
    pub(crate) fn corrupt(offset: u64, reason: impl Into<String>) -> Self {
        StorageError::Corrupt {
            offset,
            reason: reason.into(),
        }
    }
}
