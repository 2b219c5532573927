//! Transaction log error types

use std::io;

use thiserror::Error;

/// Result type for transaction log operations
pub type LogResult<T> = Result<T, LogError>;

/// Log failures. Append failures are real errors — the log is
/// best-effort-durable — but reads skip unparsable lines silently.
#[derive(Debug, Error)]
pub enum LogError {
    /// The log file could not be opened, locked, read or written
    #[error("I/O failure ({context})")]
    Io {
        /// What the log was doing when the failure occurred
        context: String,
        #[source]
        source: io::Error,
    },

    /// A log entry failed to serialize
    #[error("log entry serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Rotating with a backup produced an unverifiable copy
    #[error(transparent)]
    Backup(#[from] crate::storage::StorageError),
}

impl LogError {
    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        LogError::Io {
            context: context.into(),
            source,
        }
    }
}
