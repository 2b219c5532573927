//! Index error types

use std::io;

use thiserror::Error;

/// Result type for index operations
pub type IndexResult<T> = Result<T, IndexError>;

/// Index persistence failures.
///
/// A corrupt index file is not an error: it is quarantined on load and
/// the index starts empty.
#[derive(Debug, Error)]
pub enum IndexError {
    /// The index file could not be read, written or renamed
    #[error("I/O failure ({context})")]
    Io {
        /// What the index was doing when the failure occurred
        context: String,
        #[source]
        source: io::Error,
    },

    /// The in-memory index failed to serialize
    #[error("index serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// A rebuild scan of the data file failed
    #[error(transparent)]
    Storage(#[from] crate::storage::StorageError),
}

impl IndexError {
    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        IndexError::Io {
            context: context.into(),
            source,
        }
    }
}
