//! Table engine error types
//!
//! The engine distinguishes caller errors (validation — `Schema`) from
//! engine errors (I/O, corruption). "Not found" and "duplicate" are not
//! errors at all: they are `Ok(false)` / `Ok(None)` returns.

use std::io;

use thiserror::Error;

use crate::index::IndexError;
use crate::schema::SchemaError;
use crate::storage::StorageError;
use crate::txlog::LogError;

/// Result type for table operations
pub type TableResult<T> = Result<T, TableError>;

/// Failures surfaced by table operations.
#[derive(Debug, Error)]
pub enum TableError {
    /// Input rejected before any I/O
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Data file failure
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Index persistence failure
    #[error(transparent)]
    Index(#[from] IndexError),

    /// Transaction log failure
    #[error(transparent)]
    Log(#[from] LogError),

    /// Table-level file management failure
    #[error("I/O failure ({context})")]
    Io {
        /// What the engine was doing when the failure occurred
        context: String,
        #[source]
        source: io::Error,
    },
}

impl TableError {
    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        TableError::Io {
            context: context.into(),
            source,
        }
    }

    /// Returns true if this is a validation failure rather than a
    /// storage-layer failure.
    pub fn is_validation(&self) -> bool {
        matches!(self, TableError::Schema(_))
    }
}
