//! Database registry error types

use std::io;

use thiserror::Error;

use crate::table::TableError;

/// Result type for database operations
pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Registry-level failures.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Table name violates the identifier rule
    #[error("invalid table name {0:?}: only [A-Za-z0-9_-]+ is accepted")]
    InvalidName(String),

    /// The table was never registered; there is no implicit creation
    #[error("unknown table {0:?}: tables must be registered before use")]
    UnknownTable(String),

    /// A table operation failed
    #[error(transparent)]
    Table(#[from] TableError),

    /// Base directory management failed
    #[error("I/O failure ({context})")]
    Io {
        /// What the registry was doing when the failure occurred
        context: String,
        #[source]
        source: io::Error,
    },
}

impl DatabaseError {
    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        DatabaseError::Io {
            context: context.into(),
            source,
        }
    }
}
