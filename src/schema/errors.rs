//! Schema validation errors
//!
//! These are caller errors: raised before any file I/O, with no side
//! effects left behind.

use thiserror::Error;

/// Result type for validation operations
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Validation failures, reported at the first offending field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// Identifier is empty or contains characters outside `[A-Za-z0-9_-]`
    #[error("invalid identifier {0:?}: only [A-Za-z0-9_-]+ is accepted")]
    InvalidId(String),

    /// A required field is absent from the record
    #[error("missing required field: {0}")]
    MissingField(String),

    /// A declared field is present with the wrong runtime type
    #[error("field '{field}': expected {expected}, got {actual}")]
    TypeMismatch {
        /// Offending field name
        field: String,
        /// Declared type name
        expected: &'static str,
        /// Runtime JSON type name
        actual: &'static str,
    },
}
