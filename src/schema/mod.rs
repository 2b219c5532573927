//! Schema validation for flatstore
//!
//! Validation runs before any I/O is attempted:
//!
//! - Identifiers (record ids and table names) must match `[A-Za-z0-9_-]+`
//! - All required fields must be present
//! - Declared field types must match the runtime JSON type exactly
//!
//! Validation is deterministic, reports the first failure, and never
//! mutates the record. Engine-managed fields (`id`, timestamps, the
//! tombstone marker) are exempt from type checks.

mod errors;
mod types;
mod validator;

pub use errors::{SchemaError, SchemaResult};
pub use types::{FieldType, Schema};
pub use validator::validate_id;
