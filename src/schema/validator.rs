//! Identifier and record validation
//!
//! Validation is pure: no I/O, no mutation, first failure wins.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use super::errors::{SchemaError, SchemaResult};
use super::types::Schema;
use crate::record::{Record, ENGINE_FIELDS};

static ID_PATTERN: OnceLock<Regex> = OnceLock::new();

fn id_pattern() -> &'static Regex {
    ID_PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9_-]+$").expect("identifier pattern is a valid regex")
    })
}

/// Validates a record id or table name.
///
/// Accepts ASCII letters, digits, hyphen and underscore; rejects the
/// empty string and everything else.
pub fn validate_id(id: &str) -> SchemaResult<()> {
    if id_pattern().is_match(id) {
        Ok(())
    } else {
        Err(SchemaError::InvalidId(id.to_string()))
    }
}

impl Schema {
    /// Validates a record against this schema.
    ///
    /// Reports the first missing required field, then the first declared
    /// field whose runtime type mismatches. Engine-managed fields are
    /// skipped. Absent declared fields pass unless also required.
    pub fn validate(&self, record: &Record) -> SchemaResult<()> {
        for field in &self.required {
            if !record.contains_key(field) {
                return Err(SchemaError::MissingField(field.clone()));
            }
        }

        for (field, field_type) in &self.field_types {
            if ENGINE_FIELDS.contains(&field.as_str()) {
                continue;
            }
            if let Some(value) = record.get(field) {
                if !field_type.matches(value) {
                    return Err(SchemaError::TypeMismatch {
                        field: field.clone(),
                        expected: field_type.type_name(),
                        actual: json_type_name(value),
                    });
                }
            }
        }

        Ok(())
    }
}

/// Returns the JSON type name of a value for error messages.
fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
