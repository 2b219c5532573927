//! Schema type model
//!
//! A schema declares which fields a record must carry and what runtime
//! JSON type each declared field must have. There is no coercion: an
//! integer is not a float, a float is not an int. `Numeric` is the single
//! deliberate widening and accepts either.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Supported field types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// UTF-8 string
    String,
    /// Integer (JSON number without a fractional part)
    Int,
    /// 64-bit floating point
    Float,
    /// Boolean
    Bool,
    /// Array of any element type
    Array,
    /// Integer or float
    Numeric,
}

impl FieldType {
    /// Returns the type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Int => "int",
            FieldType::Float => "float",
            FieldType::Bool => "bool",
            FieldType::Array => "array",
            FieldType::Numeric => "numeric",
        }
    }

    /// Returns true if `value` has this runtime type.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            FieldType::String => value.is_string(),
            FieldType::Int => value.is_i64() || value.is_u64(),
            FieldType::Float => value.is_f64(),
            FieldType::Bool => value.is_boolean(),
            FieldType::Array => value.is_array(),
            FieldType::Numeric => value.is_number(),
        }
    }
}

/// Table schema: required fields plus declared field types.
///
/// The two sets are independent: a field may be required without a
/// declared type, and a declared type applies only when the field is
/// present. Field ordering is kept deterministic via `BTreeMap`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    /// Fields that must be present on every record
    #[serde(default)]
    pub required: Vec<String>,

    /// Runtime type constraints for declared fields
    #[serde(default)]
    pub field_types: BTreeMap<String, FieldType>,
}

impl Schema {
    /// Creates an empty schema (accepts every record).
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a field as required.
    pub fn require(mut self, field: impl Into<String>) -> Self {
        self.required.push(field.into());
        self
    }

    /// Declares a field type constraint.
    pub fn field(mut self, field: impl Into<String>, field_type: FieldType) -> Self {
        self.field_types.insert(field.into(), field_type);
        self
    }
}
