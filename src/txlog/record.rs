//! Transaction log entry types

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::record::now_epoch_f64;

/// Logged actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    /// A new record was inserted
    Insert,
    /// An existing record was replaced
    Update,
    /// A record was tombstoned
    Delete,
}

impl Action {
    /// Returns the wire name of the action.
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Insert => "INSERT",
            Action::Update => "UPDATE",
            Action::Delete => "DELETE",
        }
    }
}

/// One audit line: `{"timestamp": .., "action": "..", "recordId": "..",
/// "data": ..}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Fractional epoch seconds at append time
    pub timestamp: f64,
    /// What happened
    pub action: Action,
    /// The affected record id
    #[serde(rename = "recordId")]
    pub record_id: String,
    /// Post-operation record state, or null for deletes
    pub data: Option<Value>,
}

impl LogEntry {
    /// Builds an entry stamped with the current time.
    pub fn new(action: Action, record_id: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            timestamp: now_epoch_f64(),
            action,
            record_id: record_id.into(),
            data,
        }
    }
}
