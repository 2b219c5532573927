//! Record type and engine-managed fields
//!
//! A record is a flat JSON object. The engine stamps a fixed set of
//! bookkeeping fields onto every record it persists:
//!
//! - `id`          primary key, immutable, `[A-Za-z0-9_-]+`
//! - `created_at`  epoch seconds, set once on insert
//! - `updated_at`  epoch seconds, set on every update
//! - `deleted_at`  epoch seconds, set when the record is tombstoned
//! - `_deleted`    tombstone marker
//!
//! On disk a record is exactly one JSON line; `serde_json` escapes embedded
//! newlines, so the line boundary is always a record boundary.

use chrono::Utc;
use serde_json::{Map, Value};

/// A single stored record: field name -> JSON value.
pub type Record = Map<String, Value>;

/// Primary key field.
pub const FIELD_ID: &str = "id";
/// Insert timestamp field (epoch seconds).
pub const FIELD_CREATED_AT: &str = "created_at";
/// Update timestamp field (epoch seconds).
pub const FIELD_UPDATED_AT: &str = "updated_at";
/// Delete timestamp field (epoch seconds).
pub const FIELD_DELETED_AT: &str = "deleted_at";
/// Tombstone marker field.
pub const FIELD_DELETED: &str = "_deleted";

/// Fields owned by the engine. Schema validation never applies to these.
pub const ENGINE_FIELDS: [&str; 5] = [
    FIELD_ID,
    FIELD_CREATED_AT,
    FIELD_UPDATED_AT,
    FIELD_DELETED_AT,
    FIELD_DELETED,
];

/// Current time as whole epoch seconds, the resolution stored on records.
pub fn now_epoch() -> i64 {
    Utc::now().timestamp()
}

/// Current time as fractional epoch seconds, used by the transaction log.
pub fn now_epoch_f64() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}

/// Timestamp component for backup and quarantine file names.
///
/// Format: `YYYYMMDDTHHMMSSZ`.
pub fn timestamp_id() -> String {
    Utc::now().format("%Y%m%dT%H%M%SZ").to_string()
}

/// Returns the record's `id` if present and a string.
pub fn record_id(record: &Record) -> Option<&str> {
    record.get(FIELD_ID).and_then(Value::as_str)
}

/// Returns true if the record carries a live tombstone marker.
pub fn is_tombstone(record: &Record) -> bool {
    record
        .get(FIELD_DELETED)
        .and_then(Value::as_bool)
        .unwrap_or(false)
}
