//! flatstore - an embedded, append-only flat-file record store
//!
//! A log-structured persistence engine that gives an application
//! table-like storage — insert/update/delete/select by id, schema
//! validation, crash-tolerant durability — without a database server.
//!
//! # Design Principles
//!
//! - Append-only data files (no in-place updates); latest line wins
//! - A byte-offset index is the authoritative view of "current";
//!   deleted ids lose their entry, tombstone lines wait for compaction
//! - Index commits are atomic (temp file + rename)
//! - Multi-process access through per-call advisory file locks
//! - Self-healing where safe: corrupt index files are quarantined,
//!   corrupt scan lines skipped; single-offset read corruption is
//!   surfaced, never masked
//!
//! # Example
//!
//! ```no_run
//! use flatstore::{Database, TableConfig};
//! use serde_json::json;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut db = Database::open("./content", TableConfig::default())?;
//! db.register_table("posts")?;
//!
//! let posts = db.table("posts")?;
//! let mut record = flatstore::Record::new();
//! record.insert("title".to_string(), json!("Hello"));
//! posts.insert("p1", record)?;
//!
//! let post = posts.select("p1")?;
//! # Ok(())
//! # }
//! ```

pub mod database;
pub mod index;
pub mod record;
pub mod schema;
pub mod storage;
pub mod table;
pub mod txlog;

pub use database::{Database, DatabaseError, DatabaseResult};
pub use record::Record;
pub use schema::{FieldType, Schema, SchemaError};
pub use storage::CompactionResult;
pub use table::{TableBackup, TableConfig, TableEngine, TableError, TableResult, TableStats};
pub use txlog::{Action, LogEntry};
