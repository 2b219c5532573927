//! Table engine for flatstore
//!
//! One `TableEngine` orchestrates one logical table: the append-only
//! data file, the byte-offset index, the transaction log, a bounded
//! read-through cache and optional schema enforcement, combined into
//! CRUD + compaction + backup operations.
//!
//! # Record lifecycle
//!
//! absent -> active -> (active <-> active via update) -> absent (delete).
//! A deleted id reads as absent; its tombstone lines stay in the data
//! file until compaction reclaims them.
//!
//! # Crash-consistency boundary
//!
//! Append-then-index is two steps. A crash in between leaves an orphan
//! line — unindexed, invisible, recovered or discarded by the next
//! compaction — never a corrupt table. Update and delete are two locked
//! appends; a crash in the window can make a record revert to its prior
//! value, never disappear.

mod cache;
mod config;
mod engine;
mod errors;

pub use cache::RecordCache;
pub use config::TableConfig;
pub use engine::{TableBackup, TableEngine, TableStats};
pub use errors::{TableError, TableResult};
