//! Data file storage for flatstore
//!
//! The data file is the canonical persistent state of a table: an
//! append-only sequence of newline-delimited JSON records. Nothing is
//! ever overwritten or removed in place; updates and deletes append new
//! lines, and the same id may occur on many lines. The latest line per
//! id wins — normally resolved through the byte-offset index, and
//! recomputed from scratch during compaction.
//!
//! # Design Principles
//!
//! - Append-only (no in-place updates)
//! - One JSON object per line; the serializer escapes embedded newlines,
//!   so a line boundary is always a record boundary
//! - Advisory file locks per call: exclusive for writes, shared for
//!   reads; no lock is held across two file operations (closing the
//!   handle releases the lock)
//! - Compaction never replaces the data file before a checksum-verified
//!   backup copy exists

mod backup;
mod data_file;
mod errors;

pub use backup::copy_verified;
pub(crate) use backup::timestamped_path;
pub use data_file::{CompactionResult, DataFile};
pub use errors::{StorageError, StorageResult};
