//! Per-table orchestration: CRUD + compaction + backup

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{json, Value};

use super::cache::RecordCache;
use super::config::TableConfig;
use super::errors::{TableError, TableResult};
use crate::index::OffsetIndex;
use crate::record::{
    is_tombstone, now_epoch, record_id, Record, FIELD_CREATED_AT, FIELD_DELETED,
    FIELD_DELETED_AT, FIELD_ID, FIELD_UPDATED_AT,
};
use crate::schema::{validate_id, Schema};
use crate::storage::{copy_verified, timestamped_path, CompactionResult, DataFile, StorageError};
use crate::txlog::{Action, TransactionLog};

/// Paths of the three files snapshotted by a table backup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableBackup {
    /// Copy of the data file
    pub data: PathBuf,
    /// Copy of the index file
    pub index: PathBuf,
    /// Copy of the transaction log
    pub log: PathBuf,
}

/// Point-in-time counters for one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableStats {
    /// Indexed (live) record count
    pub records: usize,
    /// Records currently cached
    pub cached: usize,
    /// Data file size in bytes, stale lines included
    pub data_bytes: u64,
}

/// One logical table over three files: data, index and log.
#[derive(Debug)]
pub struct TableEngine {
    name: String,
    data: DataFile,
    index: OffsetIndex,
    log: TransactionLog,
    cache: RecordCache,
    schema: Option<Schema>,
    backup_dir: PathBuf,
}

impl TableEngine {
    /// Opens (creating if needed) the table `name` inside `base_dir`.
    ///
    /// File naming convention: `{name}_data.jsonl`, `{name}_index.json`,
    /// `{name}_log.jsonl`. All three files are created empty if absent.
    pub fn open(name: &str, base_dir: &Path, config: &TableConfig) -> TableResult<Self> {
        validate_id(name)?;

        fs::create_dir_all(base_dir).map_err(|e| {
            TableError::io(format!("create base directory {}", base_dir.display()), e)
        })?;

        let data = DataFile::new(base_dir.join(format!("{name}_data.jsonl")));
        let log = TransactionLog::new(base_dir.join(format!("{name}_log.jsonl")));
        let mut index = OffsetIndex::load(
            base_dir.join(format!("{name}_index.json")),
            config.auto_commit_index,
        )?;

        data.create_if_missing()?;
        log.create_if_missing()?;
        index.ensure_file()?;

        Ok(Self {
            name: name.to_string(),
            data,
            index,
            log,
            cache: RecordCache::new(config.max_cache_size),
            schema: None,
            backup_dir: base_dir.join("backups"),
        })
    }

    /// Table name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Installs or removes the schema enforced on inserts and updates.
    pub fn set_schema(&mut self, schema: Option<Schema>) {
        self.schema = schema;
    }

    /// Currently enforced schema, if any.
    pub fn schema(&self) -> Option<&Schema> {
        self.schema.as_ref()
    }

    /// Inserts a new record under `id`.
    ///
    /// Validation happens before any I/O. Returns `Ok(false)` without
    /// side effects when the id is already present — no silent
    /// overwrite.
    pub fn insert(&mut self, id: &str, data: Record) -> TableResult<bool> {
        validate_id(id)?;
        if let Some(schema) = &self.schema {
            schema.validate(&data)?;
        }
        if self.index.contains(id) {
            return Ok(false);
        }

        let mut record = data;
        record.insert(FIELD_ID.to_string(), json!(id));
        record.insert(FIELD_CREATED_AT.to_string(), json!(now_epoch()));
        record.insert(FIELD_DELETED.to_string(), json!(false));

        let offset = self.data.append(&record)?;
        self.index.set(id, offset)?;
        self.log
            .append(Action::Insert, id, Some(Value::Object(record.clone())))?;
        self.cache.insert(id, record);

        Ok(true)
    }

    /// Replaces the record under `id` with `new_data`, preserving
    /// `created_at` and stamping `updated_at`.
    ///
    /// Returns `Ok(false)` if the id is absent. The current line is
    /// superseded by re-appending it tombstoned, then the new version
    /// is appended and the index repointed — the repoint is the
    /// authoritative step; a crash between the two appends reverts the
    /// record to its prior value, it never disappears.
    pub fn update(&mut self, id: &str, new_data: Record) -> TableResult<bool> {
        validate_id(id)?;
        if let Some(schema) = &self.schema {
            schema.validate(&new_data)?;
        }
        let Some(offset) = self.index.get(id) else {
            return Ok(false);
        };

        let current = self.read_indexed(id, offset)?;

        let mut superseded = current.clone();
        superseded.insert(FIELD_DELETED.to_string(), json!(true));
        self.data.append(&superseded)?;

        let mut record = new_data;
        record.insert(FIELD_ID.to_string(), json!(id));
        record.insert(
            FIELD_CREATED_AT.to_string(),
            current
                .get(FIELD_CREATED_AT)
                .cloned()
                .unwrap_or_else(|| json!(now_epoch())),
        );
        record.insert(FIELD_UPDATED_AT.to_string(), json!(now_epoch()));
        record.insert(FIELD_DELETED.to_string(), json!(false));

        let new_offset = self.data.append(&record)?;
        self.index.set(id, new_offset)?;
        self.log
            .append(Action::Update, id, Some(Value::Object(record.clone())))?;
        self.cache.insert(id, record);

        Ok(true)
    }

    /// Tombstones the record under `id` and removes its index entry.
    ///
    /// Returns `Ok(false)` if the id is absent or already tombstoned —
    /// deleting twice is not an error.
    pub fn delete(&mut self, id: &str) -> TableResult<bool> {
        let Some(offset) = self.index.get(id) else {
            return Ok(false);
        };

        let current = self.read_indexed(id, offset)?;
        if is_tombstone(&current) {
            // A tombstone should never be indexed; repair quietly.
            self.index.remove(id)?;
            self.cache.remove(id);
            return Ok(false);
        }

        let mut tombstone = current;
        tombstone.insert(FIELD_DELETED.to_string(), json!(true));
        tombstone.insert(FIELD_DELETED_AT.to_string(), json!(now_epoch()));
        self.data.append(&tombstone)?;

        self.index.remove(id)?;
        self.log.append(Action::Delete, id, None)?;
        self.cache.remove(id);

        Ok(true)
    }

    /// Returns the record under `id`, or `None` if absent or deleted.
    pub fn select(&mut self, id: &str) -> TableResult<Option<Record>> {
        if let Some(record) = self.cache.get(id) {
            return Ok(Some(record.clone()));
        }

        let Some(offset) = self.index.get(id) else {
            return Ok(None);
        };

        let record = self.read_indexed(id, offset)?;
        if is_tombstone(&record) {
            return Ok(None);
        }

        self.cache.insert(id, record.clone());
        Ok(Some(record))
    }

    /// Returns every live record, ordered by id.
    pub fn select_all(&mut self) -> TableResult<Vec<Record>> {
        let mut records = Vec::with_capacity(self.index.len());
        for id in self.index.keys() {
            if let Some(record) = self.select(&id)? {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// Returns live records matching `predicate`, with skip/limit
    /// pagination over the matching set. Cost is O(index size)
    /// regardless of selectivity.
    pub fn find<F>(
        &mut self,
        predicate: F,
        limit: Option<usize>,
        offset: usize,
    ) -> TableResult<Vec<Record>>
    where
        F: Fn(&Record) -> bool,
    {
        let mut matches = Vec::new();
        let mut skipped = 0usize;

        for id in self.index.keys() {
            let Some(record) = self.select(&id)? else {
                continue;
            };
            if !predicate(&record) {
                continue;
            }
            if skipped < offset {
                skipped += 1;
                continue;
            }
            matches.push(record);
            if let Some(limit) = limit {
                if matches.len() >= limit {
                    break;
                }
            }
        }

        Ok(matches)
    }

    /// Rewrites the data file keeping only live records, replaces the
    /// index wholesale with the compaction output and clears the cache.
    ///
    /// Compaction re-derives the survivor set from the raw file rather
    /// than trusting the in-memory index, so it doubles as a
    /// consistency sweep.
    pub fn compact(&mut self) -> TableResult<CompactionResult> {
        self.index.commit()?;
        let result = self.data.compact(&self.backup_dir)?;
        self.index.replace(result.new_index.clone())?;
        self.index.commit()?;
        self.cache.clear();
        Ok(result)
    }

    /// Snapshots data, index and log into `dir` (the table's backup
    /// directory when `None`). Any single copy failure fails the whole
    /// call — no partial backup is ever reported as success.
    pub fn backup(&mut self, dir: Option<&Path>) -> TableResult<TableBackup> {
        self.index.commit()?;
        self.index.ensure_file()?;
        self.log.create_if_missing()?;

        let dir = dir.unwrap_or(&self.backup_dir).to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| {
            TableError::io(format!("create backup directory {}", dir.display()), e)
        })?;

        let data = self.data.backup(&dir)?;

        let index = timestamped_path(&dir, self.index.path());
        copy_verified(self.index.path(), &index)?;

        let log = timestamped_path(&dir, self.log.path());
        copy_verified(self.log.path(), &log)?;

        Ok(TableBackup { data, index, log })
    }

    /// Rebuilds the index from a full data-file scan and commits it.
    ///
    /// This is the recovery pass after an index quarantine: every
    /// record the data file still holds becomes visible again.
    pub fn recover_index(&mut self) -> TableResult<usize> {
        let recovered = self.index.rebuild_from(&self.data)?;
        self.index.commit()?;
        self.cache.clear();
        tracing::debug!(table = %self.name, recovered, "index rebuilt from data file");
        Ok(recovered)
    }

    /// Truncates all three files and resets in-memory state.
    /// Destructive; confirmation is the caller's concern.
    pub fn clear(&mut self) -> TableResult<()> {
        self.data.truncate()?;
        self.log.rotate(None)?;
        self.index.clear()?;
        self.index.commit()?;
        self.cache.clear();
        Ok(())
    }

    /// Persists the index if it has uncommitted mutations.
    pub fn commit_index(&mut self) -> TableResult<()> {
        self.index.commit()?;
        Ok(())
    }

    /// Drops every cached record.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Live record count.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Returns true if the table holds no live records.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// All live record ids, sorted.
    pub fn keys(&self) -> Vec<String> {
        self.index.keys()
    }

    /// Point-in-time counters.
    pub fn stats(&self) -> TableResult<TableStats> {
        Ok(TableStats {
            records: self.index.len(),
            cached: self.cache.len(),
            data_bytes: self.data.len()?,
        })
    }

    /// Audit log access.
    pub fn log(&self) -> &TransactionLog {
        &self.log
    }

    /// Data file path.
    pub fn data_path(&self) -> &Path {
        self.data.path()
    }

    /// Index file path.
    pub fn index_path(&self) -> &Path {
        self.index.path()
    }

    /// Log file path.
    pub fn log_path(&self) -> &Path {
        self.log.path()
    }

    /// Reads the line an index entry points at, enforcing that it
    /// decodes to the id the index claims.
    fn read_indexed(&self, id: &str, offset: u64) -> TableResult<Record> {
        let record = self.data.read_at(offset)?;
        if record_id(&record) != Some(id) {
            return Err(StorageError::Corrupt {
                offset,
                reason: format!(
                    "index entry for {id:?} points at a line with id {:?}",
                    record_id(&record)
                ),
            }
            .into());
        }
        Ok(record)
    }
}
