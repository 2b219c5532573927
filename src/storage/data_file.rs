//! Append-only JSONL data file
//!
//! One `DataFile` is bound to one table's data file path. Every call
//! opens a fresh handle and holds an advisory lock only for the duration
//! of that call, so independent processes can interleave safely at the
//! granularity of single appends and reads.

use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use super::backup::{copy_verified, timestamped_path};
use super::errors::{StorageError, StorageResult};
use crate::record::{is_tombstone, record_id, Record};

/// Outcome of a compaction run.
#[derive(Debug)]
pub struct CompactionResult {
    /// New byte offset per surviving id, for wholesale index replacement
    pub new_index: HashMap<String, u64>,
    /// Verified pre-compaction copy of the data file
    pub backup_path: PathBuf,
    /// Data file size before compaction
    pub bytes_before: u64,
    /// Data file size after compaction
    pub bytes_after: u64,
}

/// Handle to one table's append-only data file.
#[derive(Debug)]
pub struct DataFile {
    path: PathBuf,
}

impl DataFile {
    /// Binds a handle to the given data file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the data file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates the data file empty if it does not exist.
    pub fn create_if_missing(&self) -> StorageResult<()> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| StorageError::io(format!("create data file {}", self.path.display()), e))?;
        Ok(())
    }

    /// Returns the current data file size in bytes.
    pub fn len(&self) -> StorageResult<u64> {
        match fs::metadata(&self.path) {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(StorageError::io(
                format!("stat data file {}", self.path.display()),
                e,
            )),
        }
    }

    /// Returns true if the data file is absent or empty.
    pub fn is_empty(&self) -> StorageResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Appends one record as a single JSON line and returns the byte
    /// offset of the line start.
    ///
    /// The offset is recorded before the write (tell-before-write) under
    /// the same exclusive lock, and the line goes out as one `write_all`
    /// followed by fsync, so a reader never observes a half-line as an
    /// indexed record.
    pub fn append(&self, record: &Record) -> StorageResult<u64> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| StorageError::io(format!("open data file {}", self.path.display()), e))?;

        file.lock_exclusive()
            .map_err(|e| StorageError::io(format!("lock data file {}", self.path.display()), e))?;

        let offset = file
            .metadata()
            .map_err(|e| StorageError::io("stat data file before append", e))?
            .len();

        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        file.write_all(&line)
            .map_err(|e| StorageError::io(format!("append to {}", self.path.display()), e))?;

        file.sync_all()
            .map_err(|e| StorageError::io(format!("fsync {}", self.path.display()), e))?;

        Ok(offset)
    }

    /// Reads the single record whose line starts at `offset`.
    ///
    /// An offset past the end of the file, or a line that does not parse
    /// as a JSON object, is corruption — fatal for this read only.
    pub fn read_at(&self, offset: u64) -> StorageResult<Record> {
        let mut file = File::open(&self.path)
            .map_err(|e| StorageError::io(format!("open data file {}", self.path.display()), e))?;

        file.lock_shared()
            .map_err(|e| StorageError::io(format!("lock data file {}", self.path.display()), e))?;

        let file_size = file
            .metadata()
            .map_err(|e| StorageError::io("stat data file", e))?
            .len();
        if offset >= file_size {
            return Err(StorageError::corrupt(
                offset,
                format!("offset beyond end of file ({file_size} bytes)"),
            ));
        }

        file.seek(SeekFrom::Start(offset))
            .map_err(|e| StorageError::io(format!("seek to offset {offset}"), e))?;

        let mut reader = BufReader::new(file);
        let mut line = String::new();
        let bytes_read = reader
            .read_line(&mut line)
            .map_err(|e| StorageError::io(format!("read line at offset {offset}"), e))?;

        if bytes_read == 0 {
            return Err(StorageError::corrupt(offset, "no line at offset"));
        }

        serde_json::from_str::<Record>(line.trim_end())
            .map_err(|e| StorageError::corrupt(offset, e.to_string()))
    }

    /// Scans the whole file and returns every parsable line keyed by its
    /// own byte offset — stale and tombstoned versions included.
    ///
    /// Unparsable lines are skipped with a warning; a sequential scan is
    /// the resilience path and must survive a torn trailing write.
    pub fn read_all(&self) -> StorageResult<BTreeMap<u64, Record>> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => {
                return Err(StorageError::io(
                    format!("open data file {}", self.path.display()),
                    e,
                ))
            }
        };

        file.lock_shared()
            .map_err(|e| StorageError::io(format!("lock data file {}", self.path.display()), e))?;

        let mut reader = BufReader::new(file);
        let mut records = BTreeMap::new();
        let mut offset: u64 = 0;
        let mut buf = String::new();

        loop {
            buf.clear();
            let bytes_read = reader
                .read_line(&mut buf)
                .map_err(|e| StorageError::io(format!("scan line at offset {offset}"), e))?;
            if bytes_read == 0 {
                break;
            }

            let line = buf.trim_end();
            if !line.is_empty() {
                match serde_json::from_str::<Record>(line) {
                    Ok(record) => {
                        records.insert(offset, record);
                    }
                    Err(e) => {
                        tracing::warn!(offset, error = %e, "skipping unparsable data line");
                    }
                }
            }

            offset += bytes_read as u64;
        }

        Ok(records)
    }

    /// Rewrites the data file keeping only the latest non-tombstoned
    /// version of each id.
    ///
    /// The survivor set is recomputed from the raw file (last line wins
    /// per id) rather than taken from the index, so compaction also
    /// recovers lines the index never learned about. The original file
    /// is copied to a verified backup before the rewritten file is
    /// renamed into place; if the rename fails, the backup is restored
    /// so the table is never left without a data file.
    pub fn compact(&self, backup_dir: &Path) -> StorageResult<CompactionResult> {
        let bytes_before = self.len()?;
        let scan = self.read_all()?;

        // Last write wins per id, same rule the index encodes.
        let mut latest: BTreeMap<String, Record> = BTreeMap::new();
        for (offset, record) in scan {
            match record_id(&record) {
                Some(id) => {
                    latest.insert(id.to_string(), record);
                }
                None => {
                    tracing::warn!(offset, "dropping data line without a string id");
                }
            }
        }

        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "data".to_string());
        let tmp_path = self.path.with_file_name(format!("{file_name}.compact.tmp"));

        let mut tmp_file = File::create(&tmp_path)
            .map_err(|e| StorageError::io(format!("create {}", tmp_path.display()), e))?;

        let mut new_index = HashMap::new();
        let mut position: u64 = 0;
        for (id, record) in &latest {
            if is_tombstone(record) {
                continue;
            }
            let mut line = serde_json::to_vec(record)?;
            line.push(b'\n');
            tmp_file
                .write_all(&line)
                .map_err(|e| StorageError::io(format!("write {}", tmp_path.display()), e))?;
            new_index.insert(id.clone(), position);
            position += line.len() as u64;
        }

        tmp_file
            .sync_all()
            .map_err(|e| StorageError::io(format!("fsync {}", tmp_path.display()), e))?;
        drop(tmp_file);

        // Safety net: verified copy of the original before replacement.
        let backup_path = self.backup(backup_dir)?;

        if let Err(rename_err) = fs::rename(&tmp_path, &self.path) {
            let _ = fs::remove_file(&tmp_path);
            let restore = fs::copy(&backup_path, &self.path);
            let mut message = format!(
                "could not replace {} with compacted file: {rename_err}",
                self.path.display()
            );
            match restore {
                Ok(_) => message.push_str("; original restored from backup"),
                Err(restore_err) => {
                    message.push_str(&format!("; restore from backup failed: {restore_err}"))
                }
            }
            return Err(StorageError::CompactionFailed(message));
        }

        tracing::debug!(
            path = %self.path.display(),
            bytes_before,
            bytes_after = position,
            records = new_index.len(),
            "compaction complete"
        );

        Ok(CompactionResult {
            new_index,
            backup_path,
            bytes_before,
            bytes_after: position,
        })
    }

    /// Copies the data file to a timestamped, checksum-verified backup
    /// inside `dir` and returns the backup path.
    pub fn backup(&self, dir: &Path) -> StorageResult<PathBuf> {
        fs::create_dir_all(dir)
            .map_err(|e| StorageError::io(format!("create backup directory {}", dir.display()), e))?;
        self.create_if_missing()?;

        let backup_path = timestamped_path(dir, &self.path);
        copy_verified(&self.path, &backup_path)?;
        Ok(backup_path)
    }

    /// Truncates the data file to zero length.
    pub fn truncate(&self) -> StorageResult<()> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .open(&self.path)
            .map_err(|e| StorageError::io(format!("open data file {}", self.path.display()), e))?;

        file.lock_exclusive()
            .map_err(|e| StorageError::io(format!("lock data file {}", self.path.display()), e))?;

        file.set_len(0)
            .map_err(|e| StorageError::io(format!("truncate {}", self.path.display()), e))?;
        file.sync_all()
            .map_err(|e| StorageError::io(format!("fsync {}", self.path.display()), e))?;
        Ok(())
    }
}
