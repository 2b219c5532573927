//! In-memory offset map with atomic persistence

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::record::{is_tombstone, record_id, timestamp_id};
use crate::storage::DataFile;

use super::errors::{IndexError, IndexResult};

/// Map of record id -> byte offset of its authoritative data-file line.
///
/// Mutations only touch memory and set a dirty flag; `commit` persists
/// the whole map atomically. With `auto_commit` every mutation commits
/// immediately — higher durability, lower throughput.
#[derive(Debug)]
pub struct OffsetIndex {
    path: PathBuf,
    entries: HashMap<String, u64>,
    dirty: bool,
    auto_commit: bool,
}

impl OffsetIndex {
    /// Loads the index from its JSON file.
    ///
    /// A missing or empty file yields an empty index. An unparsable file
    /// is renamed aside to `<name>.corrupted.<timestamp>` and the index
    /// starts empty — the data file still holds every record, and
    /// `rebuild_from` can reconcile.
    pub fn load(path: impl Into<PathBuf>, auto_commit: bool) -> IndexResult<Self> {
        let path = path.into();

        let entries = match fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => HashMap::new(),
            Ok(content) => match serde_json::from_str::<HashMap<String, u64>>(&content) {
                Ok(entries) => entries,
                Err(parse_err) => {
                    let quarantine =
                        quarantine_path(&path);
                    tracing::warn!(
                        index = %path.display(),
                        quarantine = %quarantine.display(),
                        error = %parse_err,
                        "index file unparsable; quarantining and starting empty"
                    );
                    fs::rename(&path, &quarantine).map_err(|e| {
                        IndexError::io(
                            format!("quarantine corrupt index {}", path.display()),
                            e,
                        )
                    })?;
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                return Err(IndexError::io(
                    format!("read index file {}", path.display()),
                    e,
                ))
            }
        };

        Ok(Self {
            path,
            entries,
            dirty: false,
            auto_commit,
        })
    }

    /// Returns the index file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the offset for an id, if indexed.
    pub fn get(&self, id: &str) -> Option<u64> {
        self.entries.get(id).copied()
    }

    /// Returns true if the id has an index entry.
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Points an id at a byte offset.
    pub fn set(&mut self, id: impl Into<String>, offset: u64) -> IndexResult<()> {
        self.entries.insert(id.into(), offset);
        self.mark_dirty()
    }

    /// Removes an id's entry. Removal, not tombstoning: a deleted id has
    /// no entry at all.
    pub fn remove(&mut self, id: &str) -> IndexResult<()> {
        if self.entries.remove(id).is_some() {
            self.mark_dirty()?;
        }
        Ok(())
    }

    /// Returns all indexed ids, sorted for deterministic iteration.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Number of indexed ids.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no id is indexed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Replaces the whole map, e.g. with compaction output.
    pub fn replace(&mut self, entries: HashMap<String, u64>) -> IndexResult<()> {
        self.entries = entries;
        self.mark_dirty()
    }

    /// Rebuilds the map from a full data-file scan: last line wins per
    /// id, tombstoned ids excluded. Returns the rebuilt entry count.
    pub fn rebuild_from(&mut self, data_file: &DataFile) -> IndexResult<usize> {
        let scan = data_file.read_all()?;

        let mut rebuilt: HashMap<String, u64> = HashMap::new();
        for (offset, record) in scan {
            if let Some(id) = record_id(&record) {
                if is_tombstone(&record) {
                    rebuilt.remove(id);
                } else {
                    rebuilt.insert(id.to_string(), offset);
                }
            }
        }

        let count = rebuilt.len();
        self.replace(rebuilt)?;
        Ok(count)
    }

    /// Persists the index if dirty: whole map to a temp file, fsync,
    /// atomic rename over the index file.
    pub fn commit(&mut self) -> IndexResult<()> {
        if !self.dirty {
            return Ok(());
        }

        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "index".to_string());
        let tmp_path = self.path.with_file_name(format!("{file_name}.tmp"));

        let json = serde_json::to_string(&self.entries)?;

        let mut tmp_file = File::create(&tmp_path)
            .map_err(|e| IndexError::io(format!("create {}", tmp_path.display()), e))?;
        tmp_file
            .write_all(json.as_bytes())
            .map_err(|e| IndexError::io(format!("write {}", tmp_path.display()), e))?;
        tmp_file
            .sync_all()
            .map_err(|e| IndexError::io(format!("fsync {}", tmp_path.display()), e))?;
        drop(tmp_file);

        fs::rename(&tmp_path, &self.path).map_err(|e| {
            IndexError::io(
                format!("rename {} over {}", tmp_path.display(), self.path.display()),
                e,
            )
        })?;

        self.dirty = false;
        Ok(())
    }

    /// Writes the index file if it does not exist yet, so a freshly
    /// registered table has all three of its files on disk.
    pub fn ensure_file(&mut self) -> IndexResult<()> {
        if !self.path.exists() {
            self.dirty = true;
            self.commit()?;
        }
        Ok(())
    }

    /// Drops all entries from memory (the file is untouched until the
    /// next commit).
    pub fn clear(&mut self) -> IndexResult<()> {
        self.entries.clear();
        self.mark_dirty()
    }

    fn mark_dirty(&mut self) -> IndexResult<()> {
        self.dirty = true;
        if self.auto_commit {
            self.commit()?;
        }
        Ok(())
    }
}

fn quarantine_path(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "index".to_string());
    let mut candidate = path.with_file_name(format!("{file_name}.corrupted.{}", timestamp_id()));
    let mut n = 1;
    while candidate.exists() {
        candidate = path.with_file_name(format!(
            "{file_name}.corrupted.{}-{n}",
            timestamp_id()
        ));
        n += 1;
    }
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn index_path(dir: &TempDir) -> PathBuf {
        dir.path().join("posts_index.json")
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let temp_dir = TempDir::new().unwrap();
        let index = OffsetIndex::load(index_path(&temp_dir), false).unwrap();
        assert!(index.is_empty());
    }

    #[test]
    fn test_empty_file_loads_empty_without_quarantine() {
        let temp_dir = TempDir::new().unwrap();
        let path = index_path(&temp_dir);
        fs::write(&path, b"").unwrap();

        let index = OffsetIndex::load(&path, false).unwrap();
        assert!(index.is_empty());
        assert!(path.exists());
    }

    #[test]
    fn test_commit_and_reload() {
        let temp_dir = TempDir::new().unwrap();
        let path = index_path(&temp_dir);

        {
            let mut index = OffsetIndex::load(&path, false).unwrap();
            index.set("a", 0).unwrap();
            index.set("b", 42).unwrap();
            index.commit().unwrap();
        }

        let index = OffsetIndex::load(&path, false).unwrap();
        assert_eq!(index.get("a"), Some(0));
        assert_eq!(index.get("b"), Some(42));
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_uncommitted_mutations_stay_in_memory() {
        let temp_dir = TempDir::new().unwrap();
        let path = index_path(&temp_dir);

        {
            let mut index = OffsetIndex::load(&path, false).unwrap();
            index.set("a", 0).unwrap();
            // no commit
        }

        let index = OffsetIndex::load(&path, false).unwrap();
        assert!(index.is_empty());
    }

    #[test]
    fn test_auto_commit_persists_every_mutation() {
        let temp_dir = TempDir::new().unwrap();
        let path = index_path(&temp_dir);

        {
            let mut index = OffsetIndex::load(&path, true).unwrap();
            index.set("a", 7).unwrap();
        }

        let index = OffsetIndex::load(&path, false).unwrap();
        assert_eq!(index.get("a"), Some(7));
    }

    #[test]
    fn test_commit_is_noop_when_clean() {
        let temp_dir = TempDir::new().unwrap();
        let path = index_path(&temp_dir);

        let mut index = OffsetIndex::load(&path, false).unwrap();
        index.commit().unwrap();
        // Nothing was dirty, so no file was written.
        assert!(!path.exists());
    }

    #[test]
    fn test_corrupt_file_is_quarantined() {
        let temp_dir = TempDir::new().unwrap();
        let path = index_path(&temp_dir);
        fs::write(&path, b"{ this is not json").unwrap();

        let index = OffsetIndex::load(&path, false).unwrap();
        assert!(index.is_empty());
        assert!(!path.exists());

        let quarantined: Vec<_> = fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.file_name()
                    .to_string_lossy()
                    .contains("corrupted")
            })
            .collect();
        assert_eq!(quarantined.len(), 1);
    }

    #[test]
    fn test_remove_deletes_entry_entirely() {
        let temp_dir = TempDir::new().unwrap();
        let mut index = OffsetIndex::load(index_path(&temp_dir), false).unwrap();

        index.set("a", 0).unwrap();
        index.remove("a").unwrap();

        assert!(!index.contains("a"));
        assert_eq!(index.get("a"), None);
        assert!(index.keys().is_empty());
    }

    #[test]
    fn test_rebuild_from_data_file() {
        let temp_dir = TempDir::new().unwrap();
        let data = DataFile::new(temp_dir.path().join("posts_data.jsonl"));

        let mut live = crate::record::Record::new();
        live.insert("id".to_string(), json!("a"));
        live.insert("_deleted".to_string(), json!(false));
        data.append(&live).unwrap();

        let stale_offset = data.append(&live).unwrap();

        let mut dead = crate::record::Record::new();
        dead.insert("id".to_string(), json!("b"));
        dead.insert("_deleted".to_string(), json!(false));
        data.append(&dead).unwrap();
        let mut dead_tombstone = dead.clone();
        dead_tombstone.insert("_deleted".to_string(), json!(true));
        data.append(&dead_tombstone).unwrap();

        let mut index = OffsetIndex::load(index_path(&temp_dir), false).unwrap();
        let count = index.rebuild_from(&data).unwrap();

        assert_eq!(count, 1);
        assert_eq!(index.get("a"), Some(stale_offset));
        assert!(!index.contains("b"));
    }

    #[test]
    fn test_keys_are_sorted() {
        let temp_dir = TempDir::new().unwrap();
        let mut index = OffsetIndex::load(index_path(&temp_dir), false).unwrap();

        index.set("c", 2).unwrap();
        index.set("a", 0).unwrap();
        index.set("b", 1).unwrap();

        assert_eq!(index.keys(), vec!["a", "b", "c"]);
    }
}
