//! Database registry for flatstore
//!
//! A `Database` is a set of named tables sharing one base directory.
//! Tables must be registered before use — there is no implicit
//! creation — and the registry fans maintenance operations (index
//! commits, compaction, backups, cache clears) out across the set.
//! Compaction and backup fan-outs are best-effort: per-table failures
//! are captured per name and never abort the sweep.
//!
//! Each `Database` owns its state explicitly; multiple independent
//! instances can coexist in one process.

mod errors;

pub use errors::{DatabaseError, DatabaseResult};

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::schema::validate_id;
use crate::storage::CompactionResult;
use crate::table::{TableBackup, TableConfig, TableEngine, TableResult};

/// Registry of table engines over one base directory.
pub struct Database {
    base_dir: PathBuf,
    config: TableConfig,
    tables: BTreeMap<String, TableEngine>,
}

impl Database {
    /// Opens a database rooted at `base_dir`, creating the directory if
    /// needed.
    pub fn open(base_dir: impl Into<PathBuf>, config: TableConfig) -> DatabaseResult<Self> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir).map_err(|e| {
            DatabaseError::io(format!("create base directory {}", base_dir.display()), e)
        })?;

        Ok(Self {
            base_dir,
            config,
            tables: BTreeMap::new(),
        })
    }

    /// Database root directory.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Registers (and opens) the table `name`, creating its files empty
    /// if absent. Table names follow the same rule as record ids.
    /// Registering an already-registered table is a no-op.
    pub fn register_table(&mut self, name: &str) -> DatabaseResult<()> {
        validate_id(name).map_err(|_| DatabaseError::InvalidName(name.to_string()))?;
        if self.tables.contains_key(name) {
            return Ok(());
        }

        let engine = TableEngine::open(name, &self.base_dir, &self.config)?;
        self.tables.insert(name.to_string(), engine);
        Ok(())
    }

    /// Returns the engine for a registered table.
    pub fn table(&mut self, name: &str) -> DatabaseResult<&mut TableEngine> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| DatabaseError::UnknownTable(name.to_string()))
    }

    /// Registered table names, sorted.
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.keys().map(String::as_str).collect()
    }

    /// Commits every table's index. Fails on the first error — a
    /// failed index commit means durability cannot be guaranteed.
    pub fn commit_all_indexes(&mut self) -> DatabaseResult<()> {
        for engine in self.tables.values_mut() {
            engine.commit_index()?;
        }
        Ok(())
    }

    /// Compacts every table, capturing each outcome per name.
    pub fn compact_all(&mut self) -> BTreeMap<String, TableResult<CompactionResult>> {
        let mut outcomes = BTreeMap::new();
        for (name, engine) in &mut self.tables {
            let outcome = engine.compact();
            if let Err(e) = &outcome {
                tracing::warn!(table = %name, error = %e, "compaction failed");
            }
            outcomes.insert(name.clone(), outcome);
        }
        outcomes
    }

    /// Clears every table's record cache.
    pub fn clear_all_caches(&mut self) {
        for engine in self.tables.values_mut() {
            engine.clear_cache();
        }
    }

    /// Backs up every table into `dir` (each table's default backup
    /// directory when `None`), capturing each outcome per name.
    pub fn backup_all(
        &mut self,
        dir: Option<&Path>,
    ) -> BTreeMap<String, TableResult<TableBackup>> {
        let mut outcomes = BTreeMap::new();
        for (name, engine) in &mut self.tables {
            let outcome = engine.backup(dir);
            if let Err(e) = &outcome {
                tracing::warn!(table = %name, error = %e, "backup failed");
            }
            outcomes.insert(name.clone(), outcome);
        }
        outcomes
    }

    /// Clears every table: truncates all files and resets in-memory
    /// state. Destructive.
    pub fn clear_database(&mut self) -> DatabaseResult<()> {
        for engine in self.tables.values_mut() {
            engine.clear()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn body(title: &str) -> crate::record::Record {
        let mut rec = crate::record::Record::new();
        rec.insert("title".to_string(), json!(title));
        rec
    }

    #[test]
    fn test_register_creates_table_files() {
        let temp_dir = TempDir::new().unwrap();
        let mut db = Database::open(temp_dir.path(), TableConfig::default()).unwrap();

        db.register_table("posts").unwrap();

        assert!(temp_dir.path().join("posts_data.jsonl").exists());
        assert!(temp_dir.path().join("posts_index.json").exists());
        assert!(temp_dir.path().join("posts_log.jsonl").exists());
    }

    #[test]
    fn test_register_rejects_invalid_name() {
        let temp_dir = TempDir::new().unwrap();
        let mut db = Database::open(temp_dir.path(), TableConfig::default()).unwrap();

        let err = db.register_table("../escape").unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidName(_)));
    }

    #[test]
    fn test_register_twice_is_noop() {
        let temp_dir = TempDir::new().unwrap();
        let mut db = Database::open(temp_dir.path(), TableConfig::default()).unwrap();

        db.register_table("posts").unwrap();
        db.table("posts").unwrap().insert("p1", body("x")).unwrap();

        db.register_table("posts").unwrap();
        // The engine (and its in-memory index) survived re-registration.
        assert_eq!(db.table("posts").unwrap().len(), 1);
    }

    #[test]
    fn test_unregistered_table_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let mut db = Database::open(temp_dir.path(), TableConfig::default()).unwrap();

        let err = db.table("ghosts").unwrap_err();
        assert!(matches!(err, DatabaseError::UnknownTable(_)));
    }

    #[test]
    fn test_fan_out_across_tables() {
        let temp_dir = TempDir::new().unwrap();
        let mut db = Database::open(temp_dir.path(), TableConfig::default()).unwrap();

        db.register_table("posts").unwrap();
        db.register_table("pages").unwrap();
        db.table("posts").unwrap().insert("p1", body("a")).unwrap();
        db.table("pages").unwrap().insert("g1", body("b")).unwrap();

        db.commit_all_indexes().unwrap();

        let outcomes = db.compact_all();
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.values().all(|o| o.is_ok()));

        let backups = db.backup_all(None);
        assert_eq!(backups.len(), 2);
        assert!(backups.values().all(|o| o.is_ok()));

        db.clear_all_caches();
        assert_eq!(db.table("posts").unwrap().len(), 1);
    }

    #[test]
    fn test_clear_database_empties_every_table() {
        let temp_dir = TempDir::new().unwrap();
        let mut db = Database::open(temp_dir.path(), TableConfig::default()).unwrap();

        db.register_table("posts").unwrap();
        db.register_table("pages").unwrap();
        db.table("posts").unwrap().insert("p1", body("a")).unwrap();
        db.table("pages").unwrap().insert("g1", body("b")).unwrap();

        db.clear_database().unwrap();

        assert!(db.table("posts").unwrap().is_empty());
        assert!(db.table("pages").unwrap().is_empty());
    }

    #[test]
    fn test_table_names_sorted() {
        let temp_dir = TempDir::new().unwrap();
        let mut db = Database::open(temp_dir.path(), TableConfig::default()).unwrap();

        db.register_table("pages").unwrap();
        db.register_table("posts").unwrap();
        db.register_table("assets").unwrap();

        assert_eq!(db.table_names(), vec!["assets", "pages", "posts"]);
    }
}
