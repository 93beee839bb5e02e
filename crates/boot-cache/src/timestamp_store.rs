use crate::deps::DependencyGraph;
use crate::error::Result;
use crate::fs::FileSystem;
use crate::key::CacheKey;
use crate::record::validate_batch;
use crate::store::{existing_timestamps, CachedSymbols, FileTimestamp, SymbolStore};
use crate::symbol::SymbolRecord;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Keeps only the `file -> timestamp` table, in memory.
///
/// `retrieve` always misses because no symbols are kept, so every project start is a
/// full scan; afterwards the recorded timestamps let the indexer skip unchanged
/// files. Test harnesses use this to observe exactly which files were rescanned
/// without paying for serialization.
pub struct TimestampStore {
    fs: Arc<dyn FileSystem>,
    tables: RwLock<HashMap<CacheKey, BTreeMap<PathBuf, u64>>>,
}

impl TimestampStore {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            fs,
            tables: RwLock::new(HashMap::new()),
        }
    }

    /// Snapshot of the table stored under `key`.
    pub fn timestamps(&self, key: &CacheKey) -> BTreeMap<PathBuf, u64> {
        self.tables.read().get(key).cloned().unwrap_or_default()
    }
}

impl std::fmt::Debug for TimestampStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimestampStore")
            .field("keys", &self.tables.read().len())
            .finish_non_exhaustive()
    }
}

impl SymbolStore for TimestampStore {
    fn store(
        &self,
        key: &CacheKey,
        files: &[PathBuf],
        _symbols: &[SymbolRecord],
        _dependencies: &DependencyGraph,
    ) -> Result<()> {
        let table = existing_timestamps(self.fs.as_ref(), files);
        let mut tables = self.tables.write();
        tables.retain(|existing, _| !existing.is_sibling_of(key));
        tables.insert(key.clone(), table);
        Ok(())
    }

    fn retrieve(&self, _key: &CacheKey, _files: &[PathBuf]) -> Option<CachedSymbols> {
        None
    }

    fn update_files(
        &self,
        key: &CacheKey,
        files: &[FileTimestamp],
        symbols: &[SymbolRecord],
        _dependencies: &DependencyGraph,
    ) -> Result<()> {
        validate_batch(files, symbols)?;
        let mut tables = self.tables.write();
        let table = tables.entry(key.clone()).or_default();
        for stamp in files {
            table.insert(stamp.file.clone(), stamp.last_modified);
        }
        Ok(())
    }

    fn remove(&self, key: &CacheKey) -> Result<()> {
        self.tables.write().remove(key);
        Ok(())
    }

    fn remove_files(&self, key: &CacheKey, files: &[PathBuf]) -> Result<()> {
        if let Some(table) = self.tables.write().get_mut(key) {
            for file in files {
                table.remove(file);
            }
        }
        Ok(())
    }

    fn modification_timestamp(&self, key: &CacheKey, file: &Path) -> u64 {
        self.tables
            .read()
            .get(key)
            .and_then(|table| table.get(file).copied())
            .unwrap_or(0)
    }
}
