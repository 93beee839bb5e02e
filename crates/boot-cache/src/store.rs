use crate::deps::DependencyGraph;
use crate::error::Result;
use crate::fs::FileSystem;
use crate::key::CacheKey;
use crate::symbol::SymbolRecord;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// A file together with the modification time its data was scanned at.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FileTimestamp {
    pub file: PathBuf,
    pub last_modified: u64,
}

impl FileTimestamp {
    pub fn new(file: impl Into<PathBuf>, last_modified: u64) -> Self {
        Self {
            file: file.into(),
            last_modified,
        }
    }
}

/// The payload of a successful [`SymbolStore::retrieve`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CachedSymbols {
    pub symbols: Vec<SymbolRecord>,
    pub dependencies: DependencyGraph,
}

/// Durable `{file -> (timestamp, symbols, dependencies)}` storage scoped by [`CacheKey`].
///
/// Read operations never fail: anything that prevents returning trustworthy data
/// (missing record, file-set mismatch, stale timestamp, corrupt artifact) is a miss.
/// Write operations report failures so the caller can roll back its in-memory state.
///
/// Implementations serialize writes per key; reads may run concurrently with writes
/// and observe either the state before or after a write, never a mix of both.
pub trait SymbolStore: Send + Sync {
    /// Replaces the whole record for `key`.
    ///
    /// `files` becomes the authoritative file set for later `retrieve` calls; their
    /// timestamps are read from the file system at this point. Records of other
    /// versions of the same index are deleted.
    fn store(
        &self,
        key: &CacheKey,
        files: &[PathBuf],
        symbols: &[SymbolRecord],
        dependencies: &DependencyGraph,
    ) -> Result<()>;

    /// Returns everything stored for `key` if, and only if, the stored file set equals
    /// `files` (order does not matter) and every file is unchanged on disk.
    fn retrieve(&self, key: &CacheKey, files: &[PathBuf]) -> Option<CachedSymbols>;

    /// Replaces one file's symbols and dependencies and records its new timestamp.
    fn update_file(
        &self,
        key: &CacheKey,
        file: &Path,
        last_modified: u64,
        symbols: &[SymbolRecord],
        dependencies: &BTreeSet<String>,
    ) -> Result<()> {
        let mut graph = DependencyGraph::new();
        graph.set(file, dependencies.iter().cloned());
        self.update_files(
            key,
            &[FileTimestamp::new(file, last_modified)],
            symbols,
            &graph,
        )
    }

    /// Replaces the data of every file in `files` as one transaction.
    ///
    /// Every symbol in `symbols` must be owned by one of `files`. Files not mentioned
    /// keep their data; mentioned files lose all previously stored symbols and
    /// dependencies, so a file may drop to zero symbols.
    fn update_files(
        &self,
        key: &CacheKey,
        files: &[FileTimestamp],
        symbols: &[SymbolRecord],
        dependencies: &DependencyGraph,
    ) -> Result<()>;

    /// Deletes the entire record for `key`.
    fn remove(&self, key: &CacheKey) -> Result<()>;

    fn remove_file(&self, key: &CacheKey, file: &Path) -> Result<()> {
        self.remove_files(key, &[file.to_path_buf()])
    }

    /// Drops the symbols, dependencies and timestamps of `files` from `key`'s record.
    fn remove_files(&self, key: &CacheKey, files: &[PathBuf]) -> Result<()>;

    /// Last stored timestamp for `file` under `key`, or `0` if the file is untracked.
    fn modification_timestamp(&self, key: &CacheKey, file: &Path) -> u64;
}

/// Reads the current timestamps of `files`.
///
/// Returns `None` if any file cannot be stat'ed; such a file can never match a stored
/// record, so callers treat that as a miss.
pub fn current_timestamps(
    fs: &dyn FileSystem,
    files: &[PathBuf],
) -> Option<BTreeMap<PathBuf, u64>> {
    let mut out = BTreeMap::new();
    for file in files {
        match fs.last_modified_millis(file) {
            Ok(millis) => {
                out.insert(file.clone(), millis);
            }
            Err(err) => {
                tracing::trace!(
                    target = "boot.cache",
                    path = %file.display(),
                    error = %err,
                    "requested file is not readable; treating as cache miss"
                );
                return None;
            }
        }
    }
    Some(out)
}

/// Like [`current_timestamps`] but skips files that do not exist instead of failing.
pub(crate) fn existing_timestamps(
    fs: &dyn FileSystem,
    files: &[PathBuf],
) -> BTreeMap<PathBuf, u64> {
    files
        .iter()
        .filter_map(|file| match fs.last_modified_millis(file) {
            Ok(millis) => Some((file.clone(), millis)),
            Err(err) => {
                tracing::debug!(
                    target = "boot.cache",
                    path = %file.display(),
                    error = %err,
                    "not tracking unreadable file"
                );
                None
            }
        })
        .collect()
}
