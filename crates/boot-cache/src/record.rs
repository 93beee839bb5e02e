use crate::deps::DependencyGraph;
use crate::error::{CacheError, Result};
use crate::store::{CachedSymbols, FileTimestamp};
use crate::symbol::SymbolRecord;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Everything cached for one key: the file table, the flat symbol list and the
/// dependency multimap.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord {
    pub timestamps: BTreeMap<PathBuf, u64>,
    pub symbols: Vec<SymbolRecord>,
    #[serde(default)]
    pub dependencies: DependencyGraph,
}

impl CacheRecord {
    pub fn new(
        timestamps: BTreeMap<PathBuf, u64>,
        symbols: Vec<SymbolRecord>,
        mut dependencies: DependencyGraph,
    ) -> Self {
        // Dependencies of files outside the table would resurrect stale edges later.
        dependencies.retain_files(|file| timestamps.contains_key(file));
        Self {
            timestamps,
            symbols,
            dependencies,
        }
    }

    /// Exact file-set and timestamp equality.
    pub fn matches(&self, current: &BTreeMap<PathBuf, u64>) -> bool {
        self.timestamps == *current
    }

    /// Replaces the data of `files`. Symbols of every updated file are dropped first,
    /// then the new symbols are appended.
    pub fn apply_update(
        &mut self,
        files: &[FileTimestamp],
        symbols: &[SymbolRecord],
        dependencies: &DependencyGraph,
    ) {
        let updated: BTreeSet<&Path> = files.iter().map(|f| f.file.as_path()).collect();
        self.symbols
            .retain(|symbol| !updated.contains(symbol.owner_file.as_path()));
        self.symbols.extend(symbols.iter().cloned());

        for stamp in files {
            self.timestamps
                .insert(stamp.file.clone(), stamp.last_modified);
            self.dependencies.set(
                stamp.file.clone(),
                dependencies.tokens(&stamp.file).map(str::to_string),
            );
        }
    }

    pub fn apply_delete(&mut self, files: &[PathBuf]) {
        let removed: BTreeSet<&Path> = files.iter().map(PathBuf::as_path).collect();
        self.symbols
            .retain(|symbol| !removed.contains(symbol.owner_file.as_path()));
        for file in files {
            self.timestamps.remove(file);
            self.dependencies.remove(file);
        }
    }

    pub fn into_cached(self) -> CachedSymbols {
        CachedSymbols {
            symbols: self.symbols,
            dependencies: self.dependencies,
        }
    }
}

/// Rejects batches whose symbols belong to files that are not part of the batch.
pub(crate) fn validate_batch(files: &[FileTimestamp], symbols: &[SymbolRecord]) -> Result<()> {
    let batch: BTreeSet<&Path> = files.iter().map(|f| f.file.as_path()).collect();
    match symbols
        .iter()
        .find(|symbol| !batch.contains(symbol.owner_file.as_path()))
    {
        Some(stray) => Err(CacheError::SymbolOutsideBatch {
            file: stray.owner_file.clone(),
        }),
        None => Ok(()),
    }
}
