use boot_cache::{CachedSymbols, DependencyGraph, SymbolRecord};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, Default)]
struct FileEntry {
    last_modified: u64,
    symbols: Vec<SymbolRecord>,
}

/// In-memory image of one project's cache record.
///
/// The worker edits a private clone and publishes it once the store accepted the same
/// change, so readers never see data the store does not have.
#[derive(Clone, Debug, Default)]
pub(crate) struct ProjectView {
    files: BTreeMap<PathBuf, FileEntry>,
    dependencies: DependencyGraph,
}

impl ProjectView {
    pub(crate) fn from_cache(timestamps: BTreeMap<PathBuf, u64>, cached: CachedSymbols) -> Self {
        let mut files: BTreeMap<PathBuf, FileEntry> = timestamps
            .into_iter()
            .map(|(path, last_modified)| {
                (
                    path,
                    FileEntry {
                        last_modified,
                        symbols: Vec::new(),
                    },
                )
            })
            .collect();
        for record in cached.symbols {
            files
                .entry(record.owner_file.clone())
                .or_insert_with(|| FileEntry {
                    last_modified: record.last_modified,
                    symbols: Vec::new(),
                })
                .symbols
                .push(record);
        }
        Self {
            files,
            dependencies: cached.dependencies,
        }
    }

    pub(crate) fn contains(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    pub(crate) fn last_modified(&self, path: &Path) -> Option<u64> {
        self.files.get(path).map(|entry| entry.last_modified)
    }

    pub(crate) fn replace_file(
        &mut self,
        path: &Path,
        last_modified: u64,
        symbols: Vec<SymbolRecord>,
        dependencies: &BTreeSet<String>,
    ) {
        self.files.insert(
            path.to_path_buf(),
            FileEntry {
                last_modified,
                symbols,
            },
        );
        self.dependencies.set(path, dependencies.iter().cloned());
    }

    pub(crate) fn remove_file(&mut self, path: &Path) -> bool {
        self.dependencies.remove(path);
        self.files.remove(path).is_some()
    }

    pub(crate) fn files(&self) -> impl Iterator<Item = &Path> {
        self.files.keys().map(PathBuf::as_path)
    }

    pub(crate) fn symbols_of(&self, path: &Path) -> &[SymbolRecord] {
        self.files
            .get(path)
            .map(|entry| entry.symbols.as_slice())
            .unwrap_or_default()
    }

    pub(crate) fn symbols(&self) -> impl Iterator<Item = &SymbolRecord> {
        self.files.values().flat_map(|entry| entry.symbols.iter())
    }

    pub(crate) fn dependencies(&self) -> &DependencyGraph {
        &self.dependencies
    }

    /// Files that depend on any of `types`, skipping `visited`.
    pub(crate) fn dependents_of(
        &self,
        types: &BTreeSet<String>,
        visited: &BTreeSet<PathBuf>,
    ) -> Vec<PathBuf> {
        self.dependencies
            .dependents_of(types, visited)
            .map(Path::to_path_buf)
            .collect()
    }

    pub(crate) fn file_count(&self) -> usize {
        self.files.len()
    }

    pub(crate) fn symbol_count(&self) -> usize {
        self.files.values().map(|entry| entry.symbols.len()).sum()
    }
}
