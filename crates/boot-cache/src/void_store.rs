use crate::deps::DependencyGraph;
use crate::error::Result;
use crate::key::CacheKey;
use crate::store::{CachedSymbols, FileTimestamp, SymbolStore};
use crate::symbol::SymbolRecord;
use std::path::{Path, PathBuf};

/// A store that remembers nothing. Used when caching is disabled.
#[derive(Clone, Copy, Debug, Default)]
pub struct VoidStore;

impl SymbolStore for VoidStore {
    fn store(
        &self,
        _key: &CacheKey,
        _files: &[PathBuf],
        _symbols: &[SymbolRecord],
        _dependencies: &DependencyGraph,
    ) -> Result<()> {
        Ok(())
    }

    fn retrieve(&self, _key: &CacheKey, _files: &[PathBuf]) -> Option<CachedSymbols> {
        None
    }

    fn update_files(
        &self,
        _key: &CacheKey,
        _files: &[FileTimestamp],
        _symbols: &[SymbolRecord],
        _dependencies: &DependencyGraph,
    ) -> Result<()> {
        Ok(())
    }

    fn remove(&self, _key: &CacheKey) -> Result<()> {
        Ok(())
    }

    fn remove_files(&self, _key: &CacheKey, _files: &[PathBuf]) -> Result<()> {
        Ok(())
    }

    fn modification_timestamp(&self, _key: &CacheKey, _file: &Path) -> u64 {
        0
    }
}
