use boot_cache::SymbolRecord;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use thiserror::Error;

/// Settings the scanner and the indexer share; opaque to the cache.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSettings {
    pub scan_test_sources: bool,
}

/// One file handed to a [`Scanner`].
#[derive(Clone, Copy, Debug)]
pub struct ScanInput<'a> {
    pub path: &'a Path,
    pub uri: &'a str,
    pub content: &'a str,
    /// Timestamp the content was read at; stamped onto every produced record.
    pub last_modified: u64,
    pub settings: IndexSettings,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScanOutput {
    pub symbols: Vec<SymbolRecord>,
    /// Opaque tokens this file's symbols depend on (fully qualified type names).
    pub dependencies: BTreeSet<String>,
    /// Types declared by this file. Files depending on them are rescanned with it.
    pub declared_types: BTreeSet<String>,
}

#[derive(Debug, Error)]
#[error("{message}")]
pub struct ScanError {
    message: String,
}

impl ScanError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Extracts symbols from one source file.
///
/// Scanners are pure functions of their input; the indexer decides when to call them
/// and calls them at most once per stale file per update.
pub trait Scanner: Send + Sync {
    fn scan(&self, input: &ScanInput<'_>) -> Result<ScanOutput, ScanError>;
}

impl<F> Scanner for F
where
    F: Fn(&ScanInput<'_>) -> Result<ScanOutput, ScanError> + Send + Sync,
{
    fn scan(&self, input: &ScanInput<'_>) -> Result<ScanOutput, ScanError> {
        self(input)
    }
}

/// Observes every scanner invocation.
pub trait ScanListener: Send + Sync {
    fn file_scanned(&self, uri: &str);
}

/// Counts scanner invocations per document URI.
#[derive(Debug, Default)]
pub struct ScanCounter {
    counts: Mutex<HashMap<String, usize>>,
}

impl ScanCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, uri: &str) -> usize {
        self.counts.lock().get(uri).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.lock().values().sum()
    }

    pub fn reset(&self) {
        self.counts.lock().clear();
    }
}

impl ScanListener for ScanCounter {
    fn file_scanned(&self, uri: &str) {
        *self.counts.lock().entry(uri.to_string()).or_default() += 1;
    }
}
