use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, CacheError>;

/// Errors produced by symbol cache persistence.
///
/// Read paths never surface these: a cache that cannot be read is a miss. They are
/// returned from write paths (`store`, `update_*`, `remove*`) so callers can roll back.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("failed to determine home directory for default cache path")]
    MissingHomeDir,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error ({category}) at line {line}, column {column}")]
    Json {
        category: &'static str,
        line: usize,
        column: usize,
    },

    #[error("invalid cache key {key:?}: {reason}")]
    InvalidKey { key: String, reason: &'static str },

    #[error("symbol owned by {file} is not part of the update batch")]
    SymbolOutsideBatch { file: PathBuf },

    #[error("incompatible cache schema version: expected {expected}, found {found}")]
    IncompatibleSchemaVersion { expected: u32, found: u32 },
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        // Symbol payloads carry user paths and source snippets; keep only the position so
        // messages never echo cached content into logs.
        let category = match err.classify() {
            serde_json::error::Category::Io => "io",
            serde_json::error::Category::Syntax => "syntax",
            serde_json::error::Category::Data => "data",
            serde_json::error::Category::Eof => "eof",
        };
        Self::Json {
            category,
            line: err.line(),
            column: err.column(),
        }
    }
}
