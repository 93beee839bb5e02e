use crate::config::ConfigError;
use crate::scanner::ScanError;
use boot_cache::CacheError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to scan {path}: {source}")]
    Scan {
        path: PathBuf,
        #[source]
        source: ScanError,
    },

    #[error("operation cancelled")]
    Cancelled,

    #[error("index update queue is closed")]
    QueueClosed,

    #[error("index update panicked")]
    Panicked,

    #[error("failed to start index worker: {0}")]
    Worker(#[source] std::io::Error),

    #[error("unknown project `{0}`")]
    UnknownProject(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl IndexError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        IndexError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = IndexError> = std::result::Result<T, E>;
