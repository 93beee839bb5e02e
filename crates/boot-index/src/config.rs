use crate::error::IndexError;
use crate::scanner::IndexSettings;
use boot_cache::{
    CacheConfig, CacheError, DiskStorePolicy, FileSystem, MemoPolicy, OnDiskStore, SymbolStore,
    TimestampStore, VoidStore, DEFAULT_COMPACTION_THRESHOLD,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Once};
use thiserror::Error;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Top-level configuration, usually loaded from `boot-index.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndexerConfig {
    #[serde(default)]
    pub cache: CacheSection,

    #[serde(default)]
    pub index: IndexSection,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// Durable JSON-lines logs in the cache directory.
    #[default]
    Disk,
    /// No caching; every project start is a full scan.
    Void,
    /// In-memory timestamp tables only.
    Timestamps,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheSection {
    #[serde(default)]
    pub backend: CacheBackend,

    /// Cache root. Falls back to `BOOT_INDEX_CACHE_DIR`, then `~/.boot-index/cache`.
    #[serde(default)]
    pub dir: Option<PathBuf>,

    #[serde(default = "CacheSection::default_compaction_threshold")]
    pub compaction_threshold: u32,
}

impl CacheSection {
    fn default_compaction_threshold() -> u32 {
        DEFAULT_COMPACTION_THRESHOLD
    }
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            backend: CacheBackend::default(),
            dir: None,
            compaction_threshold: Self::default_compaction_threshold(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndexSection {
    #[serde(default)]
    pub scan_test_sources: bool,

    /// Upper bound on `all_symbols` results; unlimited when absent.
    #[serde(default)]
    pub max_query_results: Option<usize>,

    #[serde(default = "IndexSection::default_memo_ttl_millis")]
    pub memo_ttl_millis: u64,
}

impl IndexSection {
    fn default_memo_ttl_millis() -> u64 {
        MemoPolicy::default().ttl_millis
    }
}

impl Default for IndexSection {
    fn default() -> Self {
        Self {
            scan_test_sources: false,
            max_query_results: None,
            memo_ttl_millis: Self::default_memo_ttl_millis(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// A simple level (`info`, `debug`, ...) or a full `EnvFilter` directive string.
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,

    #[serde(default)]
    pub json: bool,

    #[serde(default = "LoggingConfig::default_stderr")]
    pub stderr: bool,

    /// Append logs to this file as well. Ignored if it cannot be opened.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_owned()
    }

    fn default_stderr() -> bool {
        true
    }

    /// Filter directives for this config with `rust_log` layered on top. A bare level
    /// is accepted in any case, and `warning` means `warn`.
    fn directives(&self, rust_log: Option<&str>) -> String {
        const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

        let level = match self.level.trim() {
            "" => Self::default_level(),
            level if level.eq_ignore_ascii_case("warning") => "warn".to_owned(),
            level if LEVELS.iter().any(|known| level.eq_ignore_ascii_case(known)) => {
                level.to_ascii_lowercase()
            }
            directives => directives.to_owned(),
        };
        match rust_log.map(str::trim).filter(|extra| !extra.is_empty()) {
            Some(extra) => format!("{level},{extra}"),
            None => level,
        }
    }

    /// The effective filter: the configured directives with `RUST_LOG` merged on top.
    /// An unparseable `RUST_LOG` is ignored; an unparseable level falls back to `info`.
    pub fn env_filter(&self) -> EnvFilter {
        let rust_log = std::env::var("RUST_LOG").ok();
        EnvFilter::try_new(self.directives(rust_log.as_deref()))
            .or_else(|_| EnvFilter::try_new(self.directives(None)))
            .unwrap_or_else(|_| EnvFilter::new(Self::default_level()))
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            json: false,
            stderr: Self::default_stderr(),
            file: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse toml config: {0}")]
    Toml(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        // `message()` omits the source snippet.
        ConfigError::Toml(err.message().to_owned())
    }
}

impl IndexerConfig {
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Directory the on-disk store keeps its artifacts in.
    pub fn symbols_dir(&self) -> Result<PathBuf, CacheError> {
        let config = match &self.cache.dir {
            Some(dir) => CacheConfig {
                cache_root_override: Some(dir.clone()),
            },
            None => CacheConfig::from_env(),
        };
        config.symbols_dir()
    }

    pub fn settings(&self) -> IndexSettings {
        IndexSettings {
            scan_test_sources: self.index.scan_test_sources,
        }
    }

    pub fn memo_policy(&self) -> MemoPolicy {
        MemoPolicy {
            ttl_millis: self.index.memo_ttl_millis,
            ..MemoPolicy::default()
        }
    }

    /// Builds the store selected by `[cache] backend`.
    pub fn open_store(&self, fs: Arc<dyn FileSystem>) -> Result<Arc<dyn SymbolStore>, IndexError> {
        let store: Arc<dyn SymbolStore> = match self.cache.backend {
            CacheBackend::Void => Arc::new(VoidStore),
            CacheBackend::Timestamps => Arc::new(TimestampStore::new(fs)),
            CacheBackend::Disk => {
                let dir = self.symbols_dir()?;
                tracing::debug!(
                    target = "boot.index",
                    dir = %dir.display(),
                    "opening on-disk symbol cache"
                );
                Arc::new(OnDiskStore::new_with_policy(
                    dir,
                    fs,
                    DiskStorePolicy {
                        compaction_threshold: self.cache.compaction_threshold,
                    },
                )?)
            }
        };
        Ok(store)
    }
}

static TRACING_INIT: Once = Once::new();

/// Installs the global `tracing` subscriber.
///
/// Safe to call multiple times; only the first call has an effect.
pub fn init_tracing(logging: &LoggingConfig) {
    TRACING_INIT.call_once(|| {
        let filter = logging.env_filter();

        let mut make_writer = BoxMakeWriter::new(std::io::sink);
        if logging.stderr {
            // Test output capture only sees `eprint!`, which `TestWriter` goes through.
            if cfg!(debug_assertions) {
                make_writer = BoxMakeWriter::new(
                    make_writer.and(tracing_subscriber::fmt::writer::TestWriter::with_stderr),
                );
            } else {
                make_writer = BoxMakeWriter::new(make_writer.and(std::io::stderr));
            }
        }
        let log_file = logging.file.as_ref().and_then(|path| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .ok()
        });
        let file_failed = logging.file.is_some() && log_file.is_none();
        if let Some(file) = log_file {
            make_writer = BoxMakeWriter::new(make_writer.and(Mutex::new(file)));
        }

        let layer: Box<dyn tracing_subscriber::Layer<_> + Send + Sync> = if logging.json {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(make_writer)
                .with_ansi(false)
                .boxed()
        } else {
            tracing_subscriber::fmt::layer()
                .with_writer(make_writer)
                .with_ansi(false)
                .boxed()
        };

        let subscriber = tracing_subscriber::registry().with(filter).with(layer);
        if tracing::subscriber::set_global_default(subscriber).is_ok() && file_failed {
            if let Some(path) = logging.file.as_ref() {
                tracing::warn!(
                    target = "boot.index",
                    path = %path.display(),
                    "failed to open log file; file logging disabled"
                );
            }
        }
    });
}
